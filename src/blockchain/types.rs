//! Ledger-specific types and error definitions.

use alloy::primitives::{Address, Bytes, TxHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export ChainParams from config module to avoid duplication
pub use crate::config::schema::ChainConfig as ChainParams;

/// Errors that can occur while talking to the remote ledger.
///
/// Connection-level failures (`Transport`, `Timeout`, `NotConnected`) are
/// absorbed by the connection manager; submission callers see them only as a
/// terminal outcome of the one request they affected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Connection, probe or submission transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote call did not answer before its deadline.
    #[error("ledger call timed out after {0} seconds")]
    Timeout(u64),

    /// No live connection is currently installed.
    #[error("not connected to any ledger endpoint")]
    NotConnected,

    /// Private credential could not be decoded or does not match the sender.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// Contract execution reverted or the node refused the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// An event listener reported a transport error.
    #[error("subscription error on {event}: {reason}")]
    Subscription { event: String, reason: String },

    /// A response or log could not be ABI-decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Call arguments do not fit the contract ABI.
    #[error("contract interface error: {0}")]
    Abi(String),
}

impl LedgerError {
    /// True for failures the heartbeat recovers from by failing over.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LedgerError::Transport(_) | LedgerError::Timeout(_) | LedgerError::NotConnected
        )
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Gas policy applied to every request the pipeline builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    pub limit: u64,
    pub price: u128,
}

/// Unsigned description of a state-changing call against the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub sender: Address,
    pub recipient: Address,
    pub payload: Bytes,
    pub gas_limit: u64,
    pub gas_price: u128,
}

/// Serialized, signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    hash: TxHash,
    nonce: u64,
    raw: Bytes,
}

impl SignedTransaction {
    pub(crate) fn new(hash: TxHash, nonce: u64, raw: Bytes) -> Self {
        Self { hash, nonce, raw }
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// EIP-2718 encoded bytes.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }
}

/// Minimal receipt view carried in confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// False when execution reverted.
    pub success: bool,
}

/// Successful terminal outcome of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub receipt: Receipt,
    pub confirmations: u64,
}

/// Asynchronous notification emitted for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    /// May fire repeatedly with increasing counts.
    Confirmation { count: u64, receipt: Receipt },
    Error(LedgerError),
}

/// Exactly one of these is produced per submitted transaction.
pub type SubmissionOutcome = Result<Confirmation, LedgerError>;

//! Remote ledger interface consumed by the connection manager, event router
//! and transaction pipeline.
//!
//! A [`LedgerConnector`] opens streaming sessions; a [`LedgerSession`] is one
//! open session bound to one endpoint. Asynchronous notifications (event
//! `data`/`error`, submission `confirmation`/`error`) arrive over channels
//! whose lifetime is bound to the session.

use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::Log;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::blockchain::types::{LedgerResult, SignedTransaction, SubmissionEvent};
use crate::connection::endpoint::Endpoint;

/// Stream of raw logs for one subscription; `Err` items are listener errors.
pub type LogStream = mpsc::Receiver<LedgerResult<Log>>;

/// Stream of confirmation/error notifications for one submitted transaction.
pub type SubmissionStream = mpsc::Receiver<SubmissionEvent>;

/// Opens transport sessions to ledger endpoints.
#[async_trait]
pub trait LedgerConnector: Send + Sync + 'static {
    /// Open a session; resolves once the transport reports ready.
    async fn open(&self, endpoint: &Endpoint) -> LedgerResult<Arc<dyn LedgerSession>>;
}

/// An open streaming session to one endpoint.
#[async_trait]
pub trait LedgerSession: Send + Sync + 'static {
    /// Endpoint this session is bound to.
    fn endpoint(&self) -> &Endpoint;

    /// Lightweight round-trip used by the heartbeat.
    async fn probe(&self) -> LedgerResult<()>;

    /// Pending transaction count for `address`.
    async fn pending_nonce(&self, address: Address) -> LedgerResult<u64>;

    /// Submit a signed transaction. `Err` means the submission itself failed;
    /// later outcomes arrive on the returned stream.
    async fn send_raw(
        &self,
        tx: &SignedTransaction,
        confirmations: u64,
    ) -> LedgerResult<SubmissionStream>;

    /// Subscribe to logs of `contract` whose first topic is `topic`.
    async fn subscribe(&self, contract: Address, topic: B256) -> LedgerResult<LogStream>;

    /// Read-only contract call; returns the ABI-encoded result.
    async fn call(&self, contract: Address, input: Bytes) -> LedgerResult<Bytes>;

    /// Close the transport. Open streams end once it is closed.
    async fn close(&self);
}

//! Transaction signing.
//!
//! # Security
//! - Credentials are decoded per call and dropped afterwards
//! - Keys are never logged or serialized
//! - Chain id from the custom network is embedded in every signature (EIP-155),
//!   so signed payloads cannot be replayed on the public base network

use alloy::consensus::{transaction::SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{hex, Address, Bytes, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::Serialize;

use crate::blockchain::types::{
    ChainParams, LedgerError, LedgerResult, SignedTransaction, TransactionRequest,
};

/// A freshly generated address and its credential.
#[derive(Debug, Clone, Serialize)]
pub struct KeyPair {
    pub address: Address,
    /// `0x`-prefixed hex private key.
    pub private_key: String,
}

/// Decode an externally supplied credential (hex, optional `0x` prefix).
fn decode_credential(credential: &str) -> LedgerResult<PrivateKeySigner> {
    let key_hex = credential.strip_prefix("0x").unwrap_or(credential);

    let bytes = hex::decode(key_hex)
        .map_err(|e| LedgerError::InvalidCredential(format!("Invalid private key format: {}", e)))?;

    PrivateKeySigner::from_slice(&bytes)
        .map_err(|e| LedgerError::InvalidCredential(format!("Invalid private key: {}", e)))
}

/// Address controlled by `credential`.
pub fn address_of(credential: &str) -> LedgerResult<Address> {
    Ok(decode_credential(credential)?.address())
}

/// Generate a new random key pair.
pub fn create_address() -> KeyPair {
    let signer = PrivateKeySigner::random();
    KeyPair {
        address: signer.address(),
        private_key: format!("0x{}", hex::encode(signer.to_bytes())),
    }
}

/// Sign `request` with `credential` for the given chain.
///
/// Pure: performs no I/O. Fails only with `InvalidCredential`, either because
/// the credential does not decode or because it does not control
/// `request.sender`.
pub fn sign(
    request: &TransactionRequest,
    credential: &str,
    nonce: u64,
    chain: &ChainParams,
) -> LedgerResult<SignedTransaction> {
    let signer = decode_credential(credential)?;
    if signer.address() != request.sender {
        return Err(LedgerError::InvalidCredential(format!(
            "credential controls {} but request is from {}",
            signer.address(),
            request.sender
        )));
    }

    let tx = TxLegacy {
        chain_id: Some(chain.chain_id),
        nonce,
        gas_price: request.gas_price,
        gas_limit: request.gas_limit,
        to: request.recipient.into(),
        value: U256::ZERO,
        input: request.payload.clone(),
    };

    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|e| LedgerError::InvalidCredential(format!("Signing failed: {}", e)))?;
    let signed = tx.into_signed(signature);
    let hash = *signed.hash();
    let envelope = TxEnvelope::from(signed);

    Ok(SignedTransaction::new(hash, nonce, Bytes::from(envelope.encoded_2718())))
}

//! Transaction pipeline: nonce, sign, submit, resolve.
//!
//! # Responsibilities
//! - Fetch a fresh pending nonce for every submission
//! - Build and sign the request with the configured chain and gas policy
//! - Submit over the live connection
//! - Resolve exactly once: on the first sufficient confirmation or the first error
//!
//! Nonces are never cached; concurrent submissions from the same sender may
//! observe the same pending count and the node decides between them.

use alloy::primitives::{Address, Bytes};
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::ledger::SubmissionStream;
use crate::blockchain::signer;
use crate::blockchain::types::{
    ChainParams, Confirmation, GasPolicy, LedgerError, LedgerResult, SignedTransaction,
    SubmissionEvent, SubmissionOutcome, TransactionRequest,
};
use crate::config::ClientConfig;
use crate::connection::ConnectionManager;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;

/// Submits state-changing calls against one contract.
#[derive(Debug, Clone)]
pub struct TransactionPipeline {
    connection: ConnectionManager,
    contract: Address,
    chain: ChainParams,
    gas: GasPolicy,
    confirmations: u64,
    request_secs: u64,
}

impl TransactionPipeline {
    pub fn new(connection: ConnectionManager, contract: Address, config: &ClientConfig) -> Self {
        Self {
            connection,
            contract,
            chain: config.chain.clone(),
            gas: config.gas.policy(),
            confirmations: config.submission.confirmations,
            request_secs: config.timeouts.request_secs,
        }
    }

    /// Sign `payload` as `sender` with `credential` and submit it to the contract.
    ///
    /// The returned outcome is the first terminal notification for this
    /// transaction; later confirmations are ignored.
    pub async fn submit(&self, sender: Address, credential: &str, payload: Bytes) -> SubmissionOutcome {
        let submission_id = Uuid::new_v4();
        let span = tracing::info_span!("submission", submission_id = %submission_id, sender = %sender);

        let outcome = self.run(sender, credential, payload).instrument(span).await;
        metrics::record_submission(outcome_label(&outcome));
        outcome
    }

    async fn run(&self, sender: Address, credential: &str, payload: Bytes) -> SubmissionOutcome {
        let session = self.connection.session().await?;

        // 1. Fresh pending nonce
        let nonce = with_deadline(self.request_secs, session.pending_nonce(sender)).await?;

        // 2. Build and sign
        let request = TransactionRequest {
            sender,
            recipient: self.contract,
            payload,
            gas_limit: self.gas.limit,
            gas_price: self.gas.price,
        };
        let signed = signer::sign(&request, credential, nonce, &self.chain).map_err(|e| {
            tracing::warn!(error = %e, "Signing failed");
            e
        })?;

        // 3. Submit
        let stream = with_deadline(
            self.request_secs,
            session.send_raw(&signed, self.confirmations),
        )
        .await?;
        tracing::info!(tx_hash = %signed.hash(), nonce = nonce, "Transaction submitted");

        // 4. First terminal notification wins
        resolve(&signed, stream, self.confirmations).await
    }
}

/// Drain `stream` until a confirmation reaches `required` or an error arrives.
async fn resolve(
    tx: &SignedTransaction,
    mut stream: SubmissionStream,
    required: u64,
) -> LedgerResult<Confirmation> {
    while let Some(event) = stream.recv().await {
        match event {
            SubmissionEvent::Confirmation { count, receipt } if count >= required => {
                if !receipt.success {
                    tracing::warn!(tx_hash = %tx.hash(), block = ?receipt.block_number, "Transaction reverted");
                    return Err(LedgerError::Rejected(format!(
                        "transaction {} reverted",
                        tx.hash()
                    )));
                }
                tracing::info!(
                    tx_hash = %tx.hash(),
                    block = ?receipt.block_number,
                    confirmations = count,
                    "Transaction confirmed"
                );
                return Ok(Confirmation {
                    receipt,
                    confirmations: count,
                });
            }
            SubmissionEvent::Confirmation { count, .. } => {
                tracing::debug!(tx_hash = %tx.hash(), confirmations = count, required = required, "Waiting for confirmations");
            }
            SubmissionEvent::Error(e) => {
                tracing::warn!(tx_hash = %tx.hash(), error = %e, "Submission failed");
                return Err(e);
            }
        }
    }

    Err(LedgerError::Transport(format!(
        "submission stream for {} closed without an outcome",
        tx.hash()
    )))
}

fn outcome_label(outcome: &SubmissionOutcome) -> &'static str {
    match outcome {
        Ok(_) => "confirmed",
        Err(LedgerError::Rejected(_)) => "rejected",
        Err(LedgerError::InvalidCredential(_)) => "invalid_credential",
        Err(LedgerError::Timeout(_)) => "timeout",
        Err(e) if e.is_transport() => "transport",
        Err(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::Receipt;
    use alloy::primitives::TxHash;
    use tokio::sync::mpsc;

    fn tx() -> SignedTransaction {
        SignedTransaction::new(TxHash::repeat_byte(0xab), 3, Bytes::new())
    }

    fn receipt(success: bool) -> Receipt {
        Receipt {
            tx_hash: TxHash::repeat_byte(0xab),
            block_number: Some(12),
            gas_used: 21_000,
            success,
        }
    }

    #[tokio::test]
    async fn test_first_confirmation_wins() {
        let (events, stream) = mpsc::channel(4);
        events
            .send(SubmissionEvent::Confirmation { count: 1, receipt: receipt(true) })
            .await
            .unwrap();
        events
            .send(SubmissionEvent::Error(LedgerError::Transport("late".into())))
            .await
            .unwrap();

        let outcome = resolve(&tx(), stream, 1).await.unwrap();
        assert_eq!(outcome.confirmations, 1);
        assert_eq!(outcome.receipt.block_number, Some(12));
    }

    #[tokio::test]
    async fn test_waits_for_required_confirmations() {
        let (events, stream) = mpsc::channel(4);
        events
            .send(SubmissionEvent::Confirmation { count: 1, receipt: receipt(true) })
            .await
            .unwrap();
        events
            .send(SubmissionEvent::Confirmation { count: 2, receipt: receipt(true) })
            .await
            .unwrap();

        let outcome = resolve(&tx(), stream, 2).await.unwrap();
        assert_eq!(outcome.confirmations, 2);
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_rejected() {
        let (events, stream) = mpsc::channel(4);
        events
            .send(SubmissionEvent::Confirmation { count: 1, receipt: receipt(false) })
            .await
            .unwrap();

        let outcome = resolve(&tx(), stream, 1).await;
        assert!(matches!(outcome, Err(LedgerError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_closed_stream_is_transport_error() {
        let (events, stream) = mpsc::channel::<SubmissionEvent>(1);
        drop(events);

        let outcome = resolve(&tx(), stream, 1).await;
        assert!(matches!(outcome, Err(LedgerError::Transport(_))));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&Err(LedgerError::Rejected("x".into()))), "rejected");
        assert_eq!(outcome_label(&Err(LedgerError::Timeout(2))), "timeout");
        assert_eq!(outcome_label(&Err(LedgerError::NotConnected)), "transport");
        assert_eq!(outcome_label(&Err(LedgerError::Transport("reset".into()))), "transport");
        assert_eq!(outcome_label(&Err(LedgerError::Abi("arity".into()))), "failed");
    }
}

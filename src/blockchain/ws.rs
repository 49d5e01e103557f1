//! WebSocket ledger transport.
//!
//! # Responsibilities
//! - Open streaming sessions to a node endpoint
//! - Liveness probe, pending nonce, raw submission, log subscriptions, calls
//! - Classify node-side JSON-RPC errors as rejections, everything else as
//!   transport failures
//! - Track every task a session spawns and abort them all on close, so
//!   receipt watchers and log forwarders end with the session

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{Filter, TransactionReceipt, TransactionRequest};
use alloy::transports::TransportError;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::blockchain::ledger::{LedgerConnector, LedgerSession, LogStream, SubmissionStream};
use crate::blockchain::types::{
    LedgerError, LedgerResult, Receipt, SignedTransaction, SubmissionEvent,
};
use crate::config::schema::TimeoutConfig;
use crate::connection::endpoint::Endpoint;

/// Buffered items per subscription listener.
const LOG_BUFFER: usize = 64;

fn transport_error(e: TransportError) -> LedgerError {
    LedgerError::Transport(e.to_string())
}

/// Node-reported errors are rejections; connection problems are transport errors.
fn submission_error(e: TransportError) -> LedgerError {
    match e.as_error_resp() {
        Some(payload) => LedgerError::Rejected(payload.message.to_string()),
        None => LedgerError::Transport(e.to_string()),
    }
}

impl From<&TransactionReceipt> for Receipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            success: receipt.status(),
        }
    }
}

/// Background tasks owned by one session.
#[derive(Debug, Default)]
struct SessionTasks {
    handles: Mutex<Vec<AbortHandle>>,
}

impl SessionTasks {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task).abort_handle();
        if let Ok(mut handles) = self.handles.lock() {
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
        }
    }

    /// Abort every task still running. Returns how many were tracked.
    fn abort_all(&self) -> usize {
        let handles = match self.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in &handles {
            handle.abort();
        }
        handles.len()
    }
}

/// Connector producing [`WsSession`]s.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    confirmation_timeout: Option<Duration>,
}

impl WsConnector {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        Self {
            confirmation_timeout: timeouts.confirmation_secs.map(Duration::from_secs),
        }
    }
}

#[async_trait]
impl LedgerConnector for WsConnector {
    async fn open(&self, endpoint: &Endpoint) -> LedgerResult<Arc<dyn LedgerSession>> {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_ws(WsConnect::new(endpoint.as_str()))
            .await
            .map_err(transport_error)?
            .erased();

        tracing::debug!(endpoint = %endpoint, "WebSocket session open");

        Ok(Arc::new(WsSession {
            endpoint: endpoint.clone(),
            provider: ArcSwapOption::from_pointee(provider),
            confirmation_timeout: self.confirmation_timeout,
            tasks: SessionTasks::default(),
        }))
    }
}

/// One open WebSocket session.
pub struct WsSession {
    endpoint: Endpoint,
    provider: ArcSwapOption<DynProvider>,
    confirmation_timeout: Option<Duration>,
    tasks: SessionTasks,
}

impl WsSession {
    fn provider(&self) -> LedgerResult<Arc<DynProvider>> {
        self.provider.load_full().ok_or(LedgerError::NotConnected)
    }
}

#[async_trait]
impl LedgerSession for WsSession {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn probe(&self) -> LedgerResult<()> {
        self.provider()?
            .get_net_version()
            .await
            .map(|_| ())
            .map_err(transport_error)
    }

    async fn pending_nonce(&self, address: Address) -> LedgerResult<u64> {
        self.provider()?
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(transport_error)
    }

    async fn send_raw(
        &self,
        tx: &SignedTransaction,
        confirmations: u64,
    ) -> LedgerResult<SubmissionStream> {
        let provider = self.provider()?;
        let pending = provider
            .send_raw_transaction(tx.raw())
            .await
            .map_err(submission_error)?;

        let (events_tx, events_rx) = mpsc::channel(4);
        let watch = pending
            .with_required_confirmations(confirmations)
            .with_timeout(self.confirmation_timeout);
        let tx_hash = tx.hash();

        self.tasks.spawn(async move {
            let event = match watch.get_receipt().await {
                Ok(receipt) => SubmissionEvent::Confirmation {
                    count: confirmations,
                    receipt: Receipt::from(&receipt),
                },
                Err(e) => {
                    tracing::debug!(tx_hash = %tx_hash, error = %e, "Receipt watch failed");
                    SubmissionEvent::Error(LedgerError::Transport(e.to_string()))
                }
            };
            let _ = events_tx.send(event).await;
        });

        Ok(events_rx)
    }

    async fn subscribe(&self, contract: Address, topic: B256) -> LedgerResult<LogStream> {
        let filter = Filter::new().address(contract).event_signature(topic);
        let mut subscription = self
            .provider()?
            .subscribe_logs(&filter)
            .await
            .map_err(transport_error)?;

        let (logs_tx, logs_rx) = mpsc::channel(LOG_BUFFER);
        self.tasks.spawn(async move {
            loop {
                let item = match subscription.recv().await {
                    Ok(log) => Ok(log),
                    Err(RecvError::Lagged(skipped)) => Err(LedgerError::Transport(format!(
                        "listener lagged, {} logs skipped",
                        skipped
                    ))),
                    Err(RecvError::Closed) => break,
                };
                if logs_tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        Ok(logs_rx)
    }

    async fn call(&self, contract: Address, input: Bytes) -> LedgerResult<Bytes> {
        let request = TransactionRequest::default()
            .with_to(contract)
            .with_input(input);
        self.provider()?
            .call(request)
            .await
            .map_err(submission_error)
    }

    async fn close(&self) {
        let aborted = self.tasks.abort_all();
        if self.provider.swap(None).is_some() {
            tracing::debug!(endpoint = %self.endpoint, aborted_tasks = aborted, "WebSocket session closed");
        }
    }
}

impl std::fmt::Debug for WsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSession")
            .field("endpoint", &self.endpoint.as_str())
            .field("open", &self.provider.load().is_some())
            .finish()
    }
}

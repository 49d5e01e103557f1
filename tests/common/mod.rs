//! Shared utilities for integration tests: a scripted in-memory ledger.

#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::Log;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use content_ledger_client::blockchain::ledger::{
    LedgerConnector, LedgerSession, LogStream, SubmissionStream,
};
use content_ledger_client::blockchain::types::{
    LedgerError, LedgerResult, Receipt, SignedTransaction, SubmissionEvent,
};
use content_ledger_client::config::ClientConfig;
use content_ledger_client::connection::Endpoint;
use content_ledger_client::contract::ContractInterface;
use content_ledger_client::ContentClient;

pub const PRIMARY: &str = "primary.test";
pub const SECONDARY: &str = "secondary.test";
pub const CONTRACT: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

// Well-known test private key (Anvil's first account)
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Build artifact of the contract used throughout the tests.
pub const ABI_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/DigitalContentObject.json");

pub fn interface() -> ContractInterface {
    ContractInterface::load(std::path::Path::new(ABI_PATH)).unwrap()
}

pub fn client_with(config: &ClientConfig, connector: &MockConnector) -> ContentClient {
    ContentClient::new(config, interface(), Arc::new(connector.clone())).unwrap()
}

pub fn client(connector: &MockConnector) -> ContentClient {
    client_with(&test_config(), connector)
}

pub fn sender() -> Address {
    TEST_ADDRESS.parse().unwrap()
}

/// Config pointing at the mock endpoints. The heartbeat interval is long so
/// tests drive ticks by hand.
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.endpoints.primary = format!("ws://{}:8546", PRIMARY);
    config.endpoints.secondary = Some(format!("ws://{}:8546", SECONDARY));
    config.contract.address = CONTRACT.to_string();
    config.contract.abi_path = ABI_PATH.into();
    config.heartbeat.interval_ms = 60_000;
    config.heartbeat.probe_timeout_secs = 1;
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 2;
    config
}

pub fn receipt(success: bool) -> Receipt {
    Receipt {
        tx_hash: B256::repeat_byte(0x77),
        block_number: Some(100),
        gas_used: 50_000,
        success,
    }
}

/// How the mock answers `send_raw`.
#[derive(Debug, Clone)]
pub enum SubmissionScript {
    /// Accept and emit these events, then close the stream.
    Events(Vec<SubmissionEvent>),
    /// Fail the submission call itself.
    Fail(LedgerError),
}

impl Default for SubmissionScript {
    fn default() -> Self {
        SubmissionScript::Events(vec![SubmissionEvent::Confirmation {
            count: 1,
            receipt: receipt(true),
        }])
    }
}

/// Everything the mock ledger has seen, plus its scripted behavior.
#[derive(Default)]
pub struct LedgerScript {
    /// Hosts opened, in order.
    pub opens: Mutex<Vec<String>>,
    /// Hosts that refuse new sessions.
    pub refuse: Mutex<HashSet<String>>,
    /// Delay before an open completes.
    pub open_delay: Mutex<Option<Duration>>,
    /// Delay before a liveness check answers.
    pub alive_delay: Mutex<Option<Duration>>,
    /// (host, topic) subscriptions that fail.
    pub refuse_topics: Mutex<HashSet<(String, B256)>>,
    pub sessions: Mutex<Vec<Arc<MockSession>>>,
    pub nonce_calls: AtomicU64,
    pub submission: Mutex<SubmissionScript>,
    pub sent: Mutex<Vec<SignedTransaction>>,
    pub call_response: Mutex<Bytes>,
}

impl LedgerScript {
    pub fn opened_hosts(&self) -> Vec<String> {
        self.opens.lock().unwrap().clone()
    }

    pub fn refuse(&self, host: &str) {
        self.refuse.lock().unwrap().insert(host.to_string());
    }

    pub fn accept(&self, host: &str) {
        self.refuse.lock().unwrap().remove(host);
    }

    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_alive_delay(&self, delay: Duration) {
        *self.alive_delay.lock().unwrap() = Some(delay);
    }

    /// Make sessions on `host` refuse subscriptions to `topic`.
    pub fn refuse_topic(&self, host: &str, topic: B256) {
        self.refuse_topics
            .lock()
            .unwrap()
            .insert((host.to_string(), topic));
    }

    pub fn set_submission(&self, script: SubmissionScript) {
        *self.submission.lock().unwrap() = script;
    }

    pub fn set_call_response(&self, data: Bytes) {
        *self.call_response.lock().unwrap() = data;
    }

    /// Most recently opened session.
    pub fn latest(&self) -> Arc<MockSession> {
        self.sessions.lock().unwrap().last().cloned().unwrap()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<SignedTransaction> {
        self.sent.lock().unwrap().clone()
    }
}

/// Connector handing out [`MockSession`]s.
#[derive(Clone, Default)]
pub struct MockConnector {
    pub script: Arc<LedgerScript>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerConnector for MockConnector {
    async fn open(&self, endpoint: &Endpoint) -> LedgerResult<Arc<dyn LedgerSession>> {
        let host = endpoint.url().host_str().unwrap_or_default().to_string();
        self.script.opens.lock().unwrap().push(host.clone());

        let delay = *self.script.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.script.refuse.lock().unwrap().contains(&host) {
            return Err(LedgerError::Transport(format!("{} refused connection", host)));
        }

        let session = Arc::new(MockSession {
            endpoint: endpoint.clone(),
            host,
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            probes: AtomicU64::new(0),
            topics: Mutex::new(Vec::new()),
            log_senders: Mutex::new(Vec::new()),
            script: self.script.clone(),
        });
        self.script.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }
}

/// One scripted session.
pub struct MockSession {
    pub endpoint: Endpoint,
    pub host: String,
    pub alive: AtomicBool,
    pub closed: AtomicBool,
    pub probes: AtomicU64,
    pub topics: Mutex<Vec<B256>>,
    log_senders: Mutex<Vec<(B256, mpsc::Sender<LedgerResult<Log>>)>>,
    script: Arc<LedgerScript>,
}

impl MockSession {
    /// Make every further probe fail.
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn subscribed_topics(&self) -> Vec<B256> {
        self.topics.lock().unwrap().clone()
    }

    /// Deliver `item` to every listener subscribed to `topic`.
    pub async fn emit(&self, topic: B256, item: LedgerResult<Log>) {
        let senders: Vec<_> = self
            .log_senders
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, tx)| tx.clone())
            .collect();
        for tx in senders {
            let _ = tx.send(item.clone()).await;
        }
    }
}

#[async_trait]
impl LedgerSession for MockSession {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn probe(&self) -> LedgerResult<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let delay = *self.script.alive_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.alive.load(Ordering::SeqCst) && !self.is_closed() {
            Ok(())
        } else {
            Err(LedgerError::Transport(format!("{} stopped answering", self.host)))
        }
    }

    async fn pending_nonce(&self, _address: Address) -> LedgerResult<u64> {
        // Every fetch sees a different pending count
        let nonce = self.script.nonce_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(nonce)
    }

    async fn send_raw(
        &self,
        tx: &SignedTransaction,
        _confirmations: u64,
    ) -> LedgerResult<SubmissionStream> {
        let script = self.script.submission.lock().unwrap().clone();
        let events = match script {
            SubmissionScript::Fail(e) => return Err(e),
            SubmissionScript::Events(events) => events,
        };
        self.script.sent.lock().unwrap().push(tx.clone());

        let (events_tx, events_rx) = mpsc::channel(events.len().max(1));
        tokio::spawn(async move {
            for event in events {
                if events_tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(events_rx)
    }

    async fn subscribe(&self, _contract: Address, topic: B256) -> LedgerResult<LogStream> {
        let refused = self
            .script
            .refuse_topics
            .lock()
            .unwrap()
            .contains(&(self.host.clone(), topic));
        if refused {
            return Err(LedgerError::Transport(format!("{} refused log filter", self.host)));
        }
        self.topics.lock().unwrap().push(topic);
        let (tx, rx) = mpsc::channel(16);
        self.log_senders.lock().unwrap().push((topic, tx));
        Ok(rx)
    }

    async fn call(&self, _contract: Address, _input: Bytes) -> LedgerResult<Bytes> {
        Ok(self.script.call_response.lock().unwrap().clone())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders ends the listener streams
        self.log_senders.lock().unwrap().clear();
    }
}

//! Event routing from remote contract logs to local notification channels.
//!
//! # Responsibilities
//! - Install one listener per remote event on every new connection
//! - Decode each log against the contract ABI and publish it on its channel
//! - Log listener errors without touching connection state
//!
//! # Design Decisions
//! - Listener tasks are owned by the connection; they are aborted when it is
//!   torn down rather than unsubscribed
//! - Installation is all or nothing: one refused subscription fails the whole
//!   connection attempt
//! - Publishing never blocks: slow subscribers lag instead of stalling the router

use alloy::primitives::Address;
use alloy::rpc::types::Log;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::blockchain::ledger::{LedgerSession, LogStream};
use crate::blockchain::types::{LedgerError, LedgerResult};
use crate::contract::ContractInterface;
use crate::events::types::{EventNotice, RemoteEvent};
use crate::observability::metrics;

/// Five notification channels, one per remote event; one producer, any number
/// of consumers.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    channels: [broadcast::Sender<EventNotice>; 5],
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: std::array::from_fn(|_| broadcast::channel(capacity).0),
        }
    }

    pub fn subscribe(&self, event: RemoteEvent) -> broadcast::Receiver<EventNotice> {
        self.channels[event.index()].subscribe()
    }

    pub fn subscribe_design(&self) -> broadcast::Receiver<EventNotice> {
        self.subscribe(RemoteEvent::Design)
    }

    pub fn subscribe_mint(&self) -> broadcast::Receiver<EventNotice> {
        self.subscribe(RemoteEvent::Mint)
    }

    pub fn subscribe_transfer(&self) -> broadcast::Receiver<EventNotice> {
        self.subscribe(RemoteEvent::Transfer)
    }

    pub fn subscribe_secondary_market(&self) -> broadcast::Receiver<EventNotice> {
        self.subscribe(RemoteEvent::SecondaryMarket)
    }

    pub fn subscribe_info(&self) -> broadcast::Receiver<EventNotice> {
        self.subscribe(RemoteEvent::Info)
    }

    /// Publish on the channel of `notice.event`. Returns the number of
    /// receivers reached.
    pub fn publish(&self, notice: EventNotice) -> usize {
        // A send error only means nobody is listening right now
        self.channels[notice.event.index()].send(notice).unwrap_or(0)
    }
}

/// Translates raw log streams into hub notifications.
#[derive(Debug, Clone)]
pub struct EventRouter {
    contract: Address,
    interface: Arc<ContractInterface>,
    hub: NotificationHub,
}

impl EventRouter {
    pub fn new(contract: Address, interface: Arc<ContractInterface>, hub: NotificationHub) -> Self {
        Self {
            contract,
            interface,
            hub,
        }
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Subscribe to all five events on `session`.
    ///
    /// Returns one listener handle per event. If any subscription is refused,
    /// the listeners already spawned are aborted and the first failure is
    /// returned.
    pub async fn install(&self, session: &Arc<dyn LedgerSession>) -> LedgerResult<Vec<JoinHandle<()>>> {
        let subscriptions = join_all(RemoteEvent::ALL.iter().map(|&event| async move {
            let topic = self.interface.topic(event);
            (event, session.subscribe(self.contract, topic).await)
        }))
        .await;

        let mut listeners = Vec::with_capacity(subscriptions.len());
        let mut failure = None;
        for (event, result) in subscriptions {
            match result {
                Ok(stream) => {
                    tracing::debug!(event = %event, endpoint = %session.endpoint(), "Registered event handler");
                    listeners.push(tokio::spawn(listen(
                        event,
                        stream,
                        self.interface.clone(),
                        self.hub.clone(),
                    )));
                }
                Err(e) => {
                    let err = LedgerError::Subscription {
                        event: event.remote_name().to_string(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(error = %err, endpoint = %session.endpoint(), "Failed to register event handler");
                    failure.get_or_insert(err);
                }
            }
        }

        match failure {
            Some(err) => {
                for listener in &listeners {
                    listener.abort();
                }
                Err(err)
            }
            None => Ok(listeners),
        }
    }
}

/// Forward one subscription until its stream ends.
async fn listen(
    event: RemoteEvent,
    mut stream: LogStream,
    interface: Arc<ContractInterface>,
    hub: NotificationHub,
) {
    while let Some(item) = stream.recv().await {
        match item {
            Ok(log) => route(event, &log, &interface, &hub),
            Err(e) => {
                tracing::warn!(event = %event, error = %e, "Event subscription error");
            }
        }
    }
    tracing::debug!(event = %event, "Event listener finished");
}

fn route(event: RemoteEvent, log: &Log, interface: &ContractInterface, hub: &NotificationHub) {
    match EventNotice::decode(interface, event, log) {
        Ok(notice) => {
            tracing::debug!(
                event = %event,
                block = ?log.block_number,
                tx_hash = ?log.transaction_hash,
                "Event received"
            );
            metrics::record_event(event.local_name());
            hub.publish(notice);
        }
        Err(e) => {
            tracing::warn!(event = %event, error = %e, "Dropping undecodable log");
        }
    }
}

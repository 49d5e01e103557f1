//! Connection manager: endpoint selection, live connection, heartbeat.
//!
//! # State Transitions
//! ```text
//! Disconnected → Connecting: connect() or heartbeat reconnect
//! Connecting → Connected: session opened, subscriptions installed
//! Connecting → Disconnected: open or subscription failed, nothing live before
//! Connected → Disconnected: disconnect() or failed liveness probe
//! ```
//!
//! # Heartbeat
//! Every interval the heartbeat probes the live connection. A failed probe
//! closes it; whenever no connection is live the heartbeat flips the active
//! endpoint and reconnects there. Flips strictly alternate between primary and
//! secondary.
//!
//! # Concurrency
//! The active endpoint and the live connection sit behind one async mutex.
//! `connect()`/`disconnect()` wait for it; a heartbeat tick only `try_lock`s
//! and skips when an attempt is already in flight, so two connection attempts
//! never overlap. The liveness check itself runs on a cloned session with the
//! lock released.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::blockchain::ledger::{LedgerConnector, LedgerSession};
use crate::blockchain::types::{LedgerError, LedgerResult};
use crate::config::ClientConfig;
use crate::connection::endpoint::{Endpoint, EndpointPair, EndpointRole};
use crate::events::EventRouter;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Snapshot published to observers on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub active: EndpointRole,
}

/// What a single heartbeat tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Another connection attempt held the lock or replaced the connection.
    Skipped,
    /// The live connection answered the probe.
    Alive,
    /// A new connection to this endpoint is live.
    Reconnected(EndpointRole),
    /// Reconnecting to this endpoint failed; the next tick tries the other one.
    ReconnectFailed(EndpointRole),
}

/// Timing knobs for the manager.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub heartbeat_interval: Duration,
    pub probe_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl ConnectionSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat.interval(),
            probe_timeout_secs: config.heartbeat.probe_timeout_secs,
            connect_timeout_secs: config.timeouts.connect_secs,
        }
    }
}

/// An open session plus the listeners bound to it.
struct LiveConnection {
    session: Arc<dyn LedgerSession>,
    role: EndpointRole,
    listeners: Vec<JoinHandle<()>>,
}

impl LiveConnection {
    async fn close(self) {
        for listener in &self.listeners {
            listener.abort();
        }
        self.session.close().await;
    }
}

/// Mutable connection state guarded by the manager's mutex.
struct Slot {
    active: EndpointRole,
    live: Option<LiveConnection>,
}

struct Inner {
    connector: Arc<dyn LedgerConnector>,
    endpoints: EndpointPair,
    router: EventRouter,
    settings: ConnectionSettings,
    slot: Mutex<Slot>,
    status: watch::Sender<ConnectionStatus>,
    heartbeat_started: AtomicBool,
    shutdown: Shutdown,
}

/// Owns the active endpoint, the live connection and the heartbeat task.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Create a manager. Nothing is opened until [`connect`](Self::connect).
    pub fn new(
        connector: Arc<dyn LedgerConnector>,
        endpoints: EndpointPair,
        router: EventRouter,
        settings: ConnectionSettings,
    ) -> Self {
        let initial = ConnectionStatus {
            state: ConnectionState::Disconnected,
            active: EndpointRole::Primary,
        };
        let (status, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                connector,
                endpoints,
                router,
                settings,
                slot: Mutex::new(Slot {
                    active: EndpointRole::Primary,
                    live: None,
                }),
                status,
                heartbeat_started: AtomicBool::new(false),
                shutdown: Shutdown::new(),
            }),
        }
    }

    /// Open a fresh connection to the active endpoint and install the event
    /// subscriptions on it, replacing (and closing) any previous connection.
    ///
    /// Starts the heartbeat on the first call, unless the manager was already
    /// shut down. Failures are absorbed: the returned state tells whether a
    /// connection is live afterwards, and the heartbeat keeps retrying.
    pub async fn connect(&self) -> ConnectionState {
        self.start_heartbeat();
        let mut slot = self.inner.slot.lock().await;
        self.inner.open_active(&mut slot).await
    }

    /// Close the live connection, if any. The heartbeat keeps running and will
    /// reconnect to the other endpoint on its next tick.
    pub async fn disconnect(&self) {
        let mut slot = self.inner.slot.lock().await;
        if let Some(live) = slot.live.take() {
            tracing::info!(endpoint = %live.session.endpoint(), role = %live.role, "Disconnecting");
            live.close().await;
            self.inner.publish(ConnectionState::Disconnected, slot.active);
        }
    }

    /// Stop the heartbeat and close the live connection. Final: a later
    /// `connect()` opens a session but never restarts the heartbeat.
    pub async fn shutdown(&self) {
        self.inner.shutdown.trigger();
        self.disconnect().await;
    }

    /// The session of the live connection.
    pub async fn session(&self) -> LedgerResult<Arc<dyn LedgerSession>> {
        let slot = self.inner.slot.lock().await;
        slot.live
            .as_ref()
            .map(|live| live.session.clone())
            .ok_or(LedgerError::NotConnected)
    }

    /// Current state and active endpoint.
    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    /// Observe status transitions.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    pub fn endpoint(&self, role: EndpointRole) -> &Endpoint {
        self.inner.endpoints.get(role)
    }

    /// Run one heartbeat iteration. The background loop calls this every interval.
    pub async fn heartbeat_tick(&self) -> HeartbeatOutcome {
        self.inner.heartbeat_tick().await
    }

    fn start_heartbeat(&self) {
        if self.inner.shutdown.is_triggered() {
            tracing::debug!("Manager shut down, heartbeat not started");
            return;
        }
        if self.inner.heartbeat_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let shutdown = self.inner.shutdown.subscribe();
        tokio::spawn(run_heartbeat(self.inner.clone(), shutdown));
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("primary", &self.inner.endpoints.get(EndpointRole::Primary).as_str())
            .field("secondary", &self.inner.endpoints.get(EndpointRole::Secondary).as_str())
            .field("status", &self.status())
            .finish()
    }
}

impl Inner {
    fn publish(&self, state: ConnectionState, active: EndpointRole) {
        self.status.send_replace(ConnectionStatus { state, active });
        metrics::record_connection_state(state);
    }

    /// Open a session to the active endpoint and make it the live connection.
    async fn open_active(&self, slot: &mut Slot) -> ConnectionState {
        let role = slot.active;
        let endpoint = self.endpoints.get(role);
        tracing::info!(endpoint = %endpoint, role = %role, "Connecting");
        self.publish(ConnectionState::Connecting, role);

        let opened = with_deadline(
            self.settings.connect_timeout_secs,
            self.connector.open(endpoint),
        )
        .await;

        // A session missing any of the five subscriptions is not usable
        let installed = match opened {
            Ok(session) => match self.router.install(&session).await {
                Ok(listeners) => Ok((session, listeners)),
                Err(e) => {
                    session.close().await;
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };

        match installed {
            Ok((session, listeners)) => {
                let fresh = LiveConnection {
                    session,
                    role,
                    listeners,
                };
                if let Some(old) = slot.live.replace(fresh) {
                    tracing::debug!(endpoint = %old.session.endpoint(), "Closing replaced connection");
                    old.close().await;
                }
                tracing::info!(endpoint = %endpoint, role = %role, "Connected");
                self.publish(ConnectionState::Connected, role);
                ConnectionState::Connected
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, role = %role, error = %e, "Connection attempt failed");
                let state = if slot.live.is_some() {
                    ConnectionState::Connected
                } else {
                    ConnectionState::Disconnected
                };
                self.publish(state, role);
                state
            }
        }
    }

    async fn heartbeat_tick(&self) -> HeartbeatOutcome {
        // 1. Snapshot the live session; the check runs without the lock
        let checked = {
            let Ok(slot) = self.slot.try_lock() else {
                tracing::debug!("Connection attempt in flight, skipping heartbeat tick");
                return HeartbeatOutcome::Skipped;
            };
            slot.live.as_ref().map(|live| live.session.clone())
        };

        if let Some(session) = &checked {
            match with_deadline(self.settings.probe_timeout_secs, session.probe()).await {
                Ok(()) => return HeartbeatOutcome::Alive,
                Err(e) => {
                    tracing::warn!(
                        endpoint = %session.endpoint(),
                        error = %e,
                        "Liveness probe failed, disconnecting"
                    );
                }
            }
        }

        let Ok(mut slot) = self.slot.try_lock() else {
            tracing::debug!("Connection attempt in flight, skipping heartbeat tick");
            return HeartbeatOutcome::Skipped;
        };

        // 2. Drop the failed connection unless it was replaced meanwhile
        let current = slot.live.as_ref().map(|live| live.session.clone());
        match (&checked, current) {
            (Some(failed), Some(live)) if Arc::ptr_eq(failed, &live) => {
                if let Some(dead) = slot.live.take() {
                    metrics::record_probe_failure(dead.role.as_str());
                    dead.close().await;
                }
                self.publish(ConnectionState::Disconnected, slot.active);
            }
            (_, Some(_)) => {
                tracing::debug!("Connection replaced during liveness check");
                return HeartbeatOutcome::Skipped;
            }
            (_, None) => {}
        }

        // 3. Nothing live: fail over to the other endpoint
        slot.active = slot.active.other();
        let target = slot.active;
        metrics::record_failover(target.as_str());
        tracing::info!(endpoint = %self.endpoints.get(target), role = %target, "Attempting to reconnect");

        let state = self.open_active(&mut slot).await;
        let connected = state == ConnectionState::Connected;
        metrics::record_reconnect(connected);
        if connected {
            HeartbeatOutcome::Reconnected(target)
        } else {
            HeartbeatOutcome::ReconnectFailed(target)
        }
    }
}

async fn run_heartbeat(inner: Arc<Inner>, mut shutdown: ShutdownSignal) {
    let period = inner.settings.heartbeat_interval;
    tracing::info!(interval_ms = period.as_millis() as u64, "Heartbeat starting");

    // First tick one full period after start; connect() has just run
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                tracing::info!("Heartbeat received shutdown signal, exiting loop");
                break;
            }
            _ = ticker.tick() => {
                inner.heartbeat_tick().await;
            }
        }
    }
}

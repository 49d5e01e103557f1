//! Connection subsystem.
//!
//! # Data Flow
//! ```text
//! EndpointsConfig
//!     → endpoint.rs (validated primary/secondary pair)
//!     → manager.rs (active endpoint, live connection, heartbeat)
//!         → LedgerConnector::open
//!         → EventRouter::install (five subscriptions)
//! ```
//!
//! # Design Decisions
//! - Exactly one live connection at a time; replaced connections are closed
//! - Failover strictly alternates between the two endpoints
//! - Connection attempts are single-flight

pub mod endpoint;
pub mod manager;

pub use endpoint::{Endpoint, EndpointError, EndpointPair, EndpointRole};
pub use manager::{
    ConnectionManager, ConnectionSettings, ConnectionState, ConnectionStatus, HeartbeatOutcome,
};

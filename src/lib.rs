//! Resilient client for the DigitalContentObject ledger contract.

pub mod blockchain;
pub mod client;
pub mod config;
pub mod connection;
pub mod contract;
pub mod events;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use client::{ClientError, ContentClient};
pub use config::schema::ClientConfig;
pub use lifecycle::Shutdown;

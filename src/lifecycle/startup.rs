//! Startup orchestration shared by the binaries.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, then metrics when enabled
//! - Build the client (nothing is connected yet)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::net::SocketAddr;
use std::path::Path;

use crate::client::{ClientError, ContentClient};
use crate::config::{load_config, ClientConfig, ConfigError};
use crate::observability::{logging, metrics};

/// Error raised before the client is running.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("client: {0}")]
    Client(#[from] ClientError),
}

/// Load `path`, set up observability and build a WebSocket-backed client.
pub fn bootstrap(path: &Path) -> Result<(ClientConfig, ContentClient), StartupError> {
    let config = load_config(path)?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        config = %path.display(),
        primary = %config.endpoints.primary,
        secondary = ?config.endpoints.secondary,
        contract = %config.contract.address,
        abi = %config.contract.abi_path.display(),
        chain_id = config.chain.chain_id,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = ContentClient::from_config(&config)?;
    Ok((config, client))
}

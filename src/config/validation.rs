//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoint URLs and the contract address parse, and an ABI file is named
//! - Guard against signatures replayable on the public base network
//! - Validate value ranges (intervals > 0, confirmations >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::connection::endpoint::Endpoint;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = Endpoint::parse(&config.endpoints.primary) {
        errors.push(ValidationError::new("endpoints.primary", e.to_string()));
    }
    if let Some(secondary) = &config.endpoints.secondary {
        if let Err(e) = Endpoint::parse(secondary) {
            errors.push(ValidationError::new("endpoints.secondary", e.to_string()));
        }
    }

    if config.contract.address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "contract.address",
            format!("'{}' is not a valid address", config.contract.address),
        ));
    }

    if config.contract.abi_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("contract.abi_path", "must name the contract ABI file"));
    }

    let chain = &config.chain;
    if chain.chain_id == chain.base_network.public_chain_id() {
        errors.push(ValidationError::new(
            "chain.chain_id",
            format!(
                "chain id {} collides with the public {:?} network",
                chain.chain_id, chain.base_network
            ),
        ));
    }
    if !chain.hardfork.supports_replay_protection() {
        errors.push(ValidationError::new(
            "chain.hardfork",
            format!("{:?} predates EIP-155 replay protection", chain.hardfork),
        ));
    }

    if config.gas.limit == 0 {
        errors.push(ValidationError::new("gas.limit", "must be greater than zero"));
    }
    if config.heartbeat.interval_ms == 0 {
        errors.push(ValidationError::new("heartbeat.interval_ms", "must be greater than zero"));
    }
    if config.heartbeat.probe_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "heartbeat.probe_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.timeouts.connect_secs == 0 || config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts", "timeouts must be greater than zero"));
    }
    if config.submission.confirmations == 0 {
        errors.push(ValidationError::new("submission.confirmations", "must be at least 1"));
    }
    if config.notifications.channel_capacity == 0 {
        errors.push(ValidationError::new(
            "notifications.channel_capacity",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

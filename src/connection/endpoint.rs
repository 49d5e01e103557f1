//! Endpoint abstraction.
//!
//! # Responsibilities
//! - Represent a single node address (validated ws/wss URL)
//! - Name the two configured endpoints (primary, secondary)
//! - Provide the strict alternation rule used by failover

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::config::EndpointsConfig;

/// Error returned for an unusable endpoint address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported endpoint scheme '{0}', expected ws or wss")]
    UnsupportedScheme(String),
}

/// An immutable network address of a ledger node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parse a streaming endpoint address.
    pub fn parse(address: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(address).map_err(|e| EndpointError::InvalidUrl {
            url: address.to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            other => Err(EndpointError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Which of the two configured endpoints is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Primary,
    Secondary,
}

impl EndpointRole {
    /// The endpoint to fail over to. Never returns `self`.
    pub fn other(self) -> Self {
        match self {
            EndpointRole::Primary => EndpointRole::Secondary,
            EndpointRole::Secondary => EndpointRole::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointRole::Primary => "primary",
            EndpointRole::Secondary => "secondary",
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two interchangeable endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPair {
    primary: Endpoint,
    secondary: Endpoint,
}

impl EndpointPair {
    pub fn new(primary: Endpoint, secondary: Endpoint) -> Self {
        Self { primary, secondary }
    }

    /// Build from config; a missing secondary reuses the primary.
    pub fn from_config(config: &EndpointsConfig) -> Result<Self, EndpointError> {
        let primary = Endpoint::parse(&config.primary)?;
        let secondary = match &config.secondary {
            Some(address) => Endpoint::parse(address)?,
            None => primary.clone(),
        };
        Ok(Self::new(primary, secondary))
    }

    pub fn get(&self, role: EndpointRole) -> &Endpoint {
        match role {
            EndpointRole::Primary => &self.primary,
            EndpointRole::Secondary => &self.secondary,
        }
    }
}

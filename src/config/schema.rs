//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::blockchain::types::GasPolicy;

/// Root configuration for the ledger client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Primary and secondary node endpoints.
    pub endpoints: EndpointsConfig,

    /// The single contract instance this client drives.
    pub contract: ContractConfig,

    /// Custom chain parameters used for signing.
    pub chain: ChainConfig,

    /// Gas policy for state-changing requests.
    pub gas: GasConfig,

    /// Liveness check settings.
    pub heartbeat: HeartbeatConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Submission tracking settings.
    pub submission: SubmissionConfig,

    /// Local notification channel settings.
    pub notifications: NotificationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node endpoints. Exactly two are used; a missing secondary falls back to the primary.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Primary WebSocket endpoint (e.g., "ws://10.0.0.1:8546").
    pub primary: String,

    /// Secondary WebSocket endpoint.
    pub secondary: Option<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            primary: "ws://localhost:8546".to_string(),
            secondary: None,
        }
    }
}

/// Contract instance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Address of the DigitalContentObject contract.
    pub address: String,
    /// JSON ABI of the contract: a bare ABI array or a build artifact with an
    /// `abi` field.
    pub abi_path: PathBuf,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            abi_path: PathBuf::from("abi/DigitalContentObject.json"),
        }
    }
}

/// Public network a custom chain was forked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseNetwork {
    Mainnet,
    Sepolia,
    Holesky,
}

impl BaseNetwork {
    /// Chain id of the public network itself.
    pub fn public_chain_id(self) -> u64 {
        match self {
            BaseNetwork::Mainnet => 1,
            BaseNetwork::Sepolia => 11_155_111,
            BaseNetwork::Holesky => 17_000,
        }
    }
}

/// Ruleset the custom chain runs. Signed transactions are legacy EIP-155.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hardfork {
    Homestead,
    Tangerine,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
}

impl Hardfork {
    /// EIP-155 replay protection arrived with Spurious Dragon.
    pub fn supports_replay_protection(self) -> bool {
        !matches!(self, Hardfork::Homestead | Hardfork::Tangerine)
    }
}

/// Custom chain parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Human-readable chain name.
    pub name: String,

    /// Chain id embedded in every signature.
    pub chain_id: u64,

    /// Network id reported by `net_version`.
    pub network_id: u64,

    /// Public network the chain was forked from.
    pub base_network: BaseNetwork,

    /// Ruleset the chain runs.
    pub hardfork: Hardfork,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "privatechain".to_string(),
            chain_id: 11421,
            network_id: 1,
            base_network: BaseNetwork::Mainnet,
            hardfork: Hardfork::Petersburg,
        }
    }
}

/// Gas policy. The private network runs with a zero gas price.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    /// Gas limit attached to every transaction.
    pub limit: u64,

    /// Gas price in wei.
    pub price: u128,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            limit: 4_700_000,
            price: 0,
        }
    }
}

impl GasConfig {
    pub fn policy(&self) -> GasPolicy {
        GasPolicy {
            limit: self.limit,
            price: self.price,
        }
    }
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Fixed interval between liveness checks in milliseconds.
    pub interval_ms: u64,

    /// Liveness probe timeout in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            probe_timeout_secs: 5,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Timeout configuration for ledger calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Session establishment timeout in seconds.
    pub connect_secs: u64,

    /// Nonce fetch, raw submission and read call timeout in seconds.
    pub request_secs: u64,

    /// Maximum wait for confirmations; unset waits indefinitely.
    pub confirmation_secs: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 30,
            confirmation_secs: None,
        }
    }
}

/// Submission tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Confirmation count at which a submission resolves.
    pub confirmations: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self { confirmations: 1 }
    }
}

/// Notification channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Buffered notifications per channel before slow subscribers lag.
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.chain.chain_id, 11421);
        assert_eq!(config.gas.limit, 4_700_000);
        assert_eq!(config.gas.price, 0);
        assert_eq!(config.heartbeat.interval(), Duration::from_secs(5));
        assert_eq!(config.submission.confirmations, 1);
        assert!(config.endpoints.secondary.is_none());
    }

    #[test]
    fn test_minimal_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            [endpoints]
            primary = "ws://node-a:8546"
            secondary = "wss://node-b:8546"

            [contract]
            address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            abi_path = "/etc/ledger/DigitalContentObject.json"

            [chain]
            hardfork = "byzantium"
            base_network = "sepolia"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoints.secondary.as_deref(), Some("wss://node-b:8546"));
        assert_eq!(config.chain.hardfork, Hardfork::Byzantium);
        assert_eq!(
            config.contract.abi_path,
            PathBuf::from("/etc/ledger/DigitalContentObject.json")
        );
        assert_eq!(config.chain.base_network.public_chain_id(), 11_155_111);
        // Untouched sections keep defaults
        assert_eq!(config.heartbeat.interval_ms, 5_000);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_replay_protection_by_hardfork() {
        assert!(!Hardfork::Homestead.supports_replay_protection());
        assert!(Hardfork::Petersburg.supports_replay_protection());
    }
}

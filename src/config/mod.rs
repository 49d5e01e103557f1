//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to ContentClient at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; endpoint changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use validation::{validate_config, ValidationError};
pub use schema::ClientConfig;
pub use schema::ChainConfig;
pub use schema::EndpointsConfig;
pub use schema::HeartbeatConfig;
pub use schema::ObservabilityConfig;

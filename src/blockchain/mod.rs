//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! ContentClient write call
//!     → transaction.rs (fresh nonce, build request)
//!     → signer.rs (EIP-155 legacy signature, pure)
//!     → ledger.rs session (send_raw over the live connection)
//!     → confirmation / error stream → single outcome
//! ```
//!
//! # Security Constraints
//! - Credentials are passed per call and never stored
//! - Never log private keys or sensitive data
//! - All remote calls have configurable deadlines

pub mod ledger;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod ws;

pub use ledger::{LedgerConnector, LedgerSession};
pub use transaction::TransactionPipeline;
pub use types::{ChainParams, Confirmation, LedgerError, LedgerResult, SubmissionOutcome};
pub use ws::WsConnector;

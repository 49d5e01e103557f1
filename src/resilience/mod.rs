//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a ledger endpoint:
//!     → timeouts.rs (enforce connect/probe/request deadline)
//!     → On failure: the heartbeat fails over to the other endpoint
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No backoff: the heartbeat interval is fixed and failover has two targets
//! - Submissions are never retried automatically (nonce must be re-fetched)

pub mod timeouts;

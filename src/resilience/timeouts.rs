//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap ledger calls with a deadline
//! - Map elapsed deadlines to `LedgerError::Timeout`
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other transport errors

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{LedgerError, LedgerResult};

/// Run `fut` with a deadline of `secs` seconds.
pub async fn with_deadline<T, F>(secs: u64, fut: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    match timeout(Duration::from_secs(secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout(secs)),
    }
}

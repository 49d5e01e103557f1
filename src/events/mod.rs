//! Event subsystem.
//!
//! # Data Flow
//! ```text
//! LiveConnection (five log subscriptions)
//!     → router.rs (one listener task per subscription)
//!     → types.rs (decode log against the contract ABI)
//!     → NotificationHub (five broadcast channels)
//!     → any number of local subscribers
//! ```

pub mod router;
pub mod types;

pub use router::{EventRouter, NotificationHub};
pub use types::{EventMeta, EventNotice, RemoteEvent};

//! Notifications for the five remote contract events.

use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::Log;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::blockchain::types::LedgerResult;
use crate::contract::ContractInterface;

/// The fixed set of remote events the router subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteEvent {
    Design,
    Mint,
    Transfer,
    SecondaryMarket,
    Info,
}

impl RemoteEvent {
    pub const ALL: [RemoteEvent; 5] = [
        RemoteEvent::Design,
        RemoteEvent::Mint,
        RemoteEvent::Transfer,
        RemoteEvent::SecondaryMarket,
        RemoteEvent::Info,
    ];

    /// Event name in the contract ABI.
    pub fn remote_name(self) -> &'static str {
        match self {
            RemoteEvent::Design => "DesignLog",
            RemoteEvent::Mint => "MintLog",
            RemoteEvent::Transfer => "TransferLog",
            RemoteEvent::SecondaryMarket => "UpdateAllowSecondaryMerketLog",
            RemoteEvent::Info => "SetInfoLog",
        }
    }

    /// Name of the local notification channel.
    pub fn local_name(self) -> &'static str {
        match self {
            RemoteEvent::Design => "design",
            RemoteEvent::Mint => "mint",
            RemoteEvent::Transfer => "transfer",
            RemoteEvent::SecondaryMarket => "secondary_market",
            RemoteEvent::Info => "info",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RemoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.remote_name())
    }
}

/// Where on the ledger an event was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventMeta {
    pub contract: Address,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
    pub log_index: Option<u64>,
    /// Set when the log was dropped by a reorg.
    pub removed: bool,
}

impl From<&Log> for EventMeta {
    fn from(log: &Log) -> Self {
        Self {
            contract: log.address(),
            block_number: log.block_number,
            tx_hash: log.transaction_hash,
            log_index: log.log_index,
            removed: log.removed,
        }
    }
}

/// One decoded contract event.
///
/// `values` holds the event's fields as named in the ABI, passed through
/// without local interpretation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventNotice {
    pub event: RemoteEvent,
    pub values: Map<String, Value>,
    pub meta: EventMeta,
}

impl EventNotice {
    /// Decode a raw log delivered on the `event` subscription.
    pub fn decode(contract: &ContractInterface, event: RemoteEvent, log: &Log) -> LedgerResult<Self> {
        Ok(Self {
            event,
            values: contract.decode_log(event, &log.inner.data)?,
            meta: EventMeta::from(log),
        })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

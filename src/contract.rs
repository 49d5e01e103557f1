//! Interface of the DigitalContentObject contract, loaded from its JSON ABI.
//!
//! The client only knows the names of the five events and ten methods it
//! drives. Signatures, topics, selectors and result layouts all come from the
//! ABI document supplied at startup, so a contract upgrade needs a new ABI
//! file and no rebuild.
//!
//! Values cross this boundary as JSON: decoded event fields and call results
//! are keyed by their ABI parameter names, with integers as decimal strings
//! and addresses in checksummed hex.

use alloy::dyn_abi::{DynSolType, DynSolValue, EventExt, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Event, Function, JsonAbi};
use alloy::primitives::{hex, Address, Bytes, LogData, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use crate::blockchain::types::{LedgerError, LedgerResult};
use crate::events::types::RemoteEvent;

/// Error loading the contract ABI.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("failed to read ABI file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ABI document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("ABI declares no {kind} named {name}")]
    Missing { kind: &'static str, name: &'static str },
}

/// Contract methods the client calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractMethod {
    GetDigitalContentSpec,
    TotalSupplyLimitOf,
    SpecOwnerOf,
    GetDigitalContentObject,
    ObjectIndexOf,
    OwnedObjectsOf,
    Design,
    Mint,
    Transfer,
    TransferFrom,
}

impl ContractMethod {
    pub const ALL: [ContractMethod; 10] = [
        ContractMethod::GetDigitalContentSpec,
        ContractMethod::TotalSupplyLimitOf,
        ContractMethod::SpecOwnerOf,
        ContractMethod::GetDigitalContentObject,
        ContractMethod::ObjectIndexOf,
        ContractMethod::OwnedObjectsOf,
        ContractMethod::Design,
        ContractMethod::Mint,
        ContractMethod::Transfer,
        ContractMethod::TransferFrom,
    ];

    /// Method name in the ABI.
    pub fn name(self) -> &'static str {
        match self {
            ContractMethod::GetDigitalContentSpec => "getDigitalContentSpec",
            ContractMethod::TotalSupplyLimitOf => "totalSupplyLimitOf",
            ContractMethod::SpecOwnerOf => "specOwnerOf",
            ContractMethod::GetDigitalContentObject => "getDigitalContentObject",
            ContractMethod::ObjectIndexOf => "objectIndexOf",
            ContractMethod::OwnedObjectsOf => "ownedObjectsOf",
            ContractMethod::Design => "design",
            ContractMethod::Mint => "mint",
            ContractMethod::Transfer => "transfer",
            ContractMethod::TransferFrom => "transferFrom",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ContractMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One call argument, converted to its ABI type at encoding time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    Uint(U256),
    Address(Address),
    Text(String),
    Bool(bool),
    UintList(Vec<U256>),
}

impl CallArg {
    fn coerce(self, ty: &DynSolType) -> Option<DynSolValue> {
        match (self, ty) {
            (CallArg::Uint(v), DynSolType::Uint(bits)) => {
                (v.bit_len() <= *bits).then_some(DynSolValue::Uint(v, *bits))
            }
            (CallArg::Address(a), DynSolType::Address) => Some(DynSolValue::Address(a)),
            (CallArg::Text(s), DynSolType::String) => Some(DynSolValue::String(s)),
            // e.g. a media id declared as bytes32
            (CallArg::Text(s), other) => other.coerce_str(&s).ok(),
            (CallArg::Bool(b), DynSolType::Bool) => Some(DynSolValue::Bool(b)),
            (CallArg::UintList(list), DynSolType::Array(inner)) => list
                .into_iter()
                .map(|v| CallArg::Uint(v).coerce(inner))
                .collect::<Option<Vec<_>>>()
                .map(DynSolValue::Array),
            _ => None,
        }
    }
}

/// Arguments of a `design` call, in ABI order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignArgs {
    pub name: String,
    pub symbol: String,
    pub content_type: String,
    pub media_id: String,
    pub total_supply_limit: U256,
    pub info: String,
    pub original_spec_ids: Vec<U256>,
    pub contract_documents: String,
    pub copyright_fee_ratio: U256,
    pub allow_secondary_market: bool,
}

impl DesignArgs {
    pub fn into_args(self) -> Vec<CallArg> {
        vec![
            CallArg::Text(self.name),
            CallArg::Text(self.symbol),
            CallArg::Text(self.content_type),
            CallArg::Text(self.media_id),
            CallArg::Uint(self.total_supply_limit),
            CallArg::Text(self.info),
            CallArg::UintList(self.original_spec_ids),
            CallArg::Text(self.contract_documents),
            CallArg::Uint(self.copyright_fee_ratio),
            CallArg::Bool(self.allow_secondary_market),
        ]
    }
}

/// Either a bare ABI array or a build artifact carrying one under `abi`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AbiDocument {
    Bare(JsonAbi),
    Artifact { abi: JsonAbi },
}

/// The resolved events and methods of one contract ABI.
#[derive(Debug, Clone)]
pub struct ContractInterface {
    events: Vec<Event>,
    functions: Vec<Function>,
}

impl ContractInterface {
    /// Load the ABI document at `path`.
    pub fn load(path: &Path) -> Result<Self, ContractError> {
        let json = std::fs::read_to_string(path).map_err(|source| ContractError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ContractError> {
        let abi = match serde_json::from_str::<AbiDocument>(json)? {
            AbiDocument::Bare(abi) | AbiDocument::Artifact { abi } => abi,
        };
        Self::from_abi(&abi)
    }

    /// Resolve every event and method the client uses. Overloads resolve to
    /// the first declaration.
    pub fn from_abi(abi: &JsonAbi) -> Result<Self, ContractError> {
        let events = RemoteEvent::ALL
            .iter()
            .map(|event| {
                abi.event(event.remote_name())
                    .and_then(|overloads| overloads.first())
                    .cloned()
                    .ok_or(ContractError::Missing {
                        kind: "event",
                        name: event.remote_name(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let functions = ContractMethod::ALL
            .iter()
            .map(|method| {
                abi.function(method.name())
                    .and_then(|overloads| overloads.first())
                    .cloned()
                    .ok_or(ContractError::Missing {
                        kind: "function",
                        name: method.name(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { events, functions })
    }

    pub fn event(&self, event: RemoteEvent) -> &Event {
        &self.events[event.index()]
    }

    pub fn function(&self, method: ContractMethod) -> &Function {
        &self.functions[method.index()]
    }

    /// First log topic identifying `event`.
    pub fn topic(&self, event: RemoteEvent) -> B256 {
        self.event(event).selector()
    }

    /// Decode a log of `event` into its named fields.
    pub fn decode_log(&self, event: RemoteEvent, log: &LogData) -> LedgerResult<Map<String, Value>> {
        let abi_event = self.event(event);
        let decoded = abi_event
            .decode_log(log)
            .map_err(|e| LedgerError::Decode(format!("malformed {} log: {}", event, e)))?;

        let mut indexed = decoded.indexed.iter();
        let mut body = decoded.body.iter();
        let mut fields = Map::new();
        for (position, input) in abi_event.inputs.iter().enumerate() {
            let value = if input.indexed {
                indexed.next()
            } else {
                body.next()
            };
            if let Some(value) = value {
                fields.insert(field_name(&input.name, position), to_json(value));
            }
        }
        Ok(fields)
    }

    /// ABI-encode a call to `method`, selector included.
    pub fn encode_call(&self, method: ContractMethod, args: Vec<CallArg>) -> LedgerResult<Bytes> {
        let function = self.function(method);
        if args.len() != function.inputs.len() {
            return Err(LedgerError::Abi(format!(
                "{} takes {} arguments, got {}",
                method,
                function.inputs.len(),
                args.len()
            )));
        }

        let values = function
            .inputs
            .iter()
            .zip(args)
            .map(|(param, arg)| {
                let ty = param
                    .resolve()
                    .map_err(|e| LedgerError::Abi(format!("{}: {}", method, e)))?;
                arg.coerce(&ty).ok_or_else(|| {
                    LedgerError::Abi(format!(
                        "{} argument {} does not fit type {}",
                        method, param.name, param.ty
                    ))
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;

        function
            .abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(|e| LedgerError::Abi(format!("{}: {}", method, e)))
    }

    /// Decode the raw result of a call to `method`.
    ///
    /// A single return value is passed through as is; several become an
    /// object keyed by output name.
    pub fn decode_output(&self, method: ContractMethod, data: &[u8]) -> LedgerResult<Value> {
        let function = self.function(method);
        let values = function.abi_decode_output(data).map_err(|e| {
            LedgerError::Decode(format!("{} returned malformed data: {}", method, e))
        })?;

        if let [single] = values.as_slice() {
            return Ok(to_json(single));
        }
        let fields = function
            .outputs
            .iter()
            .zip(&values)
            .enumerate()
            .map(|(position, (param, value))| (field_name(&param.name, position), to_json(value)))
            .collect();
        Ok(Value::Object(fields))
    }
}

/// Unnamed parameters are keyed by position.
fn field_name(name: &str, position: usize) -> String {
    if name.is_empty() {
        position.to_string()
    } else {
        name.to_string()
    }
}

fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => Value::String(hex::encode_prefixed(&word[..*size])),
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Function(f) => Value::String(f.to_string()),
        DynSolValue::Bytes(b) => Value::String(hex::encode_prefixed(b)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
        #[allow(unreachable_patterns)]
        _ => Value::Null,
    }
}

//! `ContentClient`: the public face of the crate.
//!
//! Composes the connection manager, the notification hub and the transaction
//! pipeline. Reads go straight to the live session; writes go through the
//! pipeline and resolve to a single outcome.

use alloy::primitives::{Address, U256};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::blockchain::ledger::LedgerConnector;
use crate::blockchain::signer::{self, KeyPair};
use crate::blockchain::transaction::TransactionPipeline;
use crate::blockchain::types::{LedgerResult, SubmissionOutcome};
use crate::blockchain::ws::WsConnector;
use crate::config::{validate_config, ClientConfig, ValidationError};
use crate::connection::{
    ConnectionManager, ConnectionSettings, ConnectionState, ConnectionStatus, EndpointPair,
};
use crate::contract::{CallArg, ContractError, ContractInterface, ContractMethod, DesignArgs};
use crate::events::{EventNotice, EventRouter, NotificationHub};
use crate::resilience::timeouts::with_deadline;

/// Error building a client from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] crate::connection::EndpointError),

    #[error("invalid contract address {address:?}: {reason}")]
    ContractAddress { address: String, reason: String },

    #[error("contract ABI: {0}")]
    Contract(#[from] ContractError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resilient client for the DigitalContentObject contract.
#[derive(Debug, Clone)]
pub struct ContentClient {
    connection: ConnectionManager,
    hub: NotificationHub,
    pipeline: TransactionPipeline,
    interface: Arc<ContractInterface>,
    contract: Address,
    request_secs: u64,
}

impl ContentClient {
    /// Build a client over an arbitrary ledger connector.
    ///
    /// The configuration is validated first; nothing is built from values
    /// that would fail at runtime.
    pub fn new(
        config: &ClientConfig,
        interface: ContractInterface,
        connector: Arc<dyn LedgerConnector>,
    ) -> Result<Self, ClientError> {
        validate_config(config).map_err(ClientError::Config)?;

        let endpoints = EndpointPair::from_config(&config.endpoints)?;
        let contract = config
            .contract
            .address
            .parse::<Address>()
            .map_err(|e| ClientError::ContractAddress {
                address: config.contract.address.clone(),
                reason: e.to_string(),
            })?;

        let interface = Arc::new(interface);
        let hub = NotificationHub::new(config.notifications.channel_capacity);
        let router = EventRouter::new(contract, interface.clone(), hub.clone());
        let connection = ConnectionManager::new(
            connector,
            endpoints,
            router,
            ConnectionSettings::from_config(config),
        );
        let pipeline = TransactionPipeline::new(connection.clone(), contract, config);

        Ok(Self {
            connection,
            hub,
            pipeline,
            interface,
            contract,
            request_secs: config.timeouts.request_secs,
        })
    }

    /// Build a client over WebSocket sessions, loading the ABI named in the
    /// configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        validate_config(config).map_err(ClientError::Config)?;
        let interface = ContractInterface::load(&config.contract.abi_path)?;
        Self::new(config, interface, Arc::new(WsConnector::new(&config.timeouts)))
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn interface(&self) -> &ContractInterface {
        &self.interface
    }

    // --- Connection lifecycle ---

    /// Connect to the active endpoint and start the heartbeat.
    pub async fn connect(&self) -> ConnectionState {
        self.connection.connect().await
    }

    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    /// Stop the heartbeat and close the connection.
    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.watch_status()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    // --- Notifications ---

    pub fn notifications(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn on_design(&self) -> broadcast::Receiver<EventNotice> {
        self.hub.subscribe_design()
    }

    pub fn on_mint(&self) -> broadcast::Receiver<EventNotice> {
        self.hub.subscribe_mint()
    }

    pub fn on_transfer(&self) -> broadcast::Receiver<EventNotice> {
        self.hub.subscribe_transfer()
    }

    pub fn on_secondary_market(&self) -> broadcast::Receiver<EventNotice> {
        self.hub.subscribe_secondary_market()
    }

    pub fn on_info(&self) -> broadcast::Receiver<EventNotice> {
        self.hub.subscribe_info()
    }

    // --- Reads ---

    /// Call a read-only method and decode its result as the ABI describes it.
    pub async fn read(&self, method: ContractMethod, args: Vec<CallArg>) -> LedgerResult<Value> {
        let input = self.interface.encode_call(method, args)?;
        let session = self.connection.session().await?;
        let data = with_deadline(self.request_secs, session.call(self.contract, input)).await?;
        self.interface.decode_output(method, &data)
    }

    pub async fn get_digital_content_spec(&self, spec_id: U256) -> LedgerResult<Value> {
        self.read(ContractMethod::GetDigitalContentSpec, vec![CallArg::Uint(spec_id)])
            .await
    }

    pub async fn total_supply_limit_of(&self, spec_id: U256) -> LedgerResult<Value> {
        self.read(ContractMethod::TotalSupplyLimitOf, vec![CallArg::Uint(spec_id)])
            .await
    }

    pub async fn spec_owner_of(&self, spec_id: U256) -> LedgerResult<Value> {
        self.read(ContractMethod::SpecOwnerOf, vec![CallArg::Uint(spec_id)])
            .await
    }

    pub async fn get_digital_content_object(&self, object_id: U256) -> LedgerResult<Value> {
        self.read(ContractMethod::GetDigitalContentObject, vec![CallArg::Uint(object_id)])
            .await
    }

    pub async fn object_index_of(&self, object_id: U256) -> LedgerResult<Value> {
        self.read(ContractMethod::ObjectIndexOf, vec![CallArg::Uint(object_id)])
            .await
    }

    pub async fn owned_objects_of(&self, owner: Address) -> LedgerResult<Value> {
        self.read(ContractMethod::OwnedObjectsOf, vec![CallArg::Address(owner)])
            .await
    }

    // --- Writes ---

    /// Sign and submit a call to a state-changing method.
    pub async fn write(
        &self,
        sender: Address,
        credential: &str,
        method: ContractMethod,
        args: Vec<CallArg>,
    ) -> SubmissionOutcome {
        let payload = self.interface.encode_call(method, args)?;
        self.pipeline.submit(sender, credential, payload).await
    }

    /// Register a new design owned by `sender`.
    pub async fn design(&self, sender: Address, credential: &str, args: DesignArgs) -> SubmissionOutcome {
        self.write(sender, credential, ContractMethod::Design, args.into_args())
            .await
    }

    /// Mint an object of `spec_id` to `to`.
    pub async fn mint(
        &self,
        sender: Address,
        credential: &str,
        to: Address,
        spec_id: U256,
        media_id: String,
        info: String,
    ) -> SubmissionOutcome {
        let args = vec![
            CallArg::Address(to),
            CallArg::Uint(spec_id),
            CallArg::Text(media_id),
            CallArg::Text(info),
        ];
        self.write(sender, credential, ContractMethod::Mint, args).await
    }

    pub async fn transfer(
        &self,
        sender: Address,
        credential: &str,
        to: Address,
        object_id: U256,
    ) -> SubmissionOutcome {
        let args = vec![CallArg::Address(to), CallArg::Uint(object_id)];
        self.write(sender, credential, ContractMethod::Transfer, args).await
    }

    pub async fn transfer_from(
        &self,
        sender: Address,
        credential: &str,
        from: Address,
        to: Address,
        object_id: U256,
    ) -> SubmissionOutcome {
        let args = vec![
            CallArg::Address(from),
            CallArg::Address(to),
            CallArg::Uint(object_id),
        ];
        self.write(sender, credential, ContractMethod::TransferFrom, args)
            .await
    }

    // --- Keys ---

    /// Generate a fresh random key pair. Needs no connection.
    pub fn create_address() -> KeyPair {
        signer::create_address()
    }

    /// Address controlled by `credential`.
    pub fn address_of(credential: &str) -> LedgerResult<Address> {
        signer::address_of(credential)
    }
}

//! Event subscriptions across connects and reconnects.

use alloy::primitives::{Address, LogData, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolValue;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

use content_ledger_client::blockchain::types::LedgerError;
use content_ledger_client::connection::{ConnectionState, EndpointRole, HeartbeatOutcome};
use content_ledger_client::events::RemoteEvent;

mod common;
use common::{client, interface, MockConnector, CONTRACT, PRIMARY, SECONDARY};

fn raw_log(data: LogData) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: CONTRACT.parse().unwrap(),
            data,
        },
        block_number: Some(42),
        ..Default::default()
    }
}

fn topic(event: RemoteEvent) -> B256 {
    interface().topic(event)
}

fn mint(object_id: u64) -> Log {
    raw_log(LogData::new_unchecked(
        vec![
            topic(RemoteEvent::Mint),
            Address::repeat_byte(0x0d).into_word(),
            B256::from(U256::from(object_id)),
            B256::from(U256::from(1)),
        ],
        ("media-1".to_string(), "limited".to_string())
            .abi_encode_params()
            .into(),
    ))
}

fn transfer(from: Address, to: Address, object_id: u64) -> Log {
    raw_log(LogData::new_unchecked(
        vec![
            topic(RemoteEvent::Transfer),
            from.into_word(),
            to.into_word(),
            B256::from(U256::from(object_id)),
        ],
        Default::default(),
    ))
}

fn assert_all_five_once(topics: &[B256]) {
    let expected: HashSet<_> = RemoteEvent::ALL.iter().map(|&e| topic(e)).collect();
    let unique: HashSet<_> = topics.iter().copied().collect();
    assert_eq!(topics.len(), 5, "duplicate or missing subscriptions: {:?}", topics);
    assert_eq!(unique, expected);
}

#[tokio::test]
async fn test_connect_installs_five_subscriptions() {
    let connector = MockConnector::new();
    let client = client(&connector);

    client.connect().await;
    assert_all_five_once(&connector.script.latest().subscribed_topics());

    client.shutdown().await;
}

#[tokio::test]
async fn test_reconnect_resubscribes_without_duplicates() {
    let connector = MockConnector::new();
    let client = client(&connector);
    let mut mints = client.on_mint();

    client.connect().await;
    let old = connector.script.latest();
    old.kill();
    assert!(matches!(
        client.connection().heartbeat_tick().await,
        HeartbeatOutcome::Reconnected(_)
    ));

    let fresh = connector.script.latest();
    assert_all_five_once(&fresh.subscribed_topics());

    // Old listeners are gone with the old connection
    old.emit(topic(RemoteEvent::Mint), Ok(mint(1))).await;
    fresh.emit(topic(RemoteEvent::Mint), Ok(mint(2))).await;

    let notice = tokio::time::timeout(Duration::from_secs(1), mints.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notice.event, RemoteEvent::Mint);
    assert_eq!(notice.field("objectId"), Some(&Value::String("2".into())));
    assert_eq!(notice.field("info"), Some(&Value::String("limited".into())));
    assert_eq!(notice.meta.block_number, Some(42));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(mints.try_recv(), Err(TryRecvError::Empty)));

    client.shutdown().await;
}

#[tokio::test]
async fn test_subscription_error_leaves_connection_up() {
    let connector = MockConnector::new();
    let client = client(&connector);
    let mut transfers = client.on_transfer();

    client.connect().await;
    let session = connector.script.latest();
    session
        .emit(
            topic(RemoteEvent::Transfer),
            Err(LedgerError::Transport("listener dropped a frame".into())),
        )
        .await;

    let from = Address::repeat_byte(0x0a);
    session
        .emit(
            topic(RemoteEvent::Transfer),
            Ok(transfer(from, Address::repeat_byte(0x0b), 9)),
        )
        .await;

    let notice = tokio::time::timeout(Duration::from_secs(1), transfers.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notice.field("objectId"), Some(&Value::String("9".into())));
    assert_eq!(notice.field("from"), Some(&Value::String(from.to_checksum(None))));

    assert_eq!(client.status().state, ConnectionState::Connected);
    assert!(!session.is_closed());
    assert_eq!(connector.script.session_count(), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn test_refused_subscription_fails_the_connection() {
    let connector = MockConnector::new();
    connector
        .script
        .refuse_topic(PRIMARY, topic(RemoteEvent::Mint));
    let client = client(&connector);

    // Four of five subscriptions is not a usable connection
    assert_eq!(client.connect().await, ConnectionState::Disconnected);
    let partial = connector.script.latest();
    assert!(partial.is_closed());
    assert!(matches!(
        client.connection().session().await,
        Err(LedgerError::NotConnected)
    ));

    // The heartbeat treats it like any failed attempt and moves on
    assert_eq!(
        client.connection().heartbeat_tick().await,
        HeartbeatOutcome::Reconnected(EndpointRole::Secondary)
    );
    let fresh = connector.script.latest();
    assert_eq!(fresh.host, SECONDARY);
    assert_all_five_once(&fresh.subscribed_topics());

    client.shutdown().await;
}

//! Submission pipeline against a scripted ledger.

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolValue;
use futures_util::future::join_all;
use std::collections::HashSet;
use serde_json::json;
use std::sync::atomic::Ordering;

use content_ledger_client::blockchain::types::{LedgerError, SubmissionEvent};
use content_ledger_client::contract::{CallArg, ContractMethod};
use content_ledger_client::ContentClient;

mod common;
use common::{client, receipt, sender, MockConnector, SubmissionScript, CONTRACT, TEST_PRIVATE_KEY};

async fn connected() -> (MockConnector, ContentClient) {
    let connector = MockConnector::new();
    let client = client(&connector);
    client.connect().await;
    (connector, client)
}

async fn transfer(client: &ContentClient, credential: &str) -> Result<u64, LedgerError> {
    client
        .transfer(sender(), credential, Address::repeat_byte(0x0b), U256::from(5))
        .await
        .map(|c| c.confirmations)
}

#[tokio::test]
async fn test_first_confirmation_resolves_submission() {
    let (connector, client) = connected().await;
    connector.script.set_submission(SubmissionScript::Events(vec![
        SubmissionEvent::Confirmation { count: 1, receipt: receipt(true) },
        SubmissionEvent::Confirmation { count: 2, receipt: receipt(true) },
    ]));

    let outcome = client
        .mint(
            sender(),
            TEST_PRIVATE_KEY,
            Address::repeat_byte(0x0d),
            U256::from(1),
            "media-1".into(),
            "first".into(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.confirmations, 1);
    assert_eq!(outcome.receipt, receipt(true));

    // Signed for the custom chain, addressed to the contract, zero gas price
    let sent = connector.script.sent();
    assert_eq!(sent.len(), 1);
    let envelope = TxEnvelope::decode_2718(&mut sent[0].raw().as_ref()).unwrap();
    let legacy = envelope.as_legacy().unwrap();
    assert_eq!(legacy.tx().chain_id, Some(11421));
    assert_eq!(legacy.tx().gas_price, 0);
    assert_eq!(legacy.tx().gas_limit, 4_700_000);
    assert_eq!(legacy.tx().to.to().copied(), Some(CONTRACT.parse::<Address>().unwrap()));

    client.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_submissions_fetch_fresh_nonces() {
    let (connector, client) = connected().await;

    let outcomes = join_all((0..4).map(|_| transfer(&client, TEST_PRIVATE_KEY))).await;
    assert!(outcomes.iter().all(|o| o.is_ok()));

    assert_eq!(connector.script.nonce_calls.load(Ordering::SeqCst), 4);
    let nonces: HashSet<u64> = connector.script.sent().iter().map(|tx| tx.nonce()).collect();
    assert_eq!(nonces, (0..4).collect::<HashSet<u64>>());

    client.shutdown().await;
}

#[tokio::test]
async fn test_invalid_credential_never_submits() {
    let (connector, client) = connected().await;

    let outcome = transfer(&client, "0xnot-a-key").await;
    assert!(matches!(outcome, Err(LedgerError::InvalidCredential(_))));

    // A valid key that does not control the sender
    let other = ContentClient::create_address();
    let outcome = transfer(&client, &other.private_key).await;
    assert!(matches!(outcome, Err(LedgerError::InvalidCredential(_))));

    assert!(connector.script.sent().is_empty());

    client.shutdown().await;
}

#[tokio::test]
async fn test_error_notification_resolves_as_error() {
    let (connector, client) = connected().await;
    connector.script.set_submission(SubmissionScript::Events(vec![
        SubmissionEvent::Error(LedgerError::Rejected("execution reverted".into())),
        SubmissionEvent::Confirmation { count: 1, receipt: receipt(true) },
    ]));

    let outcome = transfer(&client, TEST_PRIVATE_KEY).await;
    assert_eq!(outcome, Err(LedgerError::Rejected("execution reverted".into())));

    client.shutdown().await;
}

#[tokio::test]
async fn test_reverted_receipt_is_rejection() {
    let (connector, client) = connected().await;
    connector.script.set_submission(SubmissionScript::Events(vec![
        SubmissionEvent::Confirmation { count: 1, receipt: receipt(false) },
    ]));

    let outcome = transfer(&client, TEST_PRIVATE_KEY).await;
    assert!(matches!(outcome, Err(LedgerError::Rejected(_))));

    client.shutdown().await;
}

#[tokio::test]
async fn test_silent_stream_still_resolves() {
    let (connector, client) = connected().await;
    connector.script.set_submission(SubmissionScript::Events(Vec::new()));

    let outcome = transfer(&client, TEST_PRIVATE_KEY).await;
    assert!(matches!(outcome, Err(LedgerError::Transport(_))));

    client.shutdown().await;
}

#[tokio::test]
async fn test_submission_transport_failure() {
    let (connector, client) = connected().await;
    connector.script.set_submission(SubmissionScript::Fail(LedgerError::Transport(
        "socket closed".into(),
    )));

    let outcome = transfer(&client, TEST_PRIVATE_KEY).await;
    assert_eq!(outcome, Err(LedgerError::Transport("socket closed".into())));

    client.shutdown().await;
}

#[tokio::test]
async fn test_submit_without_connection() {
    let connector = MockConnector::new();
    let client = client(&connector);

    let outcome = transfer(&client, TEST_PRIVATE_KEY).await;
    assert_eq!(outcome, Err(LedgerError::NotConnected));
    assert_eq!(connector.script.nonce_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reads_pass_through() {
    let (connector, client) = connected().await;

    let owner = Address::repeat_byte(0x22);
    connector.script.set_call_response(owner.abi_encode().into());
    assert_eq!(
        client.spec_owner_of(U256::from(3)).await.unwrap(),
        json!(owner.to_checksum(None))
    );

    let ids = vec![U256::from(4), U256::from(8)];
    connector.script.set_call_response(ids.abi_encode().into());
    assert_eq!(client.owned_objects_of(owner).await.unwrap(), json!(["4", "8"]));

    let object = (U256::from(4), "media-4".to_string(), "first".to_string()).abi_encode_params();
    connector.script.set_call_response(object.into());
    assert_eq!(
        client.get_digital_content_object(U256::from(40)).await.unwrap(),
        json!({ "specId": "4", "mediaId": "media-4", "info": "first" })
    );

    client.shutdown().await;
}

#[tokio::test]
async fn test_write_with_mismatched_arguments_never_submits() {
    let (connector, client) = connected().await;

    let outcome = client
        .write(
            sender(),
            TEST_PRIVATE_KEY,
            ContractMethod::Transfer,
            vec![CallArg::Text("not an address".into())],
        )
        .await;
    assert!(matches!(outcome, Err(LedgerError::Abi(_))));
    assert_eq!(connector.script.nonce_calls.load(Ordering::SeqCst), 0);
    assert!(connector.script.sent().is_empty());

    client.shutdown().await;
}

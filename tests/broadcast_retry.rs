//! Broadcast retry bounds, idempotence and lifecycle outcomes.

use send_engine::broadcast::{Disposition, TransportResponse};
use send_engine::chain::{Chain, FeeTier};
use send_engine::lifecycle::TransactionStore;
use send_engine::{ErrorKind, SendError, TxStatus};

mod common;
use common::*;

fn rejected(status: Option<u16>, message: &str) -> TransportResponse {
    TransportResponse::Rejected {
        status,
        message: message.to_string(),
    }
}

async fn signed_send(
    responses: Vec<TransportResponse>,
    attempts: u32,
) -> (send_engine::SendEngine, send_engine::lifecycle::MemoryStore, std::sync::Arc<ScriptedTransport>, String) {
    let reader = FixedReader::new(Chain::Ethereum, account_state(3, 1_000_000_000_000_000_000));
    let transport = ScriptedTransport::new(Chain::Ethereum, responses);
    let services = evm_services(reader, transport.clone(), attempts);
    let (engine, store) = engine(Chain::Ethereum, services, EVM_ADDRESS, StaticOracle::default().with("w1", &evm_key()));

    let record = engine.create_send("w1", EVM_DESTINATION, "0.02", FeeTier::Normal).await.unwrap();
    engine.sign(&record.id).await.unwrap();
    (engine, store, transport, record.id)
}

#[tokio::test]
async fn test_transient_failures_stop_at_max_attempts() {
    let (engine, store, transport, id) =
        signed_send(vec![TransportResponse::Network("connection reset".into())], 3).await;

    let err = engine.broadcast(&id).await.unwrap_err();
    assert!(matches!(err, SendError::Broadcast { definitive: false, .. }));
    assert_eq!(transport.submissions(), 3);

    // Nothing is assumed lost: the record waits for reconciliation.
    let stored = store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, TxStatus::Broadcasting);
    assert_eq!(stored.failure.unwrap().kind, ErrorKind::Broadcast);
}

#[tokio::test]
async fn test_rebroadcast_reconciles_before_resubmitting() {
    let (engine, _store, transport, id) =
        signed_send(vec![TransportResponse::Network("timeout".into())], 2).await;
    assert!(engine.broadcast(&id).await.is_err());
    assert_eq!(transport.submissions(), 2);

    transport.set_landed(true);
    let outcome = engine.broadcast(&id).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::AlreadyKnown);
    assert_eq!(outcome.attempts, 0);
    assert_eq!(transport.submissions(), 2);

    let record = engine.record(&id).await.unwrap();
    assert_eq!(record.status, TxStatus::Success);
    assert_eq!(record.hash.as_deref(), Some(outcome.hash.as_str()));
}

#[tokio::test]
async fn test_reconcile_marks_landed_broadcast() {
    let (engine, _store, transport, id) =
        signed_send(vec![rejected(Some(503), "upstream unavailable")], 2).await;
    assert!(engine.broadcast(&id).await.is_err());

    assert_eq!(engine.reconcile(&id).await.unwrap().status, TxStatus::Broadcasting);
    transport.set_landed(true);
    assert_eq!(engine.reconcile(&id).await.unwrap().status, TxStatus::Success);
}

#[tokio::test]
async fn test_already_known_keeps_local_hash() {
    let (engine, _store, transport, id) =
        signed_send(vec![rejected(None, "rpc error -32000: already known")], 3).await;
    let local_hash = engine.record(&id).await.unwrap().hash.unwrap();

    let outcome = engine.broadcast(&id).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::AlreadyKnown);
    assert_eq!(outcome.hash, local_hash);
    assert_eq!(transport.submissions(), 1);
    assert_eq!(engine.record(&id).await.unwrap().status, TxStatus::Success);

    // Terminal: a second broadcast does not submit again.
    let again = engine.broadcast(&id).await.unwrap();
    assert_eq!(again.hash, local_hash);
    assert_eq!(transport.submissions(), 1);
}

#[tokio::test]
async fn test_nonce_too_low_fails_without_retry() {
    let (engine, store, transport, id) =
        signed_send(vec![rejected(None, "nonce too low: next nonce 9, tx nonce 3")], 5).await;

    let err = engine.broadcast(&id).await.unwrap_err();
    assert!(matches!(err, SendError::NonceTooLow(_)));
    assert_eq!(transport.submissions(), 1);

    let stored = store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, TxStatus::Failed);
    assert_eq!(stored.failure.unwrap().kind, ErrorKind::NonceTooLow);

    assert!(matches!(
        engine.broadcast(&id).await,
        Err(SendError::InvalidTransition { .. })
    ));
    assert_eq!(transport.submissions(), 1);
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let (engine, _store, transport, id) = signed_send(
        vec![
            rejected(Some(429), "Too Many Requests"),
            rejected(None, "rate limit exceeded"),
            TransportResponse::Accepted("0xremote".into()),
        ],
        3,
    )
    .await;

    let outcome = engine.broadcast(&id).await.unwrap();
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.disposition, Disposition::Accepted);
    assert_eq!(transport.submissions(), 3);
}

#[tokio::test]
async fn test_rate_limit_exhaustion_surfaces_rate_limited() {
    let (engine, store, _transport, id) =
        signed_send(vec![rejected(Some(429), "Too Many Requests")], 2).await;

    let err = engine.broadcast(&id).await.unwrap_err();
    assert!(matches!(err, SendError::RateLimited { attempts: 2, .. }));
    assert_eq!(store.get(&id).await.unwrap().unwrap().status, TxStatus::Broadcasting);
}

#[tokio::test]
async fn test_malformed_marks_failed() {
    let (engine, store, transport, id) =
        signed_send(vec![rejected(None, "rpc error -32602: invalid sender")], 3).await;

    let err = engine.broadcast(&id).await.unwrap_err();
    assert!(matches!(err, SendError::Broadcast { definitive: true, .. }));
    assert!(err.to_string().contains("invalid sender"));
    assert_eq!(transport.submissions(), 1);
    assert_eq!(store.get(&id).await.unwrap().unwrap().status, TxStatus::Failed);
}

#[tokio::test]
async fn test_nonce_too_low_for_landed_bytes_marks_success() {
    // First attempt times out at the client but reaches the node and is mined.
    let (engine, store, transport, id) = signed_send(
        vec![
            TransportResponse::Network("timeout".into()),
            rejected(None, "nonce too low"),
        ],
        3,
    )
    .await;
    transport.set_landed(true);
    let local_hash = engine.record(&id).await.unwrap().hash.unwrap();

    let outcome = engine.broadcast(&id).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::AlreadyKnown);
    assert_eq!(outcome.hash, local_hash);
    assert_eq!(transport.submissions(), 2);

    let stored = store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, TxStatus::Success);
    assert!(stored.failure.is_none());
}

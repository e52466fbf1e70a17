use chrono::Utc;

use super::*;
use crate::journey::{JourneyStatus, Parties};

fn event(journey_key: &str, sequence: u32, status: JourneyStatus) -> JourneyEvent {
    JourneyEvent {
        journey_key: journey_key.to_string(),
        sequence,
        parties: Parties {
            guardian_ref: "g-1".to_string(),
            child_ref: "c-1".to_string(),
            escort_ref: "e-1".to_string(),
        },
        status,
        recorded_at: Utc::now(),
        location: None,
    }
}

#[tokio::test]
async fn test_append_then_latest() {
    let store = InMemoryJourneyStore::new();
    store.append(&event("j-1", 0, JourneyStatus::Pending)).await.unwrap();
    store.append(&event("j-1", 1, JourneyStatus::Departed)).await.unwrap();

    let latest = store.latest("j-1").await.unwrap().unwrap();
    assert_eq!(latest.status, JourneyStatus::Departed);
    assert_eq!(store.event_count().await, 2);
}

#[tokio::test]
async fn test_append_rejects_stale_sequence() {
    let store = InMemoryJourneyStore::new();
    store.append(&event("j-1", 0, JourneyStatus::Pending)).await.unwrap();

    let err = store
        .append(&event("j-1", 0, JourneyStatus::Departed))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::SequenceConflict { expected: 1, actual: 0, .. }
    ));
    assert_eq!(store.event_count().await, 1);
}

#[tokio::test]
async fn test_injected_append_failure_writes_nothing() {
    let store = InMemoryJourneyStore::new();
    store.set_fail_on_append(true).await;

    assert!(store.append(&event("j-1", 0, JourneyStatus::Pending)).await.is_err());
    assert!(store.latest("j-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_push_token_replaced() {
    let store = InMemoryJourneyStore::new();
    assert_eq!(store.push_token("g-1").await.unwrap(), None);

    store.register_push_token("g-1", "ExponentPushToken[a]").await.unwrap();
    store.register_push_token("g-1", "ExponentPushToken[b]").await.unwrap();

    assert_eq!(
        store.push_token("g-1").await.unwrap().as_deref(),
        Some("ExponentPushToken[b]")
    );
}

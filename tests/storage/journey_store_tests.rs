//! JourneyStore interface tests.
//!
//! These tests verify the contract of the JourneyStore trait.
//! Each storage implementation should run these tests.

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use pickup_tracker::interfaces::{JourneyStore, StorageError};
use pickup_tracker::journey::{JourneyEvent, JourneyStatus, Parties};

/// Unique journey key so runs against a shared database do not collide.
pub fn journey_key(prefix: &str) -> String {
    format!("test_{}_{}", prefix, Uuid::new_v4())
}

/// Create a test event at the given sequence.
pub fn make_event(journey_key: &str, sequence: u32, status: JourneyStatus) -> JourneyEvent {
    let base = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();
    JourneyEvent {
        journey_key: journey_key.to_string(),
        sequence,
        parties: Parties {
            guardian_ref: "guardian-1".to_string(),
            child_ref: "child-1".to_string(),
            escort_ref: "escort-1".to_string(),
        },
        status,
        recorded_at: base + Duration::minutes(i64::from(sequence)),
        location: None,
    }
}

/// Append the first `count` statuses of the canonical flow.
pub async fn append_flow<S: JourneyStore>(store: &S, journey_key: &str, count: usize) {
    let flow = [
        JourneyStatus::Pending,
        JourneyStatus::Departed,
        JourneyStatus::Picked,
        JourneyStatus::Arrived,
        JourneyStatus::Completed,
    ];
    for (seq, status) in flow.into_iter().take(count).enumerate() {
        store
            .append(&make_event(journey_key, seq as u32, status))
            .await
            .expect("append should succeed");
    }
}

// =============================================================================
// JourneyStore::append tests
// =============================================================================

pub async fn test_append_first_event<S: JourneyStore>(store: &S) {
    let key = journey_key("append_first");

    store
        .append(&make_event(&key, 0, JourneyStatus::Pending))
        .await
        .expect("append should succeed");

    let events = store.events(&key).await.expect("events should succeed");
    assert_eq!(events.len(), 1, "should have 1 event");
}

pub async fn test_append_sequential<S: JourneyStore>(store: &S) {
    let key = journey_key("append_sequential");

    append_flow(store, &key, 5).await;

    let events = store.events(&key).await.expect("events should succeed");
    let sequences: Vec<u32> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
}

pub async fn test_append_duplicate_sequence<S: JourneyStore>(store: &S) {
    let key = journey_key("append_duplicate");
    append_flow(store, &key, 2).await;

    let result = store
        .append(&make_event(&key, 1, JourneyStatus::Cancelled))
        .await;

    assert!(
        matches!(result, Err(StorageError::SequenceConflict { expected: 2, actual: 1, .. })),
        "duplicate sequence should conflict, got {:?}",
        result
    );
    let events = store.events(&key).await.unwrap();
    assert_eq!(events.len(), 2, "conflict must not write");
    assert_eq!(events[1].status, JourneyStatus::Departed);
}

pub async fn test_append_gap_rejected<S: JourneyStore>(store: &S) {
    let key = journey_key("append_gap");

    let result = store
        .append(&make_event(&key, 3, JourneyStatus::Pending))
        .await;

    assert!(
        matches!(result, Err(StorageError::SequenceConflict { expected: 0, actual: 3, .. })),
        "first event must have sequence 0, got {:?}",
        result
    );
    assert!(store.events(&key).await.unwrap().is_empty());
}

// =============================================================================
// JourneyStore read tests
// =============================================================================

pub async fn test_latest_unknown_journey<S: JourneyStore>(store: &S) {
    let key = journey_key("latest_unknown");

    assert!(store.latest(&key).await.unwrap().is_none());
    assert!(store.events(&key).await.unwrap().is_empty());
}

pub async fn test_latest_returns_highest_sequence<S: JourneyStore>(store: &S) {
    let key = journey_key("latest_highest");
    append_flow(store, &key, 3).await;

    let latest = store.latest(&key).await.unwrap().expect("should have latest");
    assert_eq!(latest.sequence, 2);
    assert_eq!(latest.status, JourneyStatus::Picked);
}

pub async fn test_events_preserve_data<S: JourneyStore>(store: &S) {
    let key = journey_key("preserve");
    let mut event = make_event(&key, 0, JourneyStatus::Pending);
    event.recorded_at = Utc.with_ymd_and_hms(2026, 3, 2, 15, 4, 5).unwrap()
        + Duration::microseconds(123_456);
    event.location = Some("Main entrance".to_string());

    store.append(&event).await.unwrap();

    let stored = store.events(&key).await.unwrap();
    assert_eq!(stored, vec![event]);
}

pub async fn test_journeys_isolated<S: JourneyStore>(store: &S) {
    let key1 = journey_key("isolated_a");
    let key2 = journey_key("isolated_b");
    append_flow(store, &key1, 2).await;
    append_flow(store, &key2, 4).await;

    assert_eq!(store.events(&key1).await.unwrap().len(), 2);
    assert_eq!(store.events(&key2).await.unwrap().len(), 4);
    assert_eq!(
        store.latest(&key1).await.unwrap().unwrap().status,
        JourneyStatus::Departed
    );
}

pub async fn test_latest_per_journey<S: JourneyStore>(store: &S) {
    let key1 = journey_key("per_journey_a");
    let key2 = journey_key("per_journey_b");
    append_flow(store, &key1, 3).await;
    append_flow(store, &key2, 1).await;

    let latest = store.latest_per_journey().await.unwrap();

    let find = |key: &str| {
        latest
            .iter()
            .filter(|e| e.journey_key == key)
            .collect::<Vec<_>>()
    };
    let a = find(&key1);
    let b = find(&key2);
    assert_eq!(a.len(), 1, "one entry per journey");
    assert_eq!(a[0].sequence, 2);
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].status, JourneyStatus::Pending);
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all JourneyStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_journey_store_tests {
    ($store:expr) => {
        use $crate::storage::journey_store_tests::*;

        test_append_first_event($store).await;
        println!("  test_append_first_event: PASSED");

        test_append_sequential($store).await;
        println!("  test_append_sequential: PASSED");

        test_append_duplicate_sequence($store).await;
        println!("  test_append_duplicate_sequence: PASSED");

        test_append_gap_rejected($store).await;
        println!("  test_append_gap_rejected: PASSED");

        test_latest_unknown_journey($store).await;
        println!("  test_latest_unknown_journey: PASSED");

        test_latest_returns_highest_sequence($store).await;
        println!("  test_latest_returns_highest_sequence: PASSED");

        test_events_preserve_data($store).await;
        println!("  test_events_preserve_data: PASSED");

        test_journeys_isolated($store).await;
        println!("  test_journeys_isolated: PASSED");

        test_latest_per_journey($store).await;
        println!("  test_latest_per_journey: PASSED");
    };
}

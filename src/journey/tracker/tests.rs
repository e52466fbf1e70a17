use std::sync::Arc;
use std::time::Duration;

use backon::ExponentialBuilder;

use super::*;
use crate::notify::RecordingNotifier;
use crate::storage::InMemoryJourneyStore;

const FLOW: [JourneyStatus; 5] = [
    JourneyStatus::Pending,
    JourneyStatus::Departed,
    JourneyStatus::Picked,
    JourneyStatus::Arrived,
    JourneyStatus::Completed,
];

fn tracker() -> (JourneyTracker, Arc<InMemoryJourneyStore>) {
    let store = Arc::new(InMemoryJourneyStore::new());
    (JourneyTracker::new(store.clone()), store)
}

fn parties() -> TransitionPayload {
    TransitionPayload::with_parties("guardian-1", "child-1", "escort-1")
}

/// Record the first `count` statuses of the flow.
async fn advance(tracker: &JourneyTracker, journey_key: &str, count: usize) {
    for (i, status) in FLOW.into_iter().take(count).enumerate() {
        let payload = if i == 0 { parties() } else { TransitionPayload::default() };
        tracker
            .record_transition(journey_key, status, payload)
            .await
            .unwrap();
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_fresh_journey_pending_then_pending_again() {
    let (tracker, store) = tracker();

    let event = tracker
        .record_transition("j-1", JourneyStatus::Pending, parties())
        .await
        .unwrap();
    assert_eq!(event.sequence, 0);
    assert_eq!(event.status, JourneyStatus::Pending);

    let err = tracker
        .record_transition("j-1", JourneyStatus::Pending, TransitionPayload::default())
        .await
        .unwrap_err();

    match err {
        TrackerError::IllegalTransition {
            current,
            requested,
            expected,
        } => {
            assert_eq!(current, Some(JourneyStatus::Pending));
            assert_eq!(requested, JourneyStatus::Pending);
            assert_eq!(expected, Some(JourneyStatus::Departed));
        }
        other => panic!("expected IllegalTransition, got {:?}", other),
    }
    assert_eq!(store.event_count().await, 1);
}

#[tokio::test]
async fn test_skipping_arrived_is_rejected() {
    let (tracker, _) = tracker();
    advance(&tracker, "j-1", 3).await;

    let err = tracker
        .record_transition("j-1", JourneyStatus::Completed, TransitionPayload::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "illegal_transition");
    assert_eq!(err.expected_next(), Some(JourneyStatus::Arrived));
    assert_eq!(err.current_status(), Some(Some(JourneyStatus::Picked)));
    assert_eq!(
        tracker.current_status("j-1").await.unwrap(),
        Some(JourneyStatus::Picked)
    );
}

#[tokio::test]
async fn test_completed_journey_cannot_be_cancelled() {
    let (tracker, _) = tracker();
    advance(&tracker, "j-1", 5).await;

    let err = tracker
        .record_transition("j-1", JourneyStatus::Cancelled, TransitionPayload::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TrackerError::IllegalTransition {
            current: Some(JourneyStatus::Completed),
            expected: None,
            ..
        }
    ));
    assert_eq!(err.to_string(), "Cannot cancel a completed journey");
}

#[tokio::test]
async fn test_cancelled_journey_is_finalized() {
    let (tracker, store) = tracker();
    advance(&tracker, "j-1", 2).await;

    tracker
        .record_transition("j-1", JourneyStatus::Cancelled, TransitionPayload::default())
        .await
        .unwrap();

    let err = tracker
        .record_transition("j-1", JourneyStatus::Picked, TransitionPayload::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TrackerError::Finalized {
            current: JourneyStatus::Cancelled,
            requested: JourneyStatus::Picked,
        }
    ));
    assert!(err.to_string().contains("already finalized"));
    assert_eq!(store.event_count().await, 3);
}

#[tokio::test]
async fn test_cancel_twice_is_finalized() {
    let (tracker, _) = tracker();
    advance(&tracker, "j-1", 1).await;
    tracker
        .record_transition("j-1", JourneyStatus::Cancelled, TransitionPayload::default())
        .await
        .unwrap();

    let err = tracker
        .record_transition("j-1", JourneyStatus::Cancelled, TransitionPayload::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "finalized");
}

#[tokio::test]
async fn test_completed_journey_is_finalized() {
    let (tracker, _) = tracker();
    advance(&tracker, "j-1", 5).await;

    let err = tracker
        .record_transition("j-1", JourneyStatus::Pending, TransitionPayload::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "finalized");
}

#[tokio::test]
async fn test_unknown_journey() {
    let (tracker, _) = tracker();

    assert_eq!(tracker.current_status("ghost").await.unwrap(), None);
    assert!(tracker.latest_event("ghost").await.unwrap().is_none());
    assert!(tracker.history("ghost").await.unwrap().is_empty());
    assert!(matches!(
        tracker.journey("ghost").await,
        Err(TrackerError::NotFound(ref k)) if k == "ghost"
    ));
}

#[tokio::test]
async fn test_cancel_before_first_event() {
    let (tracker, _) = tracker();

    let event = tracker
        .record_transition("j-1", JourneyStatus::Cancelled, parties())
        .await
        .unwrap();

    assert_eq!(event.sequence, 0);
    assert_eq!(
        tracker.current_status("j-1").await.unwrap(),
        Some(JourneyStatus::Cancelled)
    );
}

#[tokio::test]
async fn test_first_event_must_be_pending() {
    let (tracker, store) = tracker();

    let err = tracker
        .record_transition("j-1", JourneyStatus::Departed, parties())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TrackerError::IllegalTransition {
            current: None,
            expected: Some(JourneyStatus::Pending),
            ..
        }
    ));
    assert_eq!(err.current_status(), Some(None));
    assert_eq!(store.event_count().await, 0);
}

#[tokio::test]
async fn test_first_event_without_parties_is_invalid_input() {
    let (tracker, store) = tracker();

    let err = tracker
        .record_transition("j-1", JourneyStatus::Departed, TransitionPayload::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::InvalidInput(_)));
    assert_eq!(err.kind(), "invalid_input");
    assert_eq!(store.event_count().await, 0);
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_rejection_is_idempotent() {
    let (tracker, store) = tracker();
    advance(&tracker, "j-1", 2).await;

    let first = tracker
        .record_transition("j-1", JourneyStatus::Arrived, TransitionPayload::default())
        .await
        .unwrap_err();
    let second = tracker
        .record_transition("j-1", JourneyStatus::Arrived, TransitionPayload::default())
        .await
        .unwrap_err();

    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.expected_next(), second.expected_next());
    assert_eq!(store.event_count().await, 2);
}

#[tokio::test]
async fn test_n_transitions_build_history() {
    for n in 1..=FLOW.len() {
        let (tracker, _) = tracker();
        advance(&tracker, "j-1", n).await;

        assert_eq!(
            tracker.current_status("j-1").await.unwrap(),
            Some(FLOW[n - 1])
        );
        let history = tracker.history("j-1").await.unwrap();
        assert_eq!(history.len(), n);
        assert_eq!(history.statuses(), FLOW[..n].to_vec());
        assert!(tracker.transition_table().is_valid_path(&history.statuses()));
    }
}

#[tokio::test]
async fn test_history_is_restartable() {
    let (tracker, _) = tracker();
    advance(&tracker, "j-1", 3).await;

    let history = tracker.history("j-1").await.unwrap();
    let first: Vec<_> = history.iter().map(|e| e.sequence).collect();
    let second: Vec<_> = history.iter().map(|e| e.sequence).collect();

    assert_eq!(first, vec![0, 1, 2]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_timestamps_never_decrease() {
    let (tracker, _) = tracker();
    advance(&tracker, "j-1", 5).await;

    let history = tracker.history("j-1").await.unwrap();
    let times: Vec<_> = history.iter().map(|e| e.recorded_at).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_summary_and_listing() {
    let (tracker, _) = tracker();
    advance(&tracker, "j-b", 1).await;
    advance(&tracker, "j-a", 4).await;

    let summary = tracker.journey("j-a").await.unwrap();
    assert_eq!(summary.status, JourneyStatus::Arrived);
    assert_eq!(summary.event_count, 4);
    assert_eq!(summary.parties.escort_ref, "escort-1");

    let keys: Vec<_> = tracker
        .list_journeys()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.journey_key)
        .collect();
    assert_eq!(keys, vec!["j-a".to_string(), "j-b".to_string()]);
}

// ============================================================================
// Input validation
// ============================================================================

#[tokio::test]
async fn test_blank_key_rejected() {
    let (tracker, store) = tracker();

    let err = tracker
        .record_transition("   ", JourneyStatus::Pending, parties())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_input");
    assert!(matches!(
        tracker.history("").await,
        Err(TrackerError::InvalidInput(_))
    ));
    assert_eq!(store.event_count().await, 0);
}

#[tokio::test]
async fn test_overlong_key_rejected() {
    let (tracker, _) = tracker();
    let key = "k".repeat(MAX_KEY_LEN + 1);

    let err = tracker
        .record_transition(&key, JourneyStatus::Pending, parties())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_input");
}

#[tokio::test]
async fn test_key_is_trimmed() {
    let (tracker, _) = tracker();

    let event = tracker
        .record_transition("  j-1 ", JourneyStatus::Pending, parties())
        .await
        .unwrap();

    assert_eq!(event.journey_key, "j-1");
    assert_eq!(
        tracker.current_status("j-1").await.unwrap(),
        Some(JourneyStatus::Pending)
    );
}

#[tokio::test]
async fn test_first_event_requires_parties() {
    let (tracker, store) = tracker();
    let mut payload = parties();
    payload.escort_ref = Some("  ".to_string());

    let err = tracker
        .record_transition("j-1", JourneyStatus::Pending, payload)
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::InvalidInput(ref m) if m.contains("escort_ref")));
    assert_eq!(store.event_count().await, 0);
}

#[tokio::test]
async fn test_later_events_inherit_parties() {
    let (tracker, _) = tracker();
    advance(&tracker, "j-1", 1).await;

    let event = tracker
        .record_transition(
            "j-1",
            JourneyStatus::Departed,
            TransitionPayload::default().with_location("Oak Street"),
        )
        .await
        .unwrap();

    assert_eq!(event.parties.guardian_ref, "guardian-1");
    assert_eq!(event.parties.child_ref, "child-1");
    assert_eq!(event.location.as_deref(), Some("Oak Street"));
}

#[tokio::test]
async fn test_mismatched_party_rejected() {
    let (tracker, store) = tracker();
    advance(&tracker, "j-1", 1).await;

    let payload = TransitionPayload {
        escort_ref: Some("someone-else".to_string()),
        ..Default::default()
    };
    let err = tracker
        .record_transition("j-1", JourneyStatus::Departed, payload)
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::InvalidInput(ref m) if m.contains("escort_ref")));
    assert_eq!(store.event_count().await, 1);

    // Matching references are accepted.
    tracker
        .record_transition("j-1", JourneyStatus::Departed, parties())
        .await
        .unwrap();
}

// ============================================================================
// Storage failures
// ============================================================================

#[tokio::test]
async fn test_storage_failure_surfaces() {
    let (tracker, store) = tracker();
    advance(&tracker, "j-1", 1).await;
    store.set_fail_on_append(true).await;

    let err = tracker
        .record_transition("j-1", JourneyStatus::Departed, TransitionPayload::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::Storage(_)));
    assert_eq!(err.kind(), "storage_error");
    assert_eq!(
        tracker.current_status("j-1").await.unwrap(),
        Some(JourneyStatus::Pending)
    );
}

#[test]
fn test_sequence_conflict_maps_to_conflict() {
    let err: TrackerError = StorageError::SequenceConflict {
        journey_key: "j-1".to_string(),
        expected: 2,
        actual: 1,
    }
    .into();

    assert!(matches!(err, TrackerError::Conflict { ref journey_key } if journey_key == "j-1"));
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn test_writer_outside_tracker_causes_conflict() {
    use crate::journey::Parties;

    /// Store whose `latest` lags one append behind, as if another process
    /// wrote between the read and the append.
    struct StaleReads {
        inner: InMemoryJourneyStore,
    }

    #[async_trait::async_trait]
    impl JourneyStore for StaleReads {
        async fn append(&self, event: &JourneyEvent) -> crate::interfaces::Result<()> {
            self.inner.append(event).await
        }
        async fn latest(&self, _journey_key: &str) -> crate::interfaces::Result<Option<JourneyEvent>> {
            Ok(None)
        }
        async fn events(&self, journey_key: &str) -> crate::interfaces::Result<Vec<JourneyEvent>> {
            self.inner.events(journey_key).await
        }
        async fn latest_per_journey(&self) -> crate::interfaces::Result<Vec<JourneyEvent>> {
            self.inner.latest_per_journey().await
        }
    }

    let store = Arc::new(StaleReads {
        inner: InMemoryJourneyStore::new(),
    });
    store
        .inner
        .append(&JourneyEvent {
            journey_key: "j-1".to_string(),
            sequence: 0,
            parties: Parties {
                guardian_ref: "guardian-1".to_string(),
                child_ref: "child-1".to_string(),
                escort_ref: "escort-1".to_string(),
            },
            status: JourneyStatus::Pending,
            recorded_at: Utc::now(),
            location: None,
        })
        .await
        .unwrap();
    let tracker = JourneyTracker::new(store.clone());

    let err = tracker
        .record_transition("j-1", JourneyStatus::Pending, parties())
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::Conflict { .. }));
    assert_eq!(store.inner.event_count().await, 1);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_events_one_wins() {
    let (tracker, store) = tracker();
    let tracker = Arc::new(tracker);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                tracker
                    .record_transition("j-1", JourneyStatus::Pending, parties())
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert_eq!(e.kind(), "illegal_transition"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.event_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_journeys_independent() {
    let (tracker, store) = tracker();
    let tracker = Arc::new(tracker);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let tracker = tracker.clone();
            tokio::spawn(async move { advance(&tracker, &format!("j-{}", i), 5).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.event_count().await, 40);
    assert_eq!(tracker.list_journeys().await.unwrap().len(), 8);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_notifications_follow_recorded_order() {
    let store = Arc::new(InMemoryJourneyStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let (dispatcher, worker) =
        NotificationDispatcher::spawn(notifier.clone(), 16, ExponentialBuilder::default());
    let tracker = JourneyTracker::new(store).with_notifications(dispatcher);

    advance(&tracker, "j-1", 5).await;
    let _ = tracker
        .record_transition("j-1", JourneyStatus::Cancelled, TransitionPayload::default())
        .await
        .unwrap_err();

    drop(tracker);
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();

    let delivered = notifier.delivered().await;
    let statuses: Vec<_> = delivered.iter().map(|n| n.status).collect();
    assert_eq!(statuses, FLOW.to_vec(), "rejections are not notified");
    assert!(delivered.iter().all(|n| n.guardian_ref == "guardian-1"));
}

#[tokio::test]
async fn test_notifier_outage_does_not_fail_transition() {
    let store = Arc::new(InMemoryJourneyStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    notifier
        .script_failures([crate::notify::mock::Attempt::NoRecipient])
        .await;
    let (dispatcher, worker) =
        NotificationDispatcher::spawn(notifier.clone(), 16, ExponentialBuilder::default());
    let tracker = JourneyTracker::new(store).with_notifications(dispatcher);

    let event = tracker
        .record_transition("j-1", JourneyStatus::Pending, parties())
        .await
        .unwrap();
    assert_eq!(event.status, JourneyStatus::Pending);

    drop(tracker);
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();
    assert!(notifier.delivered().await.is_empty());
}

//! In-memory storage.
//!
//! Implements both `JourneyStore` and `GuardianDirectory` over process-local
//! maps. Used by tests and by `storage.type = memory` for local runs. Append
//! failures can be injected to exercise storage error paths.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interfaces::{GuardianDirectory, JourneyStore, Result, StorageError};
use crate::journey::JourneyEvent;

#[derive(Default)]
pub struct InMemoryJourneyStore {
    journeys: RwLock<BTreeMap<String, Vec<JourneyEvent>>>,
    push_tokens: RwLock<HashMap<String, String>>,
    fail_on_append: RwLock<bool>,
}

impl InMemoryJourneyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_append(&self, fail: bool) {
        *self.fail_on_append.write().await = fail;
    }

    /// Total events across all journeys.
    pub async fn event_count(&self) -> usize {
        self.journeys.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl JourneyStore for InMemoryJourneyStore {
    async fn append(&self, event: &JourneyEvent) -> Result<()> {
        if *self.fail_on_append.read().await {
            return Err(StorageError::Unsupported(
                "append disabled for test".to_string(),
            ));
        }

        let mut journeys = self.journeys.write().await;
        let events = journeys.entry(event.journey_key.clone()).or_default();

        let expected = events.len() as u32;
        if event.sequence != expected {
            return Err(StorageError::SequenceConflict {
                journey_key: event.journey_key.clone(),
                expected,
                actual: event.sequence,
            });
        }

        events.push(event.clone());
        Ok(())
    }

    async fn latest(&self, journey_key: &str) -> Result<Option<JourneyEvent>> {
        let journeys = self.journeys.read().await;
        Ok(journeys.get(journey_key).and_then(|e| e.last().cloned()))
    }

    async fn events(&self, journey_key: &str) -> Result<Vec<JourneyEvent>> {
        let journeys = self.journeys.read().await;
        Ok(journeys.get(journey_key).cloned().unwrap_or_default())
    }

    async fn latest_per_journey(&self) -> Result<Vec<JourneyEvent>> {
        let journeys = self.journeys.read().await;
        Ok(journeys
            .values()
            .filter_map(|events| events.last().cloned())
            .collect())
    }
}

#[async_trait]
impl GuardianDirectory for InMemoryJourneyStore {
    async fn register_push_token(&self, guardian_ref: &str, token: &str) -> Result<()> {
        self.push_tokens
            .write()
            .await
            .insert(guardian_ref.to_string(), token.to_string());
        Ok(())
    }

    async fn push_token(&self, guardian_ref: &str) -> Result<Option<String>> {
        Ok(self.push_tokens.read().await.get(guardian_ref).cloned())
    }
}

#[cfg(test)]
mod tests;

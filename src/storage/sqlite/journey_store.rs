//! SQLite JourneyStore implementation.

use async_trait::async_trait;
use chrono::Utc;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use crate::interfaces::{GuardianDirectory, JourneyStore, Result, StorageError};
use crate::journey::JourneyEvent;
use crate::storage::helpers::{format_timestamp, is_unique_violation, rows_to_events, EventRow};
use crate::storage::schema::{
    JourneyEvents, PushTokens, CREATE_PUSH_TOKENS, EVENT_COLUMNS, SELECT_LATEST_PER_JOURNEY,
    SQLITE_APPEND_EVENT, SQLITE_CREATE_JOURNEY_EVENTS,
};

/// SQLite implementation of JourneyStore and GuardianDirectory.
pub struct SqliteJourneyStore {
    pool: SqlitePool,
}

impl SqliteJourneyStore {
    /// Create a new SQLite journey store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(SQLITE_CREATE_JOURNEY_EVENTS)
            .execute(&self.pool)
            .await?;
        sqlx::raw_sql(CREATE_PUSH_TOKENS).execute(&self.pool).await?;
        Ok(())
    }

    /// Next free sequence for a journey.
    async fn next_sequence(&self, journey_key: &str) -> Result<u32> {
        let query = Query::select()
            .expr(Expr::col(JourneyEvents::Sequence).max())
            .from(JourneyEvents::Table)
            .and_where(Expr::col(JourneyEvents::JourneyKey).eq(journey_key))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        let max_seq: Option<i64> = row.and_then(|r| r.get(0));
        Ok(max_seq.map(|s| s as u32 + 1).unwrap_or(0))
    }

    async fn conflict(&self, event: &JourneyEvent) -> StorageError {
        match self.next_sequence(&event.journey_key).await {
            Ok(expected) => StorageError::SequenceConflict {
                journey_key: event.journey_key.clone(),
                expected,
                actual: event.sequence,
            },
            Err(e) => e,
        }
    }

    async fn select_events(&self, journey_key: &str, order: Order, limit: Option<u64>) -> Result<Vec<JourneyEvent>> {
        // The statement is not Send, so it must be gone before the await.
        let query = {
            let mut select = Query::select();
            select
                .columns(EVENT_COLUMNS)
                .from(JourneyEvents::Table)
                .and_where(Expr::col(JourneyEvents::JourneyKey).eq(journey_key))
                .order_by(JourneyEvents::Sequence, order);
            if let Some(limit) = limit {
                select.limit(limit);
            }
            select.to_string(SqliteQueryBuilder)
        };

        let rows: Vec<EventRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        rows_to_events(rows)
    }
}

#[async_trait]
impl JourneyStore for SqliteJourneyStore {
    async fn append(&self, event: &JourneyEvent) -> Result<()> {
        // Check and insert run as a single autocommit statement, so a failed
        // or dropped append never leaves a transaction open on the connection.
        let inserted = sqlx::query(SQLITE_APPEND_EVENT)
            .bind(event.journey_key.as_str())
            .bind(i64::from(event.sequence))
            .bind(event.parties.guardian_ref.as_str())
            .bind(event.parties.child_ref.as_str())
            .bind(event.parties.escort_ref.as_str())
            .bind(event.status.as_str())
            .bind(format_timestamp(&event.recorded_at))
            .bind(event.location.as_deref())
            .bind(event.journey_key.as_str())
            .bind(i64::from(event.sequence))
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(done) if done.rows_affected() == 1 => Ok(()),
            Ok(_) => Err(self.conflict(event).await),
            Err(e) if is_unique_violation(&e) => Err(self.conflict(event).await),
            Err(e) => Err(e.into()),
        }
    }

    async fn latest(&self, journey_key: &str) -> Result<Option<JourneyEvent>> {
        let mut events = self.select_events(journey_key, Order::Desc, Some(1)).await?;
        Ok(events.pop())
    }

    async fn events(&self, journey_key: &str) -> Result<Vec<JourneyEvent>> {
        self.select_events(journey_key, Order::Asc, None).await
    }

    async fn latest_per_journey(&self) -> Result<Vec<JourneyEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(SELECT_LATEST_PER_JOURNEY)
            .fetch_all(&self.pool)
            .await?;
        rows_to_events(rows)
    }
}

#[async_trait]
impl GuardianDirectory for SqliteJourneyStore {
    async fn register_push_token(&self, guardian_ref: &str, token: &str) -> Result<()> {
        let updated_at = format_timestamp(&Utc::now());

        let query = Query::insert()
            .into_table(PushTokens::Table)
            .columns([PushTokens::GuardianRef, PushTokens::Token, PushTokens::UpdatedAt])
            .values_panic([guardian_ref.into(), token.into(), updated_at.into()])
            .on_conflict(
                OnConflict::column(PushTokens::GuardianRef)
                    .update_columns([PushTokens::Token, PushTokens::UpdatedAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn push_token(&self, guardian_ref: &str) -> Result<Option<String>> {
        let query = Query::select()
            .column(PushTokens::Token)
            .from(PushTokens::Table)
            .and_where(Expr::col(PushTokens::GuardianRef).eq(guardian_ref))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| r.get("token")))
    }
}

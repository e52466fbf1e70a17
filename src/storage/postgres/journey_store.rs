//! PostgreSQL JourneyStore implementation.
//!
//! Compare-and-append relies on the `(journey_key, sequence)` primary key:
//! of two writers racing for the same sequence, the loser gets a unique
//! violation, reported as `SequenceConflict`.

use async_trait::async_trait;
use chrono::Utc;
use sea_query::{Expr, OnConflict, Order, PostgresQueryBuilder, Query};
use sqlx::{PgPool, Row};

use crate::interfaces::{GuardianDirectory, JourneyStore, Result, StorageError};
use crate::journey::JourneyEvent;
use crate::storage::helpers::{format_timestamp, is_unique_violation, rows_to_events, EventRow};
use crate::storage::schema::{
    JourneyEvents, PushTokens, CREATE_PUSH_TOKENS, EVENT_COLUMNS, POSTGRES_CREATE_JOURNEY_EVENTS,
    SELECT_LATEST_PER_JOURNEY,
};

/// PostgreSQL implementation of JourneyStore and GuardianDirectory.
pub struct PostgresJourneyStore {
    pool: PgPool,
}

impl PostgresJourneyStore {
    /// Create a new PostgreSQL journey store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(POSTGRES_CREATE_JOURNEY_EVENTS)
            .execute(&self.pool)
            .await?;
        sqlx::raw_sql(CREATE_PUSH_TOKENS).execute(&self.pool).await?;
        Ok(())
    }

    async fn select_events(
        &self,
        journey_key: &str,
        order: Order,
        limit: Option<u64>,
    ) -> Result<Vec<JourneyEvent>> {
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
            select.to_string(PostgresQueryBuilder)
        };

        let rows: Vec<EventRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        rows_to_events(rows)
    }
}

#[async_trait]
impl JourneyStore for PostgresJourneyStore {
    async fn append(&self, event: &JourneyEvent) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let query = Query::select()
            .expr(Expr::col(JourneyEvents::Sequence).max())
            .from(JourneyEvents::Table)
            .and_where(Expr::col(JourneyEvents::JourneyKey).eq(event.journey_key.as_str()))
            .to_string(PostgresQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&mut *tx).await?;
        let max_seq: Option<i64> = row.get(0);
        let expected = max_seq.map(|s| s as u32 + 1).unwrap_or(0);

        if event.sequence != expected {
            return Err(StorageError::SequenceConflict {
                journey_key: event.journey_key.clone(),
                expected,
                actual: event.sequence,
            });
        }

        let query = Query::insert()
            .into_table(JourneyEvents::Table)
            .columns(EVENT_COLUMNS)
            .values_panic([
                event.journey_key.as_str().into(),
                i64::from(event.sequence).into(),
                event.parties.guardian_ref.as_str().into(),
                event.parties.child_ref.as_str().into(),
                event.parties.escort_ref.as_str().into(),
                event.status.as_str().into(),
                format_timestamp(&event.recorded_at).into(),
                event.location.clone().into(),
            ])
            .to_string(PostgresQueryBuilder);

        match sqlx::query(&query).execute(&mut *tx).await {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StorageError::SequenceConflict {
                    journey_key: event.journey_key.clone(),
                    expected,
                    actual: event.sequence,
                });
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(())
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
impl GuardianDirectory for PostgresJourneyStore {
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
            .to_string(PostgresQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn push_token(&self, guardian_ref: &str) -> Result<Option<String>> {
        let query = Query::select()
            .column(PushTokens::Token)
            .from(PushTokens::Table)
            .and_where(Expr::col(PushTokens::GuardianRef).eq(guardian_ref))
            .to_string(PostgresQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| r.get("token")))
    }
}

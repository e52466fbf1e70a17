//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Journey events table schema.
#[derive(Iden)]
pub enum JourneyEvents {
    Table,
    #[iden = "journey_key"]
    JourneyKey,
    #[iden = "sequence"]
    Sequence,
    #[iden = "guardian_ref"]
    GuardianRef,
    #[iden = "child_ref"]
    ChildRef,
    #[iden = "escort_ref"]
    EscortRef,
    #[iden = "status"]
    Status,
    #[iden = "recorded_at"]
    RecordedAt,
    #[iden = "location"]
    Location,
}

/// Guardian push tokens table schema.
#[derive(Iden)]
pub enum PushTokens {
    Table,
    #[iden = "guardian_ref"]
    GuardianRef,
    #[iden = "token"]
    Token,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Columns selected when reading events, in `EventRow` order.
pub const EVENT_COLUMNS: [JourneyEvents; 8] = [
    JourneyEvents::JourneyKey,
    JourneyEvents::Sequence,
    JourneyEvents::GuardianRef,
    JourneyEvents::ChildRef,
    JourneyEvents::EscortRef,
    JourneyEvents::Status,
    JourneyEvents::RecordedAt,
    JourneyEvents::Location,
];

/// SQL for creating the journey events table (SQLite).
pub const SQLITE_CREATE_JOURNEY_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS journey_events (
    journey_key TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    guardian_ref TEXT NOT NULL,
    child_ref TEXT NOT NULL,
    escort_ref TEXT NOT NULL,
    status TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    location TEXT,
    PRIMARY KEY (journey_key, sequence)
);
"#;

/// Compare-and-append for SQLite as one autocommit statement. Inserts only
/// when the next free sequence of the journey equals the supplied one.
///
/// Binds: the eight event columns in `EVENT_COLUMNS` order, then the journey
/// key and the sequence again for the check.
pub const SQLITE_APPEND_EVENT: &str = r#"
INSERT INTO journey_events (journey_key, sequence, guardian_ref, child_ref, escort_ref,
                            status, recorded_at, location)
SELECT ?, ?, ?, ?, ?, ?, ?, ?
WHERE (SELECT COALESCE(MAX(sequence) + 1, 0) FROM journey_events WHERE journey_key = ?) = ?
"#;

/// SQL for creating the journey events table (PostgreSQL).
pub const POSTGRES_CREATE_JOURNEY_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS journey_events (
    journey_key TEXT NOT NULL,
    sequence BIGINT NOT NULL,
    guardian_ref TEXT NOT NULL,
    child_ref TEXT NOT NULL,
    escort_ref TEXT NOT NULL,
    status TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    location TEXT,
    PRIMARY KEY (journey_key, sequence)
);
"#;

/// SQL for creating the push tokens table. Valid for SQLite and PostgreSQL.
pub const CREATE_PUSH_TOKENS: &str = r#"
CREATE TABLE IF NOT EXISTS push_tokens (
    guardian_ref TEXT NOT NULL PRIMARY KEY,
    token TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Latest event of every journey. Valid for SQLite and PostgreSQL.
pub const SELECT_LATEST_PER_JOURNEY: &str = r#"
SELECT e.journey_key, e.sequence, e.guardian_ref, e.child_ref, e.escort_ref,
       e.status, e.recorded_at, e.location
FROM journey_events e
JOIN (
    SELECT journey_key, MAX(sequence) AS sequence
    FROM journey_events
    GROUP BY journey_key
) latest ON latest.journey_key = e.journey_key AND latest.sequence = e.sequence
ORDER BY e.journey_key
"#;

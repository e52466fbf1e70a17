//! Storage implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::{GuardianDirectory, JourneyStore};

pub mod memory;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub(crate) mod helpers;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod schema;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryJourneyStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteJourneyStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresJourneyStore;

/// Initialize storage based on configuration.
///
/// Returns tuple of (JourneyStore, GuardianDirectory). Every backend serves
/// both from the same connection pool.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<(Arc<dyn JourneyStore>, Arc<dyn GuardianDirectory>), Box<dyn std::error::Error>> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Storage: memory");
            let store = Arc::new(InMemoryJourneyStore::new());
            Ok((store.clone(), store))
        }
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let path = &config.sqlite.path;
            info!("Storage: sqlite at {}", path);

            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }

            let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path)).await?;

            let store = Arc::new(SqliteJourneyStore::new(pool));
            store.init().await?;

            Ok((store.clone(), store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => Err("SQLite feature not enabled".into()),
        #[cfg(feature = "postgres")]
        StorageType::Postgres => {
            info!("Storage: postgres");
            let pool = sqlx::PgPool::connect(&config.postgres.uri).await?;

            let store = Arc::new(PostgresJourneyStore::new(pool));
            store.init().await?;

            Ok((store.clone(), store))
        }
        #[cfg(not(feature = "postgres"))]
        StorageType::Postgres => Err("Postgres feature not enabled".into()),
    }
}

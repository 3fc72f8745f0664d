//! SQLite-based unified store using `SeaORM`.
//!
//! A single `SqliteStore` implements `RouteRepository`, `InstanceRepository`,
//! `GlobalConfigRepository` and `HistoryRepository`, backed by a local
//! `SQLite` database. Structured payloads (handler config, header rules,
//! history snapshots) are stored as JSON text, timestamps as RFC 3339 text.

pub(crate) mod entity;
mod global_config_repo;
mod history_repo;
mod instance_repo;
mod migration;
mod route_repo;

use std::path::Path;

use caddy_orchestrator_core::error::{CoreError, CoreResult};
use caddy_orchestrator_core::utils::datetime::parse_rfc3339;
use chrono::{DateTime, Utc};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use migration::Migrator;

/// SQLite-based unified store.
pub struct SqliteStore {
    /// Shared `SeaORM` database connection.
    pub(crate) db: DatabaseConnection,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and bring its schema up to date.
    ///
    /// # Errors
    /// Returns `CoreError::StorageError` if directory creation, database
    /// connection, or schema migration fails.
    pub async fn new(db_path: &Path) -> CoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::StorageError(format!("Failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let db = Database::connect(&db_url)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to connect to SQLite: {e}")))?;

        let store = Self { db };

        Migrator::up(&store.db, None)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to run migrations: {e}")))?;

        log::info!("SQLite store ready at {}", db_path.display());
        Ok(store)
    }
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> CoreResult<DateTime<Utc>> {
    parse_rfc3339(value)
        .map_err(|e| CoreError::SerializationError(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(field: &str, value: &str) -> CoreResult<T> {
    serde_json::from_str(value)
        .map_err(|e| CoreError::SerializationError(format!("Invalid {field} JSON: {e}")))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> CoreResult<String> {
    serde_json::to_string(value).map_err(|e| CoreError::SerializationError(e.to_string()))
}

//! Applied-migration markers stored in the graph.
//!
//! One `:DataMigration` node exists per applied (application, migration)
//! pair. Every operation opens its own session and closes it again.

use crate::graph::{params, run_query, GraphConnection, GraphError};
use crate::migration::MigrationId;
use crate::utils::now_iso;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const SELECT_STATUS: &str = "MATCH (m:DataMigration {app: $appName}) \
RETURN m.app AS app, m.migration AS migration, m.createdAt AS createdAt";

pub const INSERT_MARKER: &str = "CREATE (m:DataMigration \
{app: $appName, migration: $migration, createdAt: $createdAt})";

pub const DELETE_MARKER: &str =
    "MATCH (m:DataMigration {app: $appName, migration: $migration}) DELETE m";

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Graph error: {0}")]
    GraphError(#[from] GraphError),

    #[error("Malformed migration record: {0}")]
    RecordError(#[from] serde_json::Error),
}

/// A persisted "this migration is applied" marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub app: String,
    pub migration: MigrationId,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Reads and writes migration markers
#[derive(Clone)]
pub struct StatusStore {
    connection: Arc<dyn GraphConnection>,
}

impl StatusStore {
    pub fn new(connection: Arc<dyn GraphConnection>) -> Self {
        Self { connection }
    }

    /// Applied migrations for an app, sorted ascending by identifier.
    pub async fn get_status(&self, app: &str) -> Result<Vec<MigrationRecord>, StatusError> {
        let result = run_query(
            self.connection.as_ref(),
            SELECT_STATUS,
            params([("appName", app)]),
        )
        .await?;

        let mut records = result
            .records
            .into_iter()
            .map(|r| serde_json::from_value::<MigrationRecord>(Value::Object(r)))
            .collect::<Result<Vec<_>, _>>()?;

        records.sort_by(|a, b| a.migration.cmp(&b.migration));
        Ok(records)
    }

    /// Record a migration as applied.
    ///
    /// Not idempotent: callers must not record the same migration twice.
    pub async fn record_applied(&self, app: &str, id: &MigrationId) -> Result<(), StatusError> {
        debug!(app, migration = %id, "Recording migration");
        run_query(
            self.connection.as_ref(),
            INSERT_MARKER,
            params([
                ("appName", app.to_string()),
                ("migration", id.to_string()),
                ("createdAt", now_iso()),
            ]),
        )
        .await?;
        Ok(())
    }

    /// Remove a migration's marker. Missing markers are ignored.
    pub async fn record_reverted(&self, app: &str, id: &MigrationId) -> Result<(), StatusError> {
        debug!(app, migration = %id, "Removing migration record");
        run_query(
            self.connection.as_ref(),
            DELETE_MARKER,
            params([("appName", app), ("migration", id.as_str())]),
        )
        .await?;
        Ok(())
    }
}

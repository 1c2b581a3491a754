//! Types for the migration system.

use super::loader::LoadFailure;
use crate::catalog::CatalogError;
use crate::graph::{GraphConnection, GraphError};
use crate::status::StatusError;
use crate::utils::IDENTIFIER_WIDTH;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reserved target token meaning "revert everything".
pub const ZERO_TARGET: &str = "zero";

static TARGET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+$").expect("target pattern is valid"));

/// Error types for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    #[error("Status error: {0}")]
    StatusError(#[from] StatusError),

    #[error("Invalid target '{0}': expected digits or 'zero'")]
    InvalidTarget(String),

    #[error("{} migration script(s) failed to load: {}", .0.len(), format_failures(.0))]
    LoadFailed(Vec<LoadFailure>),

    #[error("Migration {id} of {app} failed after {applied} applied: {source}")]
    ExecutionFailed {
        app: String,
        id: MigrationId,
        applied: usize,
        #[source]
        source: ScriptError,
    },

    /// The script of `id` ran but its marker could not be written or removed.
    #[error("Migration {id} of {app} ran but was not recorded after {applied} applied: {source}")]
    RecordFailed {
        app: String,
        id: MigrationId,
        applied: usize,
        #[source]
        source: StatusError,
    },
}

impl MigrationError {
    /// Migrations whose scripts ran before the error stopped the run.
    ///
    /// An unrecorded migration still changed the database and is counted.
    pub fn applied_count(&self) -> usize {
        match self {
            MigrationError::ExecutionFailed { applied, .. } => *applied,
            MigrationError::RecordFailed { applied, .. } => *applied + 1,
            _ => 0,
        }
    }
}

fn format_failures(failures: &[LoadFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error raised by a script's forward or backward operation.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Graph error: {0}")]
    GraphError(#[from] GraphError),

    #[error("{0}")]
    Failed(String),
}

/// Identifier of a migration within an application ("0001").
///
/// Identifiers compare as strings, so "10" sorts before "9". Keep widths
/// uniform across an application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId(String);

impl MigrationId {
    /// Wrap an identifier exactly as found in a file name or marker.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Zero-pad a digit string to the canonical width.
    ///
    /// Longer inputs are kept verbatim.
    pub fn normalize(digits: &str) -> Self {
        Self(format!("{:0>width$}", digits, width = IDENTIFIER_WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MigrationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the caller wants an application to end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The newest migration file.
    Latest,
    /// Before the first migration (everything reverted).
    Zero,
    /// A specific migration.
    Id(MigrationId),
}

impl Target {
    /// Parse an optional target token: absent, `"zero"`, or digits.
    pub fn parse(token: Option<&str>) -> Result<Self, MigrationError> {
        match token {
            None => Ok(Target::Latest),
            Some(ZERO_TARGET) => Ok(Target::Zero),
            Some(s) if TARGET_PATTERN.is_match(s) => Ok(Target::Id(MigrationId::normalize(s))),
            Some(s) => Err(MigrationError::InvalidTarget(s.to_string())),
        }
    }
}

/// A single migration script.
///
/// Each script changes the database going forward and can undo that change
/// going backward. Both operations receive the live connection.
#[async_trait]
pub trait MigrationScript: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Apply the migration.
    async fn forward(&self, connection: &dyn GraphConnection) -> Result<(), ScriptError>;

    /// Revert the migration.
    async fn backward(&self, connection: &dyn GraphConnection) -> Result<(), ScriptError>;
}

/// Direction of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    Forward,
    Backward,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Forward => f.write_str("forward"),
            MigrationDirection::Backward => f.write_str("backward"),
        }
    }
}

/// How a run of one application ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Nothing to do.
    UpToDate,
    /// At least one migration was applied or reverted.
    Migrated,
    /// The database records a migration newer than any file.
    Diverged {
        db_tip: MigrationId,
        files_tip: MigrationId,
    },
}

/// Result of running one application.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub app: String,
    /// Newest applied migration before the run.
    pub from: Option<MigrationId>,
    /// Newest applied migration after the run.
    pub to: Option<MigrationId>,
    pub direction: Option<MigrationDirection>,
    /// Migrations applied (forward) or reverted (backward), in run order.
    pub applied: Vec<MigrationId>,
    pub outcome: MigrationOutcome,
}

impl MigrationResult {
    pub(crate) fn unchanged(app: &str, tip: Option<MigrationId>, outcome: MigrationOutcome) -> Self {
        Self {
            app: app.to_string(),
            from: tip.clone(),
            to: tip,
            direction: None,
            applied: Vec::new(),
            outcome,
        }
    }

    /// Number of migrations applied or reverted.
    pub fn count(&self) -> usize {
        self.applied.len()
    }
}

/// An application that could not be migrated during `run_all`.
#[derive(Debug)]
pub struct AppFailure {
    pub app: String,
    pub error: MigrationError,
}

/// Result of running every application.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<MigrationResult>,
    pub failures: Vec<AppFailure>,
}

impl RunSummary {
    /// Total migrations applied, including those applied before a failure.
    pub fn applied_count(&self) -> usize {
        let succeeded: usize = self.results.iter().map(MigrationResult::count).sum();
        let partial: usize = self.failures.iter().map(|f| f.error.applied_count()).sum();
        succeeded + partial
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pads_to_width() {
        assert_eq!(MigrationId::normalize("3").as_str(), "0003");
        assert_eq!(MigrationId::normalize("0042").as_str(), "0042");
        assert_eq!(MigrationId::normalize("12345").as_str(), "12345");
    }

    #[test]
    fn test_ids_compare_as_strings() {
        assert!(MigrationId::new("10") < MigrationId::new("9"));
        assert!(MigrationId::new("0009") < MigrationId::new("0010"));
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(Target::parse(None).unwrap(), Target::Latest);
        assert_eq!(Target::parse(Some("zero")).unwrap(), Target::Zero);
        assert_eq!(
            Target::parse(Some("2")).unwrap(),
            Target::Id(MigrationId::new("0002"))
        );
    }

    #[test]
    fn test_parse_invalid_target() {
        for bad in ["fake", "", "-1", "1a", " 1", "ZERO"] {
            let result = Target::parse(Some(bad));
            assert!(
                matches!(result, Err(MigrationError::InvalidTarget(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_summary_counts_partial_runs() {
        let mut summary = RunSummary::default();
        summary.results.push(MigrationResult {
            app: "actors".to_string(),
            from: None,
            to: Some(MigrationId::new("0002")),
            direction: Some(MigrationDirection::Forward),
            applied: vec![MigrationId::new("0001"), MigrationId::new("0002")],
            outcome: MigrationOutcome::Migrated,
        });
        summary.failures.push(AppFailure {
            app: "movies".to_string(),
            error: MigrationError::ExecutionFailed {
                app: "movies".to_string(),
                id: MigrationId::new("0003"),
                applied: 1,
                source: ScriptError::Failed("boom".to_string()),
            },
        });

        assert_eq!(summary.applied_count(), 3);
        assert!(!summary.is_success());
    }
}

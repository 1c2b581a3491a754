//! Migration engine.
//!
//! This module decides which migration scripts to run for an application
//! and runs them against the graph.
//!
//! # Overview
//!
//! - Each application directory holds numbered scripts (`0001_add_actors.toml`)
//! - Applied migrations are tracked by markers in the database (see [`crate::status`])
//! - `get_migration_path` compares the files with the markers and picks the
//!   ordered scripts that reach the target, forward or backward
//! - The `Migrator` loads every selected script up front, then applies them
//!   one by one and records each as it succeeds
//! - A failing script stops the run; earlier migrations are not rolled back
//!
//! # Usage
//!
//! ```ignore
//! let migrator = Migrator::new(dir, Arc::new(graph), Arc::new(CypherScriptLoader::new()));
//! let result = migrator.run_app("actors", Some("3")).await?;
//! ```

mod executor;
mod loader;
mod plan;
mod types;

pub use executor::Migrator;
pub use loader::{CypherScript, CypherScriptLoader, LoadFailure, ScriptLoader};
pub use plan::{get_migration_path, MigrationPlan};
pub use types::{
    AppFailure, MigrationDirection, MigrationError, MigrationId, MigrationOutcome,
    MigrationResult, MigrationScript, RunSummary, ScriptError, Target, ZERO_TARGET,
};

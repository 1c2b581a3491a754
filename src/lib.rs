pub mod catalog;
pub mod config;
pub mod graph;
pub mod migration;
pub mod setup;
pub mod status;
pub mod utils;

// Re-export commonly used types
pub use catalog::{list_applications, list_migration_files, CatalogError, MigrationFileEntry};
pub use config::{read_config, ConfigError, ConnectionSettings, DriverConfig};
pub use graph::{GraphConnection, GraphError, GraphSession, HttpGraph, MemoryGraph, QueryResult};
pub use migration::{
    CypherScriptLoader, LoadFailure, MigrationDirection, MigrationError, MigrationId,
    MigrationOutcome, MigrationResult, MigrationScript, Migrator, RunSummary, ScriptError,
    ScriptLoader, Target,
};
pub use setup::{setup, SetupError};
pub use status::{MigrationRecord, StatusError, StatusStore};

use std::path::{Path, PathBuf};

/// Default migrations root used by the CLI
pub const DEFAULT_MIGRATIONS_DIR: &str = "./datamigrations";

/// The name of the driver configuration file inside the migrations root
pub const CONFIG_FILE: &str = "configuration.toml";

/// Extension of migration script files
pub const SCRIPT_EXTENSION: &str = "toml";

/// Canonical width of a migration identifier ("0001")
pub const IDENTIFIER_WIDTH: usize = 4;

/// Get the path to the driver configuration file
pub fn get_config_path(migrations_dir: &Path) -> PathBuf {
    migrations_dir.join(CONFIG_FILE)
}

/// Get the path to an application directory
pub fn get_app_path(migrations_dir: &Path, app: &str) -> PathBuf {
    migrations_dir.join(app)
}

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

use crate::utils::get_config_path;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Migrations directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Driver configuration not found at {0}")]
    ConfigNotFound(String),
}

fn default_url() -> String {
    "http://localhost:7474".to_string()
}

fn default_database() -> String {
    "neo4j".to_string()
}

/// Graph database connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Base URL of the HTTP API
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            database: default_database(),
            user: Some("neo4j".to_string()),
            password: Some("neo4j".to_string()),
        }
    }
}

/// Driver configuration stored in `configuration.toml` at the migrations root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub connection: ConnectionSettings,
}

/// Read the driver configuration for a migrations directory.
///
/// Both the directory and its configuration file must exist.
pub async fn read_config(migrations_dir: &Path) -> Result<DriverConfig, ConfigError> {
    if !migrations_dir.is_dir() {
        return Err(ConfigError::DirectoryNotFound(
            migrations_dir.display().to_string(),
        ));
    }

    let config_path = get_config_path(migrations_dir);
    if !config_path.exists() {
        return Err(ConfigError::ConfigNotFound(config_path.display().to_string()));
    }

    let content = fs::read_to_string(&config_path).await?;
    let config: DriverConfig = toml::from_str(&content)?;
    Ok(config)
}

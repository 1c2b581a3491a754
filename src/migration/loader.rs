//! Loading migration scripts from disk.

use super::types::{MigrationScript, ScriptError};
use crate::graph::{run_query, GraphConnection, Params};
use crate::utils::SCRIPT_EXTENSION;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Why a script could not be used.
#[derive(Error, Debug)]
pub enum LoadFailure {
    /// The file could not be read or parsed.
    #[error("failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    /// The file parsed but is missing a required operation.
    #[error("{path} does not define '{missing}'")]
    Contract { path: String, missing: &'static str },
}

/// Turns a migration file into a runnable script.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    /// Extension of the files this loader understands, without the dot.
    fn extension(&self) -> &str;

    /// Load the script at `path`.
    async fn load(&self, path: &Path) -> Result<Arc<dyn MigrationScript>, LoadFailure>;
}

/// Loads TOML files holding Cypher statements:
///
/// ```toml
/// name = "add actors"
/// forward = ["CREATE (:Actor {name: 'Keanu Reeves'})"]
/// backward = "MATCH (a:Actor) DETACH DELETE a"
/// ```
#[derive(Debug, Clone, Default)]
pub struct CypherScriptLoader;

impl CypherScriptLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse script source. `fallback_name` is used when the file has no `name`.
    pub fn parse(
        path: &str,
        content: &str,
        fallback_name: &str,
    ) -> Result<CypherScript, LoadFailure> {
        let file: ScriptFile = toml::from_str(content).map_err(|e| LoadFailure::Load {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let forward = file.forward.ok_or_else(|| LoadFailure::Contract {
            path: path.to_string(),
            missing: "forward",
        })?;
        let backward = file.backward.ok_or_else(|| LoadFailure::Contract {
            path: path.to_string(),
            missing: "backward",
        })?;

        Ok(CypherScript {
            name: file.name.unwrap_or_else(|| fallback_name.to_string()),
            forward: forward.into_vec(),
            backward: backward.into_vec(),
        })
    }
}

#[async_trait]
impl ScriptLoader for CypherScriptLoader {
    fn extension(&self) -> &str {
        SCRIPT_EXTENSION
    }

    async fn load(&self, path: &Path) -> Result<Arc<dyn MigrationScript>, LoadFailure> {
        let shown = path.display().to_string();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| LoadFailure::Load {
                path: shown.clone(),
                reason: e.to_string(),
            })?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let script = Self::parse(&shown, &content, &stem)?;
        debug!(path = %shown, name = %script.name, "Loaded migration script");
        Ok(Arc::new(script))
    }
}

#[derive(Deserialize)]
struct ScriptFile {
    name: Option<String>,
    forward: Option<Statements>,
    backward: Option<Statements>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Statements {
    One(String),
    Many(Vec<String>),
}

impl Statements {
    fn into_vec(self) -> Vec<String> {
        match self {
            Statements::One(s) => vec![s],
            Statements::Many(v) => v,
        }
    }
}

/// A script made of Cypher statements, run one at a time in order.
#[derive(Debug, Clone)]
pub struct CypherScript {
    name: String,
    forward: Vec<String>,
    backward: Vec<String>,
}

impl CypherScript {
    async fn run_all(
        connection: &dyn GraphConnection,
        statements: &[String],
    ) -> Result<(), ScriptError> {
        for statement in statements {
            run_query(connection, statement, Params::new()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationScript for CypherScript {
    fn name(&self) -> &str {
        &self.name
    }

    async fn forward(&self, connection: &dyn GraphConnection) -> Result<(), ScriptError> {
        Self::run_all(connection, &self.forward).await
    }

    async fn backward(&self, connection: &dyn GraphConnection) -> Result<(), ScriptError> {
        Self::run_all(connection, &self.backward).await
    }
}

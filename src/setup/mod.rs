//! Scaffolding a fresh migrations directory.

use crate::config::ConnectionSettings;
use crate::utils::get_config_path;
use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Render error: {0}")]
    RenderError(#[from] handlebars::RenderError),

    #[error("Directory {0} already exists")]
    AlreadyExists(String),
}

/// Default driver configuration written by `setup`.
/// Placeholders: {{url}}, {{database}}, {{user}}, {{password}} (already TOML-quoted)
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Graph database driver configuration.
#
# Each subdirectory next to this file is an application; its migrations are
# files named like 0001_add_actors.toml holding `forward` and `backward`
# Cypher statements.

[connection]
url = {{url}}
database = {{database}}
{{#if user}}user = {{user}}
{{/if}}{{#if password}}password = {{password}}
{{/if}}"#;

#[derive(Serialize)]
struct ConfigTemplateContext {
    url: String,
    database: String,
    user: Option<String>,
    password: Option<String>,
}

fn quote(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

/// Render the configuration file for the given settings.
pub fn render_config(settings: &ConnectionSettings) -> Result<String, SetupError> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    let context = ConfigTemplateContext {
        url: quote(&settings.url),
        database: quote(&settings.database),
        user: settings.user.as_deref().map(quote),
        password: settings.password.as_deref().map(quote),
    };

    Ok(handlebars.render_template(DEFAULT_CONFIG_TEMPLATE, &context)?)
}

/// Create a migrations directory with a default driver configuration.
///
/// Refuses to touch a directory that already exists. Returns the path of the
/// written configuration file.
pub async fn setup(dir: &Path, settings: &ConnectionSettings) -> Result<PathBuf, SetupError> {
    info!(dir = %dir.display(), "Setting up data migrations");

    if dir.exists() {
        return Err(SetupError::AlreadyExists(dir.display().to_string()));
    }

    fs::create_dir_all(dir).await?;

    let config_path = get_config_path(dir);
    fs::write(&config_path, render_config(settings)?).await?;

    info!(
        dir = %dir.display(),
        "Added migrations directory and default configuration"
    );
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;

    #[test]
    fn test_rendered_config_parses_back() {
        let settings = ConnectionSettings {
            url: "http://graph:7474".to_string(),
            database: "movies".to_string(),
            user: Some("admin".to_string()),
            password: Some("p\"ss".to_string()),
        };

        let content = render_config(&settings).unwrap();
        let config: DriverConfig = toml::from_str(&content).unwrap();
        assert_eq!(config.connection, settings);
    }

    #[test]
    fn test_rendered_config_without_credentials() {
        let settings = ConnectionSettings {
            user: None,
            password: None,
            ..Default::default()
        };

        let content = render_config(&settings).unwrap();
        assert!(!content.contains("user ="));
        let config: DriverConfig = toml::from_str(&content).unwrap();
        assert_eq!(config.connection, settings);
    }
}

#![allow(dead_code)]

use graph_migrate::{CypherScriptLoader, MemoryGraph, Migrator};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;

/// Create a temporary migrations root
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Should create temp dir")
}

/// Write a migration file into an application directory, creating it if needed
pub async fn write_migration(root: &Path, app: &str, file_name: &str, content: &str) {
    let app_dir = root.join(app);
    fs::create_dir_all(&app_dir)
        .await
        .expect("Should create app dir");
    fs::write(app_dir.join(file_name), content)
        .await
        .expect("Should write migration");
}

/// A well-formed script creating and removing nodes with `label`
pub fn script(label: &str) -> String {
    format!(
        "name = \"add {label}\"\nforward = \"CREATE (:{label})\"\nbackward = \"MATCH (n:{label}) DELETE n\"\n"
    )
}

/// The `actors` application: four migrations 0001..0004
pub async fn init_actors_app(root: &Path) {
    for (file, label) in [
        ("0001_add_actors.toml", "Actor"),
        ("0002_add_movies.toml", "Movie"),
        ("0003_add_directors.toml", "Director"),
        ("0004_add_venues.toml", "Venue"),
    ] {
        write_migration(root, "actors", file, &script(label)).await;
    }
}

/// A migrator over `root` backed by `graph`
pub fn migrator(root: &Path, graph: &MemoryGraph) -> Migrator {
    Migrator::new(
        root,
        Arc::new(graph.clone()),
        Arc::new(CypherScriptLoader::new()),
    )
}

/// Applied identifiers for an app, via the migrator's status
pub async fn status_ids(migrator: &Migrator, app: &str) -> Vec<String> {
    migrator
        .status(app)
        .await
        .expect("Should read status")
        .into_iter()
        .map(|r| r.migration.to_string())
        .collect()
}

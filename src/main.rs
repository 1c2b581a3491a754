use anyhow::bail;
use clap::Parser;
use graph_migrate::{
    read_config, setup, ConnectionSettings, CypherScriptLoader, HttpGraph, MigrationOutcome,
    Migrator,
};
use graph_migrate::utils::DEFAULT_MIGRATIONS_DIR;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Graph Migrate - run numbered data migrations against a graph database
///
/// With no arguments every application is migrated to its newest migration.
/// With APP only that application is migrated, and with APP TARGET it is moved
/// forward or backward to TARGET (a migration number, or "zero").
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scaffold a new migrations directory and exit
    #[arg(short, long)]
    setup: bool,

    /// Path to the data migrations directory
    #[arg(short, long, env = "GRAPH_MIGRATE_DIR", default_value = DEFAULT_MIGRATIONS_DIR)]
    dir: PathBuf,

    /// Application to migrate
    app: Option<String>,

    /// Migration number to migrate the application to, or "zero"
    target: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    if args.setup {
        let config_path = setup(&args.dir, &ConnectionSettings::default()).await?;
        info!("Edit {} to point at your database", config_path.display());
        return Ok(());
    }

    let config = read_config(&args.dir).await?;
    let graph = HttpGraph::new(&config.connection)?;
    info!(endpoint = graph.endpoint(), "Connecting to graph database");

    let migrator = Migrator::new(
        &args.dir,
        Arc::new(graph),
        Arc::new(CypherScriptLoader::new()),
    );

    match args.app {
        None => {
            let summary = migrator.run_all().await?;
            if !summary.is_success() {
                for failure in &summary.failures {
                    warn!(app = %failure.app, error = %failure.error, "Application not migrated");
                }
                bail!(
                    "{} application(s) failed to migrate",
                    summary.failures.len()
                );
            }
        }
        Some(app) => {
            let result = migrator.run_app(&app, args.target.as_deref()).await?;
            match result.outcome {
                MigrationOutcome::Diverged { .. } => {
                    info!(app = %app, "Database is ahead of the files; fix the files or revert manually")
                }
                _ => info!(app = %app, count = result.count(), "Done"),
            }
        }
    }

    Ok(())
}

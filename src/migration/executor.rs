//! Migration executor for running migrations.

use super::loader::ScriptLoader;
use super::plan::{get_migration_path, MigrationPlan};
use super::types::{
    AppFailure, MigrationDirection, MigrationError, MigrationOutcome, MigrationResult,
    MigrationScript, RunSummary, Target,
};
use crate::catalog::{list_applications, list_migration_files, MigrationFileEntry};
use crate::graph::GraphConnection;
use crate::status::{MigrationRecord, StatusStore};
use crate::utils::get_app_path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A selected migration with its loaded script.
struct PlannedMigration {
    entry: MigrationFileEntry,
    script: Arc<dyn MigrationScript>,
}

/// Runs the migrations of a migrations directory against a graph.
///
/// Each application is a subdirectory of the migrations directory. The
/// executor reconciles its files with the markers in the database and runs
/// the scripts needed to reach the requested target.
pub struct Migrator {
    migrations_dir: PathBuf,
    connection: Arc<dyn GraphConnection>,
    loader: Arc<dyn ScriptLoader>,
    store: StatusStore,
}

impl Migrator {
    pub fn new(
        migrations_dir: impl Into<PathBuf>,
        connection: Arc<dyn GraphConnection>,
        loader: Arc<dyn ScriptLoader>,
    ) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            store: StatusStore::new(Arc::clone(&connection)),
            connection,
            loader,
        }
    }

    /// Applied migrations of an application, oldest first.
    pub async fn status(&self, app: &str) -> Result<Vec<MigrationRecord>, MigrationError> {
        Ok(self.store.get_status(app).await?)
    }

    /// Bring every application up to its newest migration.
    ///
    /// Applications run one after another. A failing application is
    /// recorded in the summary and does not stop the others.
    pub async fn run_all(&self) -> Result<RunSummary, MigrationError> {
        let apps = list_applications(&self.migrations_dir)?;
        info!(count = apps.len(), "Migrating all applications");

        let mut summary = RunSummary::default();
        for app in apps {
            match self.run_app(&app, None).await {
                Ok(result) => summary.results.push(result),
                Err(e) => {
                    error!(app = %app, error = %e, "Application migration failed");
                    summary.failures.push(AppFailure { app, error: e });
                }
            }
        }

        info!(
            applied = summary.applied_count(),
            failed = summary.failures.len(),
            "Finished migrating all applications"
        );
        Ok(summary)
    }

    /// Migrate one application to `target`.
    ///
    /// `target` is `None` for the newest migration, `"zero"` to revert
    /// everything, or a migration number such as `"3"` or `"0003"`.
    ///
    /// Every selected script is loaded before anything runs; if any fails to
    /// load, nothing is applied. Scripts then run one at a time and each is
    /// recorded as soon as it succeeds. A failing script stops the run and
    /// the migrations already applied stay applied.
    pub async fn run_app(
        &self,
        app: &str,
        target: Option<&str>,
    ) -> Result<MigrationResult, MigrationError> {
        let files = list_migration_files(
            &get_app_path(&self.migrations_dir, app),
            self.loader.extension(),
        )?;
        let applied: Vec<_> = self
            .store
            .get_status(app)
            .await?
            .into_iter()
            .map(|r| r.migration)
            .collect();
        let db_tip = applied.last().cloned();

        if files.is_empty() {
            info!(app, "No migrations found, nothing to do");
            return Ok(MigrationResult::unchanged(app, db_tip, MigrationOutcome::UpToDate));
        }

        let target = Target::parse(target)?;

        let (direction, steps) = match get_migration_path(&files, &applied, &target) {
            MigrationPlan::NoMigrations | MigrationPlan::UpToDate => {
                info!(app, "Already up to date");
                return Ok(MigrationResult::unchanged(app, db_tip, MigrationOutcome::UpToDate));
            }
            MigrationPlan::Diverged { db_tip, files_tip } => {
                warn!(
                    app,
                    db_tip = %db_tip,
                    files_tip = %files_tip,
                    "Database is ahead of the migration files, nothing applied"
                );
                return Ok(MigrationResult::unchanged(
                    app,
                    Some(db_tip.clone()),
                    MigrationOutcome::Diverged { db_tip, files_tip },
                ));
            }
            MigrationPlan::Apply { direction, steps } => (direction, steps),
        };

        info!(
            app,
            from = db_tip.as_ref().map_or("none", |id| id.as_str()),
            %direction,
            count = steps.len(),
            "Starting migration"
        );

        let batch = self.load_scripts(steps).await?;

        let mut done = Vec::new();
        for planned in &batch {
            let id = &planned.entry.id;
            info!(
                app,
                migration = %id,
                script = planned.script.name(),
                %direction,
                "Applying migration"
            );

            let result = match direction {
                MigrationDirection::Forward => planned.script.forward(self.connection.as_ref()).await,
                MigrationDirection::Backward => planned.script.backward(self.connection.as_ref()).await,
            };

            if let Err(e) = result {
                error!(app, migration = %id, error = %e, "Migration failed");
                return Err(MigrationError::ExecutionFailed {
                    app: app.to_string(),
                    id: id.clone(),
                    applied: done.len(),
                    source: e,
                });
            }

            let recorded = match direction {
                MigrationDirection::Forward => self.store.record_applied(app, id).await,
                MigrationDirection::Backward => self.store.record_reverted(app, id).await,
            };

            if let Err(e) = recorded {
                error!(app, migration = %id, error = %e, "Migration ran but could not be recorded");
                return Err(MigrationError::RecordFailed {
                    app: app.to_string(),
                    id: id.clone(),
                    applied: done.len(),
                    source: e,
                });
            }
            done.push(id.clone());
        }

        let to = match direction {
            MigrationDirection::Forward => done.last().cloned().or(db_tip.clone()),
            MigrationDirection::Backward => applied
                .iter()
                .filter(|id| !done.contains(id))
                .last()
                .cloned(),
        };

        info!(app, count = done.len(), "Migration completed successfully");

        Ok(MigrationResult {
            app: app.to_string(),
            from: db_tip,
            to,
            direction: Some(direction),
            applied: done,
            outcome: MigrationOutcome::Migrated,
        })
    }

    /// Load every selected script, or report all the ones that failed.
    async fn load_scripts(
        &self,
        steps: Vec<MigrationFileEntry>,
    ) -> Result<Vec<PlannedMigration>, MigrationError> {
        let mut batch = Vec::with_capacity(steps.len());
        let mut failures = Vec::new();

        for entry in steps {
            match self.loader.load(&entry.path).await {
                Ok(script) => batch.push(PlannedMigration { entry, script }),
                Err(failure) => {
                    error!(file = %entry.file_name, error = %failure, "Could not load migration");
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            Ok(batch)
        } else {
            Err(MigrationError::LoadFailed(failures))
        }
    }
}

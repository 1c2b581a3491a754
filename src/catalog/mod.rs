//! Discovering applications and their migration files on disk.

use crate::migration::MigrationId;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Directory not found: {0}")]
    NotFound(String),

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Invalid file pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Migration identifier {id} is used by more than one file: {}", .files.join(", "))]
    DuplicateIdentifier { id: MigrationId, files: Vec<String> },
}

/// A migration file found in an application directory
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationFileEntry {
    pub id: MigrationId,
    pub file_name: String,
    pub path: PathBuf,
}

/// List the applications under a migrations root.
///
/// Every immediate subdirectory is an application. Names are returned sorted
/// so runs are reproducible.
pub fn list_applications(root: &Path) -> Result<Vec<String>, CatalogError> {
    ensure_dir(root)?;

    let mut apps = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => apps.push(name.to_string()),
            None => warn!(
                dir = %entry.path().display(),
                "Skipping application directory with a non UTF-8 name"
            ),
        }
    }

    Ok(apps)
}

/// List the migration files of one application, sorted by identifier.
///
/// Only files named `<digits>_<name>.<extension>` count; anything else,
/// including subdirectories, is ignored.
pub fn list_migration_files(
    app_dir: &Path,
    extension: &str,
) -> Result<Vec<MigrationFileEntry>, CatalogError> {
    ensure_dir(app_dir)?;

    let pattern = Regex::new(&format!(r"^(\d+)_\S+\.{}$", regex::escape(extension)))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(app_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            warn!(
                file = %entry.path().display(),
                "Skipping migration file with a non UTF-8 name"
            );
            continue;
        };
        let Some(captures) = pattern.captures(file_name) else {
            continue;
        };

        files.push(MigrationFileEntry {
            id: MigrationId::new(&captures[1]),
            file_name: file_name.to_string(),
            path: entry.path().to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.file_name.cmp(&b.file_name)));

    // Identifiers must be unique within an application
    if let Some(pair) = files.windows(2).find(|w| w[0].id == w[1].id) {
        let id = pair[0].id.clone();
        let files = files
            .iter()
            .filter(|f| f.id == id)
            .map(|f| f.file_name.clone())
            .collect();
        return Err(CatalogError::DuplicateIdentifier { id, files });
    }

    let widths: BTreeSet<usize> = files.iter().map(|f| f.id.as_str().len()).collect();
    if widths.len() > 1 {
        warn!(
            dir = %app_dir.display(),
            ?widths,
            "Migration identifiers have mixed widths; they are ordered as strings"
        );
    }

    Ok(files)
}

fn ensure_dir(path: &Path) -> Result<(), CatalogError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(CatalogError::NotFound(path.display().to_string()))
    }
}

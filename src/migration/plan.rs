//! Deciding which migrations to run.

use super::types::{MigrationDirection, MigrationId, Target};
use crate::catalog::MigrationFileEntry;

/// What a run has to do to reach its target.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationPlan {
    /// No migration files exist.
    NoMigrations,
    /// The database records a migration newer than the newest file.
    Diverged {
        db_tip: MigrationId,
        files_tip: MigrationId,
    },
    /// Already at the target.
    UpToDate,
    /// Run `steps` in order.
    Apply {
        direction: MigrationDirection,
        steps: Vec<MigrationFileEntry>,
    },
}

/// Compute the ordered migrations that move `applied` to `target`.
///
/// `files` and `applied` must be sorted ascending. Tips are compared as
/// optional identifiers, where `None` (nothing applied, or the zero target)
/// sorts before every real identifier.
pub fn get_migration_path(
    files: &[MigrationFileEntry],
    applied: &[MigrationId],
    target: &Target,
) -> MigrationPlan {
    let db_tip = applied.last();
    let files_tip = match files.last() {
        Some(entry) => &entry.id,
        None => return MigrationPlan::NoMigrations,
    };

    let target = match target {
        Target::Latest => Some(files_tip),
        Target::Zero => None,
        Target::Id(id) => Some(id),
    };

    if let Some(tip) = db_tip {
        if tip > files_tip {
            return MigrationPlan::Diverged {
                db_tip: tip.clone(),
                files_tip: files_tip.clone(),
            };
        }
    }

    let direction = match target.cmp(&db_tip) {
        std::cmp::Ordering::Equal => return MigrationPlan::UpToDate,
        std::cmp::Ordering::Greater => MigrationDirection::Forward,
        std::cmp::Ordering::Less => MigrationDirection::Backward,
    };

    let steps: Vec<MigrationFileEntry> = match direction {
        MigrationDirection::Forward => files
            .iter()
            .filter(|e| Some(&e.id) > db_tip && Some(&e.id) <= target)
            .cloned()
            .collect(),
        MigrationDirection::Backward => files
            .iter()
            .rev()
            .filter(|e| Some(&e.id) <= db_tip && Some(&e.id) > target)
            .cloned()
            .collect(),
    };

    // e.g. a target past the files tip while already at the tip
    if steps.is_empty() {
        return MigrationPlan::UpToDate;
    }

    MigrationPlan::Apply { direction, steps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn files(ids: &[&str]) -> Vec<MigrationFileEntry> {
        ids.iter()
            .map(|id| {
                let file_name = format!("{}_step.toml", id);
                MigrationFileEntry {
                    id: MigrationId::new(*id),
                    path: PathBuf::from(&file_name),
                    file_name,
                }
            })
            .collect()
    }

    fn ids(ids: &[&str]) -> Vec<MigrationId> {
        ids.iter().map(|id| MigrationId::new(*id)).collect()
    }

    fn steps(plan: &MigrationPlan) -> (MigrationDirection, Vec<&str>) {
        match plan {
            MigrationPlan::Apply { direction, steps } => {
                (*direction, steps.iter().map(|e| e.id.as_str()).collect())
            }
            other => panic!("expected steps, got {:?}", other),
        }
    }

    const ALL: [&str; 4] = ["0001", "0002", "0003", "0004"];

    #[test]
    fn test_no_files() {
        let plan = get_migration_path(&[], &ids(&["0001"]), &Target::Latest);
        assert_eq!(plan, MigrationPlan::NoMigrations);
    }

    #[test]
    fn test_forward_all_from_empty() {
        let plan = get_migration_path(&files(&ALL), &[], &Target::Latest);
        assert_eq!(
            steps(&plan),
            (MigrationDirection::Forward, ALL.to_vec())
        );
    }

    #[test]
    fn test_up_to_date_at_tip() {
        let plan = get_migration_path(&files(&ALL), &ids(&ALL), &Target::Latest);
        assert_eq!(plan, MigrationPlan::UpToDate);
    }

    #[test]
    fn test_zero_with_nothing_applied_is_up_to_date() {
        let plan = get_migration_path(&files(&ALL), &[], &Target::Zero);
        assert_eq!(plan, MigrationPlan::UpToDate);
    }

    #[test]
    fn test_backward_to_zero_is_descending() {
        let plan = get_migration_path(&files(&ALL), &ids(&ALL), &Target::Zero);
        assert_eq!(
            steps(&plan),
            (MigrationDirection::Backward, vec!["0004", "0003", "0002", "0001"])
        );
    }

    #[test]
    fn test_forward_to_target() {
        let target = Target::Id(MigrationId::new("0003"));
        let plan = get_migration_path(&files(&ALL), &ids(&["0001"]), &target);
        assert_eq!(
            steps(&plan),
            (MigrationDirection::Forward, vec!["0002", "0003"])
        );
    }

    #[test]
    fn test_backward_to_target() {
        let target = Target::Id(MigrationId::new("0001"));
        let plan = get_migration_path(&files(&ALL), &ids(&["0001", "0002", "0003"]), &target);
        assert_eq!(
            steps(&plan),
            (MigrationDirection::Backward, vec!["0003", "0002"])
        );
    }

    #[test]
    fn test_target_past_files_tip_stops_at_tip() {
        let target = Target::Id(MigrationId::new("0009"));
        let plan = get_migration_path(&files(&ALL), &ids(&["0001", "0002"]), &target);
        assert_eq!(
            steps(&plan),
            (MigrationDirection::Forward, vec!["0003", "0004"])
        );
    }

    #[test]
    fn test_target_past_tip_when_at_tip_is_up_to_date() {
        let target = Target::Id(MigrationId::new("0009"));
        let plan = get_migration_path(&files(&ALL), &ids(&ALL), &target);
        assert_eq!(plan, MigrationPlan::UpToDate);
    }

    #[test]
    fn test_target_below_first_file_with_nothing_applied() {
        let target = Target::Id(MigrationId::new("0000"));
        let plan = get_migration_path(&files(&ALL), &[], &target);
        assert_eq!(plan, MigrationPlan::UpToDate);
    }

    #[test]
    fn test_db_ahead_of_files() {
        let plan = get_migration_path(
            &files(&["0001", "0002", "0003"]),
            &ids(&ALL),
            &Target::Latest,
        );
        assert_eq!(
            plan,
            MigrationPlan::Diverged {
                db_tip: MigrationId::new("0004"),
                files_tip: MigrationId::new("0003"),
            }
        );
    }

    #[test]
    fn test_string_ordering_is_preserved() {
        // "10" sorts before "9"
        let plan = get_migration_path(&files(&["10", "9"]), &ids(&["10"]), &Target::Latest);
        assert_eq!(steps(&plan), (MigrationDirection::Forward, vec!["9"]));
    }
}

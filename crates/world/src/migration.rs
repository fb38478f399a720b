//! One-shot migration of foreign-layout world folders.
//!
//! The foreign layout keeps every world as a sibling folder under one root,
//! with the auxiliary dimensions of the primary world stored as
//! `<level>_nether/DIM-1` and `<level>_the_end/DIM1`. The canonical layout
//! keeps every world directly under the save root, with the auxiliary
//! dimensions named `DIM-1` and `DIM1`.
//!
//! The foreign root lies outside any [`crate::WorldStorage`] root, so the
//! sweep works on the filesystem directly.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use worldhost_core::DimensionId;

use crate::{move_dir, StorageError};

/// File whose presence marks a foreign world folder.
pub const FOREIGN_MARKER_FILE: &str = "level.dat";

/// Outcome of a sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Canonical folder names created by the sweep, in migration order.
    pub migrated: Vec<String>,
    /// Candidates left alone because their destination already existed.
    pub skipped: Vec<String>,
    /// Candidates that failed with an I/O error.
    pub failed: Vec<String>,
}

/// Relocates foreign world folders into the canonical save root.
#[derive(Debug, Clone)]
pub struct LegacyMigration {
    foreign_root: PathBuf,
    saves_root: PathBuf,
    level_name: String,
}

impl LegacyMigration {
    /// Sweep `foreign_root` into `saves_root`; `level_name` names the primary world.
    pub fn new(
        foreign_root: impl Into<PathBuf>,
        saves_root: impl Into<PathBuf>,
        level_name: impl Into<String>,
    ) -> Self {
        Self {
            foreign_root: foreign_root.into(),
            saves_root: saves_root.into(),
            level_name: level_name.into(),
        }
    }

    /// Canonical folder name for a foreign folder name.
    pub fn canonical_name(&self, foreign: &str) -> String {
        let nether = format!("{}_nether", self.level_name);
        let end = format!("{}_the_end", self.level_name);
        let mapped = if foreign == nether {
            DimensionId::NETHER.legacy_folder_name()
        } else if foreign == end {
            DimensionId::END.legacy_folder_name()
        } else {
            None
        };
        mapped.map_or_else(|| foreign.to_string(), str::to_string)
    }

    /// Foreign world folders eligible for migration, sorted by path.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.foreign_root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(root = %self.foreign_root.display(), %err, "Cannot scan foreign save root");
                return Vec::new();
            }
        };
        let saves_root = canonical(&self.saves_root);
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir() && path.join(FOREIGN_MARKER_FILE).is_file())
            .filter(|path| {
                let path = canonical(path);
                !saves_root.starts_with(&path) && !path.starts_with(&saves_root)
            })
            .collect();
        candidates.sort();
        candidates
    }

    /// Run the sweep. Per-folder failures are logged and skipped.
    pub fn run(&self) -> MigrationReport {
        let mut report = MigrationReport::default();
        for dir in self.candidates() {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let target = self.canonical_name(&name);
            let destination = self.saves_root.join(&target);
            if destination.exists() {
                info!(
                    folder = %name,
                    destination = %destination.display(),
                    "Migration destination exists, skipping"
                );
                report.skipped.push(name);
                continue;
            }
            match self.migrate_folder(&dir, &target, &destination) {
                Ok(()) => {
                    info!(folder = %name, target = %target, "Migrated foreign world folder");
                    report.migrated.push(target);
                }
                Err(err) => {
                    error!(folder = %name, %err, "Failed to migrate foreign world folder");
                    report.failed.push(name);
                }
            }
        }
        report
    }

    fn migrate_folder(
        &self,
        dir: &Path,
        target: &str,
        destination: &Path,
    ) -> Result<(), StorageError> {
        let nested = dir.join(target);
        let own_name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if target != own_name && nested.is_dir() {
            merge_into(&nested, dir)?;
            fs::remove_dir_all(&nested).map_err(|err| StorageError::io(&nested, err))?;
        }
        move_dir(dir, destination)
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Move every entry of `from` into `into`, recursing where both sides hold a directory.
fn merge_into(from: &Path, into: &Path) -> Result<(), StorageError> {
    let entries = fs::read_dir(from).map_err(|err| StorageError::io(from, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| StorageError::io(from, err))?;
        let source = entry.path();
        let target = into.join(entry.file_name());
        if !target.exists() {
            fs::rename(&source, &target).map_err(|err| StorageError::io(&target, err))?;
        } else if source.is_dir() && target.is_dir() {
            merge_into(&source, &target)?;
        } else {
            warn!(path = %target.display(), "Keeping existing file during migration merge");
        }
    }
    Ok(())
}

// src/catalog/reconcile.rs

//! Post-reindex disk cleanup
//!
//! Runs after a new index is installed. Deletion is best effort: failures
//! are logged and counted, never propagated, since the installed index only
//! describes files that were present before cleanup started.

use super::is_hidden;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// What a cleanup pass removed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failures: usize,
}

impl CleanupReport {
    pub fn extend(&mut self, other: CleanupReport) {
        self.removed.extend(other.removed);
        self.failures += other.failures;
    }
}

/// Whether a directory directly holds at least one visible file
fn has_visible_files(dir: &Path) -> std::io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let visible = entry
            .file_name()
            .to_str()
            .is_some_and(|name| !is_hidden(name));
        if visible && entry.file_type()?.is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Path below `root` with `/` separators, as a ref name would be spelled
fn relative_ref(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Remove every directory holding files whose relative path is not a live ref
///
/// `is_live` answers whether a relative path such as `dev`, `mntm-005` or
/// `feature/login` names an existing branch, tag or release. Hidden
/// directories are left alone.
pub fn delete_unlinked_directories(main_dir: &Path, is_live: impl Fn(&str) -> bool) -> CleanupReport {
    let mut report = CleanupReport::default();
    let mut walker = WalkDir::new(main_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to walk {}: {}", main_dir.display(), e);
                report.failures += 1;
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name().to_str().is_none_or(is_hidden) {
            walker.skip_current_dir();
            continue;
        }

        let path = entry.path();
        match has_visible_files(path) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!("Failed to list {}: {}", path.display(), e);
                report.failures += 1;
                continue;
            }
        }

        let Some(rel) = relative_ref(main_dir, path) else {
            continue;
        };
        if is_live(&rel) {
            continue;
        }

        match fs::remove_dir_all(path) {
            Ok(()) => {
                info!("Deleting {} (no matching branch, tag or release)", path.display());
                report.removed.push(path.to_path_buf());
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                report.failures += 1;
            }
        }
        walker.skip_current_dir();
    }

    report
}

/// Remove empty top-level subdirectories of `main_dir`
pub fn delete_empty_directories(main_dir: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();
    let entries = match fs::read_dir(main_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list {}: {}", main_dir.display(), e);
            report.failures += 1;
            return report;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in {}: {}", main_dir.display(), e);
                report.failures += 1;
                continue;
            }
        };
        let name = entry.file_name();
        if name.to_str().is_none_or(is_hidden) {
            continue;
        }
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let is_empty = match fs::read_dir(&path) {
            Ok(mut contents) => contents.next().is_none(),
            Err(e) => {
                warn!("Failed to list {}: {}", path.display(), e);
                report.failures += 1;
                continue;
            }
        };
        if !is_empty {
            continue;
        }
        match fs::remove_dir(&path) {
            Ok(()) => {
                info!("Deleting empty directory {}", path.display());
                report.removed.push(path);
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                report.failures += 1;
            }
        }
    }

    report
}

// src/catalog/packs_catalog.rs

//! Asset pack catalog facade

use super::packs::{FileKind, build_catalog};
use super::reconcile::delete_empty_directories;
use super::{
    CatalogState, FilesRoot, Generations, ReindexReport, checked_file_name,
};
use crate::error::{Error, Result};
use crate::model::Catalog;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Pack catalog of one asset-pack directory
///
/// Packs are reconciled only by what parses; the sole cleanup is removing
/// empty pack directories.
pub struct PacksCatalog {
    directory: String,
    files: Arc<FilesRoot>,
    reindex_lock: Mutex<()>,
    catalog: Generations<Catalog>,
}

impl PacksCatalog {
    pub fn new(directory: impl Into<String>, files: Arc<FilesRoot>) -> Self {
        Self {
            directory: directory.into(),
            files,
            reindex_lock: Mutex::new(()),
            catalog: Generations::new(),
        }
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn state(&self) -> CatalogState {
        self.catalog.state()
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.current().tree
    }

    /// Rebuild the catalog from disk, then remove empty pack directories
    pub fn reindex(&self) -> Result<ReindexReport> {
        let _guard = self.reindex_lock.lock();

        let catalog = match build_catalog(&self.files, &self.directory) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("{} reindex failed: {}", self.directory, e);
                return Err(e);
            }
        };

        let entries = catalog.packs.len();
        let generation = self.catalog.install(catalog);
        info!("{} reindex OK (generation {})", self.directory, generation);

        let cleanup = delete_empty_directories(&self.files.dir(&self.directory));
        if cleanup.failures > 0 {
            error!(
                "{} cleanup finished with {} failures",
                self.directory, cleanup.failures
            );
        }

        Ok(ReindexReport {
            directory: self.directory.clone(),
            generation,
            entries,
            removed: cleanup.removed,
        })
    }

    /// Filesystem path of a download or preview file of a pack
    pub fn get_file_path(&self, pack: &str, file_type: &str, file_name: &str) -> Result<PathBuf> {
        let kind = FileKind::parse(file_type)?;
        let file_path = self
            .files
            .dir(&self.directory)
            .join(checked_file_name(pack)?)
            .join(kind.dir_name())
            .join(checked_file_name(file_name)?);
        if !file_path.is_file() {
            return Err(Error::NotFound(
                "File not found, try a newer link!".to_string(),
            ));
        }
        Ok(file_path)
    }
}

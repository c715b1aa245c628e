// src/catalog/repository.rs

//! Firmware repository index facade

use super::builder::build_index;
use super::reconcile::{delete_empty_directories, delete_unlinked_directories};
use super::scanner::ScanContext;
use super::{
    CatalogState, FilesRoot, Generations, ReindexReport, checked_file_name,
    checked_relative_dir, is_hidden,
};
use crate::error::{Error, Result};
use crate::model::Index;
use crate::naming::IdentifierPolicy;
use crate::remote::{RemoteMetadata, RemoteRepository};
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Channel index of one firmware directory, reconciled against its git repository
///
/// The metadata adapter lives inside the reindex mutex: holding it is what
/// makes a reindex single-flight, and its cached ref sets are only read by
/// the reindex that synced them. Lookups never take that mutex.
pub struct RepositoryIndex {
    directory: String,
    files: Arc<FilesRoot>,
    policy: IdentifierPolicy,
    remote: Mutex<RemoteMetadata>,
    index: Generations<Index>,
}

impl RepositoryIndex {
    pub fn new(
        directory: impl Into<String>,
        files: Arc<FilesRoot>,
        remote: Box<dyn RemoteRepository>,
        policy: IdentifierPolicy,
    ) -> Self {
        Self {
            directory: directory.into(),
            files,
            policy,
            remote: Mutex::new(RemoteMetadata::new(remote)),
            index: Generations::new(),
        }
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn state(&self) -> CatalogState {
        self.index.state()
    }

    /// Currently installed index
    pub fn index(&self) -> Arc<Index> {
        self.index.current().tree
    }

    /// Rebuild the index from the remote and the disk, then clean up
    ///
    /// On failure the previous index keeps serving. Cleanup runs only after
    /// the new index is installed and never fails the reindex.
    pub fn reindex(&self) -> Result<ReindexReport> {
        let mut remote = self.remote.lock();
        let ctx = ScanContext {
            files: &self.files,
            main_dir: &self.directory,
            policy: self.policy,
        };

        let built = remote.sync().and_then(|()| build_index(&ctx, &remote));
        let index = match built {
            Ok(index) => index,
            Err(e) => {
                error!("{} reindex failed: {}", self.directory, e);
                return Err(e);
            }
        };

        let entries = index.channels.len();
        let generation = self.index.install(index);
        info!("{} reindex OK (generation {})", self.directory, generation);

        let main_dir = self.files.dir(&self.directory);
        let mut cleanup = delete_unlinked_directories(&main_dir, |name| remote.is_known_ref(name));
        cleanup.extend(delete_empty_directories(&main_dir));
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

    /// Installed index, or not-found while it has no channels
    fn ready_index(&self) -> Result<Arc<Index>> {
        let index = self.index();
        if index.channels.is_empty() {
            return Err(Error::NotFound("No channels found!".to_string()));
        }
        Ok(index)
    }

    /// Visible file names in a branch directory, sorted
    pub fn get_branch_file_names(&self, branch: &str) -> Result<Vec<String>> {
        let branch_path = self.files.dir(&self.directory).join(checked_relative_dir(branch)?);
        if !branch_path.is_dir() {
            return Err(Error::NotFound("Branch not found!".to_string()));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&branch_path).map_err(|e| Error::fs(&branch_path, e))? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", branch_path.display(), e);
                    continue;
                }
            };
            match entry.file_name().into_string() {
                Ok(name) if !is_hidden(&name) => names.push(name),
                Ok(_) => {}
                Err(name) => warn!(
                    "Skipping non UTF-8 filename in {}: {:?}",
                    branch_path.display(),
                    name
                ),
            }
        }
        names.sort();
        Ok(names)
    }

    /// URL of the file with `target`/`file_type` in a channel's latest version
    pub fn get_file_from_latest_version(
        &self,
        channel: &str,
        target: &str,
        file_type: &str,
    ) -> Result<String> {
        let index = self.ready_index()?;
        let current = index
            .channel(channel)
            .ok_or_else(|| Error::NotFound(format!("Channel `{channel}` not found!")))?;
        let latest = current
            .latest_version()
            .ok_or_else(|| Error::NotFound(format!("Channel `{channel}` has no versions!")))?;
        latest
            .find_file(target, file_type)
            .map(|f| f.url.clone())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No {target}/{file_type} file in {channel} version {}",
                    latest.version
                ))
            })
    }

    /// Filesystem path of a file in a channel directory
    ///
    /// Answers from the disk alone, so files stay servable before the first
    /// successful reindex.
    pub fn get_file_path(&self, channel: &str, file_name: &str) -> Result<PathBuf> {
        let file_path = self
            .files
            .dir(&self.directory)
            .join(checked_relative_dir(channel)?)
            .join(checked_file_name(file_name)?);
        if !file_path.is_file() {
            return Err(Error::NotFound(
                "File not found, try a newer link!".to_string(),
            ));
        }
        Ok(file_path)
    }
}

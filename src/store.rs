// src/store.rs

//! Catalog store keyed by directory name
//!
//! This is the surface the HTTP layer talks to. Each directory is either a
//! firmware repository index or an asset-pack catalog; both reindex the same
//! way, while lookups are specific to their kind.

use crate::catalog::{
    CatalogState, FilesRoot, PacksCatalog, ReindexReport, RepositoryIndex,
};
use crate::config::{Config, DirectorySection};
use crate::error::{Error, Result};
use crate::model::{Catalog, Index};
use crate::naming::IdentifierPolicy;
use crate::remote::{GithubClient, RemoteRepository};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One catalog directory
pub enum Directory {
    Repository(RepositoryIndex),
    Packs(PacksCatalog),
}

/// Shared view of a directory's installed tree
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum IndexSnapshot {
    Index(Arc<Index>),
    Catalog(Arc<Catalog>),
}

impl Directory {
    pub fn name(&self) -> &str {
        match self {
            Self::Repository(repo) => repo.directory(),
            Self::Packs(packs) => packs.directory(),
        }
    }

    pub fn reindex(&self) -> Result<ReindexReport> {
        match self {
            Self::Repository(repo) => repo.reindex(),
            Self::Packs(packs) => packs.reindex(),
        }
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        match self {
            Self::Repository(repo) => IndexSnapshot::Index(repo.index()),
            Self::Packs(packs) => IndexSnapshot::Catalog(packs.catalog()),
        }
    }

    pub fn state(&self) -> CatalogState {
        match self {
            Self::Repository(repo) => repo.state(),
            Self::Packs(packs) => packs.state(),
        }
    }
}

/// Every configured catalog plus the shared files root
pub struct Store {
    files: Arc<FilesRoot>,
    directories: BTreeMap<String, Directory>,
    raw_upload_dirs: Vec<String>,
}

impl Store {
    pub fn new(files: FilesRoot) -> Self {
        Self {
            files: Arc::new(files),
            directories: BTreeMap::new(),
            raw_upload_dirs: Vec::new(),
        }
    }

    /// Register a firmware directory backed by a remote repository
    pub fn with_repository(
        mut self,
        name: &str,
        remote: Box<dyn RemoteRepository>,
        policy: IdentifierPolicy,
    ) -> Self {
        let index = RepositoryIndex::new(name, Arc::clone(&self.files), remote, policy);
        self.directories
            .insert(name.to_string(), Directory::Repository(index));
        self
    }

    /// Register an asset-pack directory
    pub fn with_packs(mut self, name: &str) -> Self {
        let catalog = PacksCatalog::new(name, Arc::clone(&self.files));
        self.directories
            .insert(name.to_string(), Directory::Packs(catalog));
        self
    }

    /// Register a raw upload directory that only has to exist
    pub fn with_raw_upload_dir(mut self, name: &str) -> Self {
        self.raw_upload_dirs.push(name.to_string());
        self
    }

    /// Build the store described by a configuration, connecting to every repository
    pub fn from_config(config: &Config) -> Result<Self> {
        let files = FilesRoot::new(&config.server.files_dir, config.server.base_url.clone());
        let mut store = Self::new(files);

        for (name, section) in &config.directories {
            store = match section {
                DirectorySection::Repository {
                    repo,
                    identifier_policy,
                    ..
                } => {
                    let token = section.token();
                    if token.is_none() {
                        warn!("No API token configured for {}, using anonymous access", name);
                    }
                    let client = GithubClient::connect(
                        &config.github.api_url,
                        &config.github.org,
                        repo,
                        token.as_deref(),
                        config.github.timeout(),
                        config.github.changelog_commits,
                    )?;
                    store.with_repository(name, Box::new(client), *identifier_policy)
                }
                DirectorySection::Packs => store.with_packs(name),
            };
        }

        for name in &config.upload.raw_dirs {
            store = store.with_raw_upload_dir(name);
        }

        Ok(store)
    }

    pub fn directory_names(&self) -> impl Iterator<Item = &str> {
        self.directories.keys().map(String::as_str)
    }

    pub fn directory(&self, name: &str) -> Result<&Directory> {
        self.directories
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("{name} not found!")))
    }

    /// Create the files root, every catalog directory and every raw upload directory
    pub fn create_directories(&self) -> Result<()> {
        let root = self.files.root();
        fs::create_dir_all(root).map_err(|e| Error::fs(root, e))?;

        for name in self.directories.keys().chain(self.raw_upload_dirs.iter()) {
            let path = self.files.dir(name);
            fs::create_dir_all(&path).map_err(|e| Error::fs(&path, e))?;
        }
        Ok(())
    }

    /// Reindex every catalog in name order, returning the ones that failed
    ///
    /// A failure does not stop the remaining directories.
    pub fn reindex_all(&self) -> Vec<(String, Error)> {
        let mut failures = Vec::new();
        for (name, directory) in &self.directories {
            if let Err(e) = directory.reindex() {
                error!("{} reindex failed: {}", name, e);
                failures.push((name.clone(), e));
            }
        }
        failures
    }

    /// Create the directory tree and run a first reindex of every catalog
    ///
    /// Per-directory failures are logged and leave that catalog empty; only
    /// failing to create a directory is returned.
    pub fn initialize(&self) -> Result<()> {
        self.create_directories()?;
        let failures = self.reindex_all();
        info!(
            "Startup complete ({} of {} catalogs indexed)",
            self.directories.len() - failures.len(),
            self.directories.len()
        );
        Ok(())
    }

    /// Full rebuild of one directory, serialized with other reindexes of it
    pub fn reindex(&self, directory: &str) -> Result<ReindexReport> {
        self.directory(directory)?.reindex()
    }

    /// Run a reindex on the blocking pool, off the async request path
    pub async fn spawn_reindex(self: Arc<Self>, directory: String) -> Result<ReindexReport> {
        tokio::task::spawn_blocking(move || self.reindex(&directory))
            .await
            .map_err(|e| Error::Internal(format!("Reindex task failed: {e}")))?
    }

    pub fn get_index(&self, directory: &str) -> Result<IndexSnapshot> {
        Ok(self.directory(directory)?.snapshot())
    }

    pub fn get_branch_file_names(&self, directory: &str, branch: &str) -> Result<Vec<String>> {
        match self.directory(directory)? {
            Directory::Repository(repo) => repo.get_branch_file_names(branch),
            Directory::Packs(_) => Err(Error::NotFound(format!("{directory} has no branches"))),
        }
    }

    pub fn get_file_from_latest_version(
        &self,
        directory: &str,
        channel: &str,
        target: &str,
        file_type: &str,
    ) -> Result<String> {
        match self.directory(directory)? {
            Directory::Repository(repo) => {
                repo.get_file_from_latest_version(channel, target, file_type)
            }
            Directory::Packs(_) => Err(Error::NotFound(format!("{directory} has no channels"))),
        }
    }

    /// Path of a servable file
    ///
    /// `name` is a channel directory for repositories and a pack id for packs;
    /// `file_type` is required for packs (`download` or `preview`) and must be
    /// absent for repositories.
    pub fn get_file_path(
        &self,
        directory: &str,
        name: &str,
        file_type: Option<&str>,
        file_name: &str,
    ) -> Result<PathBuf> {
        match (self.directory(directory)?, file_type) {
            (Directory::Repository(repo), None) => repo.get_file_path(name, file_name),
            (Directory::Packs(packs), Some(kind)) => packs.get_file_path(name, kind, file_name),
            (Directory::Repository(_), Some(kind)) => Err(Error::NotFound(format!(
                "{directory} has no '{kind}' files"
            ))),
            (Directory::Packs(_), None) => Err(Error::NotFound(format!(
                "{directory} requires a file type"
            ))),
        }
    }
}

// src/catalog/mod.rs

//! Catalog building and reconciliation
//!
//! A reindex rebuilds a directory's tree from scratch:
//! - `scanner` groups the newest artifacts of a channel directory into a version
//! - `builder` assembles the firmware channels from remote metadata + scans
//! - `packs` parses asset packs into a pack catalog
//! - `reconcile` removes directories that no longer map to a live ref
//!
//! The facades (`RepositoryIndex`, `PacksCatalog`) hold the installed
//! generation and swap it in whole after a successful build.

mod builder;
mod packs;
mod packs_catalog;
mod reconcile;
mod repository;
mod scanner;

pub use builder::{branch_channel, build_index, development_channel, release_channel};
pub use packs::{FileKind, build_catalog, parse_pack};
pub use packs_catalog::PacksCatalog;
pub use reconcile::{CleanupReport, delete_empty_directories, delete_unlinked_directories};
pub use repository::RepositoryIndex;
pub use scanner::{ScanContext, add_files_to_version};

use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The files root and the public URL prefix it is served under
#[derive(Debug, Clone)]
pub struct FilesRoot {
    root: PathBuf,
    base_url: String,
}

impl FilesRoot {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a catalog directory
    pub fn dir(&self, directory: &str) -> PathBuf {
        self.root.join(directory)
    }

    /// Public URL for a path below the files root
    ///
    /// Depends only on the relative path, so a file keeps its URL across
    /// reindexes for as long as it stays where it is.
    pub fn url(&self, parts: &[&str]) -> String {
        let mut url = self.base_url.trim_end_matches('/').to_string();
        for part in parts {
            url.push('/');
            url.push_str(part.trim_matches('/'));
        }
        url
    }
}

/// Dot-prefixed names (`.DS_Store`, `.gitkeep`, ...) are never indexed
pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Validate a single path component supplied by a caller
pub(crate) fn checked_file_name(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::InvalidPath(name.to_string()));
    }
    Ok(name)
}

/// Validate a relative directory path supplied by a caller (branch names may nest)
pub(crate) fn checked_relative_dir(name: &str) -> Result<&Path> {
    if name.is_empty()
        || name.contains('\\')
        || name
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(Error::InvalidPath(name.to_string()));
    }
    Ok(Path::new(name))
}

/// Lifecycle of a catalog facade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    /// Constructed, no successful reindex yet
    Empty,
    /// Serving the tree installed by the given reindex (1-based)
    Ready { generation: u64 },
}

/// A tree together with the reindex that produced it
#[derive(Debug)]
pub(crate) struct Installed<T> {
    pub(crate) generation: u64,
    pub(crate) tree: Arc<T>,
}

impl<T> Clone for Installed<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            tree: Arc::clone(&self.tree),
        }
    }
}

/// Slot holding the currently served generation of a tree
///
/// Readers clone the `Arc` under a short read lock and never observe a tree
/// being built; writers replace the whole slot.
#[derive(Debug)]
pub(crate) struct Generations<T> {
    slot: RwLock<Installed<T>>,
}

impl<T: Default> Generations<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: RwLock::new(Installed {
                generation: 0,
                tree: Arc::new(T::default()),
            }),
        }
    }

    pub(crate) fn current(&self) -> Installed<T> {
        self.slot.read().clone()
    }

    /// Install a freshly built tree, returning its generation number
    pub(crate) fn install(&self, tree: T) -> u64 {
        let mut slot = self.slot.write();
        let generation = slot.generation + 1;
        *slot = Installed {
            generation,
            tree: Arc::new(tree),
        };
        generation
    }

    pub(crate) fn state(&self) -> CatalogState {
        match self.slot.read().generation {
            0 => CatalogState::Empty,
            generation => CatalogState::Ready { generation },
        }
    }
}

/// Outcome of a successful reindex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexReport {
    pub directory: String,
    pub generation: u64,
    /// Channels or packs in the new tree
    pub entries: usize,
    /// Directories removed by reconciliation
    pub removed: Vec<PathBuf>,
}

// src/lib.rs

//! Release catalog indexer
//!
//! Rebuilds machine-readable catalogs of published firmware builds and asset
//! packs from a files root on disk, enriched with release and commit metadata
//! from the git host.
//!
//! # Architecture
//!
//! - Artifacts are discovered from the filesystem, never uploaded through here
//! - A reindex rebuilds a directory's whole tree and swaps it in atomically
//! - Directories for deleted branches are removed after the swap
//! - Readers always see a complete generation, never a partial build

pub mod catalog;
pub mod config;
mod error;
pub mod hash;
pub mod model;
pub mod naming;
pub mod remote;
pub mod store;

pub use catalog::{CatalogState, FilesRoot, PacksCatalog, ReindexReport, RepositoryIndex};
pub use config::Config;
pub use error::{Error, Result};
pub use model::{Catalog, Channel, Index, Pack, PackFile, PackStats, Version, VersionFile};
pub use naming::{IdentifierPolicy, ParsedFilename, parse_filename};
pub use remote::{GithubClient, RemoteCommit, RemoteMetadata, RemoteRelease, RemoteRepository};
pub use store::{Directory, IndexSnapshot, Store};

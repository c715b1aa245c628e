// src/error.rs

//! Error types shared by every catalog component

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or querying a catalog
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed artifact filename or pack manifest
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unknown directory, channel, version, file, branch or pack
    #[error("Not found: {0}")]
    NotFound(String),

    /// Auth, network or API failure talking to the git host
    #[error("Remote metadata error: {0}")]
    RemoteMetadata(String),

    /// Missing or unreadable path during a scan or cleanup
    #[error("Filesystem error at '{}': {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Lookup name that would escape its directory
    #[error("Invalid path component: {0}")]
    InvalidPath(String),

    /// Bad configuration file or value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an I/O error together with the path that produced it
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means "nothing there" rather than an internal failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidPath(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::RemoteMetadata(e.to_string())
    }
}

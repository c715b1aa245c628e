// src/config.rs
//! Configuration file parsing for the indexer
//!
//! Supports TOML configuration files with the following sections:
//! - [server] - Files root and public base URL
//! - [github] - Hosting API endpoint, organization, changelog window
//! - [directories.*] - One entry per catalog directory
//! - [upload] - Raw upload directories that only need to exist
//!
//! Every section has defaults, so an empty file yields the production layout:
//! a `firmware` repository catalog and an `asset-packs` pack catalog.

use crate::error::{Error, Result};
use crate::naming::IdentifierPolicy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding `server.files_dir`
pub const FILES_DIR_ENV: &str = "INDEXER_FILES_DIR";

/// Environment variable overriding `server.base_url`
pub const BASE_URL_ENV: &str = "INDEXER_BASE_URL";

/// TOML configuration file structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerSection,

    /// Git hosting settings
    #[serde(default)]
    pub github: GithubSection,

    /// Catalog directories keyed by name
    #[serde(default = "default_directories")]
    pub directories: BTreeMap<String, DirectorySection>,

    /// Upload settings
    #[serde(default)]
    pub upload: UploadSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            github: GithubSection::default(),
            directories: default_directories(),
            upload: UploadSection::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
        let mut config = Self::parse(&content)?;
        config.apply_env();
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration text without touching the environment
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {e}")))
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(FILES_DIR_ENV) {
            self.server.files_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            self.server.base_url = url;
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.server.base_url).map_err(|e| {
            Error::Config(format!("Invalid base_url '{}': {e}", self.server.base_url))
        })?;

        if self.github.changelog_commits == 0 || self.github.changelog_commits > 100 {
            return Err(Error::Config(format!(
                "github.changelog_commits must be between 1 and 100, got {}",
                self.github.changelog_commits
            )));
        }

        for name in self.directories.keys().chain(self.upload.raw_dirs.iter()) {
            if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
                return Err(Error::Config(format!("Invalid directory name '{name}'")));
            }
        }

        for name in &self.upload.raw_dirs {
            if self.directories.contains_key(name) {
                return Err(Error::Config(format!(
                    "'{name}' is both a catalog and a raw upload directory"
                )));
            }
        }

        Ok(())
    }
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Root directory holding one subtree per catalog
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,

    /// Public prefix of every download URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            files_dir: default_files_dir(),
            base_url: default_base_url(),
        }
    }
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("/var/lib/indexer/files")
}

fn default_base_url() -> String {
    "https://up.momentum-fw.dev/".to_string()
}

/// Git hosting configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct GithubSection {
    /// API root
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Organization owning every configured repository
    #[serde(default = "default_org")]
    pub org: String,

    /// Commits fetched for the development changelog (one API page)
    #[serde(default = "default_changelog_commits")]
    pub changelog_commits: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GithubSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            org: default_org(),
            changelog_commits: default_changelog_commits(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_org() -> String {
    "Next-Flip".to_string()
}

fn default_changelog_commits() -> u32 {
    30
}

fn default_timeout_secs() -> u64 {
    30
}

/// One catalog directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DirectorySection {
    /// Firmware-style directory reconciled against a git repository
    Repository {
        /// Repository name inside `github.org`
        repo: String,
        /// Environment variable holding the API token
        #[serde(default)]
        token_env: Option<String>,
        /// How build identifiers are derived from filenames
        #[serde(default)]
        identifier_policy: IdentifierPolicy,
    },
    /// Asset-pack directory
    Packs,
}

impl DirectorySection {
    /// Resolve the API token from the configured environment variable
    pub fn token(&self) -> Option<String> {
        match self {
            Self::Repository {
                token_env: Some(var),
                ..
            } => std::env::var(var).ok().filter(|t| !t.is_empty()),
            _ => None,
        }
    }
}

fn default_directories() -> BTreeMap<String, DirectorySection> {
    let mut dirs = BTreeMap::new();
    dirs.insert(
        "firmware".to_string(),
        DirectorySection::Repository {
            repo: "Momentum-Firmware".to_string(),
            token_env: Some("INDEXER_FIRMWARE_GITHUB_TOKEN".to_string()),
            identifier_policy: IdentifierPolicy::LastSegment,
        },
    );
    dirs.insert("asset-packs".to_string(), DirectorySection::Packs);
    dirs
}

/// Upload configuration section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadSection {
    /// Directories created at startup for raw uploads (never indexed)
    #[serde(default)]
    pub raw_dirs: Vec<String>,
}

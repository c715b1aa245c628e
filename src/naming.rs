// src/naming.rs

//! Artifact filename convention
//!
//! Uploaded firmware artifacts are named
//! `flipper-z-<target>-<kind>-mntm-<suffix>.<ext>`. The target and the
//! composite type (`<kind>_<ext>`) of every indexed file come from here and
//! nowhere else.

use crate::error::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Prefix shared by every version token
pub const VERSION_TOKEN_PREFIX: &str = "mntm-";

static ARTIFACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^flipper-z-(\w+)-(\w+)-mntm-([A-Za-z0-9._-]+?)\.(\w+)$").unwrap()
});

/// Structured result of a successful filename parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    /// Lowercased platform token
    pub target: String,
    /// `<kind>_<ext>`
    pub file_type: String,
    /// Opaque build token after `mntm-`
    pub version_suffix: String,
}

impl ParsedFilename {
    /// Canonical token grouping every artifact of one build (`mntm-<suffix>`)
    pub fn version_token(&self) -> String {
        format!("{VERSION_TOKEN_PREFIX}{}", self.version_suffix)
    }
}

/// Parse an artifact filename
pub fn parse_filename(filename: &str) -> Result<ParsedFilename> {
    let caps = ARTIFACT_RE
        .captures(filename)
        .ok_or_else(|| Error::Parse(format!("Unknown file {filename}")))?;

    Ok(ParsedFilename {
        target: caps[1].to_lowercase(),
        file_type: format!("{}_{}", &caps[2], &caps[4]),
        version_suffix: caps[3].to_string(),
    })
}

/// Whether a version identifier is already in release form
pub fn is_release_identifier(version: &str) -> bool {
    version.starts_with(VERSION_TOKEN_PREFIX)
}

/// How a build's identifier is derived from its version token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierPolicy {
    /// Text after the last `-` (`mntm-dev-1a2b3c4d` → `1a2b3c4d`)
    #[default]
    LastSegment,
    /// Suffix with a leading `dev-` removed (`mntm-dev-1a2b3c4d` → `1a2b3c4d`,
    /// `mntm-pr-12` → `pr-12`)
    StripDevPrefix,
}

impl IdentifierPolicy {
    /// Derive the version identifier for a token like `mntm-dev-1a2b3c4d`
    pub fn identifier(&self, token: &str) -> String {
        match self {
            Self::LastSegment => token.rsplit('-').next().unwrap_or(token).to_string(),
            Self::StripDevPrefix => {
                let suffix = token.strip_prefix(VERSION_TOKEN_PREFIX).unwrap_or(token);
                suffix.strip_prefix("dev-").unwrap_or(suffix).to_string()
            }
        }
    }
}

// src/model.rs

//! Serializable catalog trees
//!
//! Two trees exist: the firmware `Index` (channels → versions → files) and
//! the asset-pack `Catalog` (packs → files/previews + stats). Both are built
//! wholesale by a reindex and never edited afterwards; the facades hand out
//! shared snapshots of them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One published artifact inside a version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFile {
    /// Public download URL (base URL + path below the files root)
    pub url: String,
    /// Platform identifier from the filename
    pub target: String,
    /// `<kind>_<extension>` from the filename
    #[serde(rename = "type")]
    pub file_type: String,
    /// Hex SHA-256 of the file at build time
    pub sha256: String,
}

/// One build or release within a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Release title, short commit hash, or `mntm-<suffix>`
    pub version: String,
    pub changelog: String,
    /// Unix seconds
    pub timestamp: i64,
    #[serde(default)]
    pub files: Vec<VersionFile>,
}

impl Version {
    pub fn new(version: impl Into<String>, changelog: impl Into<String>, timestamp: i64) -> Self {
        Self {
            version: version.into(),
            changelog: changelog.into(),
            timestamp,
            files: Vec::new(),
        }
    }

    pub fn add_file(&mut self, file: VersionFile) {
        self.files.push(file);
    }

    /// First file matching a target and type
    pub fn find_file(&self, target: &str, file_type: &str) -> Option<&VersionFile> {
        self.files
            .iter()
            .find(|f| f.target == target && f.file_type == file_type)
    }
}

/// A named artifact stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Index 0 is the most recent
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl Channel {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            versions: Vec::new(),
        }
    }

    pub fn add_version(&mut self, version: Version) {
        self.versions.push(version);
    }

    pub fn latest_version(&self) -> Option<&Version> {
        self.versions.first()
    }
}

/// Full channel tree for one firmware-style directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Index {
    pub fn add_channel(&mut self, channel: Channel) {
        self.channels.push(channel);
    }

    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }
}

/// One downloadable pack archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackFile {
    pub url: String,
    /// `zip` or `tar_gz`
    #[serde(rename = "type")]
    pub file_type: String,
    pub sha256: String,
}

/// Content totals aggregated over every bundle of a pack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackStats {
    /// Number of bundles under `source/`
    pub packs: u32,
    pub anims: u32,
    pub icons: u32,
    pub passport: BTreeSet<String>,
    pub fonts: BTreeSet<String>,
}

impl PackStats {
    /// Fold another bundle's totals into this one
    pub fn merge(&mut self, other: PackStats) {
        self.packs += other.packs;
        self.anims += other.anims;
        self.icons += other.icons;
        self.passport.extend(other.passport);
        self.fonts.extend(other.fonts);
    }

    /// Whether a bundle contributed nothing countable
    pub fn is_empty(&self) -> bool {
        self.anims == 0 && self.icons == 0 && self.passport.is_empty() && self.fonts.is_empty()
    }
}

/// A themed asset bundle with archives and previews
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pack {
    pub id: String,
    pub title: String,
    pub author: String,
    pub source_url: String,
    pub description: String,
    pub files: Vec<PackFile>,
    pub preview_urls: Vec<String>,
    pub stats: PackStats,
}

/// Every pack of one asset-pack directory, in scan order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub packs: Vec<Pack>,
}

impl Catalog {
    pub fn add_pack(&mut self, pack: Pack) {
        self.packs.push(pack);
    }

    pub fn pack(&self, id: &str) -> Option<&Pack> {
        self.packs.iter().find(|p| p.id == id)
    }
}

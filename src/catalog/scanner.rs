// src/catalog/scanner.rs

//! Channel directory scanning
//!
//! The newest parseable file of a channel directory fixes the build token
//! (`mntm-<suffix>`); every other file must carry the same token to join the
//! version. This groups all targets/types of one build even when their
//! mtimes drift, and drops leftovers from earlier builds.

use super::{FilesRoot, is_hidden};
use crate::error::{Error, Result};
use crate::hash::sha256_file;
use crate::model::{Version, VersionFile};
use crate::naming::{IdentifierPolicy, is_release_identifier, parse_filename};
use std::fs;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Where a scan happens and how build identifiers are derived
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    pub files: &'a FilesRoot,
    /// Catalog directory below the files root (e.g. `firmware`)
    pub main_dir: &'a str,
    pub policy: IdentifierPolicy,
}

/// Attach the latest build's files from `channel_dir` to `version`
///
/// A missing channel directory is created and yields no files. Per-file
/// problems (bad name, unreadable entry, hashing failure) are logged and the
/// file is left out; only failing to create or list the directory is an error.
pub fn add_files_to_version(
    mut version: Version,
    ctx: &ScanContext<'_>,
    channel_dir: &str,
) -> Result<Version> {
    let directory_path = ctx.files.dir(ctx.main_dir).join(channel_dir);

    if !directory_path.is_dir() {
        fs::create_dir_all(&directory_path).map_err(|e| Error::fs(&directory_path, e))?;
        debug!("Created channel directory {}", directory_path.display());
    }

    let read_dir = fs::read_dir(&directory_path).map_err(|e| Error::fs(&directory_path, e))?;
    let mut entries: Vec<(SystemTime, String)> = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", directory_path.display(), e);
                continue;
            }
        };
        let Ok(name) = entry.file_name().into_string() else {
            warn!(
                "Skipping non UTF-8 filename in {}: {:?}",
                directory_path.display(),
                entry.file_name()
            );
            continue;
        };
        if is_hidden(&name) {
            continue;
        }
        let modified = fs::metadata(entry.path())
            .and_then(|m| if m.is_file() { m.modified().map(Some) } else { Ok(None) });
        match modified {
            Ok(Some(mtime)) => entries.push((mtime, name)),
            Ok(None) => debug!("Skipping non-file {} in {}", name, directory_path.display()),
            Err(e) => warn!("Skipping {} in {}: {}", name, directory_path.display(), e),
        }
    }

    // Newest first; equal mtimes fall back to name order
    entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let mut latest_token: Option<String> = None;
    for (_, name) in entries {
        let parsed = match parse_filename(&name) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("{}/{}/{}: {}", ctx.main_dir, channel_dir, name, e);
                continue;
            }
        };

        if let Some(token) = &latest_token {
            if !name.contains(token.as_str()) {
                debug!("Skipping {} (not part of {})", name, token);
                continue;
            }
        } else {
            let token = parsed.version_token();
            if !is_release_identifier(&version.version) {
                rename_version(&mut version, ctx.policy.identifier(&token));
            }
            debug!("Latest build in {}/{} is {}", ctx.main_dir, channel_dir, token);
            latest_token = Some(token);
        }

        let file_path = directory_path.join(&name);
        let sha256 = match sha256_file(&file_path) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Failed to hash {}: {}", file_path.display(), e);
                continue;
            }
        };

        version.add_file(VersionFile {
            url: ctx.files.url(&[ctx.main_dir, channel_dir, &name]),
            target: parsed.target,
            file_type: parsed.file_type,
            sha256,
        });
    }

    Ok(version)
}

/// Replace the identifier and start the changelog at the line mentioning it
fn rename_version(version: &mut Version, identifier: String) {
    if let Some(pos) = version.changelog.find(&identifier) {
        let start = version.changelog[..pos].rfind('\n').map_or(0, |i| i + 1);
        version.changelog = version.changelog[start..].to_string();
    }
    version.version = identifier;
}

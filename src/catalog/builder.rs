// src/catalog/builder.rs

//! Firmware channel assembly
//!
//! Channel order is fixed: development, release, then one channel per
//! unstable branch in the order the remote listed them.

use super::checked_relative_dir;
use super::scanner::{ScanContext, add_files_to_version};
use crate::error::Result;
use crate::model::{Channel, Index};
use crate::remote::{DEV_BRANCH, RemoteMetadata};
use std::fs;
use std::io;
use tracing::{debug, info, warn};

pub fn development_channel() -> Channel {
    Channel::new(
        "development",
        "Development Channel",
        "Latest builds, might sometimes be unstable",
    )
}

pub fn release_channel() -> Channel {
    Channel::new(
        "release",
        "Stable Release Channel",
        "Less frequent, more stable releases",
    )
}

pub fn branch_channel(branch: &str) -> Channel {
    Channel::new(
        branch,
        format!("Branch {branch}"),
        format!("Latest builds from the {branch} branch, might be very unstable"),
    )
}

/// Channel for the head of `branch`, filled from the directory of the same name
fn parse_dev_channel(
    mut channel: Channel,
    ctx: &ScanContext<'_>,
    remote: &RemoteMetadata,
    branch: &str,
) -> Result<Channel> {
    let version = remote.get_dev_version(branch)?;
    let version = add_files_to_version(version, ctx, branch)?;
    channel.add_version(version);
    Ok(channel)
}

/// Release channel, empty when the repository has no stable release yet
fn parse_release_channel(
    mut channel: Channel,
    ctx: &ScanContext<'_>,
    remote: &RemoteMetadata,
) -> Result<Channel> {
    let Some(version) = remote.get_release_version() else {
        return Ok(channel);
    };
    // The release title names a directory below the catalog
    if let Err(e) = checked_relative_dir(&version.version) {
        warn!(
            "Leaving release channel of {} empty: {}",
            ctx.main_dir, e
        );
        return Ok(channel);
    }
    let release_dir = version.version.clone();
    let version = add_files_to_version(version, ctx, &release_dir)?;
    channel.add_version(version);
    Ok(channel)
}

/// Whether a branch directory holds more than a single entry
fn is_branch_populated(ctx: &ScanContext<'_>, branch: &str) -> bool {
    let branch_dir = ctx.files.dir(ctx.main_dir).join(branch);
    match fs::read_dir(&branch_dir) {
        Ok(entries) => entries.take(2).count() > 1,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to list {}: {}", branch_dir.display(), e);
            false
        }
    }
}

/// Build the channel index of a firmware directory from synced metadata
///
/// Any remote or directory-level failure aborts the build; the caller keeps
/// serving its previous index.
pub fn build_index(ctx: &ScanContext<'_>, remote: &RemoteMetadata) -> Result<Index> {
    let mut index = Index::default();

    index.add_channel(parse_dev_channel(
        development_channel(),
        ctx,
        remote,
        DEV_BRANCH,
    )?);
    index.add_channel(parse_release_channel(release_channel(), ctx, remote)?);

    for branch in remote.get_unstable_branch_names() {
        if let Err(e) = checked_relative_dir(&branch) {
            warn!("Skipping branch in {}: {}", ctx.main_dir, e);
            continue;
        }
        if !is_branch_populated(ctx, &branch) {
            debug!("Skipping branch {} in {}: not populated", branch, ctx.main_dir);
            continue;
        }
        index.add_channel(parse_dev_channel(
            branch_channel(&branch),
            ctx,
            remote,
            &branch,
        )?);
    }

    info!(
        "Built {} channels for {} from {}",
        index.channels.len(),
        ctx.main_dir,
        remote.full_name()
    );
    Ok(index)
}

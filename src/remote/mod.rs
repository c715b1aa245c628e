// src/remote/mod.rs

//! Remote git-hosting metadata
//!
//! The adapter keeps three existence sets (tags, release titles, branch
//! names) from the last `sync()` and derives the development and release
//! versions a reindex needs. The sets are deliberately stale between
//! syncs: they are only consulted right after a sync in the same reindex.
//!
//! The hosting service itself sits behind [`RemoteRepository`], implemented
//! for GitHub by [`GithubClient`].

mod github;

pub use github::GithubClient;

use crate::error::{Error, Result};
use crate::model::Version;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Branch whose head feeds the development channel
pub const DEV_BRANCH: &str = "dev";

/// Branch that mirrors stable releases
pub const RELEASE_BRANCH: &str = "release";

/// Heading separating release notes from the changelog in release bodies
const CHANGELOG_HEADING: &str = "## 🚀 Changelog";

/// Maximum characters kept from a commit subject
const COMMIT_SUBJECT_MAX: usize = 50;

/// A release as listed by the hosting service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRelease {
    /// Display title (falls back to the tag name when empty)
    pub title: String,
    pub tag: String,
    pub body: String,
    pub prerelease: bool,
    /// Creation time, Unix seconds
    pub created_at: i64,
}

/// A commit as listed by the hosting service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommit {
    pub sha: String,
    pub message: String,
    pub html_url: String,
    /// Hosting account linked to the commit, if any
    pub author_login: Option<String>,
    /// Git author name
    pub author_name: String,
    /// Author time, Unix seconds
    pub authored_at: i64,
}

/// Read access to one hosted repository
///
/// Listings are returned in the service's order: newest first for releases
/// and commits.
pub trait RemoteRepository: Send + Sync {
    /// `org/repo`, for log messages
    fn full_name(&self) -> String;

    fn list_tags(&self) -> Result<Vec<String>>;

    fn list_releases(&self) -> Result<Vec<RemoteRelease>>;

    fn list_branches(&self) -> Result<Vec<String>>;

    /// One page of the most recent commits on a branch
    fn list_recent_commits(&self, branch: &str) -> Result<Vec<RemoteCommit>>;
}

/// Cached view of a repository's refs for one reindex pass
pub struct RemoteMetadata {
    remote: Box<dyn RemoteRepository>,
    tags: HashSet<String>,
    releases: Vec<RemoteRelease>,
    release_titles: HashSet<String>,
    branches: Vec<String>,
}

impl RemoteMetadata {
    pub fn new(remote: Box<dyn RemoteRepository>) -> Self {
        Self {
            remote,
            tags: HashSet::new(),
            releases: Vec::new(),
            release_titles: HashSet::new(),
            branches: Vec::new(),
        }
    }

    pub fn full_name(&self) -> String {
        self.remote.full_name()
    }

    /// Refresh tags, releases and branches in one pass
    ///
    /// Nothing is replaced unless all three listings succeed, so the cached
    /// sets always come from a single sync.
    pub fn sync(&mut self) -> Result<()> {
        let name = self.remote.full_name();
        let tags = self.remote.list_tags().inspect_err(|e| {
            warn!("Failed to list tags for {}: {}", name, e);
        })?;
        let releases = self.remote.list_releases().inspect_err(|e| {
            warn!("Failed to list releases for {}: {}", name, e);
        })?;
        let branches = self.remote.list_branches().inspect_err(|e| {
            warn!("Failed to list branches for {}: {}", name, e);
        })?;

        info!(
            "Synced {}: {} tags, {} releases, {} branches",
            name,
            tags.len(),
            releases.len(),
            branches.len()
        );

        self.tags = tags.into_iter().collect();
        self.release_titles = releases.iter().map(|r| r.title.clone()).collect();
        self.releases = releases;
        self.branches = branches;
        Ok(())
    }

    /// Branch names other than the dev and release branches, in listing order
    pub fn get_unstable_branch_names(&self) -> Vec<String> {
        self.branches
            .iter()
            .filter(|b| b.as_str() != DEV_BRANCH && b.as_str() != RELEASE_BRANCH)
            .cloned()
            .collect()
    }

    pub fn is_branch_exist(&self, branch: &str) -> bool {
        self.branches.iter().any(|b| b == branch)
    }

    pub fn is_release_exist(&self, release: &str) -> bool {
        self.release_titles.contains(release)
    }

    pub fn is_tag_exist(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Whether a directory name matches any live tag, release or branch
    pub fn is_known_ref(&self, name: &str) -> bool {
        self.is_release_exist(name) || self.is_tag_exist(name) || self.is_branch_exist(name)
    }

    /// Version for the head of a branch, with the recent commits as changelog
    pub fn get_dev_version(&self, branch: &str) -> Result<Version> {
        let commits = self.remote.list_recent_commits(branch).inspect_err(|e| {
            warn!("Failed to list commits of {} on {}: {}", branch, self.full_name(), e);
        })?;

        let Some(last_commit) = commits.first() else {
            return Err(Error::RemoteMetadata(format!(
                "No commits found in {branch} branch!"
            )));
        };

        let changelog: String = commits.iter().map(format_commit_line).collect();
        debug!(
            "Dev version for {}: {} ({} commits in changelog)",
            branch,
            short_sha(&last_commit.sha),
            commits.len()
        );

        Ok(Version::new(
            short_sha(&last_commit.sha),
            changelog,
            last_commit.authored_at,
        ))
    }

    /// Latest non-prerelease release, if there is one
    pub fn get_release_version(&self) -> Option<Version> {
        if self.releases.is_empty() {
            warn!("No releases found for {}!", self.full_name());
            return None;
        }

        let Some(release) = self.releases.iter().find(|r| !r.prerelease) else {
            info!("Only pre-releases found for {}", self.full_name());
            return None;
        };

        Some(Version::new(
            release.title.clone(),
            release_changelog(&release.body),
            release.created_at,
        ))
    }
}

/// First 8 characters of a commit hash
fn short_sha(sha: &str) -> String {
    sha.chars().take(8).collect()
}

/// First line of a commit message stripped of markdown emphasis and truncated
fn commit_subject(message: &str) -> String {
    let subject = message
        .lines()
        .next()
        .unwrap_or("")
        .replace('`', "")
        .replace("__", "")
        .replace("**", "");

    if subject.chars().count() > COMMIT_SUBJECT_MAX {
        let truncated: String = subject.chars().take(COMMIT_SUBJECT_MAX).collect();
        format!("{truncated}...")
    } else {
        subject
    }
}

/// One markdown changelog line, newline-terminated
fn format_commit_line(commit: &RemoteCommit) -> String {
    let author = match &commit.author_login {
        Some(login) => format!("[__{login}__](https://github.com/{login})"),
        None => format!("__{}__", commit.author_name),
    };
    format!(
        "[`{}`]({}): {} - {}\n",
        short_sha(&commit.sha),
        commit.html_url,
        commit_subject(&commit.message),
        author
    )
}

/// Release notes after the changelog heading, or the whole body
fn release_changelog(body: &str) -> String {
    body.split_once(CHANGELOG_HEADING)
        .map_or(body, |(_, rest)| rest)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory repository; `fail_branches` makes the branch listing error out
    #[derive(Default)]
    struct FakeRepo {
        tags: Vec<String>,
        releases: Vec<RemoteRelease>,
        branches: Vec<String>,
        commits: Vec<RemoteCommit>,
        fail_branches: bool,
    }

    impl RemoteRepository for FakeRepo {
        fn full_name(&self) -> String {
            "Org/Repo".to_string()
        }
        fn list_tags(&self) -> Result<Vec<String>> {
            Ok(self.tags.clone())
        }
        fn list_releases(&self) -> Result<Vec<RemoteRelease>> {
            Ok(self.releases.clone())
        }
        fn list_branches(&self) -> Result<Vec<String>> {
            if self.fail_branches {
                return Err(Error::RemoteMetadata("HTTP 502".into()));
            }
            Ok(self.branches.clone())
        }
        fn list_recent_commits(&self, _branch: &str) -> Result<Vec<RemoteCommit>> {
            Ok(self.commits.clone())
        }
    }

    fn release(title: &str, prerelease: bool, created_at: i64) -> RemoteRelease {
        RemoteRelease {
            title: title.to_string(),
            tag: title.to_string(),
            body: format!("Notes\n{CHANGELOG_HEADING}\n- change in {title}\n"),
            prerelease,
            created_at,
        }
    }

    fn commit(sha: &str, message: &str, login: Option<&str>, at: i64) -> RemoteCommit {
        RemoteCommit {
            sha: sha.to_string(),
            message: message.to_string(),
            html_url: format!("https://github.com/Org/Repo/commit/{sha}"),
            author_login: login.map(str::to_string),
            author_name: "Some Author".to_string(),
            authored_at: at,
        }
    }

    fn synced(repo: FakeRepo) -> RemoteMetadata {
        let mut meta = RemoteMetadata::new(Box::new(repo));
        meta.sync().unwrap();
        meta
    }

    #[test]
    fn test_existence_checks_after_sync() {
        let meta = synced(FakeRepo {
            tags: vec!["mntm-004".into()],
            releases: vec![release("mntm-005", false, 10)],
            branches: vec!["dev".into(), "release".into(), "feature".into()],
            ..Default::default()
        });

        assert!(meta.is_tag_exist("mntm-004"));
        assert!(meta.is_release_exist("mntm-005"));
        assert!(meta.is_branch_exist("feature"));
        assert!(meta.is_known_ref("dev"));
        assert!(!meta.is_known_ref("gone"));
    }

    #[test]
    fn test_unstable_branches_exclude_reserved() {
        let meta = synced(FakeRepo {
            branches: vec!["zeta".into(), "dev".into(), "alpha".into(), "release".into()],
            ..Default::default()
        });
        assert_eq!(meta.get_unstable_branch_names(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_failed_sync_keeps_previous_sets() {
        let repo = FakeRepo {
            tags: vec!["mntm-004".into()],
            branches: vec!["dev".into()],
            ..Default::default()
        };
        let mut meta = RemoteMetadata::new(Box::new(repo));
        meta.sync().unwrap();

        meta.remote = Box::new(FakeRepo {
            tags: vec!["other".into()],
            fail_branches: true,
            ..Default::default()
        });

        let err = meta.sync().unwrap_err();
        assert!(matches!(err, Error::RemoteMetadata(_)));
        assert!(meta.is_tag_exist("mntm-004"));
        assert!(!meta.is_tag_exist("other"));
    }

    #[test]
    fn test_release_version_skips_prereleases() {
        let meta = synced(FakeRepo {
            releases: vec![
                release("mntm-006-rc", true, 30),
                release("mntm-005", false, 20),
                release("mntm-004", false, 10),
            ],
            ..Default::default()
        });

        let version = meta.get_release_version().unwrap();
        assert_eq!(version.version, "mntm-005");
        assert_eq!(version.changelog, "- change in mntm-005");
        assert_eq!(version.timestamp, 20);
        assert!(version.files.is_empty());
    }

    #[test]
    fn test_release_version_none_cases() {
        let meta = synced(FakeRepo::default());
        assert!(meta.get_release_version().is_none());

        let meta = synced(FakeRepo {
            releases: vec![release("mntm-006-rc", true, 30)],
            ..Default::default()
        });
        assert!(meta.get_release_version().is_none());
    }

    #[test]
    fn test_release_changelog_without_heading() {
        assert_eq!(release_changelog("  just notes \n"), "just notes");
    }

    #[test]
    fn test_dev_version_from_commits() {
        let meta = synced(FakeRepo {
            commits: vec![
                commit("1a2b3c4d5e6f", "Fix **bold** `code`\n\nbody", Some("alice"), 200),
                commit("99887766aabb", "Older change", None, 100),
            ],
            ..Default::default()
        });

        let version = meta.get_dev_version("dev").unwrap();
        assert_eq!(version.version, "1a2b3c4d");
        assert_eq!(version.timestamp, 200);
        let lines: Vec<&str> = version.changelog.lines().collect();
        assert_eq!(
            lines[0],
            "[`1a2b3c4d`](https://github.com/Org/Repo/commit/1a2b3c4d5e6f): Fix bold code - [__alice__](https://github.com/alice)"
        );
        assert_eq!(
            lines[1],
            "[`99887766`](https://github.com/Org/Repo/commit/99887766aabb): Older change - __Some Author__"
        );
        assert!(version.changelog.ends_with('\n'));
    }

    #[test]
    fn test_dev_version_requires_commits() {
        let meta = synced(FakeRepo::default());
        let err = meta.get_dev_version("dev").unwrap_err();
        assert!(err.to_string().contains("No commits found in dev branch!"));
    }

    #[test]
    fn test_commit_subject_truncation() {
        let long = "x".repeat(60);
        assert_eq!(commit_subject(&long), format!("{}...", "x".repeat(50)));
        let exact = "y".repeat(50);
        assert_eq!(commit_subject(&exact), exact);
        // Multi-byte characters count as one
        let accents = "é".repeat(51);
        assert_eq!(commit_subject(&accents), format!("{}...", "é".repeat(50)));
    }
}

// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use filetime::{FileTime, set_file_mtime};
use indexer::{
    Error, FilesRoot, IdentifierPolicy, RemoteCommit, RemoteRelease, RemoteRepository, Result,
    Store,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://up.example.org/";

/// Timestamp of the newest fixture build
pub const NOW: i64 = 1_700_000_000;

pub const DEV_HEAD: &str = "1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b";
pub const DEV_PREVIOUS: &str = "9f8e7d6c5b4a39281706f5e4d3c2b1a098765432";
pub const LOGIN_HEAD: &str = "abcdef1234567890abcdef1234567890abcdef12";

#[derive(Default)]
pub struct FakeState {
    pub tags: Vec<String>,
    pub releases: Vec<RemoteRelease>,
    pub branches: Vec<String>,
    pub commits: HashMap<String, Vec<RemoteCommit>>,
    /// Every listing fails while set
    pub offline: bool,
}

/// In-memory repository whose state tests can change between reindexes
#[derive(Clone, Default)]
pub struct FakeRemote {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeRemote {
    /// Repository with a dev head, a stable release, a newer pre-release,
    /// an older tag and one feature branch
    pub fn momentum() -> Self {
        let remote = Self::default();
        {
            let mut state = remote.state.lock();
            state.tags = vec!["mntm-004".into(), "mntm-005".into(), "mntm-006".into()];
            state.releases = vec![
                release("mntm-006", true, NOW - 100),
                release("mntm-005", false, NOW - 1000),
            ];
            state.branches = vec![
                "dev".into(),
                "release".into(),
                "feature/login".into(),
                "wip".into(),
            ];
            state.commits.insert(
                "dev".into(),
                vec![
                    commit(DEV_HEAD, "Fix NFC crash", Some("alice"), NOW),
                    commit(DEV_PREVIOUS, "Add **bold** subghz presets", None, NOW - 60),
                ],
            );
            state.commits.insert(
                "feature/login".into(),
                vec![commit(LOGIN_HEAD, "Login screen", Some("bob"), NOW - 30)],
            );
        }
        remote
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub fn remove_branch(&self, branch: &str) {
        let mut state = self.state.lock();
        state.branches.retain(|b| b != branch);
        state.commits.remove(branch);
    }

    fn check_online(&self) -> Result<()> {
        if self.state.lock().offline {
            return Err(Error::RemoteMetadata("connection refused".to_string()));
        }
        Ok(())
    }
}

impl RemoteRepository for FakeRemote {
    fn full_name(&self) -> String {
        "Example/Momentum-Firmware".to_string()
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        self.check_online()?;
        Ok(self.state.lock().tags.clone())
    }

    fn list_releases(&self) -> Result<Vec<RemoteRelease>> {
        self.check_online()?;
        Ok(self.state.lock().releases.clone())
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        self.check_online()?;
        Ok(self.state.lock().branches.clone())
    }

    fn list_recent_commits(&self, branch: &str) -> Result<Vec<RemoteCommit>> {
        self.check_online()?;
        Ok(self
            .state
            .lock()
            .commits
            .get(branch)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn release(tag: &str, prerelease: bool, created_at: i64) -> RemoteRelease {
    RemoteRelease {
        title: tag.to_string(),
        tag: tag.to_string(),
        body: format!("Release notes for {tag}\n\n## 🚀 Changelog\n- Changes in {tag}\n"),
        prerelease,
        created_at,
    }
}

pub fn commit(sha: &str, message: &str, login: Option<&str>, authored_at: i64) -> RemoteCommit {
    RemoteCommit {
        sha: sha.to_string(),
        message: message.to_string(),
        html_url: format!("https://github.com/Example/Momentum-Firmware/commit/{sha}"),
        author_login: login.map(str::to_string),
        author_name: "Dev Eloper".to_string(),
        authored_at,
    }
}

/// Write `content` to `dir/name` with the given mtime (Unix seconds)
pub fn write_at(dir: &Path, name: &str, content: &[u8], mtime: i64) {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

/// Populate `firmware/` with a dev build (plus a leftover from the previous
/// one), the stable release, a tag-only directory, a populated feature
/// branch, a single-file branch and a directory for a deleted branch
pub fn populate_firmware(root: &Path) {
    let fw = root.join("firmware");

    let dev = fw.join("dev");
    write_at(&dev, "flipper-z-f7-update-mntm-dev-1a2b3c4d.tgz", b"dev update", NOW);
    write_at(&dev, "flipper-z-f7-full-mntm-dev-1a2b3c4d.bin", b"dev full", NOW - 5);
    write_at(&dev, "flipper-z-f7-update-mntm-dev-9f8e7d6c.tgz", b"old update", NOW - 600);
    write_at(&dev, "notes.txt", b"not an artifact", NOW + 10);
    write_at(&dev, ".DS_Store", b"", NOW + 20);

    let rel = fw.join("mntm-005");
    write_at(&rel, "flipper-z-f7-update-mntm-005.tgz", b"release update", NOW - 1000);
    write_at(&rel, "flipper-z-f7-full-mntm-005.bin", b"release full", NOW - 1000);

    write_at(&fw.join("mntm-004"), "flipper-z-f7-update-mntm-004.tgz", b"old", NOW - 9000);

    let login = fw.join("feature/login");
    write_at(&login, "flipper-z-f7-update-mntm-login-abcdef12.tgz", b"login update", NOW - 30);
    write_at(&login, "flipper-z-f7-full-mntm-login-abcdef12.bin", b"login full", NOW - 30);

    write_at(&fw.join("wip"), "flipper-z-f7-update-mntm-wip-00000000.tgz", b"wip", NOW);

    write_at(&fw.join("deleted-branch"), "flipper-z-f7-update-mntm-gone-11111111.tgz", b"gone", NOW);
}

/// Populate `asset-packs/` with one complete pack and one empty pack directory
pub fn populate_packs(root: &Path) {
    let pack = root.join("asset-packs/neon");
    write_at(
        &pack,
        "meta.json",
        br#"{"title": "Neon", "author": "carol", "description": "Glowing icons"}"#,
        NOW,
    );
    write_at(&pack.join("download"), "neon.zip", b"zip bytes", NOW);
    write_at(&pack.join("download"), "neon.tar.gz", b"tar bytes", NOW);
    write_at(&pack.join("preview"), "1.png", b"png", NOW);

    let source = pack.join("source/Neon");
    write_at(
        &source.join("Anims"),
        "manifest.txt",
        b"Filetype: Flipper Animation Manifest\nName: glow\nName: pulse\n",
        NOW,
    );
    write_at(&source.join("Icons/Passport"), "passport_happy_46x49.png", b"p", NOW);
    write_at(&source.join("Icons/Passport"), "passport_angry1_46x49.png", b"p", NOW);
    write_at(&source.join("Icons/Settings"), "Cry_dolph_55x52.png", b"i", NOW);
    write_at(&source.join("Fonts"), "Primary.u8f", b"f", NOW);

    fs::create_dir_all(root.join("asset-packs/empty")).unwrap();
}

/// Store over a temporary files root with a firmware repository and a pack catalog
pub fn fixture_store(remote: &FakeRemote) -> (TempDir, Store) {
    let temp = tempfile::tempdir().unwrap();
    populate_firmware(temp.path());
    populate_packs(temp.path());

    let store = Store::new(FilesRoot::new(temp.path(), BASE_URL))
        .with_repository("firmware", Box::new(remote.clone()), IdentifierPolicy::LastSegment)
        .with_packs("asset-packs")
        .with_raw_upload_dir("raw");
    (temp, store)
}

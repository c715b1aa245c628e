// src/catalog/packs.rs

//! Asset pack parsing
//!
//! Expected layout of one pack directory:
//!
//! ```text
//! <pack>/
//!   meta.json                 display fields
//!   download/*.zip, *.tar.gz  archives
//!   preview/*.png             1-7 preview images
//!   source/<bundle>/
//!     Anims/manifest.txt
//!     Icons/<set>/<icon>      icon files or animated icon dirs
//!     Icons/Passport/*.png    passport segments
//!     Fonts/*.u8f
//! ```
//!
//! Missing pieces are logged and counted as zero; only an unreadable pack or
//! a malformed `meta.json` fails the pack.

use super::{FilesRoot, is_hidden};
use crate::error::{Error, Result};
use crate::hash::sha256_file;
use crate::model::{Catalog, Pack, PackFile, PackStats};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

const META_FILE: &str = "meta.json";
const ANIM_MANIFEST: &str = "manifest.txt";
const ANIM_MARKER: &str = "Name: ";
const PASSPORT_SET: &str = "Passport";
const ICON_EXTENSIONS: &[&str] = &["png", "bmx", "bm"];
const ANIMATED_ICON_MARKERS: &[&str] = &["frame_rate", "meta"];
const FONT_EXTENSION: &str = "u8f";
const PREVIEW_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
const EXPECTED_DOWNLOADS: usize = 2;
const MAX_PREVIEWS: usize = 7;

static PASSPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:passport_)?(.*?)(?:_\d+x\d+)?$").unwrap());

/// Servable file kinds inside a pack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Download,
    Preview,
}

impl FileKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Preview => "preview",
        }
    }

    /// Parse a caller-supplied kind; anything else is not servable
    pub fn parse(kind: &str) -> Result<Self> {
        match kind {
            "download" => Ok(Self::Download),
            "preview" => Ok(Self::Preview),
            other => Err(Error::NotFound(format!("Unknown pack file type '{other}'"))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PackMeta {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Visible entries of a directory sorted by name; a missing directory is empty
fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::fs(dir, e)),
    };

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| Error::fs(dir, e))?;
        let Ok(name) = entry.file_name().into_string() else {
            warn!("Skipping non UTF-8 name in {}", dir.display());
            continue;
        };
        if !is_hidden(&name) {
            entries.push((name, entry.path()));
        }
    }
    entries.sort();
    Ok(entries)
}

fn read_meta(pack_path: &Path, pack_id: &str) -> Result<PackMeta> {
    let meta_path = pack_path.join(META_FILE);
    match fs::read_to_string(&meta_path) {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| Error::Parse(format!("Invalid {META_FILE} in pack {pack_id}: {e}"))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Pack {} has no {}, using defaults", pack_id, META_FILE);
            Ok(PackMeta::default())
        }
        Err(e) => Err(Error::fs(meta_path, e)),
    }
}

/// Passport segment name from an image stem (`passport_happy1_46x49` → `happy`)
fn passport_segment(stem: &str) -> Option<String> {
    let caps = PASSPORT_RE.captures(stem)?;
    let segment = caps[1].trim_end_matches(|c: char| c.is_ascii_digit());
    let segment = segment.trim_end_matches('_');
    (!segment.is_empty()).then(|| segment.to_string())
}

fn count_anims(bundle: &Path) -> Result<u32> {
    let manifest = bundle.join("Anims").join(ANIM_MANIFEST);
    match fs::read_to_string(&manifest) {
        Ok(content) => Ok(content
            .lines()
            .filter(|line| line.starts_with(ANIM_MARKER))
            .count() as u32),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(Error::fs(manifest, e)),
    }
}

fn is_icon(path: &Path) -> bool {
    if path.is_dir() {
        ANIMATED_ICON_MARKERS
            .iter()
            .any(|marker| path.join(marker).is_file())
    } else {
        path.is_file() && has_extension(path, ICON_EXTENSIONS)
    }
}

/// Totals for one bundle under `source/`
fn bundle_stats(bundle: &Path) -> Result<PackStats> {
    let mut stats = PackStats {
        packs: 1,
        anims: count_anims(bundle)?,
        ..Default::default()
    };

    for (set_name, set_path) in sorted_entries(&bundle.join("Icons"))? {
        if !set_path.is_dir() {
            continue;
        }
        for (_, icon_path) in sorted_entries(&set_path)? {
            if set_name == PASSPORT_SET {
                if icon_path.is_file() && has_extension(&icon_path, ICON_EXTENSIONS) {
                    let segment = icon_path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .and_then(passport_segment);
                    if let Some(segment) = segment {
                        stats.passport.insert(segment);
                    }
                }
            } else if is_icon(&icon_path) {
                stats.icons += 1;
            }
        }
    }

    for (_, font_path) in sorted_entries(&bundle.join("Fonts"))? {
        if font_path.is_file() && has_extension(&font_path, &[FONT_EXTENSION]) {
            if let Some(stem) = font_path.file_stem().and_then(|s| s.to_str()) {
                stats.fonts.insert(stem.to_string());
            }
        }
    }

    Ok(stats)
}

fn archive_type(name: &str) -> Option<&'static str> {
    if name.ends_with(".tar.gz") {
        Some("tar_gz")
    } else if name.ends_with(".zip") {
        Some("zip")
    } else {
        None
    }
}

/// Parse one pack directory
pub fn parse_pack(files: &FilesRoot, main_dir: &str, pack_path: &Path) -> Result<Pack> {
    let pack_id = pack_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Parse(format!("Invalid pack path {}", pack_path.display())))?
        .to_string();

    let meta = read_meta(pack_path, &pack_id)?;

    let mut stats = PackStats::default();
    let source = pack_path.join("source");
    if !source.is_dir() {
        warn!("Pack {} has no source directory", pack_id);
    }
    for (bundle_name, bundle_path) in sorted_entries(&source)? {
        if !bundle_path.is_dir() {
            continue;
        }
        let bundle = bundle_stats(&bundle_path)?;
        if bundle.is_empty() {
            warn!("Bundle {} in pack {} is empty", bundle_name, pack_id);
        }
        stats.merge(bundle);
    }

    let download_kind = FileKind::Download.dir_name();
    let mut pack_files = Vec::new();
    for (name, path) in sorted_entries(&pack_path.join(download_kind))? {
        let Some(file_type) = archive_type(&name) else {
            warn!("Unexpected download {} in pack {}", name, pack_id);
            continue;
        };
        match sha256_file(&path) {
            Ok(sha256) => pack_files.push(PackFile {
                url: files.url(&[main_dir, &pack_id, download_kind, &name]),
                file_type: file_type.to_string(),
                sha256,
            }),
            Err(e) => warn!("Failed to hash {}: {}", path.display(), e),
        }
    }
    if pack_files.len() != EXPECTED_DOWNLOADS {
        warn!(
            "Pack {} has {} downloads, expected {}",
            pack_id,
            pack_files.len(),
            EXPECTED_DOWNLOADS
        );
    }

    let preview_kind = FileKind::Preview.dir_name();
    let preview_urls: Vec<String> = sorted_entries(&pack_path.join(preview_kind))?
        .into_iter()
        .filter(|(_, path)| path.is_file() && has_extension(path, PREVIEW_EXTENSIONS))
        .map(|(name, _)| files.url(&[main_dir, &pack_id, preview_kind, &name]))
        .collect();
    if preview_urls.is_empty() || preview_urls.len() > MAX_PREVIEWS {
        warn!(
            "Pack {} has {} previews, expected 1 to {}",
            pack_id,
            preview_urls.len(),
            MAX_PREVIEWS
        );
    }

    Ok(Pack {
        title: meta.title.unwrap_or_else(|| pack_id.clone()),
        author: meta.author.unwrap_or_default(),
        source_url: meta.source_url.unwrap_or_default(),
        description: meta.description.unwrap_or_default(),
        id: pack_id,
        files: pack_files,
        preview_urls,
        stats,
    })
}

/// Parse every pack of an asset-pack directory in name order
///
/// A pack that fails to parse is logged and left out; a missing or unreadable
/// catalog directory fails the whole build.
pub fn build_catalog(files: &FilesRoot, main_dir: &str) -> Result<Catalog> {
    let directory_path = files.dir(main_dir);
    if !directory_path.is_dir() {
        return Err(Error::NotFound(format!(
            "Directory {} not found!",
            directory_path.display()
        )));
    }

    let mut catalog = Catalog::default();
    for (name, pack_path) in sorted_entries(&directory_path)? {
        if !pack_path.is_dir() {
            continue;
        }
        // Left for the empty-directory pass
        if fs::read_dir(&pack_path).is_ok_and(|mut d| d.next().is_none()) {
            debug!("Skipping empty pack directory {}/{}", main_dir, name);
            continue;
        }
        match parse_pack(files, main_dir, &pack_path) {
            Ok(pack) => catalog.add_pack(pack),
            Err(e) => warn!("Skipping pack {}/{}: {}", main_dir, name, e),
        }
    }

    info!("Built {} packs for {}", catalog.packs.len(), main_dir);
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn setup() -> (TempDir, FilesRoot) {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("asset-packs")).unwrap();
        let files = FilesRoot::new(temp.path(), "https://up.example.org/");
        (temp, files)
    }

    fn full_pack(root: &Path) -> PathBuf {
        let pack = root.join("asset-packs/neon");
        touch(
            &pack.join("meta.json"),
            r#"{"title": "Neon", "author": "Alice", "description": "Glowing"}"#,
        );
        touch(&pack.join("download/neon.zip"), "zip");
        touch(&pack.join("download/neon.tar.gz"), "tgz");
        touch(&pack.join("preview/1.png"), "p");
        touch(&pack.join("preview/2.png"), "p");

        let bundle = pack.join("source/Neon");
        touch(
            &bundle.join("Anims/manifest.txt"),
            "Filetype: Flipper Animation Manifest\nName: A\nMin butthurt: 0\nName: B\n",
        );
        touch(&bundle.join("Icons/Animations/Levelup_128x64/frame_rate"), "4");
        touch(&bundle.join("Icons/Animations/NotAnIcon_128x64/readme"), "x");
        touch(&bundle.join("Icons/Settings/dolph.png"), "i");
        touch(&bundle.join("Icons/Settings/notes.txt"), "x");
        touch(&bundle.join("Icons/Passport/passport_happy1_46x49.png"), "i");
        touch(&bundle.join("Icons/Passport/passport_happy2_46x49.png"), "i");
        touch(&bundle.join("Icons/Passport/passport_background_128x64.png"), "i");
        touch(&bundle.join("Fonts/BigNumbers.u8f"), "f");

        let second = pack.join("source/NeonExtra");
        touch(&second.join("Fonts/BigNumbers.u8f"), "f");
        touch(&second.join("Fonts/Keyboard.u8f"), "f");
        pack
    }

    #[test]
    fn test_parse_full_pack() {
        let (temp, files) = setup();
        let pack_path = full_pack(temp.path());

        let pack = parse_pack(&files, "asset-packs", &pack_path).unwrap();
        assert_eq!(pack.id, "neon");
        assert_eq!(pack.title, "Neon");
        assert_eq!(pack.author, "Alice");
        assert_eq!(pack.source_url, "");

        assert_eq!(pack.stats.packs, 2);
        assert_eq!(pack.stats.anims, 2);
        assert_eq!(pack.stats.icons, 2);
        assert_eq!(
            pack.stats.passport.iter().collect::<Vec<_>>(),
            vec!["background", "happy"]
        );
        assert_eq!(
            pack.stats.fonts.iter().collect::<Vec<_>>(),
            vec!["BigNumbers", "Keyboard"]
        );

        let types: Vec<&str> = pack.files.iter().map(|f| f.file_type.as_str()).collect();
        assert_eq!(types, vec!["tar_gz", "zip"]);
        assert_eq!(
            pack.files[1].url,
            "https://up.example.org/asset-packs/neon/download/neon.zip"
        );
        assert_eq!(pack.files[1].sha256, crate::hash::sha256(b"zip"));
        assert_eq!(pack.preview_urls.len(), 2);
        assert!(pack.preview_urls[0].ends_with("/asset-packs/neon/preview/1.png"));
    }

    #[test]
    fn test_missing_meta_uses_directory_defaults() {
        let (temp, files) = setup();
        let pack_path = temp.path().join("asset-packs/bare");
        fs::create_dir_all(&pack_path).unwrap();

        let pack = parse_pack(&files, "asset-packs", &pack_path).unwrap();
        assert_eq!(pack.title, "bare");
        assert_eq!(pack.author, "");
        assert!(pack.files.is_empty());
        assert_eq!(pack.stats, PackStats::default());
    }

    #[test]
    fn test_invalid_meta_is_parse_error() {
        let (temp, files) = setup();
        let pack_path = temp.path().join("asset-packs/broken");
        touch(&pack_path.join("meta.json"), "{not json");

        let err = parse_pack(&files, "asset-packs", &pack_path).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("broken")));
    }

    #[test]
    fn test_catalog_skips_broken_and_hidden_packs() {
        let (temp, files) = setup();
        full_pack(temp.path());
        touch(&temp.path().join("asset-packs/broken/meta.json"), "[1,");
        touch(&temp.path().join("asset-packs/.trash/meta.json"), "{}");
        touch(&temp.path().join("asset-packs/alpha/meta.json"), "{}");
        touch(&temp.path().join("asset-packs/stray.txt"), "x");

        let catalog = build_catalog(&files, "asset-packs").unwrap();
        let ids: Vec<&str> = catalog.packs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "neon"]);
    }

    #[test]
    fn test_catalog_requires_directory() {
        let (_temp, files) = setup();
        let err = build_catalog(&files, "missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_passport_segment_names() {
        assert_eq!(passport_segment("passport_happy1_46x49").as_deref(), Some("happy"));
        assert_eq!(passport_segment("passport_okay_46x49").as_deref(), Some("okay"));
        assert_eq!(
            passport_segment("passport_background_128x64").as_deref(),
            Some("background")
        );
        assert_eq!(passport_segment("bad3").as_deref(), Some("bad"));
        assert_eq!(passport_segment("passport_").as_deref(), None);
    }

    #[test]
    fn test_file_kind_parse() {
        assert_eq!(FileKind::parse("download").unwrap(), FileKind::Download);
        assert_eq!(FileKind::parse("preview").unwrap(), FileKind::Preview);
        assert!(FileKind::parse("source").unwrap_err().is_not_found());
    }
}

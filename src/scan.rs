//! Source discovery and classification.
//!
//! Walks the source directory and classifies every file by extension alone:
//!
//! | Extension (any case) | Kind |
//! |---|---|
//! | `gif` | [`AssetKind::Animated`] |
//! | `jpg`, `jpeg`, `png`, `webp` | [`AssetKind::Static`] |
//!
//! Everything else is ignored. Entries are visited in file-name order so the
//! discovery order, and therefore the manifest order, is stable across runs
//! and platforms. Hidden entries and anything inside an output root (when the
//! outputs are nested under the source) are skipped.
//!
//! Two sources that map to the same output stem (`beach.jpg` and `beach.png`
//! in one directory) would overwrite each other's outputs. The first one in
//! discovery order wins; later ones are reported in [`ScanResult::collisions`].

use crate::naming;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Processing branch for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Static,
    Animated,
}

const STATIC_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const ANIMATED_EXTENSIONS: &[&str] = &["gif"];

/// Classify a path by its extension (case-insensitive).
pub fn classify(path: &Path) -> Option<AssetKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ANIMATED_EXTENSIONS.contains(&ext.as_str()) {
        Some(AssetKind::Animated)
    } else if STATIC_EXTENSIONS.contains(&ext.as_str()) {
        Some(AssetKind::Static)
    } else {
        None
    }
}

/// A discovered source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Path on disk.
    pub path: PathBuf,
    /// Path relative to the source root, forward slashes.
    pub original: String,
    /// Relative path without extension; outputs are named after it.
    pub stem_path: PathBuf,
    pub kind: AssetKind,
}

/// A source skipped because an earlier file already claimed its output names.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub original: String,
    /// The earlier source that keeps the output names.
    pub kept: String,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: Vec<SourceFile>,
    pub collisions: Vec<Collision>,
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Walk `root` and collect supported files in discovery order.
///
/// Directories listed in `exclude` (typically the output roots) are pruned
/// when they sit inside `root`.
pub fn scan(root: &Path, exclude: &[&Path]) -> Result<ScanResult, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::SourceNotFound(root.to_path_buf()));
    }

    let excluded: Vec<&Path> = exclude
        .iter()
        .copied()
        .filter(|dir| naming::is_within(dir, root) && !naming::is_within(root, dir))
        .collect();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !is_hidden(entry)
                && !(entry.file_type().is_dir()
                    && excluded.iter().any(|dir| naming::is_within(entry.path(), dir)))
        });

    let mut result = ScanResult::default();
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = classify(entry.path()) else {
            continue;
        };

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let original = naming::normalize_relative(relative);
        let stem_path = naming::stem_path(relative);

        if let Some(kept) = claimed.get(&stem_path) {
            result.collisions.push(Collision {
                original,
                kept: kept.clone(),
            });
            continue;
        }
        claimed.insert(stem_path.clone(), original.clone());

        result.files.push(SourceFile {
            path: entry.path().to_path_buf(),
            original,
            stem_path,
            kind,
        });
    }

    Ok(result)
}

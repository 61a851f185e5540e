//! Output naming and path normalization.
//!
//! Output files are named after the source's base name with the original
//! extension stripped, placed under the same sub-directory they had in the
//! source tree:
//!
//! ```text
//! images/trips/Beach.JPG  →  images-optimized/trips/Beach.webp
//!                            images-optimized/trips/Beach.avif
//!                            images-optimized/thumbs/trips/Beach.webp
//! ```
//!
//! Manifest entries always use forward slashes regardless of platform.

use crate::types::Variant;
use std::path::{Component, Path, PathBuf};

/// Render a relative path with `/` separators.
pub fn normalize_relative(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Source path relative to the source root, extension stripped.
///
/// `trips/Beach.JPG` → `trips/Beach`. This is the identity used for output
/// naming and collision detection.
pub fn stem_path(relative: &Path) -> PathBuf {
    let stem = relative.file_stem().unwrap_or(relative.as_os_str());
    match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(stem),
        _ => PathBuf::from(stem),
    }
}

/// Full output path for one variant: `<root>/<stem_path>.<ext>`.
pub fn output_path(root: &Path, stem_path: &Path, variant: Variant) -> PathBuf {
    let mut name = stem_path.as_os_str().to_os_string();
    name.push(".");
    name.push(variant.extension());
    root.join(name)
}

/// Lexically resolve `.` and `..` components after making the path absolute.
fn absolute_clean(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Express `target` relative to the directory `base`, with `/` separators.
///
/// Purely lexical (no symlink resolution); inserts `..` segments when
/// `target` is not inside `base`.
pub fn relative_to(base: &Path, target: &Path) -> String {
    let base = absolute_clean(base);
    let target = absolute_clean(target);

    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();
    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &target_parts[common..] {
        rel.push(part);
    }
    normalize_relative(&rel)
}

/// Whether `path` lives inside `dir` (both resolved lexically).
pub fn is_within(path: &Path, dir: &Path) -> bool {
    absolute_clean(path).starts_with(absolute_clean(dir))
}

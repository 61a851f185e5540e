//! Manifest writer.
//!
//! The manifest is the JSON array of [`AssetRecord`]s the gallery viewer
//! loads. It is written in one step: serialized into a temporary file next
//! to the target, then renamed over it. Readers (a web server, a deploy
//! step) see either the previous manifest or the new one, never a partial
//! file, and a run that dies before the rename leaves the old one intact.

use crate::types::AssetRecord;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not replace manifest: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Atomically replace the manifest at `path` with `records`.
pub fn write_manifest(path: &Path, records: &[AssetRecord]) -> Result<(), ManifestError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let json = serde_json::to_string_pretty(records)?;

    // Same directory as the target so the rename never crosses filesystems
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;

    // Temp files are created owner-only; the manifest is served to browsers
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    tmp.persist(path)?;
    Ok(())
}

/// Read a manifest written by [`write_manifest`].
pub fn read_manifest(path: &Path) -> Result<Vec<AssetRecord>, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

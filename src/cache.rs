//! Processing cache for incremental re-runs.
//!
//! AVIF encoding and ffmpeg transcodes dominate a run. In CI the output
//! directory is usually restored from a cache between builds, so this module
//! lets the optimizer skip every encode for a source whose content and
//! encoding settings are unchanged since the last run.
//!
//! # Design
//!
//! The cache works at record granularity: one entry per source file, keyed by
//! the source's path relative to the source root, holding the
//! [`AssetRecord`] the last run produced for it.
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout` (which resets
//!   modification times).
//! - **`params_hash`**: SHA-256 of every setting that influences outputs:
//!   qualities, sizes, codec settings, and the output layout.
//!
//! A cache hit requires matching hashes **and** every output file referenced
//! by the cached record still existing on disk.
//!
//! Only complete records are stored. A degraded result (a GIF copied because
//! ffmpeg failed, a missing variant) is retried on the next run.
//!
//! ## Storage
//!
//! The cache manifest is `<optimized root>/.optimize-cache.json`. Each run
//! writes a fresh cache containing only the sources it saw, so entries for
//! deleted sources disappear. `--no-cache` starts from an empty cache.

use crate::config::OptimizerConfig;
use crate::types::AssetRecord;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the optimized output root.
const CACHE_FILENAME: &str = ".optimize-cache.json";

/// Bump to invalidate every existing cache when the format or keys change.
const CACHE_VERSION: u32 = 1;

/// The cached outcome for one source file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
    pub record: AssetRecord,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or a first run).
    pub fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(cache_path(output_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == CACHE_VERSION => m,
            _ => Self::empty(),
        }
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(output_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(cache_path(output_dir), json)
    }

    /// Look up the cached record for a source.
    ///
    /// Output paths in records are relative to `manifest_dir`; every one of
    /// them must still exist for a hit.
    pub fn find_cached(
        &self,
        original: &str,
        source_hash: &str,
        params_hash: &str,
        manifest_dir: &Path,
    ) -> Option<&AssetRecord> {
        let entry = self.entries.get(original)?;
        if entry.source_hash != source_hash || entry.params_hash != params_hash {
            return None;
        }
        entry
            .record
            .output_paths()
            .all(|rel| manifest_dir.join(rel).exists())
            .then_some(&entry.record)
    }

    pub fn insert(&mut self, record: AssetRecord, source_hash: String, params_hash: String) {
        self.entries.insert(
            record.original.clone(),
            CacheEntry {
                source_hash,
                params_hash,
                record,
            },
        );
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 hash of every config value that affects a record.
///
/// The transcoder binary is left out: pointing at a different ffmpeg build
/// does not change what a record looks like.
pub fn hash_params(config: &OptimizerConfig) -> String {
    let video = &config.video;
    let key = serde_json::json!({
        "paths": {
            "optimized": config.paths.optimized,
            "thumbnails": config.paths.thumbnails,
            "manifest": config.paths.manifest,
        },
        "images": config.images,
        "thumbnails": config.thumbnails,
        "video": [
            video.primary_crf,
            video.secondary_crf,
            video.thumbnail_seconds,
            video.thumbnail_fps,
        ],
    });
    let mut hasher = Sha256::new();
    hasher.update(key.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of what a run did per source file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Reused from the cache without encoding.
    pub cached: u32,
    /// Fully encoded.
    pub encoded: u32,
    /// Recorded with a fallback or missing variants.
    pub degraded: u32,
    /// Dropped from the manifest.
    pub skipped: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.cached + self.encoded + self.degraded + self.skipped
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cached, {} encoded, {} degraded, {} skipped ({} total)",
            self.cached,
            self.encoded,
            self.degraded,
            self.skipped,
            self.total()
        )
    }
}

/// Path to the cache manifest file in the given output directory.
pub fn cache_path(output_dir: &Path) -> PathBuf {
    output_dir.join(CACHE_FILENAME)
}

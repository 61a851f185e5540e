//! Optimizer configuration.
//!
//! Handles loading, validating, and merging the `gallery.toml` file. Every key
//! is optional: user values are merged on top of the stock defaults, so a
//! config file only needs the values it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! [paths]
//! source = "images"                            # Source images (never modified)
//! optimized = "images-optimized"               # Full-size outputs
//! thumbnails = "images-optimized/thumbs"       # Square thumbnails
//! manifest = "images-optimized/index.json"     # Manifest read by the viewer
//!
//! [images]
//! max_width = 1920          # Full-size outputs never exceed this width
//! webp_quality = 80
//! avif_quality = 60
//!
//! [thumbnails]
//! size = 480                # Square edge, center-cropped to fill
//! webp_quality = 60
//! avif_quality = 50
//!
//! [video]
//! ffmpeg = "ffmpeg"         # Transcoder binary (name on PATH or full path)
//! primary_crf = 35          # VP9 constant quality
//! secondary_crf = 30        # VP8 constant quality (fallback)
//! thumbnail_seconds = 3     # Max thumbnail clip length
//! thumbnail_fps = 15        # Thumbnail clip frame-rate cap
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Optimizer configuration loaded from `gallery.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Input and output locations.
    pub paths: PathsConfig,
    /// Full-size static image settings.
    pub images: ImagesConfig,
    /// Square thumbnail settings.
    pub thumbnails: ThumbnailsConfig,
    /// GIF → WebM transcoding settings.
    pub video: VideoConfig,
}

impl OptimizerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let qualities = [
            ("images.webp_quality", self.images.webp_quality),
            ("images.avif_quality", self.images.avif_quality),
            ("thumbnails.webp_quality", self.thumbnails.webp_quality),
            ("thumbnails.avif_quality", self.thumbnails.avif_quality),
        ];
        for (key, value) in qualities {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if self.images.max_width == 0 {
            return Err(ConfigError::Validation(
                "images.max_width must be non-zero".into(),
            ));
        }
        if self.thumbnails.size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.size must be non-zero".into(),
            ));
        }
        for (key, value) in [
            ("video.primary_crf", self.video.primary_crf),
            ("video.secondary_crf", self.video.secondary_crf),
        ] {
            if value > 63 {
                return Err(ConfigError::Validation(format!("{key} must be 0-63")));
            }
        }
        if self.video.thumbnail_seconds == 0 || self.video.thumbnail_fps == 0 {
            return Err(ConfigError::Validation(
                "video.thumbnail_seconds and video.thumbnail_fps must be non-zero".into(),
            ));
        }
        if self.video.ffmpeg.trim().is_empty() {
            return Err(ConfigError::Validation(
                "video.ffmpeg must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Input and output locations.
///
/// Relative paths are resolved against the working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub source: PathBuf,
    pub optimized: PathBuf,
    pub thumbnails: PathBuf,
    pub manifest: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: "images".into(),
            optimized: "images-optimized".into(),
            thumbnails: "images-optimized/thumbs".into(),
            manifest: "images-optimized/index.json".into(),
        }
    }
}

/// Full-size static image settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Maximum output width in pixels. Smaller sources keep their width.
    pub max_width: u32,
    pub webp_quality: u32,
    pub avif_quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            webp_quality: 80,
            avif_quality: 60,
        }
    }
}

/// Square thumbnail settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Edge length of the square thumbnail.
    pub size: u32,
    pub webp_quality: u32,
    pub avif_quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            size: 480,
            webp_quality: 60,
            avif_quality: 50,
        }
    }
}

/// GIF → WebM transcoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    /// Transcoder binary, looked up on `PATH` when not a path.
    pub ffmpeg: String,
    /// Constant-quality value for the primary codec (VP9).
    pub primary_crf: u32,
    /// Constant-quality value for the secondary codec (VP8).
    pub secondary_crf: u32,
    /// Maximum thumbnail clip length.
    pub thumbnail_seconds: u32,
    /// Thumbnail clip frame-rate cap.
    pub thumbnail_fps: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            primary_crf: 35,
            secondary_crf: 30,
            thumbnail_seconds: 3,
            thumbnail_fps: 15,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(OptimizerConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<OptimizerConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: OptimizerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// A missing file is not an error: the stock defaults are returned.
pub fn load_config(path: &Path) -> Result<OptimizerConfig, ConfigError> {
    if !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `gallery.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Gallery Optimizer Configuration
# ===============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Locations (relative paths resolve against the working directory)
# ---------------------------------------------------------------------------
[paths]
# Source images. Never modified.
source = "images"

# Full-size optimized outputs.
optimized = "images-optimized"

# Square thumbnails.
thumbnails = "images-optimized/thumbs"

# Manifest read by the gallery viewer. Output paths inside it are relative
# to this file's directory.
manifest = "images-optimized/index.json"

# ---------------------------------------------------------------------------
# Full-size static images (jpg, jpeg, png, webp)
# ---------------------------------------------------------------------------
[images]
# Outputs are scaled down to this width; smaller images are never enlarged.
max_width = 1920

# Encoding quality (1 = worst, 100 = best).
webp_quality = 80
avif_quality = 60

# ---------------------------------------------------------------------------
# Thumbnails (square, center-cropped to fill)
# ---------------------------------------------------------------------------
[thumbnails]
size = 480
webp_quality = 60
avif_quality = 50

# ---------------------------------------------------------------------------
# Animated GIFs -> WebM
# ---------------------------------------------------------------------------
[video]
# Transcoder binary. When it cannot be run, GIFs are copied as-is.
ffmpeg = "ffmpeg"

# Constant-quality values (0-63, lower = better). VP9 is tried first,
# VP8 is the fallback.
primary_crf = 35
secondary_crf = 30

# Thumbnail clips are cut to this length and capped at this frame rate.
thumbnail_seconds = 3
thumbnail_fps = 15
"##
}

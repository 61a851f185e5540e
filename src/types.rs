//! Manifest types shared between the optimizer and the manifest writer.
//!
//! These types are the on-disk contract with the gallery viewer: the manifest
//! is a JSON array of [`AssetRecord`]s, and variant keys double as output file
//! extensions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which processing branch produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    /// Static image re-encoded to WebP and AVIF.
    Image,
    /// Animated GIF transcoded to a WebM video.
    Webm,
    /// Animated GIF copied verbatim after every transcode attempt failed.
    Gif,
}

/// An encoding variant. The serialized name is also the output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Webp,
    Avif,
    Webm,
    Gif,
}

impl Variant {
    pub fn extension(self) -> &'static str {
        match self {
            Variant::Webp => "webp",
            Variant::Avif => "avif",
            Variant::Webm => "webm",
            Variant::Gif => "gif",
        }
    }

    /// Variants produced for a static image (and for still-frame thumbnails).
    pub fn still() -> [Variant; 2] {
        [Variant::Webp, Variant::Avif]
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Variant name → output path (forward slashes, relative to the manifest).
pub type VariantMap = BTreeMap<Variant, String>;

/// One manifest entry per source file.
///
/// `optimized` always has at least one entry. `thumbnail` is empty when the
/// GIF copy fallback was used, so consumers must probe for the keys present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Source path relative to the source root.
    pub original: String,
    pub format: AssetFormat,
    pub optimized: VariantMap,
    pub thumbnail: VariantMap,
}

impl AssetRecord {
    /// All output paths referenced by this record.
    pub fn output_paths(&self) -> impl Iterator<Item = &String> {
        self.optimized.values().chain(self.thumbnail.values())
    }
}

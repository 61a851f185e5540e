//! High-level image operations.
//!
//! These functions combine calculations with backend execution. Each variant
//! (WebP, AVIF) is encoded independently: one failing encode is reported in
//! [`EncodedVariants::failed`] without preventing the other.

use super::backend::{BackendError, ImageBackend};
use super::calculations::fit_to_width;
use super::params::{Quality, ResizeParams, ThumbnailParams};
use crate::naming;
use crate::types::Variant;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Per-variant qualities for still images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StillEncoding {
    pub webp: Quality,
    pub avif: Quality,
}

impl StillEncoding {
    fn quality(&self, variant: Variant) -> Quality {
        match variant {
            Variant::Avif => self.avif,
            _ => self.webp,
        }
    }
}

/// Configuration for the full-size optimized image.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedConfig {
    pub max_width: u32,
    pub encoding: StillEncoding,
}

/// Configuration for square thumbnails.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailConfig {
    pub size: u32,
    pub encoding: StillEncoding,
}

/// Outcome of encoding every still variant of one asset.
#[derive(Debug, Default)]
pub struct EncodedVariants {
    pub written: Vec<(Variant, PathBuf)>,
    pub failed: Vec<(Variant, BackendError)>,
}

impl EncodedVariants {
    fn record(&mut self, variant: Variant, output: PathBuf, result: Result<()>) {
        match result {
            Ok(()) => self.written.push((variant, output)),
            Err(e) => self.failed.push((variant, e)),
        }
    }
}

/// Create the full-size WebP and AVIF outputs.
///
/// Width is capped at `config.max_width`; smaller sources keep their size.
pub fn create_optimized_image(
    backend: &impl ImageBackend,
    source: &Path,
    original_dims: (u32, u32),
    output_root: &Path,
    stem_path: &Path,
    config: &OptimizedConfig,
) -> EncodedVariants {
    let (width, height) = fit_to_width(original_dims, config.max_width);
    let mut encoded = EncodedVariants::default();

    for variant in Variant::still() {
        let output = naming::output_path(output_root, stem_path, variant);
        let result = backend.resize(&ResizeParams {
            source: source.to_path_buf(),
            output: output.clone(),
            width,
            height,
            quality: config.encoding.quality(variant),
        });
        encoded.record(variant, output, result);
    }

    encoded
}

/// Plan a square thumbnail operation without executing it.
pub fn plan_thumbnail(
    source: &Path,
    output: &Path,
    size: u32,
    quality: Quality,
) -> ThumbnailParams {
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        crop_width: size,
        crop_height: size,
        quality,
    }
}

/// Create `size × size` WebP and AVIF thumbnails.
///
/// The source is resized so its shorter edge fills the square, then the
/// excess is cropped evenly from both sides. For animated sources the
/// backend decodes the first frame.
pub fn create_square_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output_root: &Path,
    stem_path: &Path,
    config: &ThumbnailConfig,
) -> EncodedVariants {
    let mut encoded = EncodedVariants::default();

    for variant in Variant::still() {
        let output = naming::output_path(output_root, stem_path, variant);
        let params = plan_thumbnail(
            source,
            &output,
            config.size,
            config.encoding.quality(variant),
        );
        let result = backend.thumbnail(&params);
        encoded.record(variant, output, result);
    }

    encoded
}

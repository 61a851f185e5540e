//! The asset optimizer: turns discovered sources into manifest records.
//!
//! Every source goes through exactly one branch:
//!
//! ```text
//! static   identify → full-size webp+avif → 480×480 webp+avif thumbnail
//! animated full-size chain [vp9, vp8, copy .gif]
//!            ├─ copy   → format "gif", empty thumbnail, done
//!            └─ webm   → thumbnail chain [vp9, vp8, first frame webp+avif]
//! ```
//!
//! ## Failure handling
//!
//! Failures are scoped to the smallest unit that can absorb them:
//!
//! - A single variant failing (AVIF encode, say) drops only that variant.
//! - A file whose optimized or thumbnail map ends up empty, or whose
//!   full-size or thumbnail chain is exhausted, is left out of the manifest
//!   with a logged reason. The run continues with the next file.
//! - Only run-level problems ([`ProcessError`]: unreadable source root,
//!   manifest write) abort the run.
//!
//! Processing is strictly sequential. Each file produces a [`FileOutcome`]
//! and the manifest is assembled from those outcomes in discovery order.
//!
//! ## Output Structure
//!
//! ```text
//! images/                       images-optimized/
//! ├── trips/                    ├── index.json          # manifest
//! │   ├── beach.jpg      →      ├── trips/
//! │   └── party.gif             │   ├── beach.webp
//! └── logo.png                  │   ├── beach.avif
//!                               │   └── party.webm
//!                               ├── logo.webp
//!                               ├── logo.avif
//!                               └── thumbs/
//!                                   ├── trips/beach.webp
//!                                   ├── trips/beach.avif
//!                                   ├── trips/party.webm
//!                                   └── ...
//! ```

use crate::cache::{self, CacheEntry, CacheManifest, CacheStats};
use crate::config::OptimizerConfig;
use crate::imaging::{
    BackendError, EncodedVariants, ImageBackend, OptimizedConfig, Quality, RustBackend,
    StillEncoding, ThumbnailConfig, create_optimized_image, create_square_thumbnail,
    get_dimensions,
};
use crate::manifest::{self, ManifestError};
use crate::naming;
use crate::scan::{self, AssetKind, Collision, ScanError, SourceFile};
use crate::types::{AssetFormat, AssetRecord, Variant, VariantMap};
use crate::video::{
    self, ChainExhausted, ChainOutcome, ClipProfile, CopyOriginal, FfmpegTranscoder,
    FrameThumbnail, TranscodeJob, Transcoder, VideoCodec,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Run-level failures. Anything that goes wrong for a single file is a
/// [`FileError`] instead and never aborts the run.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Manifest write failed: {0}")]
    Manifest(#[from] ManifestError),
}

/// Why a single file was left out of the manifest.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("{0}")]
    FallbackExhausted(#[from] ChainExhausted),
}

/// How one output variant came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStatus {
    /// Reused from a previous run.
    Cached,
    /// Produced by the preferred encoder.
    Encoded,
    /// Produced by a later tier of a fallback chain.
    Fallback,
    /// The source was copied verbatim.
    Copied,
    /// Every attempt for this variant failed.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantInfo {
    /// Display label, e.g. "optimized webp" or "thumbnail webm (vp8)".
    pub label: String,
    pub status: VariantStatus,
}

/// Progress events sent to the CLI while files are processed.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    FileProcessed {
        /// 1-based position in discovery order.
        index: usize,
        original: String,
        format: AssetFormat,
        variants: Vec<VariantInfo>,
    },
    FileSkipped {
        index: usize,
        original: String,
        reason: String,
    },
}

/// What happened to one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Cached,
    Encoded,
    /// Recorded, but through the GIF copy or with missing variants.
    Degraded,
    Skipped,
}

/// Result of processing one source file.
#[derive(Debug)]
pub struct FileOutcome {
    pub status: FileStatus,
    pub record: Option<AssetRecord>,
    /// Entry to carry into the next run's cache, for complete records only.
    pub cache_entry: Option<CacheEntry>,
}

/// Records in discovery order, plus the cache to persist for the next run.
#[derive(Debug)]
pub struct ProcessResult {
    pub records: Vec<AssetRecord>,
    pub cache: CacheManifest,
    pub stats: CacheStats,
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub manifest_path: PathBuf,
    pub files_found: usize,
    pub records_written: usize,
    pub collisions: Vec<Collision>,
    pub stats: CacheStats,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// No supported files in the source tree. Nothing was written.
    NoFiles,
    Completed(RunSummary),
}

/// Run the whole optimizer with the pure-Rust image backend and ffmpeg.
///
/// The transcoder is probed once up front. When it is missing the run still
/// proceeds: GIFs fall through to the copy tier.
pub fn process(
    config: &OptimizerConfig,
    use_cache: bool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<RunOutcome, ProcessError> {
    let video_config = &config.video;
    match video::probe(&video_config.ffmpeg) {
        Ok(version) => info!(%version, "found transcoder"),
        Err(e) => warn!(error = %e, "transcoder unavailable, GIFs will be copied unconverted"),
    }

    let vp9 = FfmpegTranscoder::new(
        video_config.ffmpeg.clone(),
        VideoCodec::Vp9,
        video_config.primary_crf,
    );
    let vp8 = FfmpegTranscoder::new(
        video_config.ffmpeg.clone(),
        VideoCodec::Vp8,
        video_config.secondary_crf,
    );
    let backend = RustBackend::new();

    process_with(&backend, &[&vp9, &vp8], config, use_cache, progress)
}

/// Run the optimizer with explicit backends (allows testing with mocks).
///
/// `video_tiers` are the transcoders to try, in order, before the built-in
/// fallbacks (GIF copy for full size, still frame for thumbnails).
pub fn process_with(
    backend: &impl ImageBackend,
    video_tiers: &[&dyn Transcoder],
    config: &OptimizerConfig,
    use_cache: bool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<RunOutcome, ProcessError> {
    let paths = &config.paths;
    let scanned = scan::scan(
        &paths.source,
        &[paths.optimized.as_path(), paths.thumbnails.as_path()],
    )?;
    for collision in &scanned.collisions {
        warn!(
            source = %collision.original,
            kept = %collision.kept,
            "output name already taken, skipping"
        );
    }

    if scanned.files.is_empty() {
        return Ok(RunOutcome::NoFiles);
    }
    std::fs::create_dir_all(&paths.optimized)?;
    std::fs::create_dir_all(&paths.thumbnails)?;

    let cache = if use_cache {
        CacheManifest::load(&paths.optimized)
    } else {
        CacheManifest::empty()
    };

    let result = process_files(
        backend,
        video_tiers,
        config,
        &scanned.files,
        &cache,
        progress.as_ref(),
    );

    manifest::write_manifest(&paths.manifest, &result.records)?;
    if let Err(e) = result.cache.save(&paths.optimized) {
        warn!(error = %e, "could not save processing cache");
    }

    Ok(RunOutcome::Completed(RunSummary {
        manifest_path: paths.manifest.clone(),
        files_found: scanned.files.len(),
        records_written: result.records.len(),
        collisions: scanned.collisions,
        stats: result.stats,
    }))
}

/// Process every file in order and assemble the manifest records.
pub fn process_files(
    backend: &impl ImageBackend,
    video_tiers: &[&dyn Transcoder],
    config: &OptimizerConfig,
    files: &[SourceFile],
    cache: &CacheManifest,
    progress: Option<&Sender<ProcessEvent>>,
) -> ProcessResult {
    let pipeline = Pipeline::new(backend, video_tiers, config);
    let params_hash = cache::hash_params(config);

    let outcomes: Vec<FileOutcome> = files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let (outcome, event) = pipeline.process_file(i + 1, file, cache, &params_hash);
            if let Some(tx) = progress {
                tx.send(event).ok();
            }
            outcome
        })
        .collect();

    let stats = outcomes.iter().fold(CacheStats::default(), |mut stats, o| {
        match o.status {
            FileStatus::Cached => stats.cached += 1,
            FileStatus::Encoded => stats.encoded += 1,
            FileStatus::Degraded => stats.degraded += 1,
            FileStatus::Skipped => stats.skipped += 1,
        }
        stats
    });

    let mut next_cache = CacheManifest::empty();
    let mut records = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        if let Some(entry) = outcome.cache_entry {
            next_cache.insert(entry.record, entry.source_hash, entry.params_hash);
        }
        records.extend(outcome.record);
    }

    ProcessResult {
        records,
        cache: next_cache,
        stats,
    }
}

/// Directory that record paths are relative to.
fn manifest_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Everything a single file needs, resolved once per run.
struct Pipeline<'a, B: ImageBackend> {
    backend: &'a B,
    video_tiers: &'a [&'a dyn Transcoder],
    optimized_root: &'a Path,
    thumbnails_root: &'a Path,
    manifest_dir: PathBuf,
    optimized: OptimizedConfig,
    thumbnail: ThumbnailConfig,
    full_clip: ClipProfile,
    thumb_clip: ClipProfile,
}

/// A file that made it into the manifest.
struct Encoded {
    record: AssetRecord,
    variants: Vec<VariantInfo>,
    degraded: bool,
}

impl<'a, B: ImageBackend> Pipeline<'a, B> {
    fn new(
        backend: &'a B,
        video_tiers: &'a [&'a dyn Transcoder],
        config: &'a OptimizerConfig,
    ) -> Self {
        let images = &config.images;
        let thumbs = &config.thumbnails;
        Self {
            backend,
            video_tiers,
            optimized_root: &config.paths.optimized,
            thumbnails_root: &config.paths.thumbnails,
            manifest_dir: manifest_dir(&config.paths.manifest),
            optimized: OptimizedConfig {
                max_width: images.max_width,
                encoding: StillEncoding {
                    webp: Quality::new(images.webp_quality),
                    avif: Quality::new(images.avif_quality),
                },
            },
            thumbnail: ThumbnailConfig {
                size: thumbs.size,
                encoding: StillEncoding {
                    webp: Quality::new(thumbs.webp_quality),
                    avif: Quality::new(thumbs.avif_quality),
                },
            },
            full_clip: ClipProfile::Full {
                max_width: images.max_width,
            },
            thumb_clip: ClipProfile::Thumbnail {
                size: thumbs.size,
                max_seconds: config.video.thumbnail_seconds,
                fps: config.video.thumbnail_fps,
            },
        }
    }

    fn process_file(
        &self,
        index: usize,
        file: &SourceFile,
        cache: &CacheManifest,
        params_hash: &str,
    ) -> (FileOutcome, ProcessEvent) {
        let source_hash = match cache::hash_file(&file.path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                debug!(source = %file.original, error = %e, "could not hash source");
                None
            }
        };

        let cached = source_hash.as_deref().and_then(|hash| {
            cache.find_cached(&file.original, hash, params_hash, &self.manifest_dir)
        });
        if let Some(record) = cached {
            let event = ProcessEvent::FileProcessed {
                index,
                original: file.original.clone(),
                format: record.format,
                variants: cached_variants(record),
            };
            let outcome = FileOutcome {
                status: FileStatus::Cached,
                record: Some(record.clone()),
                cache_entry: source_hash.map(|source_hash| CacheEntry {
                    source_hash,
                    params_hash: params_hash.to_string(),
                    record: record.clone(),
                }),
            };
            return (outcome, event);
        }

        let result = match file.kind {
            AssetKind::Static => self.encode_static(file),
            AssetKind::Animated => self.encode_animated(file),
        };

        match result {
            Ok(encoded) => {
                let event = ProcessEvent::FileProcessed {
                    index,
                    original: file.original.clone(),
                    format: encoded.record.format,
                    variants: encoded.variants,
                };
                let cache_entry = match (&source_hash, encoded.degraded) {
                    (Some(hash), false) => Some(CacheEntry {
                        source_hash: hash.clone(),
                        params_hash: params_hash.to_string(),
                        record: encoded.record.clone(),
                    }),
                    _ => None,
                };
                let outcome = FileOutcome {
                    status: if encoded.degraded {
                        FileStatus::Degraded
                    } else {
                        FileStatus::Encoded
                    },
                    record: Some(encoded.record),
                    cache_entry,
                };
                (outcome, event)
            }
            Err(e) => {
                warn!(source = %file.original, error = %e, "skipping file");
                let event = ProcessEvent::FileSkipped {
                    index,
                    original: file.original.clone(),
                    reason: e.to_string(),
                };
                let outcome = FileOutcome {
                    status: FileStatus::Skipped,
                    record: None,
                    cache_entry: None,
                };
                (outcome, event)
            }
        }
    }

    fn encode_static(&self, file: &SourceFile) -> Result<Encoded, FileError> {
        let dims = get_dimensions(self.backend, &file.path)?;
        let mut variants = Vec::new();

        let full = create_optimized_image(
            self.backend,
            &file.path,
            dims,
            self.optimized_root,
            &file.stem_path,
            &self.optimized,
        );
        let mut degraded = !full.failed.is_empty();
        let optimized = self.still_outputs("optimized", full, file, &mut variants)?;

        let thumb = create_square_thumbnail(
            self.backend,
            &file.path,
            self.thumbnails_root,
            &file.stem_path,
            &self.thumbnail,
        );
        degraded |= !thumb.failed.is_empty();
        let thumbnail = self.still_outputs("thumbnail", thumb, file, &mut variants)?;

        Ok(Encoded {
            record: AssetRecord {
                original: file.original.clone(),
                format: AssetFormat::Image,
                optimized,
                thumbnail,
            },
            variants,
            degraded,
        })
    }

    fn encode_animated(&self, file: &SourceFile) -> Result<Encoded, FileError> {
        let mut variants = Vec::new();

        let copy = CopyOriginal;
        let mut full_tiers: Vec<&dyn Transcoder> = self.video_tiers.to_vec();
        full_tiers.push(&copy);
        let full = video::run_chain(
            &full_tiers,
            &self.job(file, self.optimized_root, self.full_clip),
        )?;
        let optimized = self.chain_outputs("optimized", &full, &mut variants);

        if full.outputs.iter().any(|(v, _)| *v == Variant::Gif) {
            return Ok(Encoded {
                record: AssetRecord {
                    original: file.original.clone(),
                    format: AssetFormat::Gif,
                    optimized,
                    thumbnail: VariantMap::new(),
                },
                variants,
                degraded: true,
            });
        }

        let frame = FrameThumbnail::new(self.backend, self.thumbnail.encoding);
        let mut thumb_tiers: Vec<&dyn Transcoder> = self.video_tiers.to_vec();
        thumb_tiers.push(&frame);
        let thumb = video::run_chain(
            &thumb_tiers,
            &self.job(file, self.thumbnails_root, self.thumb_clip),
        )?;
        let thumbnail = self.chain_outputs("thumbnail", &thumb, &mut variants);

        Ok(Encoded {
            record: AssetRecord {
                original: file.original.clone(),
                format: AssetFormat::Webm,
                optimized,
                thumbnail,
            },
            variants,
            degraded: false,
        })
    }

    fn job(&self, file: &SourceFile, output_root: &Path, profile: ClipProfile) -> TranscodeJob {
        TranscodeJob {
            source: file.path.clone(),
            output_root: output_root.to_path_buf(),
            stem_path: file.stem_path.clone(),
            profile,
        }
    }

    /// Turn still-image results into a variant map.
    ///
    /// Failed variants are logged and dropped; an empty map is an error
    /// carrying the first failure.
    fn still_outputs(
        &self,
        role: &str,
        encoded: EncodedVariants,
        file: &SourceFile,
        variants: &mut Vec<VariantInfo>,
    ) -> Result<VariantMap, FileError> {
        let mut map = VariantMap::new();
        for (variant, path) in encoded.written {
            variants.push(VariantInfo {
                label: format!("{role} {variant}"),
                status: VariantStatus::Encoded,
            });
            map.insert(variant, naming::relative_to(&self.manifest_dir, &path));
        }

        let mut first_error = None;
        for (variant, e) in encoded.failed {
            warn!(source = %file.original, %variant, error = %e, "{role} variant failed");
            variants.push(VariantInfo {
                label: format!("{role} {variant}"),
                status: VariantStatus::Failed,
            });
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) if map.is_empty() => Err(e.into()),
            _ => Ok(map),
        }
    }

    /// Turn a chain result into a variant map. Tiers that failed before the
    /// successful one are listed first.
    fn chain_outputs(
        &self,
        role: &str,
        outcome: &ChainOutcome,
        variants: &mut Vec<VariantInfo>,
    ) -> VariantMap {
        for (tier, _) in &outcome.failures {
            variants.push(VariantInfo {
                label: format!("{role} ({tier})"),
                status: VariantStatus::Failed,
            });
        }

        let mut map = VariantMap::new();
        for (variant, path) in &outcome.outputs {
            let status = if *variant == Variant::Gif {
                VariantStatus::Copied
            } else if outcome.tier == 0 {
                VariantStatus::Encoded
            } else {
                VariantStatus::Fallback
            };
            variants.push(VariantInfo {
                label: format!("{role} {variant} ({})", outcome.label),
                status,
            });
            map.insert(*variant, naming::relative_to(&self.manifest_dir, path));
        }
        map
    }
}

fn cached_variants(record: &AssetRecord) -> Vec<VariantInfo> {
    let optimized = record.optimized.keys().map(|v| ("optimized", v));
    let thumbnail = record.thumbnail.keys().map(|v| ("thumbnail", v));
    optimized
        .chain(thumbnail)
        .map(|(role, variant)| VariantInfo {
            label: format!("{role} {variant}"),
            status: VariantStatus::Cached,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Dimensions;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{create_test_gif, create_test_jpeg};
    use crate::video::tests::ScriptedTranscoder;
    use std::fs;
    use std::sync::mpsc;
    use tempfile::TempDir;

    /// Config rooted in a temp dir with the default layout.
    fn test_config(root: &Path) -> OptimizerConfig {
        let mut config = OptimizerConfig::default();
        config.paths.source = root.join("images");
        config.paths.optimized = root.join("images-optimized");
        config.paths.thumbnails = root.join("images-optimized/thumbs");
        config.paths.manifest = root.join("images-optimized/index.json");
        config
    }

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn write_source(config: &OptimizerConfig, relative: &str) {
        let path = config.paths.source.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, relative.as_bytes()).unwrap();
    }

    fn completed(outcome: RunOutcome) -> RunSummary {
        match outcome {
            RunOutcome::Completed(summary) => summary,
            RunOutcome::NoFiles => panic!("expected a completed run"),
        }
    }

    fn read_records(config: &OptimizerConfig) -> Vec<AssetRecord> {
        manifest::read_manifest(&config.paths.manifest).unwrap()
    }

    // =========================================================================
    // Static images
    // =========================================================================

    #[test]
    fn static_image_gets_optimized_and_thumbnail_variants() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "photo.JPG");
        let backend = MockBackend::with_dimensions(vec![dims(2400, 1600)]);

        let summary = completed(process_with(&backend, &[], &config, false, None).unwrap());
        assert_eq!(summary.files_found, 1);
        assert_eq!(summary.records_written, 1);

        let records = read_records(&config);
        assert_eq!(
            records,
            vec![AssetRecord {
                original: "photo.JPG".to_string(),
                format: AssetFormat::Image,
                optimized: VariantMap::from([
                    (Variant::Webp, "photo.webp".to_string()),
                    (Variant::Avif, "photo.avif".to_string()),
                ]),
                thumbnail: VariantMap::from([
                    (Variant::Webp, "thumbs/photo.webp".to_string()),
                    (Variant::Avif, "thumbs/photo.avif".to_string()),
                ]),
            }]
        );

        let ops = backend.get_operations();
        assert!(matches!(&ops[0], RecordedOp::Identify(_)));
        assert!(matches!(&ops[1], RecordedOp::Resize { width: 1920, height: 1280, .. }));
        assert!(matches!(&ops[3], RecordedOp::Thumbnail { crop_width: 480, crop_height: 480, .. }));
    }

    #[test]
    fn static_image_is_never_upscaled() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "small.png");
        let backend = MockBackend::with_dimensions(vec![dims(640, 480)]);

        process_with(&backend, &[], &config, false, None).unwrap();

        for op in backend.get_operations() {
            if let RecordedOp::Resize { width, height, .. } = op {
                assert_eq!((width, height), (640, 480));
            }
        }
    }

    #[test]
    fn nested_sources_mirror_their_directory() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "trips/2024/beach.jpg");
        let backend = MockBackend::with_dimensions(vec![dims(800, 600)]);

        process_with(&backend, &[], &config, false, None).unwrap();

        let records = read_records(&config);
        assert_eq!(records[0].original, "trips/2024/beach.jpg");
        assert_eq!(records[0].optimized[&Variant::Webp], "trips/2024/beach.webp");
        assert_eq!(records[0].thumbnail[&Variant::Avif], "thumbs/trips/2024/beach.avif");
        assert!(config.paths.optimized.join("trips/2024/beach.webp").exists());
    }

    #[test]
    fn static_variant_failure_keeps_remaining_variants() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "photo.jpg");
        let backend = MockBackend::with_dimensions(vec![dims(800, 600)]).failing(".avif");

        let summary = completed(process_with(&backend, &[], &config, false, None).unwrap());
        assert_eq!(summary.stats.degraded, 1);

        let records = read_records(&config);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].optimized.keys().collect::<Vec<_>>(), vec![&Variant::Webp]);
        assert_eq!(records[0].thumbnail.keys().collect::<Vec<_>>(), vec![&Variant::Webp]);
    }

    #[test]
    fn undecodable_image_is_skipped_and_run_continues() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "a.jpg");
        write_source(&config, "b.jpg");
        // One set of dimensions: identify fails for b.jpg
        let backend = MockBackend::with_dimensions(vec![dims(800, 600)]);

        let summary = completed(process_with(&backend, &[], &config, false, None).unwrap());
        assert_eq!(summary.files_found, 2);
        assert_eq!(summary.records_written, 1);
        assert_eq!(summary.stats.skipped, 1);
        assert_eq!(read_records(&config)[0].original, "a.jpg");
    }

    #[test]
    fn static_with_no_thumbnail_is_dropped() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(tmp.path());
        config.paths.thumbnails = tmp.path().join("thumbs-out");
        write_source(&config, "photo.jpg");
        let backend = MockBackend::with_dimensions(vec![dims(800, 600)])
            .failing("thumbs-out/photo.webp")
            .failing("thumbs-out/photo.avif");

        let summary = completed(process_with(&backend, &[], &config, false, None).unwrap());
        assert_eq!(summary.records_written, 0);
        assert_eq!(summary.stats.skipped, 1);
        assert!(read_records(&config).is_empty());
    }

    // =========================================================================
    // Animated GIFs
    // =========================================================================

    #[test]
    fn gif_transcodes_to_webm_with_webm_thumbnail() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "party.gif");
        let backend = MockBackend::new();
        let vp9 = ScriptedTranscoder::ok("vp9", Variant::Webm);
        let vp8 = ScriptedTranscoder::ok("vp8", Variant::Webm);

        process_with(&backend, &[&vp9, &vp8], &config, false, None).unwrap();

        let records = read_records(&config);
        assert_eq!(
            records,
            vec![AssetRecord {
                original: "party.gif".to_string(),
                format: AssetFormat::Webm,
                optimized: VariantMap::from([(Variant::Webm, "party.webm".to_string())]),
                thumbnail: VariantMap::from([(Variant::Webm, "thumbs/party.webm".to_string())]),
            }]
        );
        assert_eq!(vp8.call_count(), 0);
        assert_eq!(
            vp9.profiles(),
            vec![
                ClipProfile::Full { max_width: 1920 },
                ClipProfile::Thumbnail {
                    size: 480,
                    max_seconds: 3,
                    fps: 15
                },
            ]
        );
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn gif_falls_back_to_secondary_codec() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "party.gif");
        let backend = MockBackend::new();
        let vp9 = ScriptedTranscoder::failing("vp9");
        let vp8 = ScriptedTranscoder::ok("vp8", Variant::Webm);

        let summary = completed(
            process_with(&backend, &[&vp9, &vp8], &config, false, None).unwrap(),
        );

        let records = read_records(&config);
        assert_eq!(records[0].format, AssetFormat::Webm);
        assert_eq!(records[0].thumbnail[&Variant::Webm], "thumbs/party.webm");
        assert_eq!(vp9.call_count(), 2);
        assert_eq!(vp8.call_count(), 2);
        assert_eq!(summary.stats.encoded, 1);
    }

    #[test]
    fn gif_copied_when_every_transcoder_fails() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "party.gif");
        let backend = MockBackend::new();
        let vp9 = ScriptedTranscoder::failing("vp9");
        let vp8 = ScriptedTranscoder::failing("vp8");

        let summary = completed(
            process_with(&backend, &[&vp9, &vp8], &config, false, None).unwrap(),
        );

        let records = read_records(&config);
        assert_eq!(
            records,
            vec![AssetRecord {
                original: "party.gif".to_string(),
                format: AssetFormat::Gif,
                optimized: VariantMap::from([(Variant::Gif, "party.gif".to_string())]),
                thumbnail: VariantMap::new(),
            }]
        );
        assert_eq!(
            fs::read(config.paths.optimized.join("party.gif")).unwrap(),
            b"party.gif"
        );
        // No thumbnail attempt after the copy fallback
        assert_eq!(vp9.call_count(), 1);
        assert_eq!(vp8.call_count(), 1);
        assert_eq!(summary.stats.degraded, 1);
    }

    #[test]
    fn gif_copied_when_no_transcoder_configured() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "party.gif");

        process_with(&MockBackend::new(), &[], &config, false, None).unwrap();

        assert_eq!(read_records(&config)[0].format, AssetFormat::Gif);
    }

    #[test]
    fn gif_thumbnail_falls_back_to_still_frame() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "party.gif");
        let backend = MockBackend::new();
        let full_only = FullOnly(ScriptedTranscoder::ok("vp9", Variant::Webm));

        process_with(&backend, &[&full_only], &config, false, None).unwrap();

        let records = read_records(&config);
        assert_eq!(records[0].format, AssetFormat::Webm);
        assert_eq!(
            records[0].thumbnail,
            VariantMap::from([
                (Variant::Webp, "thumbs/party.webp".to_string()),
                (Variant::Avif, "thumbs/party.avif".to_string()),
            ])
        );
        for op in backend.get_operations() {
            assert!(matches!(op, RecordedOp::Thumbnail { crop_width: 480, crop_height: 480, .. }));
        }
    }

    #[test]
    fn gif_with_no_thumbnail_is_dropped() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "party.gif");
        let backend = MockBackend::new().failing(".webp").failing(".avif");
        let full_only = FullOnly(ScriptedTranscoder::ok("vp9", Variant::Webm));

        let (tx, rx) = mpsc::channel();
        let summary = completed(
            process_with(&backend, &[&full_only], &config, false, Some(tx)).unwrap(),
        );

        assert_eq!(summary.files_found, 1);
        assert_eq!(summary.records_written, 0);
        assert_eq!(summary.stats.skipped, 1);
        assert!(read_records(&config).is_empty());

        let events: Vec<ProcessEvent> = rx.into_iter().collect();
        assert!(matches!(
            &events[0],
            ProcessEvent::FileSkipped { original, reason, .. }
                if original == "party.gif" && reason == "all 2 fallback tiers failed"
        ));
    }

    /// Succeeds only for full-size clips.
    struct FullOnly(ScriptedTranscoder);

    impl Transcoder for FullOnly {
        fn label(&self) -> String {
            self.0.label()
        }

        fn transcode(&self, job: &TranscodeJob) -> Result<video::Outputs, video::EncodeError> {
            match job.profile {
                ClipProfile::Full { .. } => self.0.transcode(job),
                ClipProfile::Thumbnail { .. } => Err(video::EncodeError::Failed {
                    tool: self.label(),
                    status: "exit status: 1".to_string(),
                    diagnostic: "scripted thumbnail failure".to_string(),
                }),
            }
        }
    }

    // =========================================================================
    // Run-level behavior
    // =========================================================================

    #[test]
    fn mixed_tree_is_processed_in_discovery_order() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "b/party.gif");
        write_source(&config, "a.png");
        write_source(&config, "c.webp");
        write_source(&config, "notes.txt");
        let backend = MockBackend::with_dimensions(vec![dims(800, 600), dims(800, 600)]);
        let vp9 = ScriptedTranscoder::ok("vp9", Variant::Webm);

        process_with(&backend, &[&vp9], &config, false, None).unwrap();

        let originals: Vec<String> = read_records(&config)
            .into_iter()
            .map(|r| r.original)
            .collect();
        assert_eq!(originals, vec!["a.png", "b/party.gif", "c.webp"]);
    }

    #[test]
    fn every_manifest_path_exists_on_disk() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "photo.jpg");
        write_source(&config, "party.gif");
        write_source(&config, "old.gif");
        let backend = MockBackend::with_dimensions(vec![dims(800, 600)]);

        process_with(&backend, &[], &config, false, None).unwrap();

        let manifest_dir = config.paths.manifest.parent().unwrap();
        for record in read_records(&config) {
            assert!(!record.optimized.is_empty());
            for rel in record.output_paths() {
                assert!(manifest_dir.join(rel).exists(), "missing {rel}");
            }
        }
    }

    #[test]
    fn empty_source_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        fs::create_dir_all(&config.paths.source).unwrap();
        write_source(&config, "README.md");

        let outcome = process_with(&MockBackend::new(), &[], &config, false, None).unwrap();
        assert!(matches!(outcome, RunOutcome::NoFiles));
        assert!(!config.paths.manifest.exists());
    }

    #[test]
    fn empty_source_leaves_existing_manifest_untouched() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        fs::create_dir_all(&config.paths.source).unwrap();
        fs::create_dir_all(&config.paths.optimized).unwrap();
        fs::write(&config.paths.manifest, "[\"previous\"]").unwrap();

        process_with(&MockBackend::new(), &[], &config, false, None).unwrap();

        assert_eq!(
            fs::read_to_string(&config.paths.manifest).unwrap(),
            "[\"previous\"]"
        );
    }

    #[test]
    fn missing_source_root_is_run_error() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());

        let result = process_with(&MockBackend::new(), &[], &config, false, None);
        assert!(matches!(result, Err(ProcessError::Scan(ScanError::SourceNotFound(_)))));
    }

    #[test]
    fn outputs_nested_in_source_are_not_rescanned() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(tmp.path());
        config.paths.optimized = config.paths.source.join("out");
        config.paths.thumbnails = config.paths.source.join("out/thumbs");
        config.paths.manifest = config.paths.source.join("out/index.json");
        write_source(&config, "photo.jpg");
        write_source(&config, "out/stale.webp");

        let backend = MockBackend::with_dimensions(vec![dims(800, 600)]);
        let summary = completed(process_with(&backend, &[], &config, false, None).unwrap());
        assert_eq!(summary.files_found, 1);
    }

    #[test]
    fn rerun_produces_identical_manifest() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "photo.jpg");
        write_source(&config, "party.gif");
        let vp9 = ScriptedTranscoder::ok("vp9", Variant::Webm);

        let first = MockBackend::with_dimensions(vec![dims(800, 600)]);
        process_with(&first, &[&vp9], &config, false, None).unwrap();
        let first_manifest = fs::read_to_string(&config.paths.manifest).unwrap();

        let second = MockBackend::with_dimensions(vec![dims(800, 600)]);
        process_with(&second, &[&vp9], &config, false, None).unwrap();
        let second_manifest = fs::read_to_string(&config.paths.manifest).unwrap();

        assert_eq!(first_manifest, second_manifest);
    }

    #[test]
    fn collisions_are_reported_and_first_source_wins() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "beach.jpg");
        write_source(&config, "beach.png");
        let backend = MockBackend::with_dimensions(vec![dims(800, 600)]);

        let summary = completed(process_with(&backend, &[], &config, false, None).unwrap());
        assert_eq!(summary.collisions.len(), 1);
        assert_eq!(summary.collisions[0].original, "beach.png");
        assert_eq!(read_records(&config)[0].original, "beach.jpg");
    }

    // =========================================================================
    // Cache
    // =========================================================================

    #[test]
    fn second_run_uses_cache() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "photo.jpg");
        let vp9 = ScriptedTranscoder::ok("vp9", Variant::Webm);
        write_source(&config, "party.gif");

        let first = MockBackend::with_dimensions(vec![dims(800, 600)]);
        let summary = completed(process_with(&first, &[&vp9], &config, true, None).unwrap());
        assert_eq!(summary.stats.encoded, 2);
        let first_manifest = fs::read_to_string(&config.paths.manifest).unwrap();

        let second = MockBackend::new();
        let summary = completed(process_with(&second, &[&vp9], &config, true, None).unwrap());
        assert_eq!(summary.stats.cached, 2);
        assert!(second.get_operations().is_empty());
        assert_eq!(vp9.call_count(), 2);
        assert_eq!(fs::read_to_string(&config.paths.manifest).unwrap(), first_manifest);
    }

    #[test]
    fn changed_source_is_re_encoded() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "photo.jpg");

        let first = MockBackend::with_dimensions(vec![dims(800, 600)]);
        process_with(&first, &[], &config, true, None).unwrap();

        fs::write(config.paths.source.join("photo.jpg"), "edited").unwrap();
        let second = MockBackend::with_dimensions(vec![dims(800, 600)]);
        let summary = completed(process_with(&second, &[], &config, true, None).unwrap());
        assert_eq!(summary.stats.encoded, 1);
        assert!(!second.get_operations().is_empty());
    }

    #[test]
    fn no_cache_forces_re_encode() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "photo.jpg");

        let first = MockBackend::with_dimensions(vec![dims(800, 600)]);
        process_with(&first, &[], &config, true, None).unwrap();

        let second = MockBackend::with_dimensions(vec![dims(800, 600)]);
        let summary = completed(process_with(&second, &[], &config, false, None).unwrap());
        assert_eq!(summary.stats.cached, 0);
        assert_eq!(summary.stats.encoded, 1);
    }

    #[test]
    fn degraded_gif_copy_is_retried() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "party.gif");

        process_with(&MockBackend::new(), &[], &config, true, None).unwrap();
        assert_eq!(read_records(&config)[0].format, AssetFormat::Gif);

        let vp9 = ScriptedTranscoder::ok("vp9", Variant::Webm);
        process_with(&MockBackend::new(), &[&vp9], &config, true, None).unwrap();
        assert_eq!(read_records(&config)[0].format, AssetFormat::Webm);
    }

    #[test]
    fn deleted_source_disappears_from_manifest() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "a.jpg");
        write_source(&config, "b.jpg");

        let first = MockBackend::with_dimensions(vec![dims(800, 600), dims(800, 600)]);
        process_with(&first, &[], &config, true, None).unwrap();
        assert_eq!(read_records(&config).len(), 2);

        fs::remove_file(config.paths.source.join("b.jpg")).unwrap();
        process_with(&MockBackend::new(), &[], &config, true, None).unwrap();

        let records = read_records(&config);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original, "a.jpg");
        let cache = CacheManifest::load(&config.paths.optimized);
        assert!(!cache.entries.contains_key("b.jpg"));
    }

    // =========================================================================
    // Progress events
    // =========================================================================

    #[test]
    fn events_report_processed_and_skipped_files() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "a.jpg");
        write_source(&config, "b.jpg");
        let backend = MockBackend::with_dimensions(vec![dims(800, 600)]);

        let (tx, rx) = mpsc::channel();
        process_with(&backend, &[], &config, false, Some(tx)).unwrap();
        let events: Vec<ProcessEvent> = rx.into_iter().collect();

        assert_eq!(events.len(), 2);
        match &events[0] {
            ProcessEvent::FileProcessed {
                index,
                original,
                format,
                variants,
            } => {
                assert_eq!(*index, 1);
                assert_eq!(original, "a.jpg");
                assert_eq!(*format, AssetFormat::Image);
                assert_eq!(variants.len(), 4);
                assert!(variants.iter().all(|v| v.status == VariantStatus::Encoded));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            &events[1],
            ProcessEvent::FileSkipped { index: 2, original, .. } if original == "b.jpg"
        ));
    }

    #[test]
    fn events_mark_fallback_tiers() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_source(&config, "party.gif");
        let vp9 = ScriptedTranscoder::failing("vp9");
        let vp8 = ScriptedTranscoder::ok("vp8", Variant::Webm);

        let (tx, rx) = mpsc::channel();
        process_with(&MockBackend::new(), &[&vp9, &vp8], &config, false, Some(tx)).unwrap();
        let events: Vec<ProcessEvent> = rx.into_iter().collect();

        let ProcessEvent::FileProcessed { variants, .. } = &events[0] else {
            panic!("expected processed event");
        };
        assert_eq!(
            variants,
            &vec![
                VariantInfo {
                    label: "optimized (vp9)".to_string(),
                    status: VariantStatus::Failed,
                },
                VariantInfo {
                    label: "optimized webm (vp8)".to_string(),
                    status: VariantStatus::Fallback,
                },
                VariantInfo {
                    label: "thumbnail (vp9)".to_string(),
                    status: VariantStatus::Failed,
                },
                VariantInfo {
                    label: "thumbnail webm (vp8)".to_string(),
                    status: VariantStatus::Fallback,
                },
            ]
        );
    }

    // =========================================================================
    // Real encoders
    // =========================================================================

    #[test]
    fn real_backend_produces_square_thumbnails() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        create_test_jpeg(&config.paths.source.join("wide.jpg"), 600, 300);
        create_test_gif(&config.paths.source.join("anim.gif"), 300, 200, 3);

        process_with(&RustBackend::new(), &[], &config, false, None).unwrap();

        let records = read_records(&config);
        let manifest_dir = config.paths.manifest.parent().unwrap();
        let wide = records.iter().find(|r| r.original == "wide.jpg").unwrap();
        let thumb = manifest_dir.join(&wide.thumbnail[&Variant::Webp]);
        assert_eq!(image::image_dimensions(thumb).unwrap(), (480, 480));
        let full = manifest_dir.join(&wide.optimized[&Variant::Webp]);
        assert_eq!(image::image_dimensions(full).unwrap(), (600, 300));

        let anim = records.iter().find(|r| r.original == "anim.gif").unwrap();
        assert_eq!(anim.format, AssetFormat::Gif);
    }

    #[test]
    fn real_backend_caps_large_photo_at_max_width() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        create_test_jpeg(&config.paths.source.join("photo.JPG"), 2400, 1600);

        process_with(&RustBackend::new(), &[], &config, false, None).unwrap();

        let records = read_records(&config);
        assert_eq!(records.len(), 1);
        let photo = &records[0];
        assert_eq!(photo.original, "photo.JPG");
        assert_eq!(photo.optimized[&Variant::Webp], "photo.webp");
        assert_eq!(photo.optimized[&Variant::Avif], "photo.avif");

        let manifest_dir = config.paths.manifest.parent().unwrap();
        let webp = manifest_dir.join(&photo.optimized[&Variant::Webp]);
        assert_eq!(image::image_dimensions(webp).unwrap(), (1920, 1280));
        let avif = manifest_dir.join(&photo.optimized[&Variant::Avif]);
        assert!(fs::metadata(avif).unwrap().len() > 0);
        let thumb = manifest_dir.join(&photo.thumbnail[&Variant::Webp]);
        assert_eq!(image::image_dimensions(thumb).unwrap(), (480, 480));
    }
}

//! Animated-image transcoding behind a narrow capability interface.
//!
//! Every way of producing an output for a GIF is a [`Transcoder`]: the ffmpeg
//! codecs, the byte-copy of the original, and the still-frame thumbnail. The
//! optimizer expresses its fallback policy as an ordered list of tiers handed
//! to [`run_chain`], which returns the first tier that produced output:
//!
//! ```text
//! full-size:  vp9 (crf 35) → vp8 (crf 30) → copy original .gif
//! thumbnail:  vp9 (crf 35) → vp8 (crf 30) → first frame as .webp/.avif
//! ```
//!
//! All calls are blocking; ffmpeg runs without a timeout.

pub mod fallback;
pub mod ffmpeg;

pub use fallback::{CopyOriginal, FrameThumbnail};
pub use ffmpeg::{FfmpegTranscoder, VideoCodec, probe};

use crate::imaging::BackendError;
use crate::types::Variant;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Longest diagnostic kept from an encoder's error output.
const DIAGNOSTIC_LIMIT: usize = 400;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("{tool} is not available: {reason}")]
    EncoderUnavailable { tool: String, reason: String },
    #[error("{tool} failed ({status}): {diagnostic}")]
    Failed {
        tool: String,
        status: String,
        diagnostic: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encode failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("{tier} does not produce {profile} outputs")]
    Unsupported { tier: String, profile: &'static str },
}

/// What kind of clip a job asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipProfile {
    /// Full-length clip, width capped at `max_width`.
    Full { max_width: u32 },
    /// Short, frame-rate capped, square center-cropped clip.
    Thumbnail {
        size: u32,
        max_seconds: u32,
        fps: u32,
    },
}

impl ClipProfile {
    pub fn name(&self) -> &'static str {
        match self {
            ClipProfile::Full { .. } => "full-size",
            ClipProfile::Thumbnail { .. } => "thumbnail",
        }
    }
}

/// One transcode request: source file plus where outputs go.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub source: PathBuf,
    pub output_root: PathBuf,
    /// Relative output name without extension.
    pub stem_path: PathBuf,
    pub profile: ClipProfile,
}

/// Files written by a successful tier.
pub type Outputs = Vec<(Variant, PathBuf)>;

/// A way of turning an animated source into one or more outputs.
pub trait Transcoder {
    /// Short name used in logs and progress output.
    fn label(&self) -> String;

    fn transcode(&self, job: &TranscodeJob) -> Result<Outputs, EncodeError>;
}

/// The tier that succeeded, plus the failures of the tiers tried before it.
#[derive(Debug)]
pub struct ChainOutcome {
    /// Position of the successful tier in the chain.
    pub tier: usize,
    pub label: String,
    pub outputs: Outputs,
    pub failures: Vec<(String, EncodeError)>,
}

/// Every tier of a chain failed.
#[derive(Error, Debug)]
#[error("all {} fallback tiers failed", .failures.len())]
pub struct ChainExhausted {
    pub failures: Vec<(String, EncodeError)>,
}

/// Try each tier in order and return the first that writes any output.
pub fn run_chain(
    tiers: &[&dyn Transcoder],
    job: &TranscodeJob,
) -> Result<ChainOutcome, ChainExhausted> {
    let mut failures = Vec::new();

    for (index, tier) in tiers.iter().enumerate() {
        let label = tier.label();
        match tier.transcode(job) {
            Ok(outputs) if !outputs.is_empty() => {
                return Ok(ChainOutcome {
                    tier: index,
                    label,
                    outputs,
                    failures,
                });
            }
            Ok(_) => {
                warn!(source = %job.source.display(), tier = %label, "tier wrote no output");
                failures.push((
                    label.clone(),
                    EncodeError::Failed {
                        tool: label,
                        status: "ok".to_string(),
                        diagnostic: "no output written".to_string(),
                    },
                ));
            }
            Err(e) => {
                warn!(
                    source = %job.source.display(),
                    tier = %label,
                    profile = job.profile.name(),
                    error = %e,
                    "transcode tier failed"
                );
                failures.push((label, e));
            }
        }
    }

    Err(ChainExhausted { failures })
}

/// Keep the tail of an encoder's error output, where the actual error is.
pub fn truncate_diagnostic(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.chars().count() <= DIAGNOSTIC_LIMIT {
        return trimmed.to_string();
    }
    let skip = trimmed.chars().count() - DIAGNOSTIC_LIMIT;
    format!("...{}", trimmed.chars().skip(skip).collect::<String>())
}

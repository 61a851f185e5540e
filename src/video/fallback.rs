//! Last-resort tiers that need no external transcoder.

use super::{ClipProfile, EncodeError, Outputs, TranscodeJob, Transcoder};
use crate::imaging::{ImageBackend, StillEncoding, ThumbnailConfig, create_square_thumbnail};
use crate::naming;
use crate::types::Variant;
use std::fs;
use tracing::warn;

/// Copies the original GIF byte-for-byte into the optimized root.
///
/// Only serves the full-size profile.
pub struct CopyOriginal;

impl Transcoder for CopyOriginal {
    fn label(&self) -> String {
        "gif-copy".to_string()
    }

    fn transcode(&self, job: &TranscodeJob) -> Result<Outputs, EncodeError> {
        if !matches!(job.profile, ClipProfile::Full { .. }) {
            return Err(EncodeError::Unsupported {
                tier: self.label(),
                profile: job.profile.name(),
            });
        }

        let output = naming::output_path(&job.output_root, &job.stem_path, Variant::Gif);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        // Copying a file onto itself would truncate it
        let same_file = output.exists()
            && fs::canonicalize(&output)? == fs::canonicalize(&job.source)?;
        if !same_file {
            fs::copy(&job.source, &output)?;
        }

        Ok(vec![(Variant::Gif, output)])
    }
}

/// Encodes the first frame of the animation as a still square thumbnail.
///
/// Only serves the thumbnail profile. Succeeds when at least one still
/// variant was written.
pub struct FrameThumbnail<'a, B: ImageBackend> {
    backend: &'a B,
    encoding: StillEncoding,
}

impl<'a, B: ImageBackend> FrameThumbnail<'a, B> {
    pub fn new(backend: &'a B, encoding: StillEncoding) -> Self {
        Self { backend, encoding }
    }
}

impl<B: ImageBackend> Transcoder for FrameThumbnail<'_, B> {
    fn label(&self) -> String {
        "still-frame".to_string()
    }

    fn transcode(&self, job: &TranscodeJob) -> Result<Outputs, EncodeError> {
        let ClipProfile::Thumbnail { size, .. } = job.profile else {
            return Err(EncodeError::Unsupported {
                tier: self.label(),
                profile: job.profile.name(),
            });
        };

        let encoded = create_square_thumbnail(
            self.backend,
            &job.source,
            &job.output_root,
            &job.stem_path,
            &ThumbnailConfig {
                size,
                encoding: self.encoding,
            },
        );

        let mut failed = encoded.failed.into_iter();
        if encoded.written.is_empty() {
            return match failed.next() {
                Some((_, e)) => Err(e.into()),
                None => Ok(Vec::new()),
            };
        }
        for (variant, e) in failed {
            warn!(source = %job.source.display(), %variant, error = %e, "still-frame variant failed");
        }
        Ok(encoded.written)
    }
}

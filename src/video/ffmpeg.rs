//! ffmpeg-backed WebM transcoding.
//!
//! ffmpeg is invoked as a blocking child process with stdin closed and log
//! output reduced to errors, so a failure's stderr is the diagnostic itself.

use super::{ClipProfile, EncodeError, Outputs, TranscodeJob, Transcoder, truncate_diagnostic};
use crate::naming;
use crate::types::Variant;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    Vp9,
    Vp8,
}

impl VideoCodec {
    fn encoder(self) -> &'static str {
        match self {
            VideoCodec::Vp9 => "libvpx-vp9",
            VideoCodec::Vp8 => "libvpx",
        }
    }

    /// VP9 runs in pure constant-quality mode (`-b:v 0`); libvpx's VP8
    /// encoder needs a bitrate ceiling for `-crf` to take effect.
    fn bitrate(self) -> &'static str {
        match self {
            VideoCodec::Vp9 => "0",
            VideoCodec::Vp8 => "2M",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VideoCodec::Vp9 => "vp9",
            VideoCodec::Vp8 => "vp8",
        }
    }
}

/// One codec configuration of the external transcoder.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegTranscoder {
    binary: String,
    codec: VideoCodec,
    crf: u32,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>, codec: VideoCodec, crf: u32) -> Self {
        Self {
            binary: binary.into(),
            codec,
            crf,
        }
    }

    /// Video filter chain for a profile.
    ///
    /// Full clips keep their aspect ratio with even dimensions (required by
    /// yuv420p) and never grow. Thumbnails fill a square and crop the center.
    pub fn filter(profile: &ClipProfile) -> String {
        match profile {
            ClipProfile::Full { max_width } => {
                format!("scale=trunc(min(iw\\,{max_width})/2)*2:-2:flags=lanczos")
            }
            ClipProfile::Thumbnail { size, fps, .. } => format!(
                "fps={fps},scale={size}:{size}:force_original_aspect_ratio=increase:flags=lanczos,crop={size}:{size}"
            ),
        }
    }

    /// Full argument list for transcoding `job` into `output`.
    pub fn build_args(&self, job: &TranscodeJob, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(job.source.as_os_str().to_os_string());

        if let ClipProfile::Thumbnail { max_seconds, .. } = job.profile {
            args.push("-t".into());
            args.push(max_seconds.to_string().into());
        }

        let crf = self.crf.to_string();
        let filter = Self::filter(&job.profile);
        for arg in [
            "-an",
            "-vf",
            filter.as_str(),
            "-c:v",
            self.codec.encoder(),
            "-crf",
            crf.as_str(),
            "-b:v",
            self.codec.bitrate(),
            "-pix_fmt",
            "yuv420p",
        ] {
            args.push(arg.into());
        }
        args.push(output.as_os_str().to_os_string());
        args
    }
}

impl Transcoder for FfmpegTranscoder {
    fn label(&self) -> String {
        self.codec.label().to_string()
    }

    fn transcode(&self, job: &TranscodeJob) -> Result<Outputs, EncodeError> {
        let output = naming::output_path(&job.output_root, &job.stem_path, Variant::Webm);
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let args = self.build_args(job, &output);
        debug!(binary = %self.binary, ?args, "running transcoder");

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| EncodeError::EncoderUnavailable {
                tool: self.binary.clone(),
                reason: e.to_string(),
            })?;

        let failure = if !result.status.success() {
            Some(EncodeError::Failed {
                tool: format!("{} ({})", self.binary, self.codec.encoder()),
                status: result.status.to_string(),
                diagnostic: truncate_diagnostic(&String::from_utf8_lossy(&result.stderr)),
            })
        } else if std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0) == 0 {
            Some(EncodeError::Failed {
                tool: format!("{} ({})", self.binary, self.codec.encoder()),
                status: result.status.to_string(),
                diagnostic: "output file is missing or empty".to_string(),
            })
        } else {
            None
        };

        if let Some(err) = failure {
            // A failed run can leave a truncated file behind
            let _ = std::fs::remove_file(&output);
            return Err(err);
        }

        Ok(vec![(Variant::Webm, output)])
    }
}

/// Check once that the transcoder can be run at all.
///
/// Returns the first line of `-version` output.
pub fn probe(binary: &str) -> Result<String, EncodeError> {
    let output = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| EncodeError::EncoderUnavailable {
            tool: binary.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(EncodeError::EncoderUnavailable {
            tool: binary.to_string(),
            reason: format!("version probe exited with {}", output.status),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}

//! CLI output formatting.
//!
//! Output is **source-centric**: every entry leads with its positional index
//! and its path relative to the source root (the same string the manifest
//! uses as `original`), with details shown as indented context lines.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Sources (3 files)
//! 001 logo.png (image)
//! 002 trips/beach.jpg (image)
//! 003 trips/party.gif (animated)
//!
//! Skipped
//!     trips/beach.png: output name taken by trips/beach.jpg
//! ```
//!
//! ## Optimize
//!
//! ```text
//! 001 logo.png
//!     optimized webp: cached
//!     optimized avif: cached
//!     thumbnail webp: cached
//!     thumbnail avif: cached
//! 002 trips/party.gif → webm
//!     optimized (vp9): failed
//!     optimized webm (vp8): fallback
//!     thumbnail (vp9): failed
//!     thumbnail webm (vp8): fallback
//! 003 trips/broken.jpg
//!     Skipped: image processing failed: ...
//!
//! Wrote 2 records to images-optimized/index.json (3 files found)
//! Files: 1 cached, 1 encoded, 0 degraded, 1 skipped (3 total)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::process::{ProcessEvent, RunSummary, VariantStatus};
use crate::scan::{AssetKind, ScanResult};
use crate::types::AssetFormat;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the list of discovered sources and any skipped collisions.
pub fn format_scan_output(result: &ScanResult) -> Vec<String> {
    let mut lines = vec![format!("Sources ({} files)", result.files.len())];

    for (i, file) in result.files.iter().enumerate() {
        let kind = match file.kind {
            AssetKind::Static => "image",
            AssetKind::Animated => "animated",
        };
        lines.push(format!("{} {} ({})", format_index(i + 1), file.original, kind));
    }

    if !result.collisions.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for collision in &result.collisions {
            lines.push(format!(
                "{}{}: output name taken by {}",
                indent(1),
                collision.original,
                collision.kept
            ));
        }
    }

    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(result: &ScanResult) {
    for line in format_scan_output(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Optimize output
// ============================================================================

/// Format a single progress event as display lines.
///
/// Animated sources show the format they ended up as; per-variant status is
/// listed as indented context.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::FileProcessed {
            index,
            original,
            format,
            variants,
        } => {
            let header = match format {
                AssetFormat::Image => format!("{} {}", format_index(*index), original),
                AssetFormat::Webm => format!("{} {} \u{2192} webm", format_index(*index), original),
                AssetFormat::Gif => format!("{} {} \u{2192} gif", format_index(*index), original),
            };
            let mut lines = vec![header];
            for variant in variants {
                let status_str = match variant.status {
                    VariantStatus::Cached => "cached",
                    VariantStatus::Encoded => "encoded",
                    VariantStatus::Fallback => "fallback",
                    VariantStatus::Copied => "copied",
                    VariantStatus::Failed => "failed",
                };
                lines.push(format!("{}{}: {}", indent(1), variant.label, status_str));
            }
            lines
        }
        ProcessEvent::FileSkipped {
            index,
            original,
            reason,
        } => vec![
            format!("{} {}", format_index(*index), original),
            format!("{}Skipped: {}", indent(1), reason),
        ],
    }
}

/// Format the closing summary of a completed run.
pub fn format_run_summary(summary: &RunSummary) -> Vec<String> {
    let noun = if summary.records_written == 1 {
        "record"
    } else {
        "records"
    };
    vec![
        String::new(),
        format!(
            "Wrote {} {} to {} ({} files found)",
            summary.records_written,
            noun,
            summary.manifest_path.display(),
            summary.files_found
        ),
        format!("Files: {}", summary.stats),
    ]
}

/// Print the run summary to stdout.
pub fn print_run_summary(summary: &RunSummary) {
    for line in format_run_summary(summary) {
        println!("{}", line);
    }
}

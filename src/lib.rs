//! # Gallery Optimizer
//!
//! Prepares a directory of gallery images for the web. Static images become
//! width-capped WebP and AVIF files plus square thumbnails; animated GIFs
//! become WebM videos. A JSON manifest lists what was produced for each
//! source so a viewer can pick the best variant the browser supports.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan       images/  →  classified source list     (walkdir, by extension)
//! 2. Optimize   sources  →  images-optimized/          (per file, sequential)
//! 3. Manifest   records  →  images-optimized/index.json (atomic replace)
//! ```
//!
//! A run is one batch invocation, typically from CI. Source files are never
//! modified.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the source tree and classifies files as static or animated |
//! | [`process`] | The optimizer: per-file branches, fallback policy, run orchestration |
//! | [`imaging`] | Pure-Rust still image operations: resize, square thumbnail, WebP/AVIF encode |
//! | [`video`] | `Transcoder` capability, ffmpeg codecs, copy and still-frame fallbacks |
//! | [`manifest`] | Atomic manifest writer and reader |
//! | [`cache`] | Content-hash cache that lets re-runs skip unchanged sources |
//! | [`config`] | `gallery.toml` loading, merging over defaults, validation |
//! | [`types`] | Manifest record types shared with the viewer |
//! | [`naming`] | Output path derivation and manifest-relative paths |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fallback Chains Instead of Failure
//!
//! ffmpeg is the only external dependency, and CI images do not always ship
//! one with libvpx. Rather than failing the build, every animated source goes
//! through an ordered chain of [`video::Transcoder`]s (VP9, then VP8, then a
//! plain copy of the GIF), and its thumbnail through a second chain ending in
//! a still first frame. The gallery always gets something to show.
//!
//! ## Per-File Isolation
//!
//! A corrupt JPEG or a GIF ffmpeg chokes on costs one manifest entry, not the
//! run. Only problems that make the whole output meaningless (source root
//! missing, manifest not writable) abort.
//!
//! ## Manifest Paths Relative to the Manifest
//!
//! Paths in the manifest are relative to the directory holding it, with `/`
//! separators on every platform. The viewer resolves them against the
//! manifest's URL, so the output directory can be deployed anywhere.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod process;
pub mod scan;
pub mod types;
pub mod video;

#[cfg(test)]
pub(crate) mod test_helpers;

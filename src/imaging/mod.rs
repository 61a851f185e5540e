//! Static image processing in pure Rust, no external binaries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | Lanczos3 via `DynamicImage::resize_exact` (never upscales) |
//! | **Thumbnail** | fill-resize + centered `crop_imm` |
//! | **Encode → WebP** | `webp` (libwebp, lossy) |
//! | **Encode → AVIF** | `image::codecs::avif::AvifEncoder` (rav1e) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_fill_dimensions, center_crop_offset, fit_to_width};
pub use operations::{
    EncodedVariants, OptimizedConfig, StillEncoding, ThumbnailConfig, create_optimized_image,
    create_square_thumbnail, get_dimensions,
};
pub use params::{Quality, ResizeParams, ThumbnailParams};
pub use rust_backend::RustBackend;

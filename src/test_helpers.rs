//! Shared test utilities: synthetic source images and source trees.

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a looping animated GIF with `frames` solid-color frames.
pub fn create_test_gif(path: &Path, width: u32, height: u32, frames: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GifEncoder::new(std::io::BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite).unwrap();
    let frames = (0..frames).map(|i| {
        let shade = (i * 60 % 256) as u8;
        Frame::from_parts(
            RgbaImage::from_pixel(width, height, image::Rgba([shade, 0, 255 - shade, 255])),
            0,
            0,
            Delay::from_numer_denom_ms(100, 1),
        )
    });
    encoder.encode_frames(frames).unwrap();
}

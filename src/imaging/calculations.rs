//! Pure calculation functions for image dimensions.

/// Scale `original` down so its width is at most `max_width`.
///
/// Aspect ratio is preserved and images are never enlarged: a source that
/// already fits is returned unchanged. Height never rounds down to zero.
///
/// ```
/// # use gallery_optimizer::imaging::fit_to_width;
/// assert_eq!(fit_to_width((2400, 1600), 1920), (1920, 1280));
/// assert_eq!(fit_to_width((800, 600), 1920), (800, 600));
/// ```
pub fn fit_to_width(original: (u32, u32), max_width: u32) -> (u32, u32) {
    let (width, height) = original;
    if width <= max_width {
        return original;
    }
    let ratio = max_width as f64 / width as f64;
    let scaled_height = ((height as f64 * ratio).round() as u32).max(1);
    (max_width, scaled_height)
}

/// Dimensions that cover a `target` box while keeping the source aspect ratio.
///
/// One edge matches the target exactly and the other meets or exceeds it, so
/// a center crop afterwards yields exactly `target`.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Wider: height matches, width overflows
        let w = ((tgt_h as f64 * src_aspect).round() as u32).max(tgt_w);
        (w, tgt_h)
    } else {
        let h = ((tgt_w as f64 / src_aspect).round() as u32).max(tgt_h);
        (tgt_w, h)
    }
}

/// Top-left corner of a `target`-sized window centered in `filled`.
pub fn center_crop_offset(filled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        filled.0.saturating_sub(target.0) / 2,
        filled.1.saturating_sub(target.1) / 2,
    )
}

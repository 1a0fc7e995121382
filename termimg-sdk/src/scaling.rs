// ABOUTME: Aspect-preserving fit calculations shared by the pixel-exact backends
// ABOUTME: Downscales images into a pixel box and never enlarges them

use image::{imageops::FilterType, DynamicImage};

/// Scale factor that fits `(width, height)` inside `(max_width, max_height)`,
/// or `None` when the image already fits. The factor is always below 1.
pub fn fit_scale(width: u32, height: u32, max_width: u32, max_height: u32) -> Option<f64> {
    if width == 0 || height == 0 {
        return None;
    }
    if width <= max_width && height <= max_height {
        return None;
    }

    let width_ratio = max_width as f64 / width as f64;
    let height_ratio = max_height as f64 / height as f64;

    // The smaller ratio makes the image fit in both dimensions
    Some(width_ratio.min(height_ratio))
}

/// Target dimensions after fitting, or `None` when no scaling is needed.
pub fn fit_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> Option<(u32, u32)> {
    let scale = fit_scale(width, height, max_width, max_height)?;
    let target_width = (width as f64 * scale) as u32;
    let target_height = (height as f64 * scale) as u32;
    Some((target_width.max(1), target_height.max(1)))
}

/// Width in pixels an image should be displayed at so it fits a box of
/// `max_cols` by `max_rows` cells.
pub fn fit_width(
    width: u32,
    height: u32,
    max_cols: u32,
    max_rows: u32,
    font_width: u32,
    font_height: u32,
) -> f64 {
    let max_width = font_width * max_cols;
    let max_height = font_height * max_rows;
    match fit_scale(width, height, max_width, max_height) {
        Some(scale) => width as f64 * scale,
        None => width as f64,
    }
}

/// Integer fit used by w3mimgdisplay: clamp the width first, then the height.
pub fn fit_clamped(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let (mut width, mut height) = (u64::from(width), u64::from(height));
    let (max_width, max_height) = (u64::from(max_width), u64::from(max_height));

    if width > max_width && width > 0 {
        height = height * max_width / width;
        width = max_width;
    }
    if height > max_height && height > 0 {
        width = width * max_height / height;
        height = max_height;
    }

    (width as u32, height as u32)
}

pub struct ImageScaler {
    filter: FilterType,
}

impl ImageScaler {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3, // High quality scaling
        }
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Shrink `img` into the pixel box, leaving it untouched if it fits.
    pub fn fit(&self, img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
        match fit_dimensions(img.width(), img.height(), max_width, max_height) {
            Some((width, height)) => {
                log::debug!(
                    "Scaling image from {}x{} to {}x{}",
                    img.width(),
                    img.height(),
                    width,
                    height
                );
                img.resize_exact(width, height, self.filter)
            }
            None => img,
        }
    }
}

impl Default for ImageScaler {
    fn default() -> Self {
        Self::new()
    }
}

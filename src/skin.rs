use std::path::Path;

use image::{DynamicImage, GenericImageView};
use thiserror::Error;

use crate::color::Rgb;

/// Images are sampled at this size on their long side.
const SAMPLE_SIZE: u32 = 256;

const CB_RANGE: (f32, f32) = (77.0, 127.0);
const CR_RANGE: (f32, f32) = (133.0, 173.0);
const LUMA_RANGE: (f32, f32) = (40.0, 240.0);

#[derive(Debug, Error)]
pub enum SkinError {
    #[error("failed to read image: {0}")]
    Image(#[from] image::ImageError),
    #[error("no skin detected in image")]
    NoSkinDetected,
}

/// Mean colour of the skin-like pixels in an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinSample {
    pub color: Rgb,
    /// Share of sampled pixels classified as skin, in `[0, 1]`.
    pub coverage: f32,
}

pub fn load_image(path: &Path) -> Result<DynamicImage, SkinError> {
    Ok(image::open(path)?)
}

pub fn is_skin(pixel: Rgb) -> bool {
    let ycc = pixel.to_ycbcr();
    within(ycc.y, LUMA_RANGE) && within(ycc.cb, CB_RANGE) && within(ycc.cr, CR_RANGE)
}

pub fn skin_color(image: &DynamicImage) -> Result<SkinSample, SkinError> {
    let (width, height) = image.dimensions();
    let sampled = if width.max(height) > SAMPLE_SIZE {
        image.thumbnail(SAMPLE_SIZE, SAMPLE_SIZE)
    } else {
        image.clone()
    };
    let rgb = sampled.to_rgb8();

    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        if is_skin(Rgb::new(r, g, b)) {
            sums[0] += r as u64;
            sums[1] += g as u64;
            sums[2] += b as u64;
            count += 1;
        }
    }

    if count == 0 {
        return Err(SkinError::NoSkinDetected);
    }

    let mean = |sum: u64| ((sum as f64 / count as f64).round() as u64).min(255) as u8;
    let total = (rgb.width() as u64 * rgb.height() as u64).max(1) as f32;

    Ok(SkinSample {
        color: Rgb::new(mean(sums[0]), mean(sums[1]), mean(sums[2])),
        coverage: count as f32 / total,
    })
}

fn within(value: f32, (low, high): (f32, f32)) -> bool {
    value >= low && value <= high
}

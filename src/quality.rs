//! Per-image focus and brightness measurement.
//!
//! Both metrics are pure functions of the decoded raster:
//!
//! - **Blur score**: variance of the 3×3 Laplacian
//!   `[0 1 0; 1 -4 1; 0 1 0]` over the luminance image. Sharp images have
//!   strong edge response and a high variance; flat or defocused images sit
//!   near zero.
//! - **Brightness**: mean of the HSV value channel, which is `max(R, G, B)`
//!   per pixel, in the scale of the source bit depth.
//!
//! A file that cannot be decoded never produces an error: it yields an
//! unreadable measurement with zero scores, and the caller counts it.

use std::path::Path;

use image::{DynamicImage, ImageReader};
use log::warn;
use serde::Serialize;

/// ITU-R BT.601 luma weights.
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Channel precision of a decoded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BitDepth {
    Eight,
    Sixteen,
    Float,
}

impl BitDepth {
    fn of(img: &DynamicImage) -> Self {
        let color = img.color();
        match color.bytes_per_pixel() / color.channel_count().max(1) {
            1 => BitDepth::Eight,
            2 => BitDepth::Sixteen,
            _ => BitDepth::Float,
        }
    }

    /// Largest value a channel can take at this depth.
    pub fn channel_max(&self) -> f64 {
        match self {
            BitDepth::Eight => u8::MAX as f64,
            BitDepth::Sixteen => u16::MAX as f64,
            BitDepth::Float => 1.0,
        }
    }
}

/// Result of measuring one image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QualityMeasurement {
    /// False when the file could not be opened or decoded.
    pub readable: bool,
    pub width: u32,
    pub height: u32,
    pub bit_depth: Option<BitDepth>,
    pub blur_score: f64,
    pub brightness: f64,
}

impl QualityMeasurement {
    /// The sentinel returned for files that cannot be decoded.
    pub fn unreadable() -> Self {
        Self {
            readable: false,
            width: 0,
            height: 0,
            bit_depth: None,
            blur_score: 0.0,
            brightness: 0.0,
        }
    }
}

/// Decode an image file and measure it.
pub fn measure_image(path: &Path) -> QualityMeasurement {
    let decoded = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());

    match decoded {
        Ok(img) => measure_dynamic(&img),
        Err(err) => {
            warn!("cannot decode image {}: {err}", path.display());
            QualityMeasurement::unreadable()
        }
    }
}

/// Measure an already decoded image.
pub fn measure_dynamic(img: &DynamicImage) -> QualityMeasurement {
    let (width, height) = (img.width(), img.height());
    let depth = BitDepth::of(img);

    let (luma, value_sum) = match depth {
        BitDepth::Eight => fold_rgb(
            img.to_rgb8()
                .pixels()
                .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64]),
            true,
        ),
        BitDepth::Sixteen => fold_rgb(
            img.to_rgb16()
                .pixels()
                .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64]),
            true,
        ),
        BitDepth::Float => fold_rgb(
            img.to_rgb32f()
                .pixels()
                .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64]),
            false,
        ),
    };

    let pixel_count = luma.len();
    let brightness = if pixel_count > 0 {
        value_sum / pixel_count as f64
    } else {
        0.0
    };

    QualityMeasurement {
        readable: true,
        width,
        height,
        bit_depth: Some(depth),
        blur_score: laplacian_variance(&luma, width as usize, height as usize),
        brightness,
    }
}

/// Build the luminance plane and the sum of HSV values in one pass.
///
/// Integer depths round luma to whole levels, matching a grayscale image of
/// the same depth.
fn fold_rgb(pixels: impl Iterator<Item = [f64; 3]>, round: bool) -> (Vec<f64>, f64) {
    let (lower, _) = pixels.size_hint();
    let mut luma = Vec::with_capacity(lower);
    let mut value_sum = 0.0;

    for [r, g, b] in pixels {
        let y = LUMA_R * r + LUMA_G * g + LUMA_B * b;
        luma.push(if round { y.round() } else { y });
        value_sum += r.max(g).max(b);
    }

    (luma, value_sum)
}

/// Population variance of the 4-neighbour Laplacian over a row-major plane.
///
/// Borders are handled by reflecting about the edge pixel (`dcb|abcd|cba`),
/// so every pixel contributes one response.
pub fn laplacian_variance(plane: &[f64], width: usize, height: usize) -> f64 {
    let n = width * height;
    if n == 0 || plane.len() < n {
        return 0.0;
    }

    let at = |x: usize, y: usize| plane[y * width + x];
    let mut sum = 0.0;
    let mut sum_sq = 0.0;

    for y in 0..height {
        let up = reflect101(y as isize - 1, height);
        let down = reflect101(y as isize + 1, height);
        for x in 0..width {
            let left = reflect101(x as isize - 1, width);
            let right = reflect101(x as isize + 1, width);

            let response =
                at(x, up) + at(x, down) + at(left, y) + at(right, y) - 4.0 * at(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }

    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean).max(0.0)
}

fn reflect101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let reflected = if i < 0 {
        -i
    } else if i >= len {
        2 * len - 2 - i
    } else {
        i
    };
    reflected as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    #[test]
    fn flat_image_has_zero_blur_score() {
        let img = RgbImage::from_pixel(16, 16, Rgb([90, 90, 90]));
        let m = measure_dynamic(&DynamicImage::ImageRgb8(img));
        assert!(m.readable);
        assert_eq!(m.blur_score, 0.0);
        assert!((m.brightness - 90.0).abs() < 1e-9);
    }

    #[test]
    fn checkerboard_is_sharper_than_gradient() {
        let checker = RgbImage::from_fn(16, 16, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let gradient = RgbImage::from_fn(16, 16, |x, _| {
            let v = (x * 16) as u8;
            Rgb([v, v, v])
        });

        let sharp = measure_dynamic(&DynamicImage::ImageRgb8(checker));
        let smooth = measure_dynamic(&DynamicImage::ImageRgb8(gradient));
        assert!(sharp.blur_score > smooth.blur_score);
        assert!(sharp.blur_score > 1000.0);
    }

    #[test]
    fn brightness_is_mean_of_channel_max() {
        let img = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([200, 100, 50])
            } else {
                Rgb([10, 20, 100])
            }
        });
        let m = measure_dynamic(&DynamicImage::ImageRgb8(img));
        assert!((m.brightness - 150.0).abs() < 1e-9);
        assert_eq!(m.bit_depth, Some(BitDepth::Eight));
    }

    #[test]
    fn sixteen_bit_brightness_uses_native_scale() {
        let img: ImageBuffer<Rgb<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(4, 4, Rgb([60000, 1000, 0]));
        let m = measure_dynamic(&DynamicImage::ImageRgb16(img));
        assert_eq!(m.bit_depth, Some(BitDepth::Sixteen));
        assert!((m.brightness - 60000.0).abs() < 1e-9);
        assert!(m.brightness <= BitDepth::Sixteen.channel_max());
    }

    #[test]
    fn single_pixel_image_is_measurable() {
        let img = RgbImage::from_pixel(1, 1, Rgb([1, 2, 3]));
        let m = measure_dynamic(&DynamicImage::ImageRgb8(img));
        assert_eq!(m.blur_score, 0.0);
        assert_eq!((m.width, m.height), (1, 1));
    }

    #[test]
    fn laplacian_of_single_spike() {
        // 3x3 plane with a spike in the middle; reflect-101 borders.
        let mut plane = vec![0.0; 9];
        plane[4] = 1.0;
        let var = laplacian_variance(&plane, 3, 3);
        // Responses: center -4, edge-adjacent 1 or 2 (reflected), corners 0.
        assert!(var > 0.0);
    }

    #[test]
    fn undecodable_file_yields_sentinel() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        assert_eq!(measure_image(&path), QualityMeasurement::unreadable());
        assert_eq!(
            measure_image(&temp.path().join("missing.png")),
            QualityMeasurement::unreadable()
        );
    }

    #[test]
    fn png_round_trip_through_disk() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("solid.png");
        RgbImage::from_pixel(8, 4, Rgb([10, 240, 30]))
            .save(&path)
            .expect("save png");

        let m = measure_image(&path);
        assert!(m.readable);
        assert_eq!((m.width, m.height), (8, 4));
        assert!((m.brightness - 240.0).abs() < 1e-9);
    }
}

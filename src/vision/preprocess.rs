//! Capture binarization
//!
//! Prepares a raw screen capture for text recognition and glyph cropping:
//! grayscale, integer upscale for small text, then a local (Gaussian mean)
//! threshold so that text ends up white on a black background regardless of
//! uneven backgrounds.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CaptureSettings;
use crate::vision::raster::BinaryRaster;

/// Which way round the text contrasts with its background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPolarity {
    /// Dark text on a light background (documents, most UIs)
    #[default]
    DarkOnLight,
    /// Light text on a dark background (terminals, dark themes)
    LightOnDark,
}

/// Binarize a capture; the result is 255 for text and 0 for background
pub fn prepare_capture(image: &DynamicImage, settings: &CaptureSettings) -> GrayImage {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray;
    }

    // Upscale first so the threshold window sees smooth strokes
    let scale = settings.upscale_factor.max(1);
    let gray = if scale > 1 {
        imageops::resize(&gray, width * scale, height * scale, FilterType::CatmullRom)
    } else {
        gray
    };

    debug!(
        "Preparing capture {}x{} (scale {}, sigma {}, offset {}, {:?})",
        width, height, scale, settings.threshold_sigma, settings.threshold_offset, settings.polarity
    );

    // gaussian_blur_f32 panics on a non-positive sigma
    let sigma = settings.threshold_sigma.max(0.1);
    let local_mean = imageproc::filter::gaussian_blur_f32(&gray, sigma);
    let offset = settings.threshold_offset as i16;

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0] as i16;
        let mean = local_mean.get_pixel(x, y).0[0] as i16;
        let is_text = match settings.polarity {
            TextPolarity::DarkOnLight => value <= mean - offset,
            TextPolarity::LightOnDark => value >= mean + offset,
        };
        if is_text {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Binarize a standalone glyph image with a global Otsu threshold
///
/// An image with a single gray level has no glyph and binarizes to all
/// background.
pub fn binarize_glyph(image: &GrayImage, polarity: TextPolarity) -> BinaryRaster {
    let mut levels = image.pixels().map(|p| p.0[0]);
    let uniform = match levels.next() {
        Some(first) => levels.all(|value| value == first),
        None => true,
    };
    if uniform {
        return BinaryRaster::new(image.width(), image.height());
    }

    let level = imageproc::contrast::otsu_level(image);
    BinaryRaster::from_fn(image.width(), image.height(), |x, y| {
        let value = image.get_pixel(x, y).0[0];
        match polarity {
            TextPolarity::DarkOnLight => value <= level,
            TextPolarity::LightOnDark => value > level,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::features::extract_features;

    /// Dark ring ("o") with radii `inner..outer` drawn on a light background
    fn dark_ring(size: u32, inner: f32, outer: f32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let dx = x as f32 - size as f32 / 2.0;
            let dy = y as f32 - size as f32 / 2.0;
            let r = (dx * dx + dy * dy).sqrt();
            if r > inner && r < outer {
                Luma([30])
            } else {
                Luma([220])
            }
        })
    }

    #[test]
    fn test_binarize_glyph_dark_on_light() {
        let raster = binarize_glyph(&dark_ring(40, 8.0, 16.0), TextPolarity::DarkOnLight);
        assert!(!raster.get(0, 0));
        assert!(!raster.get(20, 20));
        assert!(raster.get(20, 8));
        assert_eq!(extract_features(&raster).hole_count(), 1.0);
    }

    #[test]
    fn test_binarize_glyph_light_on_dark() {
        let mut inverted = dark_ring(40, 8.0, 16.0);
        imageops::invert(&mut inverted);
        let raster = binarize_glyph(&inverted, TextPolarity::LightOnDark);
        assert!(raster.get(20, 8));
        assert!(!raster.get(0, 0));
    }

    #[test]
    fn test_binarize_glyph_uniform_image_is_blank() {
        for (value, polarity) in [
            (128, TextPolarity::LightOnDark),
            (0, TextPolarity::DarkOnLight),
            (255, TextPolarity::DarkOnLight),
            (255, TextPolarity::LightOnDark),
        ] {
            let raster = binarize_glyph(&GrayImage::from_pixel(20, 30, Luma([value])), polarity);
            assert_eq!(raster.foreground_count(), 0, "{} {:?}", value, polarity);
            assert!(extract_features(&raster).is_zero());
        }
    }

    #[test]
    fn test_prepare_capture_upscales_and_marks_text() {
        let capture = DynamicImage::ImageLuma8(dark_ring(40, 12.0, 15.0));
        let settings = CaptureSettings {
            upscale_factor: 2,
            ..Default::default()
        };
        let binary = prepare_capture(&capture, &settings);

        assert_eq!(binary.dimensions(), (80, 80));
        // Middle of the stroke (radius 27 after scaling) is text
        assert_eq!(binary.get_pixel(40, 13).0[0], 255);
        // Flat background and the hole are not
        assert_eq!(binary.get_pixel(2, 2).0[0], 0);
        assert_eq!(binary.get_pixel(40, 40).0[0], 0);
    }

    #[test]
    fn test_prepare_capture_light_text() {
        let mut capture = dark_ring(40, 12.0, 15.0);
        imageops::invert(&mut capture);
        let settings = CaptureSettings {
            upscale_factor: 1,
            polarity: TextPolarity::LightOnDark,
            ..Default::default()
        };
        let binary = prepare_capture(&DynamicImage::ImageLuma8(capture), &settings);

        assert_eq!(binary.dimensions(), (40, 40));
        assert_eq!(binary.get_pixel(20, 7).0[0], 255);
        assert_eq!(binary.get_pixel(1, 1).0[0], 0);
    }

    #[test]
    fn test_prepare_capture_empty_image() {
        let capture = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        let binary = prepare_capture(&capture, &CaptureSettings::default());
        assert_eq!(binary.dimensions(), (0, 0));
    }
}

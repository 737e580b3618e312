//! OCR (Optical Character Recognition) module
//!
//! The recognizer itself is a caller-owned collaborator behind
//! [`TextRecognizer`]. This module turns its word/line level output into
//! per-character boxes and cuts the matching glyph crops out of the
//! binarized capture.

use image::GrayImage;
use tracing::debug;

use crate::error::Result;
use crate::vision::raster::{BinaryRaster, Rect};

/// Detected text region from OCR
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    /// Detected text content
    pub text: String,
    /// Bounding box (x, y, width, height); may be negative or empty for
    /// poorly localized detections
    pub bounds: (i32, i32, i32, i32),
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
}

/// Something that can find text in a binarized capture
pub trait TextRecognizer {
    /// Recognize text regions in a white-on-black capture
    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextRegion>>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for &T {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextRegion>> {
        (**self).recognize(image)
    }
}

/// Recognizer for captures whose text is already known.
///
/// Reports the whole capture's ink as a single region carrying `text`, so
/// the usual segmentation splits it into characters.
#[derive(Debug, Clone)]
pub struct KnownTextRecognizer {
    text: String,
}

impl KnownTextRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextRecognizer for KnownTextRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextRegion>> {
        let Some(ink) = BinaryRaster::from_luma(image).ink_bounds() else {
            return Ok(Vec::new());
        };
        Ok(vec![TextRegion {
            text: self.text.clone(),
            bounds: (
                ink.x as i32,
                ink.y as i32,
                ink.width as i32,
                ink.height as i32,
            ),
            confidence: 1.0,
        }])
    }
}

/// A single recognized character and its estimated box in the capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterBox {
    pub ch: char,
    pub bounds: Rect,
    pub confidence: f32,
}

/// Split recognized regions into per-character boxes.
///
/// Regions below `min_confidence`, with blank text or with a non-positive
/// box are dropped. Parts of a box left of or above the capture are cut off. Each region's box is divided evenly among its
/// characters, and only alphanumeric characters are kept.
pub fn segment_characters(regions: &[TextRegion], min_confidence: f32) -> Vec<CharacterBox> {
    let mut characters = Vec::new();

    for region in regions {
        if region.confidence < min_confidence {
            debug!(
                "Discarding OCR region with low confidence: {:?} ({:.2})",
                region.text, region.confidence
            );
            continue;
        }
        if region.text.trim().is_empty() {
            continue;
        }

        let (x, y, w, h) = region.bounds;
        if w <= 0 || h <= 0 {
            continue;
        }

        // Boxes hanging over the top or left edge are clipped to the capture
        let top = y.max(0);
        let height = y + h - top;
        if height <= 0 {
            continue;
        }

        let count = region.text.chars().count();
        let char_width = w as f64 / count as f64;
        let estimated = char_width as u32;
        if estimated == 0 {
            continue;
        }

        for (i, ch) in region.text.chars().enumerate() {
            if !ch.is_alphanumeric() {
                continue;
            }
            let start = x as f64 + i as f64 * char_width;
            let (char_x, width) = if start >= 0.0 {
                (start as u32, estimated)
            } else {
                (0, (start + char_width).max(0.0) as u32)
            };
            if width == 0 {
                continue;
            }
            characters.push(CharacterBox {
                ch,
                bounds: Rect::new(char_x, top as u32, width, height as u32),
                confidence: region.confidence,
            });
        }
    }

    debug!(
        "Segmented {} characters from {} regions",
        characters.len(),
        regions.len()
    );
    characters
}

/// Cut a character's crop out of a binarized (white text) capture
pub fn crop_glyph(binarized: &GrayImage, character: &CharacterBox) -> BinaryRaster {
    let rect = character.bounds.clip(binarized.width(), binarized.height());
    BinaryRaster::from_fn(rect.width, rect.height, |x, y| {
        binarized.get_pixel(rect.x + x, rect.y + y).0[0] != 0
    })
}

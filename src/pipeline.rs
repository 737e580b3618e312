//! Online identification
//!
//! Capture in, ranked fonts out: binarize the capture, let the recognizer
//! find text, cut one crop per character, compute the crop feature vectors
//! and rank the database against them.

use image::DynamicImage;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::CaptureSettings;
use crate::error::Result;
use crate::matching::{FontMatcher, MatchResult};
use crate::vision::features::{extract_features, FeatureVector};
use crate::vision::ocr::{crop_glyph, segment_characters, TextRecognizer};
use crate::vision::preprocess::prepare_capture;

/// Result of identifying the font of one capture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identification {
    /// Ranked candidate fonts
    pub matches: MatchResult,
    /// Characters whose crops contributed a feature vector
    pub characters_used: usize,
    /// Characters accepted from the recognizer before feature extraction
    pub characters_recognized: usize,
}

/// Feature vectors of every usable character in a capture
pub fn capture_features(
    capture: &DynamicImage,
    recognizer: &dyn TextRecognizer,
    settings: &CaptureSettings,
) -> Result<(Vec<FeatureVector>, usize)> {
    // 1. Binarize: text white on black
    let binarized = prepare_capture(capture, settings);

    // 2. Recognize and split into characters
    let regions = recognizer.recognize(&binarized)?;
    let characters = segment_characters(&regions, settings.min_confidence);

    // 3. One vector per character crop; degenerate crops carry no sample
    let vectors: Vec<FeatureVector> = characters
        .iter()
        .map(|character| extract_features(&crop_glyph(&binarized, character)))
        .filter(|features| !features.is_zero())
        .collect();

    debug!(
        "{} text regions, {} characters, {} usable crops",
        regions.len(),
        characters.len(),
        vectors.len()
    );
    Ok((vectors, characters.len()))
}

/// Identify the font used in `capture`
pub fn identify(
    capture: &DynamicImage,
    recognizer: &dyn TextRecognizer,
    matcher: &FontMatcher,
    settings: &CaptureSettings,
    top_n: usize,
) -> Result<Identification> {
    let started = Instant::now();
    let (vectors, characters_recognized) = capture_features(capture, recognizer, settings)?;
    let matches = matcher.find_best_matches(&vectors, top_n);

    info!(
        "Identified {} candidates from {} characters in {:.1?}",
        matches.len(),
        vectors.len(),
        started.elapsed()
    );
    Ok(Identification {
        matches,
        characters_used: vectors.len(),
        characters_recognized,
    })
}

//! Glyph feature vectors
//!
//! Turns a binary glyph raster and its contour forest into a fixed
//! 7-component shape descriptor. The same function runs on glyphs rendered
//! from font files and on character crops taken from a capture, so the
//! computation must not depend on where the raster came from.

use serde::{Deserialize, Serialize};

use crate::vision::contour::{trace, Contour, ContourForest};
use crate::vision::raster::BinaryRaster;

/// Number of components in a [`FeatureVector`]
pub const FEATURE_LEN: usize = 7;

/// Component names, in vector order
pub const FEATURE_NAMES: [&str; FEATURE_LEN] = [
    "aspect_ratio",
    "pixel_density",
    "centroid_x",
    "centroid_y",
    "hole_count",
    "normalized_perimeter",
    "normalized_area",
];

/// Shape descriptor of a single glyph
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_LEN]);

impl FeatureVector {
    /// Sentinel returned for rasters that carry no usable glyph
    pub const ZERO: FeatureVector = FeatureVector([0.0; FEATURE_LEN]);

    /// Build a vector, replacing any non-finite component with 0
    pub fn new(values: [f64; FEATURE_LEN]) -> Self {
        Self(values.map(|v| if v.is_finite() { v } else { 0.0 }))
    }

    pub fn as_array(&self) -> &[f64; FEATURE_LEN] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    /// True for the all-zero sentinel
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.0[0]
    }

    pub fn pixel_density(&self) -> f64 {
        self.0[1]
    }

    pub fn centroid(&self) -> (f64, f64) {
        (self.0[2], self.0[3])
    }

    pub fn hole_count(&self) -> f64 {
        self.0[4]
    }

    pub fn normalized_perimeter(&self) -> f64 {
        self.0[5]
    }

    pub fn normalized_area(&self) -> f64 {
        self.0[6]
    }

    /// (name, value) pairs in vector order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

/// Trace `raster` and compute its feature vector
pub fn extract_features(raster: &BinaryRaster) -> FeatureVector {
    let forest = trace(raster);
    compute(raster, &forest)
}

/// Compute the feature vector of `raster` from its contour forest
pub fn compute(raster: &BinaryRaster, forest: &ContourForest) -> FeatureVector {
    let (width, height) = raster.dimensions();
    if raster.is_empty() {
        return FeatureVector::ZERO;
    }

    // 1. Primary outer contour: largest root, earliest on ties
    let Some(primary) = primary_outer(forest) else {
        return FeatureVector::ZERO;
    };
    let bbox = primary.bounds;

    // 2. Aspect ratio
    if bbox.height == 0 || bbox.width == 0 {
        return FeatureVector::ZERO;
    }
    let aspect_ratio = bbox.width as f64 / bbox.height as f64;

    // 3. Pixel density inside the bounding box
    let pixel_density = raster.foreground_in(bbox) as f64 / bbox.area() as f64;

    // 4. Centroid from raster moments, relative to the bounding box
    let (mut m00, mut m10, mut m01) = (0u64, 0u64, 0u64);
    for y in bbox.y..bbox.bottom() {
        for x in bbox.x..bbox.right() {
            if raster.get(x, y) {
                m00 += 1;
                m10 += x as u64;
                m01 += y as u64;
            }
        }
    }
    if m00 == 0 {
        return FeatureVector::ZERO;
    }
    let centroid_x = (m10 as f64 / m00 as f64 - bbox.x as f64) / bbox.width as f64;
    let centroid_y = (m01 as f64 / m00 as f64 - bbox.y as f64) / bbox.height as f64;

    // 5. Every non-root contour counts as a hole
    let hole_count = forest.non_root_count() as f64;

    // 6 & 7. Root contour totals, normalized by raster size
    let (perimeter, area) = forest
        .roots()
        .fold((0.0, 0.0), |(p, a), c| (p + c.perimeter, a + c.area));
    let (w, h) = (width as f64, height as f64);
    let diagonal = (w * w + h * h).sqrt();
    let normalized_perimeter = perimeter / diagonal;
    let normalized_area = area / (w * h);

    FeatureVector::new([
        aspect_ratio,
        pixel_density,
        centroid_x,
        centroid_y,
        hole_count,
        normalized_perimeter,
        normalized_area,
    ])
}

fn primary_outer(forest: &ContourForest) -> Option<&Contour> {
    forest.roots().fold(None, |best: Option<&Contour>, c| match best {
        Some(b) if b.area >= c.area => Some(b),
        _ => Some(c),
    })
}

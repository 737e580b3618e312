//! Vision Layer
//!
//! Everything that works on pixels: binary rasters, contour hierarchy
//! tracing, glyph feature vectors, capture preprocessing and OCR
//! segmentation. Offline-rendered glyphs and online capture crops go
//! through the same [`features::extract_features`] call.

pub mod contour;
pub mod features;
pub mod ocr;
pub mod preprocess;
pub mod raster;

pub use contour::{trace, BorderKind, Contour, ContourForest, ContourId};
pub use features::{compute, extract_features, FeatureVector, FEATURE_LEN, FEATURE_NAMES};
pub use ocr::{crop_glyph, segment_characters, CharacterBox, KnownTextRecognizer, TextRecognizer, TextRegion};
pub use preprocess::{binarize_glyph, prepare_capture, TextPolarity};
pub use raster::{BinaryRaster, Rect};

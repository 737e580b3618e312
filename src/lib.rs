//! TypePrint - font identification from glyph shapes
//!
//! Fingerprints fonts by the geometry of their rendered glyphs and matches
//! captured text against a database of those fingerprints.
//!
//! The offline side ([`fingerprint`]) renders a fixed charset for every
//! font and stores the mean glyph feature vector per font. The online side
//! ([`pipeline`], [`matching`]) computes the same feature vectors for
//! character crops taken from a capture and ranks fonts by cosine
//! similarity.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod matching;
pub mod pipeline;
pub mod storage;
pub mod vision;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use fingerprint::{BuildConfig, DatabaseBuilder, FontDatabase, FontSource, OutlineRenderer};
pub use matching::{match_fonts, DatabaseHandle, FontMatch, FontMatcher, MatchResult};
pub use pipeline::{identify, Identification};
pub use vision::{extract_features, BinaryRaster, FeatureVector};

//! Fingerprint Layer
//!
//! Offline side of the engine: discovering font files, rendering their
//! glyphs, averaging glyph feature vectors into per-font fingerprints and
//! persisting the resulting database.

pub mod builder;
pub mod database;
pub mod render;
pub mod sources;

pub use builder::{BuildConfig, BuildReport, DatabaseBuilder, FeatureAccumulator, GlyphFace, GlyphRenderer};
pub use database::FontDatabase;
pub use render::OutlineRenderer;
pub use sources::{default_font_directories, discover_fonts, font_id, font_sources, FontSource};

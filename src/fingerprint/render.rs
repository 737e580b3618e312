//! Outline glyph rendering
//!
//! Rasterizes glyph outlines read with `skrifa` into binary rasters: the
//! outline is flattened into line segments, filled with the nonzero
//! winding rule by sampling pixel centres, cropped to its ink and centred
//! on a square canvas.

use skrifa::{
    outline::{DrawSettings, OutlinePen},
    prelude::{LocationRef, Size},
    raw::FontRef,
    MetadataProvider,
};
use tracing::debug;

use crate::error::{Error, Result};
use crate::fingerprint::builder::{GlyphFace, GlyphRenderer};
use crate::fingerprint::sources::FontSource;
use crate::vision::raster::BinaryRaster;

/// Renderer for TrueType and CFF outlines
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineRenderer;

impl GlyphRenderer for OutlineRenderer {
    fn open(&self, source: &FontSource) -> Result<Box<dyn GlyphFace>> {
        let unreadable = |reason: String| Error::UnreadableFont {
            path: source.path.clone(),
            reason,
        };

        let data = std::fs::read(&source.path).map_err(|e| unreadable(e.to_string()))?;
        let font = FontRef::from_index(&data, source.index).map_err(|e| unreadable(e.to_string()))?;
        if !font.charmap().has_map() {
            return Err(unreadable("no usable character map".to_string()));
        }

        debug!("Opened {} ({} bytes)", source.id, data.len());
        Ok(Box::new(OutlineFace {
            data,
            index: source.index,
        }))
    }
}

/// An opened font file
struct OutlineFace {
    data: Vec<u8>,
    index: u32,
}

impl GlyphFace for OutlineFace {
    fn render(&self, ch: char, canvas_size: u32, point_size: f32) -> Option<BinaryRaster> {
        let font = FontRef::from_index(&self.data, self.index).ok()?;
        let glyph_id = font.charmap().map(ch)?;
        let glyph = font.outline_glyphs().get(glyph_id)?;

        let mut pen = FlatteningPen::default();
        let settings = DrawSettings::unhinted(Size::new(point_size), LocationRef::default());
        glyph.draw(settings, &mut pen).ok()?;

        let ink = fill_nonzero(&pen.finish())?;
        center_on_canvas(&ink, canvas_size)
    }
}

/// Straight segment in pixel space (y down)
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Edge {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

/// Pen that flattens curves into edges, flipping y so that it grows downwards
#[derive(Debug, Default)]
pub(crate) struct FlatteningPen {
    edges: Vec<Edge>,
    start: (f32, f32),
    current: (f32, f32),
}

impl FlatteningPen {
    fn push(&mut self, x: f32, y: f32) {
        let (x0, y0) = self.current;
        if (x0, y0) != (x, y) {
            self.edges.push(Edge { x0, y0, x1: x, y1: y });
        }
        self.current = (x, y);
    }

    /// Close the last subpath and hand out the edge list
    pub(crate) fn finish(mut self) -> Vec<Edge> {
        self.close();
        self.edges
    }
}

/// Segments used for a curve whose control polygon is `length` pixels long
fn curve_steps(length: f32) -> usize {
    (length.sqrt().ceil() as usize).clamp(2, 32)
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

impl OutlinePen for FlatteningPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close();
        self.start = (x, -y);
        self.current = (x, -y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(x, -y);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let p0 = self.current;
        let p1 = (cx0, -cy0);
        let p2 = (x, -y);
        let steps = curve_steps(distance(p0, p1) + distance(p1, p2));
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            let mt = 1.0 - t;
            let px = mt * mt * p0.0 + 2.0 * mt * t * p1.0 + t * t * p2.0;
            let py = mt * mt * p0.1 + 2.0 * mt * t * p1.1 + t * t * p2.1;
            self.push(px, py);
        }
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let p0 = self.current;
        let p1 = (cx0, -cy0);
        let p2 = (cx1, -cy1);
        let p3 = (x, -y);
        let steps = curve_steps(distance(p0, p1) + distance(p1, p2) + distance(p2, p3));
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            let mt = 1.0 - t;
            let a = mt * mt * mt;
            let b = 3.0 * mt * mt * t;
            let c = 3.0 * mt * t * t;
            let d = t * t * t;
            let px = a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0;
            let py = a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1;
            self.push(px, py);
        }
    }

    fn close(&mut self) {
        let (x, y) = self.start;
        self.push(x, y);
    }
}

/// Fill the region enclosed by `edges` with the nonzero winding rule.
///
/// A pixel is ink when its centre lies inside the outline. The returned
/// raster is cropped to the ink; `None` means nothing was filled.
pub(crate) fn fill_nonzero(edges: &[Edge]) -> Option<BinaryRaster> {
    let finite = edges
        .iter()
        .all(|e| e.x0.is_finite() && e.y0.is_finite() && e.x1.is_finite() && e.y1.is_finite());
    if edges.is_empty() || !finite {
        return None;
    }

    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for e in edges {
        min_x = min_x.min(e.x0).min(e.x1);
        min_y = min_y.min(e.y0).min(e.y1);
        max_x = max_x.max(e.x0).max(e.x1);
        max_y = max_y.max(e.y0).max(e.y1);
    }

    let origin_x = min_x.floor();
    let origin_y = min_y.floor();
    let width = (max_x.ceil() - origin_x) as u32;
    let height = (max_y.ceil() - origin_y) as u32;
    if width == 0 || height == 0 {
        return None;
    }

    let mut raster = BinaryRaster::new(width, height);
    let mut crossings: Vec<(f32, i32)> = Vec::new();

    for row in 0..height {
        let sample_y = origin_y + row as f32 + 0.5;

        // 1. Crossings of the sample line, with edge direction
        crossings.clear();
        for e in edges {
            let (winding, y_min, y_max) = if e.y0 < e.y1 {
                (1, e.y0, e.y1)
            } else {
                (-1, e.y1, e.y0)
            };
            if sample_y < y_min || sample_y >= y_max {
                continue;
            }
            let t = (sample_y - e.y0) / (e.y1 - e.y0);
            crossings.push((e.x0 + t * (e.x1 - e.x0), winding));
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        // 2. Fill pixel centres between crossings with nonzero winding
        let mut winding = 0;
        for pair in crossings.windows(2) {
            winding += pair[0].1;
            if winding == 0 {
                continue;
            }
            let first = (pair[0].0 - origin_x - 0.5).ceil().max(0.0) as u32;
            let end = ((pair[1].0 - origin_x - 0.5).ceil().max(0.0) as u32).min(width);
            for col in first..end {
                raster.set(col, row, true);
            }
        }
    }

    let ink = raster.ink_bounds()?;
    Some(raster.crop(ink))
}

/// Paste `ink` in the middle of a `canvas_size` square, clipping overflow
pub(crate) fn center_on_canvas(ink: &BinaryRaster, canvas_size: u32) -> Option<BinaryRaster> {
    let (width, height) = ink.dimensions();
    if width == 0 || height == 0 || canvas_size == 0 {
        return None;
    }

    let offset_x = (canvas_size as i64 - width as i64).div_euclid(2);
    let offset_y = (canvas_size as i64 - height as i64).div_euclid(2);

    Some(BinaryRaster::from_fn(canvas_size, canvas_size, |x, y| {
        let src_x = x as i64 - offset_x;
        let src_y = y as i64 - offset_y;
        src_x >= 0
            && src_y >= 0
            && src_x < width as i64
            && src_y < height as i64
            && ink.get(src_x as u32, src_y as u32)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::builder::{BuildConfig, DatabaseBuilder};
    use crate::vision::features::extract_features;
    use std::path::PathBuf;

    static TEST_FONT_FILE_PATH: &str = "resources/tests/dejavu/DejaVuSerif.ttf";

    fn test_font() -> FontSource {
        FontSource::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(TEST_FONT_FILE_PATH), 0)
    }

    /// Draw a closed polygon in font units (y up)
    fn polygon(pen: &mut FlatteningPen, points: &[(f32, f32)]) {
        pen.move_to(points[0].0, points[0].1);
        for &(x, y) in &points[1..] {
            pen.line_to(x, y);
        }
        pen.close();
    }

    #[test]
    fn test_fill_square() {
        let mut pen = FlatteningPen::default();
        polygon(&mut pen, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let ink = fill_nonzero(&pen.finish()).unwrap();

        assert_eq!(ink.dimensions(), (10, 10));
        assert_eq!(ink.foreground_count(), 100);
    }

    #[test]
    fn test_counter_wound_hole_is_left_empty() {
        let mut pen = FlatteningPen::default();
        // Outer clockwise, inner counter-clockwise (font winding convention)
        polygon(&mut pen, &[(0.0, 0.0), (0.0, 12.0), (12.0, 12.0), (12.0, 0.0)]);
        polygon(&mut pen, &[(4.0, 4.0), (8.0, 4.0), (8.0, 8.0), (4.0, 8.0)]);
        let ink = fill_nonzero(&pen.finish()).unwrap();

        assert_eq!(ink.dimensions(), (12, 12));
        assert_eq!(ink.foreground_count(), 144 - 16);
        assert!(!ink.get(6, 6));
        assert_eq!(extract_features(&ink).hole_count(), 1.0);
    }

    #[test]
    fn test_same_wound_overlap_is_filled() {
        let mut pen = FlatteningPen::default();
        polygon(&mut pen, &[(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0)]);
        polygon(&mut pen, &[(4.0, 0.0), (12.0, 0.0), (12.0, 8.0), (4.0, 8.0)]);
        let ink = fill_nonzero(&pen.finish()).unwrap();

        assert_eq!(ink.dimensions(), (12, 8));
        assert_eq!(ink.foreground_count(), 96);
    }

    #[test]
    fn test_quadratic_curve_is_flattened() {
        let mut pen = FlatteningPen::default();
        pen.move_to(0.0, 0.0);
        pen.quad_to(10.0, 20.0, 20.0, 0.0);
        pen.close();
        let edges = pen.finish();

        assert!(edges.len() > 3);
        let ink = fill_nonzero(&edges).unwrap();
        // The arch peaks at half the control height
        assert_eq!(ink.width(), 20);
        assert_eq!(ink.height(), 10);
    }

    #[test]
    fn test_empty_outline_has_no_ink() {
        assert!(fill_nonzero(&[]).is_none());

        // Degenerate: a single horizontal line
        let mut pen = FlatteningPen::default();
        pen.move_to(0.0, 0.0);
        pen.line_to(10.0, 0.0);
        assert!(fill_nonzero(&pen.finish()).is_none());
    }

    #[test]
    fn test_center_on_canvas() {
        let ink = BinaryRaster::from_fn(4, 2, |_, _| true);
        let canvas = center_on_canvas(&ink, 10).unwrap();

        assert_eq!(canvas.dimensions(), (10, 10));
        assert_eq!(canvas.ink_bounds().unwrap(), crate::vision::raster::Rect::new(3, 4, 4, 2));
    }

    #[test]
    fn test_center_on_canvas_clips_oversized_ink() {
        let ink = BinaryRaster::from_fn(12, 3, |x, _| x % 2 == 0);
        let canvas = center_on_canvas(&ink, 8).unwrap();

        assert_eq!(canvas.dimensions(), (8, 8));
        // Two columns cut off on each side
        assert!(canvas.get(0, 3));
        assert!(!canvas.get(1, 3));
        assert_eq!(canvas.foreground_count(), 4 * 3);
    }

    #[test]
    fn test_open_missing_font_is_unreadable() {
        let source = FontSource::new(PathBuf::from("/nonexistent/font.ttf"), 0);
        let result = OutlineRenderer.open(&source);
        assert!(matches!(result, Err(Error::UnreadableFont { .. })));
    }

    #[test]
    fn test_open_garbage_is_unreadable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"definitely not a font").unwrap();

        let source = FontSource::new(file.path().to_path_buf(), 0);
        let result = OutlineRenderer.open(&source);
        assert!(matches!(result, Err(Error::UnreadableFont { .. })));
    }

    #[test]
    fn test_render_real_glyph_is_centred() {
        let face = OutlineRenderer.open(&test_font()).unwrap();
        let canvas = face.render('o', 64, 48.0).unwrap();
        assert_eq!(canvas.dimensions(), (64, 64));

        let ink = canvas.ink_bounds().unwrap();
        let left = ink.x as i64;
        let right = 64 - ink.right() as i64;
        let top = ink.y as i64;
        let bottom = 64 - ink.bottom() as i64;
        assert!((left - right).abs() <= 1, "left {left}, right {right}");
        assert!((top - bottom).abs() <= 1, "top {top}, bottom {bottom}");
    }

    #[test]
    fn test_render_real_glyph_topology() {
        let face = OutlineRenderer.open(&test_font()).unwrap();
        let hole_count = |ch| extract_features(&face.render(ch, 64, 48.0).unwrap()).hole_count();

        assert_eq!(hole_count('o'), 1.0);
        assert_eq!(hole_count('B'), 2.0);
        assert_eq!(hole_count('l'), 0.0);
    }

    #[test]
    fn test_render_real_font_upright() {
        // y grows downwards: the stem of 'P' reaches below its bowl
        let face = OutlineRenderer.open(&test_font()).unwrap();
        let canvas = face.render('P', 64, 48.0).unwrap();
        let features = extract_features(&canvas);
        assert!(features.centroid().1 < 0.5);
    }

    #[test]
    fn test_render_real_font_blank_and_unmapped() {
        let face = OutlineRenderer.open(&test_font()).unwrap();
        assert!(face.render(' ', 64, 48.0).is_none());
        assert!(face.render('\u{E000}', 64, 48.0).is_none());
    }

    #[test]
    fn test_build_from_real_font() {
        let source = test_font();
        let builder = DatabaseBuilder::new(OutlineRenderer, BuildConfig::default());
        let (database, report) = builder.build_with_report(std::slice::from_ref(&source));

        assert_eq!(database.len(), 1);
        let vector = database.get(&source.id).unwrap();
        assert_eq!(vector.len(), crate::vision::features::FEATURE_LEN);
        assert_eq!(report.fonts_unreadable, 0);
        assert_eq!(report.samples, BuildConfig::default().charset.len());
    }
}

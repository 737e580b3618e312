//! Binary raster storage
//!
//! A single bit-plane image: every pixel is either foreground (ink) or
//! background. Glyph crops from a capture and glyphs rendered from font
//! files both end up in this form before contour tracing.

use image::{GrayImage, Luma};

/// Axis-aligned pixel rectangle (x, y, width, height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Number of pixels covered
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True if `other` lies entirely inside this rectangle
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Clip this rectangle to a `width` x `height` canvas
    pub fn clip(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Rect {
            x,
            y,
            width: self.right().min(width) - x,
            height: self.bottom().min(height) - y,
        }
    }
}

/// Width x height grid of foreground/background pixels, row-major
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinaryRaster {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl BinaryRaster {
    /// Create an all-background raster
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width as usize * height as usize],
        }
    }

    /// Create a raster by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    /// Treat every non-zero luma pixel as foreground
    pub fn from_luma(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.pixels().map(|p| p.0[0] != 0).collect(),
        }
    }

    /// Render as white-on-black luma image
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True if the raster has no pixels at all
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Pixel state; anything outside the raster reads as background
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Set a pixel; writes outside the raster are ignored
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = value;
        }
    }

    pub fn foreground_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    /// Count foreground pixels inside `rect` (clipped to the raster)
    pub fn foreground_in(&self, rect: Rect) -> usize {
        let rect = rect.clip(self.width, self.height);
        (rect.y..rect.bottom())
            .map(|y| {
                let row = y as usize * self.width as usize;
                self.pixels[row + rect.x as usize..row + rect.right() as usize]
                    .iter()
                    .filter(|&&p| p)
                    .count()
            })
            .sum()
    }

    /// Copy out the part of the raster covered by `rect` (clipped)
    pub fn crop(&self, rect: Rect) -> BinaryRaster {
        let rect = rect.clip(self.width, self.height);
        BinaryRaster::from_fn(rect.width, rect.height, |x, y| {
            self.get(rect.x + x, rect.y + y)
        })
    }

    /// Tight bounding box of all foreground pixels, if any
    pub fn ink_bounds(&self) -> Option<Rect> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut any = false;

        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    any = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        any.then(|| Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Build a raster from rows of text where `#` marks foreground
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        BinaryRaster::from_fn(width, height, |x, y| {
            rows[y as usize].as_bytes().get(x as usize) == Some(&b'#')
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_raster_is_background() {
        let raster = BinaryRaster::new(4, 3);
        assert_eq!(raster.dimensions(), (4, 3));
        assert_eq!(raster.pixel_count(), 12);
        assert_eq!(raster.foreground_count(), 0);
        assert!(raster.ink_bounds().is_none());
    }

    #[test]
    fn test_out_of_range_reads_background() {
        let mut raster = BinaryRaster::from_fn(2, 2, |_, _| true);
        assert!(!raster.get(2, 0));
        assert!(!raster.get(0, 5));
        raster.set(9, 9, true);
        assert_eq!(raster.foreground_count(), 4);
    }

    #[test]
    fn test_luma_roundtrip_keeps_foreground() {
        let raster = BinaryRaster::from_rows(&[
            "#..",
            ".#.",
            "..#",
        ]);
        let luma = raster.to_luma();
        assert_eq!(luma.get_pixel(1, 1).0[0], 255);
        assert_eq!(luma.get_pixel(1, 0).0[0], 0);
        assert_eq!(BinaryRaster::from_luma(&luma), raster);
    }

    #[test]
    fn test_foreground_in_rect() {
        let raster = BinaryRaster::from_rows(&[
            "####",
            "#..#",
            "####",
        ]);
        assert_eq!(raster.foreground_in(Rect::new(0, 0, 4, 3)), 10);
        assert_eq!(raster.foreground_in(Rect::new(1, 1, 2, 1)), 0);
        // Clipped to the raster
        assert_eq!(raster.foreground_in(Rect::new(3, 0, 10, 10)), 3);
    }

    #[test]
    fn test_crop_and_ink_bounds() {
        let raster = BinaryRaster::from_rows(&[
            "......",
            "..##..",
            "..#...",
            "......",
        ]);
        let bounds = raster.ink_bounds().unwrap();
        assert_eq!(bounds, Rect::new(2, 1, 2, 2));

        let cropped = raster.crop(bounds);
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.foreground_count(), 3);
        assert!(!cropped.get(1, 1));
    }

    #[test]
    fn test_rect_containment() {
        let outer = Rect::new(0, 0, 10, 10);
        assert!(outer.contains(&Rect::new(2, 2, 3, 3)));
        assert!(outer.contains(&Rect::new(0, 2, 3, 3)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&Rect::new(2, 2, 9, 3)));
    }

    #[test]
    fn test_rect_clip() {
        let rect = Rect::new(8, 8, 5, 5).clip(10, 10);
        assert_eq!(rect, Rect::new(8, 8, 2, 2));
        assert!(Rect::new(20, 0, 3, 3).clip(10, 10).is_empty());
    }
}

//! Contour hierarchy tracing
//!
//! Border following with hierarchy (Suzuki & Abe, 1985). Foreground is
//! 8-connected, background 4-connected. The raster is scanned once in row
//! order; each unlabeled border start is followed around its region while
//! the visited border pixels are labeled with the contour's sequence number.
//! The last labeled border crossed on the current row decides the parent of
//! the next contour, so no point-in-polygon tests are needed and the whole
//! pass stays linear in the pixel count.
//!
//! Tracing pads the raster with one pixel of background on every side, so
//! regions touching the raster edge are traced like any other region.
//! Contour points are reported in the coordinates of the unpadded raster.

use crate::vision::raster::{BinaryRaster, Rect};

/// Index of a contour inside its [`ContourForest`]
pub type ContourId = usize;

/// Neighbour offsets (dx, dy) in clockwise order starting west, y pointing down
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, 0),  // w
    (-1, -1), // nw
    (0, -1),  // n
    (1, -1),  // ne
    (1, 0),   // e
    (1, 1),   // se
    (0, 1),   // s
    (-1, 1),  // sw
];

const EAST: usize = 4;

/// Maps `(dy + 1) * 3 + (dx + 1)` to an index into `NEIGHBOURS`
const DIRECTION_LOOKUP: [usize; 9] = [1, 2, 3, 0, 0, 4, 7, 6, 5];

/// Label reserved for the virtual frame around the padded raster
const FRAME_LABEL: i32 = 1;

/// Polarity of a traced border
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    /// Outer shell of a foreground region
    Outer,
    /// Boundary between a foreground region and a background hole inside it
    Hole,
}

/// A single traced border
#[derive(Debug, Clone)]
pub struct Contour {
    /// Sequential id, equal to the discovery order in the raster scan
    pub id: ContourId,
    pub kind: BorderKind,
    /// Enclosing contour, `None` for roots
    pub parent: Option<ContourId>,
    /// Border pixels in traversal order
    pub points: Vec<(u32, u32)>,
    /// Inclusive pixel extent of the border
    pub bounds: Rect,
    /// Polygon area enclosed by the border pixel centres
    pub area: f64,
    /// Closed polygon length through the border pixel centres
    pub perimeter: f64,
}

impl Contour {
    fn from_points(
        id: ContourId,
        kind: BorderKind,
        parent: Option<ContourId>,
        points: Vec<(u32, u32)>,
    ) -> Self {
        let bounds = point_bounds(&points);
        let area = polygon_area(&points);
        let perimeter = closed_length(&points);
        Self {
            id,
            kind,
            parent,
            points,
            bounds,
            area,
            perimeter,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// All contours of one raster with their parent/child links
#[derive(Debug, Clone, Default)]
pub struct ContourForest {
    width: u32,
    height: u32,
    contours: Vec<Contour>,
}

impl ContourForest {
    fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            contours: Vec::new(),
        }
    }

    /// Dimensions of the traced raster
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Contours in discovery order; a contour's id is its index here
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn get(&self, id: ContourId) -> Option<&Contour> {
        self.contours.get(id)
    }

    /// Contours without a parent
    pub fn roots(&self) -> impl Iterator<Item = &Contour> {
        self.contours.iter().filter(|c| c.parent.is_none())
    }

    /// Direct children of `id`
    pub fn children(&self, id: ContourId) -> impl Iterator<Item = &Contour> {
        self.contours.iter().filter(move |c| c.parent == Some(id))
    }

    /// Number of contours that have a parent
    pub fn non_root_count(&self) -> usize {
        self.contours.iter().filter(|c| c.parent.is_some()).count()
    }

    /// Nesting depth of `id` (roots are at depth 0)
    pub fn depth(&self, id: ContourId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|c| c.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.contours[parent].parent;
        }
        depth
    }
}

/// Trace every border in `raster` and link them into a forest
pub fn trace(raster: &BinaryRaster) -> ContourForest {
    let (width, height) = raster.dimensions();
    if raster.is_empty() {
        return ContourForest::empty(width, height);
    }

    let mut grid = LabelGrid::padded_from(raster);
    let mut contours: Vec<Contour> = Vec::new();

    for y in 1..grid.height - 1 {
        // Most recently crossed border on this row
        let mut last_border = FRAME_LABEL;

        for x in 1..grid.width - 1 {
            let value = grid.at(x, y);
            if value == 0 {
                continue;
            }

            let start = if value == 1 && grid.at(x - 1, y) == 0 {
                Some((BorderKind::Outer, (x - 1, y)))
            } else if value >= 1 && grid.at(x + 1, y) == 0 {
                if value > 1 {
                    last_border = value;
                }
                Some((BorderKind::Hole, (x + 1, y)))
            } else {
                None
            };

            if let Some((kind, from)) = start {
                let id = contours.len();
                let label = id as i32 + 2;
                let parent = parent_of(kind, last_border, &contours);
                let points = grid
                    .follow(label, (x, y), from)
                    .into_iter()
                    .map(|(px, py)| ((px - 1) as u32, (py - 1) as u32))
                    .collect();
                contours.push(Contour::from_points(id, kind, parent, points));
            }

            let value = grid.at(x, y);
            if value != 1 {
                last_border = value.abs();
            }
        }
    }

    ContourForest {
        width,
        height,
        contours,
    }
}

/// Decide the parent of a new border from the kind of the last crossed border
fn parent_of(kind: BorderKind, last_border: i32, contours: &[Contour]) -> Option<ContourId> {
    if last_border <= FRAME_LABEL {
        // The frame behaves like a hole border that has no parent
        return None;
    }
    let previous = &contours[(last_border - 2) as usize];
    if (kind == BorderKind::Outer) != (previous.kind == BorderKind::Outer) {
        Some(previous.id)
    } else {
        previous.parent
    }
}

/// Working label image: 0 background, 1 unvisited foreground,
/// +/-n visited border pixel of contour label n
struct LabelGrid {
    width: usize,
    height: usize,
    labels: Vec<i32>,
}

impl LabelGrid {
    fn padded_from(raster: &BinaryRaster) -> Self {
        let width = raster.width() as usize + 2;
        let height = raster.height() as usize + 2;
        let mut labels = vec![0; width * height];
        for y in 0..raster.height() {
            for x in 0..raster.width() {
                if raster.get(x, y) {
                    labels[(y as usize + 1) * width + x as usize + 1] = 1;
                }
            }
        }
        Self {
            width,
            height,
            labels,
        }
    }

    fn at(&self, x: usize, y: usize) -> i32 {
        self.labels[y * self.width + x]
    }

    fn set(&mut self, (x, y): (usize, usize), value: i32) {
        self.labels[y * self.width + x] = value;
    }

    fn get(&self, (x, y): (usize, usize)) -> i32 {
        self.at(x, y)
    }

    /// Follow the border starting at `start`, entered from background pixel `from`.
    ///
    /// Foreground pixels never sit on the padding, so every neighbour lookup
    /// stays inside the grid.
    fn follow(&mut self, label: i32, start: (usize, usize), from: (usize, usize)) -> Vec<(usize, usize)> {
        // Clockwise search for the first non-zero neighbour
        let from_dir = direction(start, from);
        let first = (0..8)
            .map(|k| (from_dir + k) % 8)
            .map(|dir| neighbour(start, dir))
            .find(|&p| self.get(p) != 0);

        let Some(first) = first else {
            // Isolated pixel
            self.set(start, -label);
            return vec![start];
        };

        let mut points = Vec::new();
        let mut previous = first;
        let mut current = start;

        loop {
            points.push(current);

            // Counter-clockwise search starting just after `previous`
            let back = direction(current, previous);
            let mut east_is_background = false;
            let mut next = previous;
            for k in 1..=8 {
                let dir = (back + 8 - k) % 8;
                let candidate = neighbour(current, dir);
                if self.get(candidate) != 0 {
                    next = candidate;
                    break;
                }
                if dir == EAST {
                    east_is_background = true;
                }
            }

            if east_is_background {
                self.set(current, -label);
            } else if self.get(current) == 1 {
                self.set(current, label);
            }

            if next == start && current == first {
                break;
            }
            previous = current;
            current = next;
        }

        points
    }
}

fn neighbour((x, y): (usize, usize), dir: usize) -> (usize, usize) {
    let (dx, dy) = NEIGHBOURS[dir];
    ((x as isize + dx) as usize, (y as isize + dy) as usize)
}

fn direction(from: (usize, usize), to: (usize, usize)) -> usize {
    let dx = to.0 as isize - from.0 as isize;
    let dy = to.1 as isize - from.1 as isize;
    DIRECTION_LOOKUP[((dy + 1) * 3 + (dx + 1)) as usize]
}

fn point_bounds(points: &[(u32, u32)]) -> Rect {
    let Some(&(x0, y0)) = points.first() else {
        return Rect::default();
    };
    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (x0, y0, x0, y0),
        |(min_x, min_y, max_x, max_y), &(x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        },
    );
    Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

/// Shoelace area of the closed polygon through `points`
fn polygon_area(points: &[(u32, u32)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| {
            x0 as f64 * y1 as f64 - x1 as f64 * y0 as f64
        })
        .sum();
    twice.abs() / 2.0
}

/// Length of the closed polygon through `points`
fn closed_length(points: &[(u32, u32)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| {
            let dx = x1 as f64 - x0 as f64;
            let dy = y1 as f64 - y0 as f64;
            (dx * dx + dy * dy).sqrt()
        })
        .sum()
}

//! Open boundary segments along the grid perimeter.
//!
//! Each open side is scanned along its perimeter run and split at dry cells
//! into contiguous wet segments. Corner ownership is fixed:
//!
//! - an open east side owns both eastern corners
//! - an open west side owns both western corners
//! - north and south own the rest of their row
//!
//! so every perimeter cell belongs to at most one segment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::mask::OceanMask;
use crate::types::{GridPoint, Side, SideBoundaries};

/// Open-boundary settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Which sides exchange water with the outer ocean
    pub open: SideBoundaries<bool>,
    /// Boundary-condition type code written for every segment
    pub type_code: i32,
    /// Trailing field of every segment line
    pub spare: i32,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            // The glacier closes the fjord in the west.
            open: SideBoundaries::new(false, true, true, true),
            type_code: 4,
            spare: 0,
        }
    }
}

impl BoundaryConfig {
    /// Set the open sides.
    pub fn with_open(mut self, open: SideBoundaries<bool>) -> Self {
        self.open = open;
        self
    }

    /// Set the type code.
    pub fn with_type_code(mut self, type_code: i32) -> Self {
        self.type_code = type_code;
        self
    }
}

/// A contiguous run of wet cells on one side of the perimeter.
///
/// Indices are 0-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenBoundarySegment {
    /// Side of the domain
    pub side: Side,
    /// Row (north/south) or column (east/west) of the side
    pub position: usize,
    /// First index along the side
    pub start: usize,
    /// Last index along the side
    pub end: usize,
    /// Boundary-condition type code
    pub type_code: i32,
    /// Spare field
    pub spare: i32,
}

impl OpenBoundarySegment {
    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    /// Whether the range holds no cell (`end < start`).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Cells of the segment in increasing index order.
    pub fn cells(&self) -> impl Iterator<Item = GridPoint> + '_ {
        (self.start..=self.end).map(move |k| {
            if self.side.is_row() {
                GridPoint::new(self.position, k)
            } else {
                GridPoint::new(k, self.position)
            }
        })
    }
}

/// All open boundary segments of a grid, in descriptor order.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenBoundaries {
    /// Grid shape `(n_rows, n_cols)`
    pub shape: (usize, usize),
    /// Segments ordered west, north, east, south, then by start index
    pub segments: Vec<OpenBoundarySegment>,
}

impl OpenBoundaries {
    /// Segments of one side.
    pub fn for_side(&self, side: Side) -> impl Iterator<Item = &OpenBoundarySegment> + '_ {
        self.segments.iter().filter(move |s| s.side == side)
    }

    /// Total number of boundary points.
    pub fn n_points(&self) -> usize {
        self.segments.iter().map(OpenBoundarySegment::len).sum()
    }

    /// All boundary points in descriptor order.
    pub fn points(&self) -> Vec<GridPoint> {
        self.segments.iter().flat_map(|s| s.cells()).collect()
    }

    /// Cells claimed by more than one segment.
    pub fn overlaps(&self) -> Vec<GridPoint> {
        let mut seen = BTreeSet::new();
        let mut twice = BTreeSet::new();
        for p in self.points() {
            if !seen.insert(p) {
                twice.insert(p);
            }
        }
        twice.into_iter().collect()
    }

    /// Wet perimeter cells of open sides that no segment covers.
    pub fn uncovered(&self, mask: &OceanMask, open: &SideBoundaries<bool>) -> Vec<GridPoint> {
        let covered: BTreeSet<GridPoint> = self.points().into_iter().collect();
        let mut missing = BTreeSet::new();
        for side in open.sides_where(|&o| o) {
            for p in mask.perimeter(side) {
                if mask.is_wet(p) && !covered.contains(&p) {
                    missing.insert(p);
                }
            }
        }
        missing.into_iter().collect()
    }
}

/// Perimeter run owned by an open side, as indices along the side.
pub fn owned_run(side: Side, shape: (usize, usize), open: &SideBoundaries<bool>) -> RangeInclusive<usize> {
    let (n_rows, n_cols) = shape;
    match side {
        Side::East | Side::West => 0..=n_rows - 1,
        Side::North | Side::South => {
            let first = usize::from(open.west);
            let last = if open.east { n_cols - 2 } else { n_cols - 1 };
            first..=last
        }
    }
}

/// Build the open boundary segments of a mask.
///
/// Sides without any wet cell produce no segment.
pub fn build_open_boundaries(mask: &OceanMask, config: &BoundaryConfig) -> OpenBoundaries {
    let shape = mask.shape();
    let (n_rows, n_cols) = shape;
    let mut segments = Vec::new();
    if n_rows < 2 || n_cols < 2 {
        return OpenBoundaries { shape, segments };
    }

    for side in Side::ALL {
        if !config.open[side] {
            continue;
        }
        let position = side.line_index(n_rows, n_cols);
        let cell = |k: usize| {
            if side.is_row() {
                GridPoint::new(position, k)
            } else {
                GridPoint::new(k, position)
            }
        };

        let mut run_start: Option<usize> = None;
        let run = owned_run(side, shape, &config.open);
        let last = *run.end();
        for k in run {
            let wet = mask.is_wet(cell(k));
            match (wet, run_start) {
                (true, None) => run_start = Some(k),
                (false, Some(start)) => {
                    segments.push(segment(side, position, start, k - 1, config));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            segments.push(segment(side, position, start, last, config));
        }
    }

    let boundaries = OpenBoundaries { shape, segments };
    for side in Side::ALL {
        let n = boundaries.for_side(side).count();
        if config.open[side] && n == 0 {
            log::warn!("open {side} boundary has no wet cells and is omitted");
        }
    }
    log::info!(
        "open boundaries: {} segments, {} points",
        boundaries.segments.len(),
        boundaries.n_points()
    );
    boundaries
}

fn segment(side: Side, position: usize, start: usize, end: usize, config: &BoundaryConfig) -> OpenBoundarySegment {
    OpenBoundarySegment {
        side,
        position,
        start,
        end,
        type_code: config.type_code,
        spare: config.spare,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn open_mask(n_rows: usize, n_cols: usize) -> OceanMask {
        OceanMask::from_array(Array2::from_elem((n_rows, n_cols), true))
    }

    #[test]
    fn test_corner_ownership() {
        let mask = open_mask(4, 5);
        let b = build_open_boundaries(&mask, &BoundaryConfig::default());
        let north: Vec<_> = b.for_side(Side::North).collect();
        let east: Vec<_> = b.for_side(Side::East).collect();
        let south: Vec<_> = b.for_side(Side::South).collect();
        assert_eq!((north[0].start, north[0].end, north[0].position), (0, 3, 3));
        assert_eq!((east[0].start, east[0].end, east[0].position), (0, 3, 4));
        assert_eq!((south[0].start, south[0].end, south[0].position), (0, 3, 0));
        assert!(b.overlaps().is_empty());
        assert!(b.uncovered(&mask, &BoundaryConfig::default().open).is_empty());
        assert_eq!(b.n_points(), 4 + 4 + 4);
    }

    #[test]
    fn test_segment_length() {
        let b = build_open_boundaries(&open_mask(4, 5), &BoundaryConfig::default());
        assert!(b.segments.iter().all(|s| !s.is_empty() && s.len() == s.cells().count()));

        let inverted = OpenBoundarySegment {
            start: 3,
            end: 2,
            ..b.segments[0]
        };
        assert!(inverted.is_empty());
        assert_eq!(inverted.len(), 0);
        assert_eq!(inverted.cells().count(), 0);
    }

    #[test]
    fn test_descriptor_order() {
        let b = build_open_boundaries(&open_mask(3, 3), &BoundaryConfig::default());
        let sides: Vec<Side> = b.segments.iter().map(|s| s.side).collect();
        assert_eq!(sides, vec![Side::North, Side::East, Side::South]);
    }

    #[test]
    fn test_dry_gap_splits_south() {
        let mut mask = open_mask(4, 8);
        mask.set_wet(GridPoint::new(0, 3), false);
        mask.set_wet(GridPoint::new(0, 4), false);
        let b = build_open_boundaries(&mask, &BoundaryConfig::default());
        let south: Vec<_> = b.for_side(Side::South).map(|s| (s.start, s.end)).collect();
        assert_eq!(south, vec![(0, 2), (5, 6)]);
    }

    #[test]
    fn test_dry_side_omitted() {
        let mut mask = open_mask(4, 4);
        for col in 0..4 {
            mask.set_wet(GridPoint::new(3, col), false);
        }
        let b = build_open_boundaries(&mask, &BoundaryConfig::default());
        assert_eq!(b.for_side(Side::North).count(), 0);
        // East run stops at the dry north-east corner.
        let east: Vec<_> = b.for_side(Side::East).map(|s| (s.start, s.end)).collect();
        assert_eq!(east, vec![(0, 2)]);
    }

    #[test]
    fn test_open_west_owns_western_corners() {
        let mask = open_mask(3, 4);
        let config = BoundaryConfig::default().with_open(SideBoundaries::uniform(true));
        let b = build_open_boundaries(&mask, &config);
        let north: Vec<_> = b.for_side(Side::North).map(|s| (s.start, s.end)).collect();
        assert_eq!(north, vec![(1, 2)]);
        assert!(b.overlaps().is_empty());
        assert!(b.uncovered(&mask, &config.open).is_empty());
    }

    #[test]
    fn test_segment_cells() {
        let s = OpenBoundarySegment {
            side: Side::East,
            position: 4,
            start: 1,
            end: 2,
            type_code: 4,
            spare: 0,
        };
        let cells: Vec<_> = s.cells().collect();
        assert_eq!(cells, vec![GridPoint::new(1, 4), GridPoint::new(2, 4)]);
    }
}

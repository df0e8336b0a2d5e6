//! Sponge zones at the open boundaries.
//!
//! Inside a band of `width` rows/columns along each open side, fields are
//! overwritten with the value of the innermost row/column outside the band.
//! The band then has no gradient normal to the boundary, matching the flat
//! topography used there.
//!
//! Rows are flattened first (north, south), then columns (east, west), so
//! corner blocks take the value of the innermost interior cell.
//!
//! ```text
//! north, width 2:   row ny-1 <- row ny-3
//!                   row ny-2 <- row ny-3
//! ```

use ndarray::{Array2, Array3, ArrayViewMut2, Axis, s};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::TopographyDataset;
use crate::types::{Side, SideBoundaries};

/// Error type for sponge zones.
#[derive(Debug, Error)]
pub enum SpongeError {
    /// Sponge bands leave no interior row or column
    #[error("sponge width {width} leaves no interior along {side} for grid shape {shape:?}")]
    TooWide {
        width: usize,
        side: Side,
        shape: (usize, usize),
    },
}

/// Sponge zone settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpongeConfig {
    /// Number of rows/columns flattened at each open side
    pub width: usize,
}

impl Default for SpongeConfig {
    fn default() -> Self {
        Self { width: 4 }
    }
}

impl SpongeConfig {
    /// Set the width.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Sponge bands of a grid with a given set of open sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpongeZone {
    width: usize,
    open: SideBoundaries<bool>,
    shape: (usize, usize),
}

impl SpongeZone {
    /// Create the zone, checking that an interior remains.
    pub fn new(config: &SpongeConfig, open: SideBoundaries<bool>, shape: (usize, usize)) -> Result<Self, SpongeError> {
        let w = config.width;
        let (n_rows, n_cols) = shape;
        let needed = |a: bool, b: bool| w * (usize::from(a) + usize::from(b)) + 1;
        if n_rows < needed(open.north, open.south) {
            let side = if open.north { Side::North } else { Side::South };
            return Err(SpongeError::TooWide { width: w, side, shape });
        }
        if n_cols < needed(open.east, open.west) {
            let side = if open.east { Side::East } else { Side::West };
            return Err(SpongeError::TooWide { width: w, side, shape });
        }
        Ok(Self {
            width: w,
            open,
            shape,
        })
    }

    /// Width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether `(row, col)` lies in a sponge band.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        let (n_rows, n_cols) = self.shape;
        let w = self.width;
        (self.open.south && row < w)
            || (self.open.north && row + w >= n_rows)
            || (self.open.west && col < w)
            || (self.open.east && col + w >= n_cols)
    }

    /// Flatten a 2D `(row, col)` field in place.
    pub fn flatten<T: Copy>(&self, mut field: ArrayViewMut2<'_, T>) {
        if self.width == 0 {
            return;
        }
        let (n_rows, n_cols) = field.dim();
        let w = self.width;
        if self.open.north {
            let src = field.row(n_rows - 1 - w).to_owned();
            for r in n_rows - w..n_rows {
                field.row_mut(r).assign(&src);
            }
        }
        if self.open.south {
            let src = field.row(w).to_owned();
            for r in 0..w {
                field.row_mut(r).assign(&src);
            }
        }
        if self.open.east {
            let src = field.column(n_cols - 1 - w).to_owned();
            for c in n_cols - w..n_cols {
                field.column_mut(c).assign(&src);
            }
        }
        if self.open.west {
            let src = field.column(w).to_owned();
            for c in 0..w {
                field.column_mut(c).assign(&src);
            }
        }
    }

    /// Flatten a 2D field, returning a copy.
    pub fn flattened<T: Copy>(&self, field: &Array2<T>) -> Array2<T> {
        let mut out = field.clone();
        self.flatten(out.view_mut());
        out
    }

    /// Flatten every level of a `(level, row, col)` field in place.
    pub fn flatten_levels(&self, field: &mut Array3<f64>) {
        for level in field.axis_iter_mut(Axis(0)) {
            self.flatten(level);
        }
    }

    /// Flatten all fields of a topography dataset.
    pub fn flatten_topography(&self, dataset: &TopographyDataset) -> TopographyDataset {
        let mut out = dataset.clone();
        let mut wet = out.mask.wet().clone();
        self.flatten(wet.view_mut());
        out.mask = crate::mask::OceanMask::from_array(wet);
        self.flatten(out.bathymetry.view_mut());
        self.flatten(out.ice_draft.view_mut());
        self.flatten(out.ice_thickness.view_mut());
        out
    }

    /// Innermost interior cell that a sponge cell copies.
    pub fn source_of(&self, row: usize, col: usize) -> (usize, usize) {
        let (n_rows, n_cols) = self.shape;
        let w = self.width;
        let row = if self.open.north && row + w >= n_rows {
            n_rows - 1 - w
        } else if self.open.south && row < w {
            w
        } else {
            row
        };
        let col = if self.open.east && col + w >= n_cols {
            n_cols - 1 - w
        } else if self.open.west && col < w {
            w
        } else {
            col
        };
        (row, col)
    }
}

/// Maximum absolute difference between a sponge cell and its source cell.
///
/// NaN pairs count as equal.
pub fn sponge_deviation(zone: &SpongeZone, field: &Array2<f64>) -> f64 {
    let mut max: f64 = 0.0;
    for ((r, c), &v) in field.indexed_iter() {
        if !zone.contains(r, c) {
            continue;
        }
        let src = field[zone.source_of(r, c)];
        if v.is_nan() && src.is_nan() {
            continue;
        }
        let d = (v - src).abs();
        max = if d.is_nan() { f64::INFINITY } else { max.max(d) };
    }
    max
}

/// Slice of the interior (non-sponge) region.
pub fn interior<T>(zone: &SpongeZone, field: &Array2<T>) -> Array2<T>
where
    T: Clone,
{
    let (n_rows, n_cols) = zone.shape;
    let w = zone.width;
    let r0 = if zone.open.south { w } else { 0 };
    let r1 = if zone.open.north { n_rows - w } else { n_rows };
    let c0 = if zone.open.west { w } else { 0 };
    let c1 = if zone.open.east { n_cols - w } else { n_cols };
    field.slice(s![r0..r1, c0..c1]).to_owned()
}

//! Wet/dry classification of the model grid.
//!
//! A cell is wet (ocean, possibly under floating ice) when
//!
//! ```text
//! bedrock < -min_depth  AND  ice_base > bedrock
//! ```
//!
//! Wet regions that cannot be reached from an open side of the grid
//! perimeter (lakes, subglacial pockets, single stray cells) are removed by
//! [`OceanMask::keep_connected_to`].

use ndarray::{Array2, Zip};
use std::collections::VecDeque;
use std::fmt;

use super::MaskError;
use crate::types::{GridPoint, Side, SideBoundaries};

/// Surface classification codes of the source topography products.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SurfaceType {
    /// Open ocean
    Ocean = 0,
    /// Land without ice
    IceFreeLand = 1,
    /// Ice resting on bedrock
    GroundedIce = 2,
    /// Ice shelf or floating tongue
    FloatingIce = 3,
    /// Lake below grounded ice
    SubglacialLake = 4,
}

impl SurfaceType {
    /// Decode a stored surface code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SurfaceType::Ocean),
            1 => Some(SurfaceType::IceFreeLand),
            2 => Some(SurfaceType::GroundedIce),
            3 => Some(SurfaceType::FloatingIce),
            4 => Some(SurfaceType::SubglacialLake),
            _ => None,
        }
    }

    /// Stored code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the surface type implies an ocean water column.
    #[inline]
    pub fn has_ocean_water(self) -> bool {
        matches!(self, SurfaceType::Ocean | SurfaceType::FloatingIce)
    }
}

/// Boolean ocean mask on a geodetic grid, `true` = wet.
#[derive(Clone, Debug, PartialEq)]
pub struct OceanMask {
    wet: Array2<bool>,
}

impl OceanMask {
    /// Wrap an existing boolean array.
    pub fn from_array(wet: Array2<bool>) -> Self {
        Self { wet }
    }

    /// Mask where every cell is wet.
    pub fn all_wet(shape: (usize, usize)) -> Self {
        Self {
            wet: Array2::from_elem(shape, true),
        }
    }

    /// Mask where every cell is dry.
    pub fn all_dry(shape: (usize, usize)) -> Self {
        Self {
            wet: Array2::from_elem(shape, false),
        }
    }

    /// Derive the mask from bedrock and ice-base elevations.
    ///
    /// `min_depth` is the minimum depth of the sea floor below sea level (m).
    pub fn from_elevations(bedrock: &Array2<f64>, ice_base: &Array2<f64>, min_depth: f64) -> Result<Self, MaskError> {
        if bedrock.dim() != ice_base.dim() {
            return Err(MaskError::ShapeMismatch {
                expected: bedrock.dim(),
                found: ice_base.dim(),
            });
        }
        let threshold = -min_depth;
        let wet = Zip::from(bedrock)
            .and(ice_base)
            .map_collect(|&bed, &base| bed < threshold && base > bed);
        Ok(Self { wet })
    }

    /// Derive the mask from positive-down depths.
    ///
    /// Wet where the bathymetry is defined, deeper than `min_depth` and deeper
    /// than the ice draft.
    pub fn from_depths(bathymetry: &Array2<f64>, ice_draft: &Array2<f64>, min_depth: f64) -> Result<Self, MaskError> {
        if bathymetry.dim() != ice_draft.dim() {
            return Err(MaskError::ShapeMismatch {
                expected: bathymetry.dim(),
                found: ice_draft.dim(),
            });
        }
        let wet = Zip::from(bathymetry)
            .and(ice_draft)
            .map_collect(|&depth, &draft| depth.is_finite() && depth > min_depth && depth > draft);
        Ok(Self { wet })
    }

    /// Shape `(n_rows, n_cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.wet.dim()
    }

    /// Underlying boolean array.
    #[inline]
    pub fn wet(&self) -> &Array2<bool> {
        &self.wet
    }

    /// Consume the mask, returning the boolean array.
    pub fn into_array(self) -> Array2<bool> {
        self.wet
    }

    /// Check if a cell is wet.
    #[inline]
    pub fn is_wet(&self, p: GridPoint) -> bool {
        self.wet[p.as_index()]
    }

    /// Check if a cell is dry.
    #[inline]
    pub fn is_dry(&self, p: GridPoint) -> bool {
        !self.wet[p.as_index()]
    }

    /// Whether `p` lies on the grid.
    #[inline]
    pub fn contains(&self, p: GridPoint) -> bool {
        let (n_rows, n_cols) = self.shape();
        p.row < n_rows && p.col < n_cols
    }

    /// Set the wet status of a cell.
    pub fn set_wet(&mut self, p: GridPoint, is_wet: bool) {
        self.wet[p.as_index()] = is_wet;
    }

    /// Number of wet cells.
    pub fn wet_count(&self) -> usize {
        self.wet.iter().filter(|&&w| w).count()
    }

    /// Number of dry cells.
    pub fn dry_count(&self) -> usize {
        self.wet.len() - self.wet_count()
    }

    /// All wet cells in row-major order.
    pub fn wet_cells(&self) -> Vec<GridPoint> {
        self.wet
            .indexed_iter()
            .filter_map(|((row, col), &w)| w.then_some(GridPoint::new(row, col)))
            .collect()
    }

    /// Cells whose status differs between `self` and `other`.
    pub fn differences(&self, other: &OceanMask) -> Result<Vec<GridPoint>, MaskError> {
        if self.shape() != other.shape() {
            return Err(MaskError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(Zip::indexed(&self.wet)
            .and(&other.wet)
            .fold(Vec::new(), |mut acc, (row, col), &a, &b| {
                if a != b {
                    acc.push(GridPoint::new(row, col));
                }
                acc
            }))
    }

    /// Cells of one side of the perimeter, in increasing index order.
    pub fn perimeter(&self, side: Side) -> Vec<GridPoint> {
        let (n_rows, n_cols) = self.shape();
        if n_rows == 0 || n_cols == 0 {
            return Vec::new();
        }
        let line = side.line_index(n_rows, n_cols);
        if side.is_row() {
            (0..n_cols).map(|col| GridPoint::new(line, col)).collect()
        } else {
            (0..n_rows).map(|row| GridPoint::new(row, line)).collect()
        }
    }

    /// Keep only wet cells 4-connected to a wet cell on an open side.
    ///
    /// Returns the filtered mask and the number of removed cells.
    pub fn keep_connected_to(&self, open: &SideBoundaries<bool>) -> (OceanMask, usize) {
        let shape = self.shape();
        let mut reached = Array2::from_elem(shape, false);
        let mut queue = VecDeque::new();

        for side in open.sides_where(|&o| o) {
            for p in self.perimeter(side) {
                if self.is_wet(p) && !reached[p.as_index()] {
                    reached[p.as_index()] = true;
                    queue.push_back(p);
                }
            }
        }

        while let Some(p) = queue.pop_front() {
            for q in p.neighbours4(shape) {
                if self.is_wet(q) && !reached[q.as_index()] {
                    reached[q.as_index()] = true;
                    queue.push_back(q);
                }
            }
        }

        let removed = self.wet_count() - reached.iter().filter(|&&r| r).count();
        (OceanMask { wet: reached }, removed)
    }

    /// Summary counts.
    pub fn statistics(&self) -> MaskStatistics {
        let wet = self.wet_count();
        MaskStatistics {
            total_cells: self.wet.len(),
            wet_cells: wet,
            dry_cells: self.wet.len() - wet,
        }
    }
}

/// Statistics about an ocean mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskStatistics {
    /// Total number of cells
    pub total_cells: usize,
    /// Number of wet cells
    pub wet_cells: usize,
    /// Number of dry cells
    pub dry_cells: usize,
}

impl fmt::Display for MaskStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = |n: usize| {
            if self.total_cells == 0 {
                0.0
            } else {
                100.0 * n as f64 / self.total_cells as f64
            }
        };
        writeln!(f, "Ocean Mask Statistics:")?;
        writeln!(f, "  Total cells: {}", self.total_cells)?;
        writeln!(f, "  Wet cells: {} ({:.1}%)", self.wet_cells, pct(self.wet_cells))?;
        write!(f, "  Dry cells: {} ({:.1}%)", self.dry_cells, pct(self.dry_cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_elevations() {
        let bedrock = array![[-100.0, -1.0, 20.0], [-300.0, -300.0, -50.0]];
        let ice_base = array![[0.0, 0.0, 20.0], [-200.0, -300.0, 0.0]];
        let mask = OceanMask::from_elevations(&bedrock, &ice_base, 2.0).unwrap();
        // shallow (-1 m), land and grounded ice are dry
        assert_eq!(mask.wet(), &array![[true, false, false], [true, false, true]]);
        assert_eq!(mask.wet_count(), 3);
    }

    #[test]
    fn test_from_depths() {
        let depth = array![[100.0, f64::NAN], [1.5, 80.0]];
        let draft = array![[0.0, 0.0], [0.0, 80.0]];
        let mask = OceanMask::from_depths(&depth, &draft, 2.0).unwrap();
        assert_eq!(mask.wet(), &array![[true, false], [false, false]]);
    }

    #[test]
    fn test_connectivity_removes_lake() {
        // South open; a lake at (3, 3) and a channel reaching the south edge.
        let wet = array![
            [false, true, false, false, false],
            [false, true, true, false, false],
            [false, false, true, false, false],
            [false, false, false, true, false],
            [false, false, false, false, false],
        ];
        let mask = OceanMask::from_array(wet);
        let open = SideBoundaries::new(false, false, false, true);
        let (kept, removed) = mask.keep_connected_to(&open);
        assert_eq!(removed, 1);
        assert!(kept.is_wet(GridPoint::new(2, 2)));
        assert!(kept.is_dry(GridPoint::new(3, 3)));
    }

    #[test]
    fn test_closed_side_does_not_seed() {
        let wet = array![[true, false], [true, false]];
        let mask = OceanMask::from_array(wet);
        let open = SideBoundaries::new(false, true, true, true);
        // Column 0 touches north and south, so it stays.
        let (kept, removed) = mask.keep_connected_to(&open);
        assert_eq!(removed, 0);
        assert_eq!(kept.wet_count(), 2);

        let only_east = SideBoundaries::new(false, false, true, false);
        let (kept, _) = mask.keep_connected_to(&only_east);
        assert_eq!(kept.wet_count(), 0);
    }

    #[test]
    fn test_statistics_display() {
        let mask = OceanMask::from_array(array![[true, false], [true, true]]);
        let stats = mask.statistics();
        assert_eq!(stats.wet_cells, 3);
        assert!(stats.to_string().contains("Wet cells: 3 (75.0%)"));
    }

    #[test]
    fn test_surface_codes() {
        assert_eq!(SurfaceType::from_code(3), Some(SurfaceType::FloatingIce));
        assert!(SurfaceType::FloatingIce.has_ocean_water());
        assert!(!SurfaceType::GroundedIce.has_ocean_water());
        assert_eq!(SurfaceType::from_code(9), None);
    }
}

//! Grid point indices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell of the structured grid, 0-based `(row, col)`.
///
/// Rows follow latitude (south to north), columns follow longitude
/// (west to east). Output files use 1-based `(col + 1, row + 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    /// Latitude index
    pub row: usize,
    /// Longitude index
    pub col: usize,
}

impl GridPoint {
    /// Create a new grid point.
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// As an ndarray index `[row, col]`.
    #[inline]
    pub fn as_index(self) -> [usize; 2] {
        [self.row, self.col]
    }

    /// 1-based `(lon-index, lat-index)` as written to model input files.
    #[inline]
    pub fn one_based(self) -> (usize, usize) {
        (self.col + 1, self.row + 1)
    }

    /// The up-to-4 edge neighbours inside a grid of the given shape.
    pub fn neighbours4(self, shape: (usize, usize)) -> impl Iterator<Item = GridPoint> {
        let (n_rows, n_cols) = shape;
        let GridPoint { row, col } = self;
        [
            (row.checked_sub(1), Some(col)),
            ((row + 1 < n_rows).then_some(row + 1), Some(col)),
            (Some(row), col.checked_sub(1)),
            (Some(row), (col + 1 < n_cols).then_some(col + 1)),
        ]
        .into_iter()
        .filter_map(|(r, c)| Some(GridPoint::new(r?, c?)))
    }

    /// The up-to-8 edge and corner neighbours inside a grid of the given shape.
    pub fn neighbours8(self, shape: (usize, usize)) -> impl Iterator<Item = GridPoint> {
        let (n_rows, n_cols) = shape;
        let GridPoint { row, col } = self;
        let rows = row.saturating_sub(1)..=(row + 1).min(n_rows.saturating_sub(1));
        rows.flat_map(move |r| {
            let cols = col.saturating_sub(1)..=(col + 1).min(n_cols.saturating_sub(1));
            cols.map(move |c| GridPoint::new(r, c))
        })
        .filter(move |p| *p != self)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(j={}, i={})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_based() {
        assert_eq!(GridPoint::new(2, 5).one_based(), (6, 3));
    }

    #[test]
    fn test_corner_neighbours() {
        let corner = GridPoint::new(0, 0);
        assert_eq!(corner.neighbours4((3, 3)).count(), 2);
        assert_eq!(corner.neighbours8((3, 3)).count(), 3);

        let centre = GridPoint::new(1, 1);
        assert_eq!(centre.neighbours4((3, 3)).count(), 4);
        assert_eq!(centre.neighbours8((3, 3)).count(), 8);
    }
}

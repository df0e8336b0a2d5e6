//! Compass sides of the rectangular model domain.
//!
//! The domain is indexed `(row, col)` with rows running south to north
//! (increasing latitude) and columns running west to east (increasing
//! longitude).

use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of the rectangular grid perimeter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Column 0
    West,
    /// Last row
    North,
    /// Last column
    East,
    /// Row 0
    South,
}

impl Side {
    /// All sides in open-boundary descriptor order (west, north, east, south).
    pub const ALL: [Side; 4] = [Side::West, Side::North, Side::East, Side::South];

    /// Whether the side runs along a grid row (north/south) rather than a column.
    #[inline]
    pub fn is_row(self) -> bool {
        matches!(self, Side::North | Side::South)
    }

    /// 0-based index of the row or column this side lies on.
    pub fn line_index(self, n_rows: usize, n_cols: usize) -> usize {
        match self {
            Side::West | Side::South => 0,
            Side::North => n_rows.saturating_sub(1),
            Side::East => n_cols.saturating_sub(1),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::West => "west",
            Side::North => "north",
            Side::East => "east",
            Side::South => "south",
        };
        f.write_str(name)
    }
}

/// A value per side with named fields.
///
/// Avoids positional conventions like `[west, north, east, south]` vs
/// `[south, east, north, west]`.
///
/// # Example
///
/// ```
/// use fjord_setup::types::{Side, SideBoundaries};
///
/// // Fjord domain: open to the ocean in the north, east and south, closed by
/// // the glacier in the west.
/// let open = SideBoundaries::new(false, true, true, true);
/// assert!(!open[Side::West]);
/// assert_eq!(open.sides_where(|&o| o), vec![Side::North, Side::East, Side::South]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideBoundaries<T> {
    /// Column 0
    pub west: T,
    /// Last row
    pub north: T,
    /// Last column
    pub east: T,
    /// Row 0
    pub south: T,
}

impl<T> SideBoundaries<T> {
    /// Create with explicit values in descriptor order: west, north, east, south.
    pub fn new(west: T, north: T, east: T, south: T) -> Self {
        Self {
            west,
            north,
            east,
            south,
        }
    }

    /// Same value on every side.
    pub fn uniform(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            west: value.clone(),
            north: value.clone(),
            east: value.clone(),
            south: value,
        }
    }

    /// Map a function over all sides.
    pub fn map<U, F>(self, mut f: F) -> SideBoundaries<U>
    where
        F: FnMut(T) -> U,
    {
        SideBoundaries {
            west: f(self.west),
            north: f(self.north),
            east: f(self.east),
            south: f(self.south),
        }
    }

    /// Iterate `(side, value)` in descriptor order.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        [
            (Side::West, &self.west),
            (Side::North, &self.north),
            (Side::East, &self.east),
            (Side::South, &self.south),
        ]
        .into_iter()
    }

    /// Sides whose value satisfies the predicate, in descriptor order.
    pub fn sides_where<F>(&self, mut predicate: F) -> Vec<Side>
    where
        F: FnMut(&T) -> bool,
    {
        self.iter()
            .filter(|(_, v)| predicate(v))
            .map(|(side, _)| side)
            .collect()
    }
}

impl<T: Default> Default for SideBoundaries<T> {
    fn default() -> Self {
        Self {
            west: T::default(),
            north: T::default(),
            east: T::default(),
            south: T::default(),
        }
    }
}

impl<T> std::ops::Index<Side> for SideBoundaries<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::West => &self.west,
            Side::North => &self.north,
            Side::East => &self.east,
            Side::South => &self.south,
        }
    }
}

impl<T> std::ops::IndexMut<Side> for SideBoundaries<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::West => &mut self.west,
            Side::North => &mut self.north,
            Side::East => &mut self.east,
            Side::South => &mut self.south,
        }
    }
}

//! Small strongly-typed building blocks shared by all stages.
//!
//! - **Grid points**: `GridPoint { row, col }` instead of bare `(usize, usize)`
//!   tuples whose order is easy to mix up (files use `(lon, lat)`, arrays use
//!   `(lat, lon)`)
//! - **Sides**: `SideBoundaries { west, north, east, south }` instead of
//!   positional arrays
//! - **Months**: `YearMonth` with day counts for day-weighted averaging
//!
//! # Example
//!
//! ```
//! use fjord_setup::types::{GridPoint, Side, SideBoundaries, YearMonth};
//!
//! let p = GridPoint::new(0, 3);
//! assert_eq!(p.one_based(), (4, 1));
//!
//! let widths = SideBoundaries::new(0, 4, 4, 4);
//! assert_eq!(widths[Side::North], 4);
//!
//! let feb = YearMonth::new(2016, 2).unwrap();
//! assert_eq!(feb.days(), 29);
//! ```

mod calendar;
mod indices;
mod sides;

pub use calendar::{YearMonth, day_weights};
pub use indices::GridPoint;
pub use sides::{Side, SideBoundaries};

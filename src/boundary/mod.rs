//! Domain boundaries: grounding line, open boundary segments, sponge zones.
//!
//! # Example
//!
//! ```
//! use fjord_setup::boundary::{BoundaryConfig, build_open_boundaries};
//! use fjord_setup::mask::OceanMask;
//! use fjord_setup::types::Side;
//! use ndarray::Array2;
//!
//! let mask = OceanMask::from_array(Array2::from_elem((5, 8), true));
//! let boundaries = build_open_boundaries(&mask, &BoundaryConfig::default());
//!
//! // West is closed; east owns both eastern corners.
//! assert_eq!(boundaries.for_side(Side::West).count(), 0);
//! let east = boundaries.for_side(Side::East).next().unwrap();
//! assert_eq!((east.start, east.end), (0, 4));
//! ```

mod grounding_line;
mod segments;
mod sponge;

pub use grounding_line::{GroundingLine, GroundingLineConfig, GroundingLineError, locate_grounding_line};
pub use segments::{BoundaryConfig, OpenBoundaries, OpenBoundarySegment, build_open_boundaries, owned_run};
pub use sponge::{SpongeConfig, SpongeError, SpongeZone, interior, sponge_deviation};

//! Interpolation from the unstructured source mesh onto the model grid.
//!
//! All distances are planar; geodetic coordinates never enter the
//! interpolation.
//!
//! # Example
//!
//! ```
//! use fjord_setup::interpolation::{LinearInterpolator, ScatteredInterpolator};
//!
//! let nodes = [[0.0, 0.0], [1000.0, 0.0], [0.0, 1000.0]];
//! let linear = LinearInterpolator::new(&nodes);
//! let values = [0.0, 10.0, 20.0];
//!
//! assert!((linear.interpolate(&values, [250.0, 250.0]) - 7.5).abs() < 1e-9);
//! // no extrapolation
//! assert!(linear.interpolate(&values, [1000.0, 1000.0]).is_nan());
//! ```

mod field;
mod scattered;
mod triangulation;

use thiserror::Error;

use crate::boundary::SpongeError;
use crate::mesh::GridError;
use crate::types::GridPoint;

pub use field::{
    BoundaryField, FallbackReport, FieldInterpolator, InterpolatedField, InterpolationConfig, extrapolate_vertically,
};
pub use scattered::{
    LinearInterpolator, NearestInterpolator, NodeIndex, ScatterMethod, ScatteredInterpolator, build_interpolator,
};
pub use triangulation::Triangulation;

/// Error type for field interpolation.
#[derive(Debug, Error)]
pub enum InterpolationError {
    /// Source arrays disagree in length
    #[error("{what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// Too many wet cells needed the nearest fallback
    #[error(
        "{name} level {level}: {fallback} of {wet} wet cells needed the nearest fallback \
         ({fraction:.3} > {max:.3})"
    )]
    FallbackExceeded {
        name: String,
        level: usize,
        fallback: usize,
        wet: usize,
        fraction: f64,
        max: f64,
    },

    /// A wet column has no defined value at any level
    #[error("wet column at {point} has no defined level")]
    EmptyWaterColumn { point: GridPoint },

    /// Target grid error
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Sponge zone error
    #[error(transparent)]
    Sponge(#[from] SpongeError),
}

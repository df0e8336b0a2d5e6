//! Resampling of source products onto the model grid.
//!
//! - **Box filter**: averaging and decimation of the topography along one axis
//! - **Regrid**: nearest/bilinear lookup of a planar raster (ice thickness)
//!   at the planar coordinates of the model grid

mod box_filter;
mod regrid;

pub use box_filter::{BoxFilter, COORDINATE_TOLERANCE, ResampleConfig};
pub use regrid::{PlanarRaster, RegridMethod};

use crate::mesh::GridError;
use thiserror::Error;

/// Error type for resampling.
#[derive(Debug, Error)]
pub enum ResampleError {
    /// Box-filter width must be odd for a centered window
    #[error("box-filter factor must be odd, got {0}")]
    EvenFactor(usize),

    /// Averaged coarse coordinate differs from the subsampled source coordinate
    #[error(
        "box-filter coordinate mismatch at coarse index {index}: averaged {averaged}, subsampled {subsampled}"
    )]
    CoordinateMismatch {
        index: usize,
        averaged: f64,
        subsampled: f64,
    },

    /// Axis too short for the filter
    #[error("axis of length {len} yields fewer than 2 points with factor {factor}")]
    TooFewPoints { len: usize, factor: usize },

    /// Raster coordinates not strictly ascending
    #[error("raster {what} coordinates are not strictly ascending at index {index}")]
    NotAscending { what: &'static str, index: usize },

    /// Raster values do not match the coordinates
    #[error("raster values have shape {found:?}, coordinates imply {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Grid construction failed
    #[error(transparent)]
    Grid(#[from] GridError),
}

//! Ocean mask derivation and reconciliation.
//!
//! # Example
//!
//! ```
//! use fjord_setup::mask::OceanMask;
//! use fjord_setup::types::SideBoundaries;
//! use ndarray::array;
//!
//! let bedrock = array![[-50.0, -50.0, 10.0], [-50.0, 10.0, -40.0]];
//! let ice_base = array![[0.0, 0.0, 10.0], [0.0, 10.0, 0.0]];
//! let mask = OceanMask::from_elevations(&bedrock, &ice_base, 2.0).unwrap();
//! assert_eq!(mask.wet_count(), 4);
//!
//! // Only the south side is open: the cell at (1, 2) is a lake.
//! let open = SideBoundaries::new(false, false, false, true);
//! let (connected, removed) = mask.keep_connected_to(&open);
//! assert_eq!((connected.wet_count(), removed), (3, 1));
//! ```

mod ocean_mask;
mod patch;
mod reconcile;

pub use ocean_mask::{MaskStatistics, OceanMask, SurfaceType};
pub use patch::{ExpectedLocation, MaskPatch, apply_patches};
pub use reconcile::{MaskConfig, Reconciliation, ReferenceCheck, check_reference, reconcile_mask};

use crate::types::GridPoint;
use thiserror::Error;

/// Error type for mask reconciliation.
#[derive(Debug, Error)]
pub enum MaskError {
    /// Input arrays differ in shape
    #[error("array shape {found:?} does not match {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Reference classification holds an unknown code
    #[error("unknown surface type code {code} at {point}")]
    UnknownSurfaceCode { code: u8, point: GridPoint },

    /// Water presence and reference classification disagree over a region
    #[error(
        "water presence disagrees with reference classification in {clustered} clustered cells (first at {first}), {isolated} isolated"
    )]
    ReferenceDisagreement {
        clustered: usize,
        isolated: usize,
        first: GridPoint,
    },

    /// More isolated disagreements than configured
    #[error("{found} isolated disagreements with reference classification, at most {max} allowed")]
    TooManyIsolated { found: usize, max: usize },

    /// Override targets a cell outside the grid
    #[error("mask override {index} targets {point} outside grid of shape {shape:?}")]
    PatchOutOfBounds {
        index: usize,
        point: GridPoint,
        shape: (usize, usize),
    },

    /// Override cell is not where the override expects it
    #[error(
        "mask override {index} at {point} lies at ({lon}, {lat}), expected near ({expected_lon}, {expected_lat})"
    )]
    PatchLocation {
        index: usize,
        point: GridPoint,
        lon: f64,
        lat: f64,
        expected_lon: f64,
        expected_lat: f64,
    },

    /// Override cell does not have the expected state
    #[error("mask override {index} at {point} expects wet={expected_wet}, found wet={found_wet} ({reason})")]
    PatchPrecondition {
        index: usize,
        point: GridPoint,
        expected_wet: bool,
        found_wet: bool,
        reason: String,
    },

    /// Opened cell would not hold a water column
    #[error(
        "mask override {index} opens {point} ({reason}) but its depth {depth} m does not exceed \
         the ice draft {ice_draft} m and the minimum depth {min_depth} m"
    )]
    PatchWithoutWater {
        index: usize,
        point: GridPoint,
        depth: f64,
        ice_draft: f64,
        min_depth: f64,
        reason: String,
    },

    /// No wet cell is connected to an open side
    #[error("no wet cell is connected to an open boundary")]
    NoOpenWater,
}

//! Grid and mesh data model.
//!
//! Provides the snapshot types passed between pipeline stages:
//! - Regular geodetic grid with planar coordinates
//! - Source topography and the model topography dataset
//! - Unstructured source mesh with averaged fields and monthly series

mod geodetic_grid;
mod topography;
mod unstructured;

pub use geodetic_grid::{GeodeticGrid, GridAxis, GridError};
pub(crate) use geodetic_grid::inside_range;
pub use topography::{Topography, TopographyDataset, TopographyViolation};
pub use unstructured::{MeshField, MeshTimeSeries, UnstructuredMesh, mask_salinity_sentinels};

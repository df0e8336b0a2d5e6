//! Normalization of the three source datasets.
//!
//! Sources arrive in whatever orientation their producers chose. The
//! loaders bring them into the canonical layouts used everywhere else:
//!
//! - geodetic topography: `(lat, lon)`, both axes increasing, cropped
//! - planar ice thickness: `(y, x)`, both axes increasing
//! - mesh series: `(time, node, level)`, nodes cropped to the domain
//!
//! File reading lives in [`crate::io`]; the loaders work on in-memory
//! source structs so every check can run without NetCDF files.

mod ice_thickness_source;
mod mesh_source;
mod topography_source;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::{GeoBoundingBox, ManifestError};
use crate::mask::MaskError;
use crate::mesh::GridError;
use crate::resample::ResampleError;

pub use ice_thickness_source::IceThicknessSource;
pub use mesh_source::{LoadedMesh, MeshSource, align_level_counts, concatenate_series};
pub use topography_source::{LoadedTopography, TopographySource};

/// Error type for source loading.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Source grid is unusable
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Mask convention check failed
    #[error(transparent)]
    Mask(#[from] MaskError),

    /// Planar raster is unusable
    #[error(transparent)]
    Raster(#[from] ResampleError),

    /// Series manifest is inconsistent
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Source projection differs from the configured one
    #[error("projection mismatch: configured '{expected}', source declares '{found}'")]
    ProjectionMismatch { expected: String, found: String },

    /// Companion series differ by more than one level
    #[error("{first} has {first_levels} levels, {second} has {second_levels}")]
    LevelCountMismatch {
        first: String,
        first_levels: usize,
        second: String,
        second_levels: usize,
    },

    /// Two arrays of one source disagree in shape
    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// No mesh node falls inside the crop window
    #[error("no mesh node inside {bbox:?}")]
    NoNodes { bbox: GeoBoundingBox },

    /// NetCDF reading failed
    #[cfg(feature = "netcdf")]
    #[error(transparent)]
    NetCDF(#[from] crate::io::NetCDFError),
}

/// Model domain settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Crop window of the model grid
    pub bbox: GeoBoundingBox,
    /// Largest accepted deviation from uniform coordinate spacing, in degrees
    pub spacing_tolerance: f64,
    /// Extra margin around `bbox` for mesh nodes, in degrees
    pub mesh_margin: f64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            // 79N Glacier and the fjord towards the Norske Oer ice barrier
            bbox: GeoBoundingBox::new(-22.5, 79.05, -17.5, 80.05),
            spacing_tolerance: 1e-6,
            mesh_margin: 0.5,
        }
    }
}

impl DomainConfig {
    /// Set the crop window.
    pub fn with_bbox(mut self, bbox: GeoBoundingBox) -> Self {
        self.bbox = bbox;
        self
    }

    /// Set the spacing tolerance.
    pub fn with_spacing_tolerance(mut self, tol: f64) -> Self {
        self.spacing_tolerance = tol;
        self
    }

    /// Set the mesh margin.
    pub fn with_mesh_margin(mut self, margin: f64) -> Self {
        self.mesh_margin = margin;
        self
    }

    /// Window used to select mesh nodes.
    pub fn mesh_window(&self) -> GeoBoundingBox {
        self.bbox.with_margin(self.mesh_margin)
    }
}

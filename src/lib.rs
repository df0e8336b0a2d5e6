//! # fjord-setup
//!
//! Input preparation for a regional ocean model of a glacial fjord.
//!
//! This crate builds the model grid and its companion files from three
//! mismatched source datasets:
//! - Geodetic bedrock/ice topography (regular lon/lat grid)
//! - Planar ice thickness (polar stereographic raster)
//! - Unstructured-mesh ocean output (monthly salinity/temperature)
//!
//! The stages are:
//! - Coordinate transform (polar stereographic)
//! - Source loading, cropping and normalization
//! - Box-filter resampling and ice-thickness regridding
//! - Ocean-mask reconciliation with audited overrides
//! - Topography smoothing and sponge zones
//! - Grounding-line location for subglacial discharge
//! - Open-boundary segment indexing
//! - Scattered interpolation of initial and boundary fields
//!
//! # Example
//!
//! ```ignore
//! use fjord_setup::{PipelineConfig, build_topography, write_text_outputs};
//!
//! let config = PipelineConfig::from_file(Path::new("fjord.toml"))?;
//! let products = build_topography(topography_source, ice_source, &config)?;
//! write_text_outputs(&products, &config, &config.outputs)?;
//! ```

pub mod boundary;
pub mod config;
pub mod error;
pub mod interpolation;
pub mod io;
pub mod loader;
pub mod mask;
pub mod mesh;
pub mod pipeline;
pub mod resample;
pub mod smoothing;
pub mod types;

// Re-export main types for convenience
pub use boundary::{
    BoundaryConfig, GroundingLine, GroundingLineConfig, OpenBoundaries, OpenBoundarySegment, SpongeConfig,
    SpongeZone, build_open_boundaries, locate_grounding_line,
};
pub use config::{ConfigError, InputPaths, ModelPaths, PipelineConfig, ProjectionConfig};
pub use error::PipelineError;
pub use interpolation::{
    BoundaryField, FieldInterpolator, InterpolatedField, InterpolationConfig, InterpolationError, ScatterMethod,
    extrapolate_vertically,
};
pub use io::{CoordinateProjection, GeoBoundingBox, PolarStereographic, StratificationConfig, StratificationProfile};
pub use loader::{DomainConfig, IceThicknessSource, LoadedMesh, MeshSource, TopographySource};
pub use mask::{MaskConfig, MaskPatch, OceanMask, SurfaceType, reconcile_mask};
pub use mesh::{GeodeticGrid, MeshField, MeshTimeSeries, Topography, TopographyDataset, UnstructuredMesh};
pub use pipeline::{
    TopographyProducts, build_boundary_conditions, build_initial_conditions, build_topography, write_text_outputs,
};
#[cfg(feature = "netcdf")]
pub use pipeline::run;
pub use resample::{BoxFilter, PlanarRaster, RegridMethod, ResampleConfig};
pub use smoothing::{SmoothingConfig, smooth_topography};
pub use types::{GridPoint, Side, SideBoundaries, YearMonth};

//! I/O utilities for reading and writing data files.
//!
//! This module provides:
//! - **Coordinate projections**: Transform between geographic and polar
//!   stereographic coordinates
//! - **Series manifests**: Which source file holds which months
//! - **Stratification profiles**: Horizontally uniform salinity/temperature
//!   profiles and their text files
//! - **Discharge file**: Grounding-line cells for the subglacial discharge
//! - **Boundary descriptor**: Open-boundary segments for the model setup
//! - **NetCDF I/O**: Source readers and model input writers (requires
//!   `netcdf` feature)
//!
//! # File Formats
//!
//! ## Series Manifest
//!
//! ```text
//! # file first last
//! fesom.2015.nc 2015-01 2015-12
//! fesom.2016.nc 2016-01 2016-12
//! ```
//!
//! ## Boundary Descriptor (`bdyinfo.dat`)
//!
//! Per side, in the order west, north, east, south: the segment count
//! followed by one `position start end type-code spare` line per segment,
//! all indices one-based.
//!
//! ```text
//! 0
//! 1
//! 40 1 59 4 0
//! 0
//! 0
//! ```
//!
//! ## Discharge File
//!
//! Point count, then one `i j tag` line per grounding-line cell, one-based.
//!
//! ```text
//! 2
//! 12 1 79NG
//! 11 2 79NG
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use fjord_setup::io::{read_manifest_file, write_bdyinfo_file};
//!
//! let manifest = read_manifest_file(Path::new("input/salt.manifest"))?;
//! write_bdyinfo_file(Path::new("model/bdyinfo.dat"), &boundaries)?;
//! ```

mod bdyinfo;
mod discharge;
mod manifest;
#[cfg(feature = "netcdf")]
mod netcdf_io;
mod profile;
mod projection;

pub use bdyinfo::{BdyInfoError, format_bdyinfo, parse_bdyinfo, read_bdyinfo_file, write_bdyinfo_file};
pub use discharge::{
    DischargeFileError, format_grounding_line, read_grounding_line_file, write_grounding_line_file,
};
pub use manifest::{
    ManifestEntry, ManifestError, TimeSeriesManifest, parse_manifest, read_manifest_file,
};
#[cfg(feature = "netcdf")]
pub use netcdf_io::{
    NetCDFError, NetCDFWriterConfig, is_valid_f64, read_ice_thickness_source, read_mesh_coordinates,
    read_mesh_series, read_mesh_series_files, read_topography_source, write_boundary_conditions,
    write_initial_conditions, write_topography_dataset,
};
pub use profile::{
    ProfileError, ProfileVariable, StratificationConfig, StratificationLevel,
    StratificationProfile, read_profile_file,
};
pub use projection::{CoordinateProjection, GeoBoundingBox, PolarStereographic, normalize_longitude};

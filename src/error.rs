//! Crate-level error aggregating the stage errors.

use thiserror::Error;

use crate::boundary::{GroundingLineError, SpongeError};
use crate::config::ConfigError;
use crate::interpolation::InterpolationError;
use crate::io::{BdyInfoError, DischargeFileError, ManifestError, ProfileError};
use crate::loader::LoaderError;
use crate::mask::MaskError;
use crate::mesh::GridError;
use crate::resample::ResampleError;
use crate::smoothing::SmoothingError;

/// Error of any pipeline stage, prefixed with the stage name.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("grid: {0}")]
    Grid(#[from] GridError),

    #[error("source loading: {0}")]
    Loader(#[from] LoaderError),

    #[error("series manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("grid resampling: {0}")]
    Resample(#[from] ResampleError),

    #[error("mask reconciliation: {0}")]
    Mask(#[from] MaskError),

    #[error("topography smoothing: {0}")]
    Smoothing(#[from] SmoothingError),

    #[error("sponge zone: {0}")]
    Sponge(#[from] SpongeError),

    #[error("grounding line: {0}")]
    GroundingLine(#[from] GroundingLineError),

    #[error("field interpolation: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("stratification profile: {0}")]
    Profile(#[from] ProfileError),

    #[error("boundary descriptor: {0}")]
    BdyInfo(#[from] BdyInfoError),

    #[error("discharge file: {0}")]
    Discharge(#[from] DischargeFileError),

    /// Written topography violates a consistency invariant
    #[error("topography dataset: {count} violations, first: {first}")]
    InvalidTopography { count: usize, first: String },

    #[cfg(feature = "netcdf")]
    #[error("NetCDF: {0}")]
    NetCDF(#[from] crate::io::NetCDFError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_prefix() {
        let err: PipelineError = MaskError::NoOpenWater.into();
        assert!(err.to_string().starts_with("mask reconciliation: "));
        let err: PipelineError = SmoothingError::NoOpenWater.into();
        assert!(err.to_string().starts_with("topography smoothing: "));
    }
}

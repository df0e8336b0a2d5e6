//! Pipeline configuration.
//!
//! One value passed explicitly to every stage. Each section has defaults
//! for the 79N Glacier fjord, so a TOML file only lists what differs:
//!
//! ```toml
//! [domain.bbox]
//! min_lon = -22.5
//! min_lat = 79.05
//! max_lon = -17.5
//! max_lat = 80.05
//!
//! [mask]
//! min_depth = 2.0
//!
//! [grounding_line]
//! lon_cutoff = -19.5
//! tag = "79NG"
//!
//! [sponge]
//! width = 4
//!
//! [[stratification.levels]]
//! z = 0.0
//! salinity = 30.0
//! temperature = -1.8
//! ```
//!
//! # Example
//!
//! ```
//! use fjord_setup::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_toml_str("[sponge]\nwidth = 6\n").unwrap();
//! assert_eq!(config.sponge.width, 6);
//! assert_eq!(config.smoothing.pm_i, 2);
//! config.validate().unwrap();
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::boundary::{BoundaryConfig, GroundingLineConfig, SpongeConfig};
use crate::interpolation::InterpolationConfig;
use crate::io::{PolarStereographic, StratificationConfig};
use crate::loader::DomainConfig;
use crate::mask::MaskConfig;
use crate::resample::{RegridMethod, ResampleConfig};
use crate::smoothing::SmoothingConfig;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML syntax or type error
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serialization failed
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Value out of its accepted range
    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

/// Planar projection parameters (north polar stereographic, WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Latitude of true scale in degrees
    pub lat_ts: f64,
    /// Central meridian in degrees
    pub lon_0: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        // EPSG:3413
        Self {
            lat_ts: 70.0,
            lon_0: -45.0,
        }
    }
}

impl ProjectionConfig {
    /// Build the projection.
    pub fn projection(&self) -> PolarStereographic {
        PolarStereographic::north(self.lat_ts, self.lon_0)
    }
}

/// Source dataset locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    /// Geodetic bedrock/ice-base topography
    pub topography: Option<PathBuf>,
    /// Planar ice thickness
    pub ice_thickness: Option<PathBuf>,
    /// File holding mesh node coordinates and level depths
    pub mesh: Option<PathBuf>,
    /// Manifest of the monthly salinity files
    pub salinity_manifest: Option<PathBuf>,
    /// Manifest of the monthly temperature files
    pub temperature_manifest: Option<PathBuf>,
}

/// Output file names, relative to `output_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    /// Directory receiving every output
    pub output_dir: PathBuf,
    /// Topography dataset
    pub topography: PathBuf,
    /// Open-boundary descriptor
    pub bdyinfo: PathBuf,
    /// Grounding-line discharge points
    pub discharge: PathBuf,
    /// Salinity stratification profile
    pub salt_profile: PathBuf,
    /// Temperature stratification profile
    pub temp_profile: PathBuf,
    /// Initial conditions
    pub initial_conditions: PathBuf,
    /// Boundary conditions
    pub boundary_conditions: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("model"),
            topography: PathBuf::from("topo.nc"),
            bdyinfo: PathBuf::from("bdyinfo.dat"),
            discharge: PathBuf::from("riverinfo.dat"),
            salt_profile: PathBuf::from("salt_profile.txt"),
            temp_profile: PathBuf::from("temp_profile.txt"),
            initial_conditions: PathBuf::from("initial_conditions.nc"),
            boundary_conditions: PathBuf::from("bdy_3d.nc"),
        }
    }
}

impl ModelPaths {
    /// Paths under another output directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: dir.into(),
            ..Self::default()
        }
    }

    fn join(&self, name: &Path) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn topography(&self) -> PathBuf {
        self.join(&self.topography)
    }

    pub fn bdyinfo(&self) -> PathBuf {
        self.join(&self.bdyinfo)
    }

    pub fn discharge(&self) -> PathBuf {
        self.join(&self.discharge)
    }

    pub fn salt_profile(&self) -> PathBuf {
        self.join(&self.salt_profile)
    }

    pub fn temp_profile(&self) -> PathBuf {
        self.join(&self.temp_profile)
    }

    pub fn initial_conditions(&self) -> PathBuf {
        self.join(&self.initial_conditions)
    }

    pub fn boundary_conditions(&self) -> PathBuf {
        self.join(&self.boundary_conditions)
    }
}

/// Configuration of the whole pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub domain: DomainConfig,
    pub projection: ProjectionConfig,
    pub resample: ResampleConfig,
    /// Regridding of the ice thickness onto the model grid
    pub ice_regrid: RegridMethod,
    pub mask: MaskConfig,
    pub grounding_line: GroundingLineConfig,
    pub smoothing: SmoothingConfig,
    pub boundary: BoundaryConfig,
    pub sponge: SpongeConfig,
    pub interpolation: InterpolationConfig,
    /// Horizontally uniform initial stratification; mesh fields are used when absent
    pub stratification: Option<StratificationConfig>,
    pub inputs: InputPaths,
    pub outputs: ModelPaths,
}

impl PipelineConfig {
    /// Parse a TOML document; missing sections take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Set the domain section.
    pub fn with_domain(mut self, domain: DomainConfig) -> Self {
        self.domain = domain;
        self
    }

    /// Set the mask section.
    pub fn with_mask(mut self, mask: MaskConfig) -> Self {
        self.mask = mask;
        self
    }

    /// Set the grounding-line section.
    pub fn with_grounding_line(mut self, grounding_line: GroundingLineConfig) -> Self {
        self.grounding_line = grounding_line;
        self
    }

    /// Set the boundary section.
    pub fn with_boundary(mut self, boundary: BoundaryConfig) -> Self {
        self.boundary = boundary;
        self
    }

    /// Set the sponge section.
    pub fn with_sponge(mut self, sponge: SpongeConfig) -> Self {
        self.sponge = sponge;
        self
    }

    /// Set the smoothing section.
    pub fn with_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Set the stratification section.
    pub fn with_stratification(mut self, stratification: StratificationConfig) -> Self {
        self.stratification = Some(stratification);
        self
    }

    /// Set the output locations.
    pub fn with_outputs(mut self, outputs: ModelPaths) -> Self {
        self.outputs = outputs;
        self
    }

    /// Check value ranges that the types cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bbox = self.domain.bbox;
        if !bbox.is_valid() {
            return Err(invalid("domain.bbox", format!("empty box {bbox:?}")));
        }
        if !(self.domain.spacing_tolerance > 0.0) {
            return Err(invalid("domain.spacing_tolerance", "must be positive"));
        }
        if !(self.domain.mesh_margin >= 0.0) {
            return Err(invalid("domain.mesh_margin", "must not be negative"));
        }
        if !(-90.0..=90.0).contains(&self.projection.lat_ts) || self.projection.lat_ts <= 0.0 {
            return Err(invalid("projection.lat_ts", "must be a northern latitude"));
        }
        if self.resample.factor % 2 == 0 {
            return Err(invalid("resample.factor", format!("must be odd, got {}", self.resample.factor)));
        }
        if !(self.mask.min_depth > 0.0) {
            return Err(invalid("mask.min_depth", "must be positive"));
        }
        if let Some(exclusion) = &self.grounding_line.exclusion {
            if !exclusion.is_valid() {
                return Err(invalid("grounding_line.exclusion", format!("empty box {exclusion:?}")));
            }
        }
        if self.grounding_line.tag.split_whitespace().count() != 1 {
            return Err(invalid("grounding_line.tag", "must be a single word"));
        }
        if self.sponge.width == 0 {
            return Err(invalid("sponge.width", "must be at least 1"));
        }
        let fraction = self.interpolation.max_fallback_fraction;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(invalid(
                "interpolation.max_fallback_fraction",
                format!("must lie in [0, 1], got {fraction}"),
            ));
        }
        if let Some(stratification) = &self.stratification {
            if stratification.levels.is_empty() {
                return Err(invalid("stratification.levels", "needs at least one level"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::GeoBoundingBox;
    use crate::types::SideBoundaries;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.resample.factor, 3);
        assert_eq!(config.mask.min_depth, 2.0);
        assert_eq!(config.grounding_line.tag, "79NG");
        assert!(!config.boundary.open.west);
        assert!(config.stratification.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
ice_regrid = "nearest"

[grounding_line]
lon_cutoff = -19.0

[grounding_line.exclusion]
min_lon = -19.6
min_lat = 79.4
max_lon = -19.2
max_lat = 79.6

[boundary.open]
west = false
north = false
east = true
south = true

[[stratification.levels]]
z = -100.0
salinity = 34.5
temperature = 1.0
"#;
        let config = PipelineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ice_regrid, RegridMethod::Nearest);
        assert_eq!(config.grounding_line.lon_cutoff, -19.0);
        assert_eq!(config.grounding_line.tag, "79NG");
        assert_eq!(
            config.grounding_line.exclusion,
            Some(GeoBoundingBox::new(-19.6, 79.4, -19.2, 79.6))
        );
        assert_eq!(config.boundary.open, SideBoundaries::new(false, false, true, true));
        assert_eq!(config.stratification.unwrap().levels.len(), 1);
        config_roundtrip();
    }

    fn config_roundtrip() {
        let config = PipelineConfig::default().with_sponge(SpongeConfig::default().with_width(6));
        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = PipelineConfig::default();
        config.resample.factor = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "resample.factor", .. })
        ));

        let config = PipelineConfig::default().with_mask(MaskConfig::default().with_min_depth(0.0));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "mask.min_depth", .. })));

        let mut config = PipelineConfig::default();
        config.interpolation.max_fallback_fraction = 1.5;
        assert!(config.validate().is_err());

        let config = PipelineConfig::default().with_sponge(SpongeConfig::default().with_width(0));
        assert!(config.validate().is_err());

        let config = PipelineConfig::default().with_stratification(StratificationConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            PipelineConfig::from_toml_str("[sponge]\nwidth = \"wide\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_model_paths() {
        let paths = ModelPaths::in_dir("/tmp/run");
        assert_eq!(paths.bdyinfo(), PathBuf::from("/tmp/run/bdyinfo.dat"));
        assert_eq!(paths.salt_profile(), PathBuf::from("/tmp/run/salt_profile.txt"));
    }
}

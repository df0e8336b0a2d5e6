//! Initial stratification profiles.
//!
//! Salinity and temperature are given at a few depths; between them the
//! model interpolates linearly. Two files are written, one per variable.
//!
//! # File Format
//!
//! ```text
//! 3
//!    0.0 30.0
//! -100.0 34.5
//! -800.0 34.9
//! ```
//!
//! First line: number of levels. Then `z value` per level, `z` in m
//! (negative below the surface), sorted from the surface down.

use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use thiserror::Error;

use crate::mask::OceanMask;
use crate::types::GridPoint;

/// Error type for stratification profiles.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Parse error with line number
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Profile has no level
    #[error("stratification has no level")]
    EmptyProfile,

    /// Level value is NaN or infinite
    #[error("level {index} has a non-finite value")]
    NonFinite { index: usize },

    /// Two levels at the same depth
    #[error("two levels at z = {z}")]
    DuplicateDepth { z: f64 },

    /// Count line disagrees with the number of levels
    #[error("profile declares {declared} levels, found {found}")]
    CountMismatch { declared: usize, found: usize },
}

/// One level of the stratification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StratificationLevel {
    /// Height in m, negative below the surface
    pub z: f64,
    /// Salinity in psu
    pub salinity: f64,
    /// Temperature in degC
    pub temperature: f64,
}

/// Stratification settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StratificationConfig {
    /// Levels in any order
    pub levels: Vec<StratificationLevel>,
}

impl StratificationConfig {
    /// Add a level.
    pub fn with_level(mut self, z: f64, salinity: f64, temperature: f64) -> Self {
        self.levels.push(StratificationLevel { z, salinity, temperature });
        self
    }
}

/// Profile variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVariable {
    Salinity,
    Temperature,
}

impl ProfileVariable {
    fn of(self, level: &StratificationLevel) -> f64 {
        match self {
            Self::Salinity => level.salinity,
            Self::Temperature => level.temperature,
        }
    }

    /// Value column width in the profile file.
    fn width(self) -> usize {
        match self {
            Self::Salinity => 3,
            Self::Temperature => 5,
        }
    }
}

/// Validated stratification, sorted from the surface down.
#[derive(Debug, Clone, PartialEq)]
pub struct StratificationProfile {
    levels: Vec<StratificationLevel>,
}

impl StratificationProfile {
    /// Sort and validate a configuration.
    pub fn new(config: &StratificationConfig) -> Result<Self, ProfileError> {
        if config.levels.is_empty() {
            return Err(ProfileError::EmptyProfile);
        }
        for (index, l) in config.levels.iter().enumerate() {
            if !(l.z.is_finite() && l.salinity.is_finite() && l.temperature.is_finite()) {
                return Err(ProfileError::NonFinite { index });
            }
        }
        let mut levels = config.levels.clone();
        levels.sort_by(|a, b| b.z.total_cmp(&a.z));
        if let Some(w) = levels.windows(2).find(|w| w[0].z == w[1].z) {
            return Err(ProfileError::DuplicateDepth { z: w[0].z });
        }
        Ok(Self { levels })
    }

    /// Levels from the surface down.
    pub fn levels(&self) -> &[StratificationLevel] {
        &self.levels
    }

    /// Value at height `z`: linear between levels, constant beyond the ends.
    pub fn sample(&self, variable: ProfileVariable, z: f64) -> f64 {
        let first = &self.levels[0];
        let last = &self.levels[self.levels.len() - 1];
        if z >= first.z {
            return variable.of(first);
        }
        if z <= last.z {
            return variable.of(last);
        }
        // levels are sorted by decreasing z
        let i = self.levels.partition_point(|l| l.z > z);
        let (upper, lower) = (&self.levels[i - 1], &self.levels[i]);
        let t = (upper.z - z) / (upper.z - lower.z);
        variable.of(upper) + t * (variable.of(lower) - variable.of(upper))
    }

    /// Horizontally uniform field `(level, lat, lon)` at the given depths.
    ///
    /// `depth` is positive down; dry columns are NaN.
    pub fn uniform_field(&self, variable: ProfileVariable, depth: &Array1<f64>, mask: &OceanMask) -> Array3<f64> {
        let (n_rows, n_cols) = mask.shape();
        let column: Vec<f64> = depth.iter().map(|&d| self.sample(variable, -d)).collect();
        Array3::from_shape_fn((depth.len(), n_rows, n_cols), |(k, r, c)| {
            if mask.is_wet(GridPoint::new(r, c)) {
                column[k]
            } else {
                f64::NAN
            }
        })
    }

    /// Render one profile file.
    pub fn format(&self, variable: ProfileVariable) -> String {
        let mut out = format!("{}\n", self.levels.len());
        let width = variable.width();
        for l in &self.levels {
            out.push_str(&format!(
                "{:>6} {:>width$}\n",
                format!("{:?}", l.z),
                format!("{:?}", variable.of(l)),
            ));
        }
        out
    }

    /// Write `salt_profile.txt`-style files for both variables.
    pub fn write_files(&self, salt_path: &Path, temp_path: &Path) -> Result<(), ProfileError> {
        File::create(salt_path)?.write_all(self.format(ProfileVariable::Salinity).as_bytes())?;
        File::create(temp_path)?.write_all(self.format(ProfileVariable::Temperature).as_bytes())?;
        log::info!(
            "wrote {}-level stratification to {} and {}",
            self.levels.len(),
            salt_path.display(),
            temp_path.display()
        );
        Ok(())
    }
}

/// Read one profile file as `(z, value)` pairs.
pub fn read_profile_file(path: &Path) -> Result<Vec<(f64, f64)>, ProfileError> {
    let reader = BufReader::new(File::open(path)?);
    let mut declared = None;
    let mut values = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_num = i + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if declared.is_none() {
            declared = Some(line.parse::<usize>().map_err(|_| ProfileError::ParseError {
                line: line_num,
                message: "Expected level count".into(),
            })?);
            continue;
        }
        let parts: Vec<f64> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|e| ProfileError::ParseError {
                line: line_num,
                message: format!("Invalid number: {e}"),
            })?;
        if parts.len() != 2 {
            return Err(ProfileError::ParseError {
                line: line_num,
                message: format!("Expected 2 columns (z value), got {}", parts.len()),
            });
        }
        values.push((parts[0], parts[1]));
    }

    let declared = declared.ok_or(ProfileError::EmptyProfile)?;
    if declared != values.len() {
        return Err(ProfileError::CountMismatch {
            declared,
            found: values.len(),
        });
    }
    Ok(values)
}

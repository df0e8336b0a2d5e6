//! Grounding-line location on the model grid.
//!
//! For every row, the first wet cell from the west edge that lies west of a
//! longitude cutoff marks where glacier ice leaves the bed. These cells are
//! the injection points for subglacial discharge.
//!
//! Near the calving front, deep floating ice is indistinguishable from
//! grounded ice by the mask alone. A configured rectangle removes those
//! candidates. It is an empirical correction: if it no longer removes
//! anything, the grid or the data changed and the rectangle is stale.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::GeoBoundingBox;
use crate::mask::OceanMask;
use crate::mesh::GeodeticGrid;
use crate::types::GridPoint;

/// Error type for grounding-line location.
#[derive(Debug, Error)]
pub enum GroundingLineError {
    /// Mask and grid do not match
    #[error("mask shape {mask:?} does not match grid shape {grid:?}")]
    ShapeMismatch {
        mask: (usize, usize),
        grid: (usize, usize),
    },

    /// No wet cell west of the cutoff
    #[error("no wet cell west of longitude {lon_cutoff}")]
    NoPoints { lon_cutoff: f64 },

    /// Configured exclusion removed no candidate
    #[error("calving-front exclusion {exclusion:?} removed no grounding-line candidate")]
    ExclusionUnused { exclusion: GeoBoundingBox },
}

/// Grounding-line settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingLineConfig {
    /// Only columns with longitude strictly below this value are searched
    pub lon_cutoff: f64,
    /// Candidates inside this rectangle are dropped
    pub exclusion: Option<GeoBoundingBox>,
    /// Name written after each point in the discharge file
    pub tag: String,
}

impl Default for GroundingLineConfig {
    fn default() -> Self {
        Self {
            lon_cutoff: -19.5,
            exclusion: None,
            tag: "79NG".to_string(),
        }
    }
}

impl GroundingLineConfig {
    /// Set the longitude cutoff.
    pub fn with_lon_cutoff(mut self, lon_cutoff: f64) -> Self {
        self.lon_cutoff = lon_cutoff;
        self
    }

    /// Set the calving-front exclusion.
    pub fn with_exclusion(mut self, exclusion: GeoBoundingBox) -> Self {
        self.exclusion = Some(exclusion);
        self
    }

    /// Set the point tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

/// Located grounding line, ordered by row.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundingLine {
    /// At most one point per row, south to north
    pub points: Vec<GridPoint>,
    /// Candidates removed by the exclusion rectangle
    pub excluded: Vec<GridPoint>,
    /// Tag written with every point
    pub tag: String,
}

impl GroundingLine {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no point was found.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Geographic coordinates `(lon, lat)` of the points.
    pub fn coordinates(&self, grid: &GeodeticGrid) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (grid.lon[p.col], grid.lat[p.row])).collect()
    }
}

/// Locate the grounding line in a wet mask.
///
/// # Errors
/// - `NoPoints` if no row has a wet cell west of the cutoff
/// - `ExclusionUnused` if an exclusion is configured but removed nothing
pub fn locate_grounding_line(
    grid: &GeodeticGrid,
    mask: &OceanMask,
    config: &GroundingLineConfig,
) -> Result<GroundingLine, GroundingLineError> {
    if mask.shape() != grid.shape() {
        return Err(GroundingLineError::ShapeMismatch {
            mask: mask.shape(),
            grid: grid.shape(),
        });
    }

    let west_cols: Vec<usize> = (0..grid.n_lon()).filter(|&c| grid.lon[c] < config.lon_cutoff).collect();
    let mut points = Vec::new();
    let mut excluded = Vec::new();

    for row in 0..grid.n_lat() {
        let Some(col) = west_cols.iter().copied().find(|&c| mask.is_wet(GridPoint::new(row, c))) else {
            continue;
        };
        let p = GridPoint::new(row, col);
        match &config.exclusion {
            Some(rect) if rect.contains(grid.lon[col], grid.lat[row]) => excluded.push(p),
            _ => points.push(p),
        }
    }

    if let Some(rect) = config.exclusion {
        if excluded.is_empty() {
            return Err(GroundingLineError::ExclusionUnused { exclusion: rect });
        }
    }
    if points.is_empty() {
        return Err(GroundingLineError::NoPoints {
            lon_cutoff: config.lon_cutoff,
        });
    }

    log::info!(
        "grounding line: {} points, {} excluded at the calving front",
        points.len(),
        excluded.len()
    );
    Ok(GroundingLine {
        points,
        excluded,
        tag: config.tag.clone(),
    })
}

//! Topography smoothing.
//!
//! A running mean over a `(2 pm_i + 1) x (2 pm_j + 1)` window bounds local
//! slopes of the sea floor and the ice base. Undefined (NaN) cells are
//! ignored in the window and stay undefined.
//!
//! After smoothing, the mask is derived again from the smoothed depths. Ice
//! values blend into neighbouring open-water cells, so the ice extent can
//! grow slightly.

use ndarray::{Array2, Zip, s};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mask::{MaskError, OceanMask};
use crate::mesh::TopographyDataset;
use crate::types::SideBoundaries;

/// Error type for topography smoothing.
#[derive(Debug, Error)]
pub enum SmoothingError {
    /// Mask derivation failed
    #[error(transparent)]
    Mask(#[from] MaskError),

    /// No wet cell connected to an open side remains
    #[error("no open water remains after smoothing")]
    NoOpenWater,
}

/// Smoothing window half-widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Half-width along rows (latitude index)
    pub pm_i: usize,
    /// Half-width along columns (longitude index)
    pub pm_j: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { pm_i: 2, pm_j: 2 }
    }
}

impl SmoothingConfig {
    /// Whether smoothing leaves data unchanged.
    pub fn is_identity(&self) -> bool {
        self.pm_i == 0 && self.pm_j == 0
    }
}

/// NaN-aware running mean with half-widths `(pm_i, pm_j)`.
///
/// Windows are truncated at the array edges.
pub fn smooth_2d(data: &Array2<f64>, pm_i: usize, pm_j: usize) -> Array2<f64> {
    if pm_i == 0 && pm_j == 0 {
        return data.clone();
    }
    let (ni, nj) = data.dim();
    Array2::from_shape_fn((ni, nj), |(i, j)| {
        if data[[i, j]].is_nan() {
            return f64::NAN;
        }
        let window = data.slice(s![
            i.saturating_sub(pm_i)..(i + pm_i + 1).min(ni),
            j.saturating_sub(pm_j)..(j + pm_j + 1).min(nj)
        ]);
        let (sum, count) = window
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, n), &v| (sum + v, n + 1));
        sum / count as f64
    })
}

/// Summary of a smoothing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmoothingReport {
    /// Wet cells that became dry
    pub dried: usize,
    /// Wet cells removed as disconnected after smoothing
    pub disconnected: usize,
    /// Cells with ice before smoothing
    pub ice_cells_before: usize,
    /// Cells with ice after smoothing
    pub ice_cells_after: usize,
}

/// Smooth bathymetry and ice fields on wet cells and re-derive the mask.
///
/// # Errors
/// `NoOpenWater` if smoothing leaves no wet cell connected to an open side.
pub fn smooth_topography(
    dataset: &TopographyDataset,
    config: &SmoothingConfig,
    min_depth: f64,
    open: &SideBoundaries<bool>,
) -> Result<(TopographyDataset, SmoothingReport), SmoothingError> {
    let wet = dataset.mask.wet();
    let restrict = |field: &Array2<f64>| {
        Zip::from(field)
            .and(wet)
            .map_collect(|&v, &w| if w { v } else { f64::NAN })
    };

    let bathymetry = smooth_2d(&restrict(&dataset.bathymetry), config.pm_i, config.pm_j);
    let fill_zero = |field: Array2<f64>| field.mapv(|v| if v.is_nan() { 0.0 } else { v });
    let ice_draft = fill_zero(smooth_2d(&restrict(&dataset.ice_draft), config.pm_i, config.pm_j));
    let ice_thickness = fill_zero(smooth_2d(&restrict(&dataset.ice_thickness), config.pm_i, config.pm_j));

    let derived = OceanMask::from_depths(&bathymetry, &ice_draft, min_depth)?;
    let dried = dataset.mask.wet_count().saturating_sub(derived.wet_count());
    let (mask, disconnected) = derived.keep_connected_to(open);
    if mask.wet_count() == 0 {
        return Err(SmoothingError::NoOpenWater);
    }

    let bathymetry = Zip::from(&bathymetry)
        .and(mask.wet())
        .map_collect(|&d, &w| if w { d } else { f64::NAN });

    let count_ice = |h: &Array2<f64>| h.iter().filter(|&&v| v > 0.0).count();
    let report = SmoothingReport {
        dried,
        disconnected,
        ice_cells_before: count_ice(&dataset.ice_thickness),
        ice_cells_after: count_ice(&ice_thickness),
    };
    log::info!(
        "smoothing ({}x{} window): {} cells dried, {} disconnected, ice cells {} -> {}",
        2 * config.pm_i + 1,
        2 * config.pm_j + 1,
        report.dried,
        report.disconnected,
        report.ice_cells_before,
        report.ice_cells_after
    );

    let smoothed = TopographyDataset {
        grid: dataset.grid.clone(),
        mask,
        bathymetry,
        ice_draft,
        ice_thickness,
        attributes: dataset.attributes.clone(),
    };
    Ok((smoothed, report))
}

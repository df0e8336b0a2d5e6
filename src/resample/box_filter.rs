//! Box-filter downsampling along one grid axis.
//!
//! A centered moving average of odd width `factor` is applied along the
//! axis, then every `factor`-th averaged value is kept, starting at index
//! `factor / 2`. The same operation applied to the coordinate vector must
//! reproduce the directly subsampled coordinates, otherwise the coarse grid
//! would be shifted against the fine one.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::ResampleError;
use crate::io::CoordinateProjection;
use crate::mesh::{GeodeticGrid, GridAxis, Topography};

/// Tolerance for comparing averaged and subsampled coordinates (degrees).
pub const COORDINATE_TOLERANCE: f64 = 1e-9;

/// Box-filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Filter width and decimation step; must be odd
    pub factor: usize,
    /// Axis that is downsampled; the other axis is reused as is
    pub axis: GridAxis,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            factor: 3,
            axis: GridAxis::Latitude,
        }
    }
}

/// Centered moving average followed by decimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxFilter {
    factor: usize,
}

impl BoxFilter {
    /// Create a filter of width `factor`.
    ///
    /// # Errors
    /// `EvenFactor` unless `factor` is odd (1 is the identity).
    pub fn new(factor: usize) -> Result<Self, ResampleError> {
        if factor % 2 == 0 {
            return Err(ResampleError::EvenFactor(factor));
        }
        Ok(Self { factor })
    }

    /// Filter width.
    #[inline]
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Half width of the averaging window.
    #[inline]
    pub fn half(&self) -> usize {
        self.factor / 2
    }

    /// Source indices kept after decimation of an axis of length `n`.
    ///
    /// Only indices with a complete averaging window are kept.
    pub fn kept_indices(&self, n: usize) -> Vec<usize> {
        let half = self.half();
        (half..n).step_by(self.factor).take_while(|&i| i + half < n).collect()
    }

    /// Averaged and decimated 1D values.
    ///
    /// NaN anywhere in a window makes that coarse value NaN.
    pub fn apply_1d(&self, values: ArrayView1<'_, f64>) -> Array1<f64> {
        let half = self.half();
        let width = self.factor as f64;
        self.kept_indices(values.len())
            .into_iter()
            .map(|i| values.slice(ndarray::s![i - half..=i + half]).sum() / width)
            .collect()
    }

    /// Coarse coordinate vector, checked against direct subsampling.
    ///
    /// # Errors
    /// `CoordinateMismatch` if the averaged coordinate differs from the
    /// subsampled one by more than [`COORDINATE_TOLERANCE`].
    pub fn coarsen_coordinates(&self, coords: &Array1<f64>) -> Result<Array1<f64>, ResampleError> {
        let averaged = self.apply_1d(coords.view());
        for (k, i) in self.kept_indices(coords.len()).into_iter().enumerate() {
            let diff = (averaged[k] - coords[i]).abs();
            if diff > COORDINATE_TOLERANCE {
                return Err(ResampleError::CoordinateMismatch {
                    index: k,
                    averaged: averaged[k],
                    subsampled: coords[i],
                });
            }
        }
        if averaged.len() < 2 {
            return Err(ResampleError::TooFewPoints {
                len: coords.len(),
                factor: self.factor,
            });
        }
        Ok(averaged)
    }

    /// Average and decimate a field along `axis`.
    pub fn apply(&self, field: &Array2<f64>, axis: GridAxis) -> Array2<f64> {
        let ax = axis.ndarray_axis();
        let other = Axis(1 - ax.index());
        let n_kept = self.kept_indices(field.len_of(ax)).len();
        let mut out = match axis {
            GridAxis::Latitude => Array2::zeros((n_kept, field.ncols())),
            GridAxis::Longitude => Array2::zeros((field.nrows(), n_kept)),
        };
        for (src, mut dst) in field.axis_iter(other).zip(out.axis_iter_mut(other)) {
            dst.assign(&self.apply_1d(src));
        }
        out
    }

    /// Downsample a grid along `axis`, recomputing planar coordinates.
    pub fn apply_grid<P: CoordinateProjection + ?Sized>(
        &self,
        grid: &GeodeticGrid,
        axis: GridAxis,
        projection: &P,
    ) -> Result<GeodeticGrid, ResampleError> {
        let coarse = self.coarsen_coordinates(grid.coords(axis))?;
        let (lon, lat) = match axis {
            GridAxis::Latitude => (grid.lon.clone(), coarse),
            GridAxis::Longitude => (coarse, grid.lat.clone()),
        };
        Ok(GeodeticGrid::new(lon, lat, projection)?)
    }

    /// Downsample bedrock and ice-base elevations onto the coarse grid.
    pub fn apply_topography<P: CoordinateProjection + ?Sized>(
        &self,
        topography: &Topography,
        axis: GridAxis,
        projection: &P,
    ) -> Result<Topography, ResampleError> {
        let grid = self.apply_grid(&topography.grid, axis, projection)?;
        let bedrock = self.apply(&topography.bedrock, axis);
        let ice_base = self.apply(&topography.ice_base, axis);
        log::info!(
            "box filter (factor {} along {}): {:?} -> {:?}",
            self.factor,
            axis,
            topography.grid.shape(),
            grid.shape()
        );
        Ok(Topography::new(grid, bedrock, ice_base)?)
    }
}

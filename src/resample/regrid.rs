//! Regridding of a regular planar raster onto the model grid.
//!
//! Lookups use the planar `(x, y)` coordinates of the target points. Target
//! points outside the raster extent get NaN; no extrapolation happens.

use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

use super::ResampleError;
use crate::mesh::GeodeticGrid;

/// Interpolation method for gridded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegridMethod {
    /// Value of the closest raster cell
    Nearest,
    /// Bilinear interpolation of the four surrounding cells
    #[default]
    Linear,
}

/// A field on a regular planar grid, indexed `(y, x)`.
#[derive(Debug, Clone)]
pub struct PlanarRaster {
    /// Cell-center x in m, strictly increasing
    pub x: Array1<f64>,
    /// Cell-center y in m, strictly increasing
    pub y: Array1<f64>,
    /// Values `(y, x)`
    pub values: Array2<f64>,
}

impl PlanarRaster {
    /// Create a raster, checking coordinates and shape.
    ///
    /// # Errors
    /// Non-monotonic coordinates or a shape that does not match them.
    pub fn new(x: Array1<f64>, y: Array1<f64>, values: Array2<f64>) -> Result<Self, ResampleError> {
        check_ascending("x", &x)?;
        check_ascending("y", &y)?;
        if values.dim() != (y.len(), x.len()) {
            return Err(ResampleError::ShapeMismatch {
                expected: (y.len(), x.len()),
                found: values.dim(),
            });
        }
        Ok(Self { x, y, values })
    }

    /// Value at a planar point, or NaN outside the raster.
    pub fn sample(&self, x: f64, y: f64, method: RegridMethod) -> f64 {
        let (Some((i0, i1, fx)), Some((j0, j1, fy))) = (find_bracket(&self.x, x), find_bracket(&self.y, y)) else {
            return f64::NAN;
        };
        match method {
            RegridMethod::Nearest => {
                let i = if fx < 0.5 { i0 } else { i1 };
                let j = if fy < 0.5 { j0 } else { j1 };
                self.values[[j, i]]
            }
            RegridMethod::Linear => {
                let v00 = self.values[[j0, i0]];
                let v01 = self.values[[j0, i1]];
                let v10 = self.values[[j1, i0]];
                let v11 = self.values[[j1, i1]];
                let v0 = v00 * (1.0 - fx) + v01 * fx;
                let v1 = v10 * (1.0 - fx) + v11 * fx;
                v0 * (1.0 - fy) + v1 * fy
            }
        }
    }

    /// Sample the raster at every point of a geodetic grid.
    pub fn regrid(&self, target: &GeodeticGrid, method: RegridMethod) -> Array2<f64> {
        Zip::from(&target.x)
            .and(&target.y)
            .map_collect(|&x, &y| self.sample(x, y, method))
    }
}

fn check_ascending(what: &'static str, coords: &Array1<f64>) -> Result<(), ResampleError> {
    if coords.len() < 2 {
        return Err(ResampleError::NotAscending { what, index: coords.len() });
    }
    match (1..coords.len()).find(|&i| !(coords[i] > coords[i - 1])) {
        Some(index) => Err(ResampleError::NotAscending { what, index }),
        None => Ok(()),
    }
}

/// Bracketing indices and fraction of `value` in ascending `coords`.
///
/// `None` outside `[coords[0], coords[n - 1]]`.
fn find_bracket(coords: &Array1<f64>, value: f64) -> Option<(usize, usize, f64)> {
    let n = coords.len();
    if n < 2 || !(value >= coords[0] && value <= coords[n - 1]) {
        return None;
    }
    let slice = coords.as_slice()?;
    let upper = slice.partition_point(|&c| c <= value).min(n - 1);
    let lower = upper - 1;
    let f = (value - coords[lower]) / (coords[upper] - coords[lower]);
    Some((lower, upper, f))
}

//! Regular longitude/latitude grid with attached planar coordinates.

use ndarray::{Array1, Array2, s};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

use crate::io::{CoordinateProjection, GeoBoundingBox};

/// Coordinate axis of a geodetic grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridAxis {
    /// Rows (ndarray axis 0)
    Latitude,
    /// Columns (ndarray axis 1)
    Longitude,
}

impl GridAxis {
    /// The ndarray axis of a `(lat, lon)` field.
    pub fn ndarray_axis(self) -> ndarray::Axis {
        match self {
            GridAxis::Latitude => ndarray::Axis(0),
            GridAxis::Longitude => ndarray::Axis(1),
        }
    }
}

impl fmt::Display for GridAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridAxis::Latitude => f.write_str("latitude"),
            GridAxis::Longitude => f.write_str("longitude"),
        }
    }
}

/// Error type for grid construction.
#[derive(Debug, Error)]
pub enum GridError {
    /// Coordinate vector is not strictly increasing
    #[error("{axis} coordinates are not strictly increasing at index {index} ({previous} -> {value})")]
    NotMonotonic {
        axis: GridAxis,
        index: usize,
        previous: f64,
        value: f64,
    },

    /// Spacing between coordinates varies
    #[error("{axis} spacing is not uniform at index {index}: expected {expected}, found {found}")]
    NonUniformSpacing {
        axis: GridAxis,
        index: usize,
        expected: f64,
        found: f64,
    },

    /// Fewer than two points along an axis
    #[error("{axis} axis needs at least 2 points, found {len}")]
    TooShort { axis: GridAxis, len: usize },

    /// Crop window contains no grid points
    #[error("crop window {bbox:?} contains no grid points")]
    EmptyCrop { bbox: GeoBoundingBox },

    /// Field shape does not match the grid
    #[error("{what} has shape {found:?}, grid has shape {expected:?}")]
    ShapeMismatch {
        what: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Companion vector or array axis has the wrong length
    #[error("{what} has length {found}, expected {expected}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// Time series without any record
    #[error("{what} has no time records")]
    EmptyTimeAxis { what: String },
}

/// Regular geodetic grid indexed `(row = latitude, col = longitude)`.
///
/// Every point also carries planar `(x, y)` coordinates, which are the ones
/// used for all distance-based work.
#[derive(Debug, Clone)]
pub struct GeodeticGrid {
    /// Longitudes in degrees, strictly increasing (columns)
    pub lon: Array1<f64>,
    /// Latitudes in degrees, strictly increasing (rows)
    pub lat: Array1<f64>,
    /// Planar x in meters, shape `(n_lat, n_lon)`
    pub x: Array2<f64>,
    /// Planar y in meters, shape `(n_lat, n_lon)`
    pub y: Array2<f64>,
}

impl GeodeticGrid {
    /// Create a grid from coordinate vectors, computing planar coordinates.
    ///
    /// # Errors
    /// `NotMonotonic` or `TooShort` if a coordinate vector is unusable.
    pub fn new<P: CoordinateProjection + ?Sized>(
        lon: Array1<f64>,
        lat: Array1<f64>,
        projection: &P,
    ) -> Result<Self, GridError> {
        check_increasing(GridAxis::Longitude, &lon)?;
        check_increasing(GridAxis::Latitude, &lat)?;
        let (x, y) = projection.to_planar_grid(&lon, &lat);
        Ok(Self { lon, lat, x, y })
    }

    /// Shape `(n_lat, n_lon)` of fields on this grid.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Number of rows.
    #[inline]
    pub fn n_lat(&self) -> usize {
        self.lat.len()
    }

    /// Number of columns.
    #[inline]
    pub fn n_lon(&self) -> usize {
        self.lon.len()
    }

    /// Coordinate vector of an axis.
    pub fn coords(&self, axis: GridAxis) -> &Array1<f64> {
        match axis {
            GridAxis::Latitude => &self.lat,
            GridAxis::Longitude => &self.lon,
        }
    }

    /// Uniform spacing along an axis in degrees.
    ///
    /// # Errors
    /// `NonUniformSpacing` if any step deviates from the first one by more than `tol`.
    pub fn spacing(&self, axis: GridAxis, tol: f64) -> Result<f64, GridError> {
        uniform_spacing(axis, self.coords(axis), tol)
    }

    /// Row and column index ranges of the points inside `bbox`.
    ///
    /// # Errors
    /// `EmptyCrop` if no row or no column falls inside the window.
    pub fn crop_ranges(&self, bbox: &GeoBoundingBox) -> Result<(Range<usize>, Range<usize>), GridError> {
        let rows = inside_range(&self.lat, bbox.min_lat, bbox.max_lat);
        let cols = inside_range(&self.lon, bbox.min_lon, bbox.max_lon);
        match (rows, cols) {
            (Some(rows), Some(cols)) => Ok((rows, cols)),
            _ => Err(GridError::EmptyCrop { bbox: *bbox }),
        }
    }

    /// Sub-grid covering the given index ranges.
    pub fn slice(&self, rows: Range<usize>, cols: Range<usize>) -> Self {
        Self {
            lon: self.lon.slice(s![cols.clone()]).to_owned(),
            lat: self.lat.slice(s![rows.clone()]).to_owned(),
            x: self.x.slice(s![rows.clone(), cols.clone()]).to_owned(),
            y: self.y.slice(s![rows, cols]).to_owned(),
        }
    }

    /// Geographic extent of the grid points.
    pub fn bbox(&self) -> GeoBoundingBox {
        GeoBoundingBox::new(
            self.lon[0],
            self.lat[0],
            self.lon[self.lon.len() - 1],
            self.lat[self.lat.len() - 1],
        )
    }

    /// Planar extent `(min_x, min_y, max_x, max_y)` of the grid points.
    pub fn planar_extent(&self) -> (f64, f64, f64, f64) {
        let fold = |a: &Array2<f64>| {
            a.iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        };
        let (min_x, max_x) = fold(&self.x);
        let (min_y, max_y) = fold(&self.y);
        (min_x, min_y, max_x, max_y)
    }

    /// Check that a field has this grid's shape.
    pub fn check_shape<T>(&self, what: &str, field: &Array2<T>) -> Result<(), GridError> {
        if field.dim() != self.shape() {
            return Err(GridError::ShapeMismatch {
                what: what.to_string(),
                expected: self.shape(),
                found: field.dim(),
            });
        }
        Ok(())
    }

    /// Grid spacing in arc seconds `(dlon, dlat)`, from the first two points.
    pub fn resolution_arcsec(&self) -> (f64, f64) {
        let step = |c: &Array1<f64>| (c[1] - c[0]) * 3600.0;
        (step(&self.lon), step(&self.lat))
    }
}

fn check_increasing(axis: GridAxis, coords: &Array1<f64>) -> Result<(), GridError> {
    if coords.len() < 2 {
        return Err(GridError::TooShort {
            axis,
            len: coords.len(),
        });
    }
    for i in 1..coords.len() {
        if !(coords[i] > coords[i - 1]) {
            return Err(GridError::NotMonotonic {
                axis,
                index: i,
                previous: coords[i - 1],
                value: coords[i],
            });
        }
    }
    Ok(())
}

/// Uniform step of a coordinate vector.
fn uniform_spacing(axis: GridAxis, coords: &Array1<f64>, tol: f64) -> Result<f64, GridError> {
    check_increasing(axis, coords)?;
    let expected = coords[1] - coords[0];
    for i in 2..coords.len() {
        let found = coords[i] - coords[i - 1];
        if (found - expected).abs() > tol {
            return Err(GridError::NonUniformSpacing {
                axis,
                index: i,
                expected,
                found,
            });
        }
    }
    Ok(expected)
}

pub(crate) fn inside_range(coords: &Array1<f64>, lo: f64, hi: f64) -> Option<Range<usize>> {
    let first = coords.iter().position(|&c| c >= lo)?;
    let last = coords.iter().rposition(|&c| c <= hi)?;
    (first <= last).then_some(first..last + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::PolarStereographic;

    fn grid() -> GeodeticGrid {
        let lon = Array1::linspace(-24.0, -16.0, 9);
        let lat = Array1::linspace(79.0, 80.0, 5);
        GeodeticGrid::new(lon, lat, &PolarStereographic::epsg_3413()).unwrap()
    }

    #[test]
    fn test_shape_and_spacing() {
        let g = grid();
        assert_eq!(g.shape(), (5, 9));
        assert!((g.spacing(GridAxis::Longitude, 1e-9).unwrap() - 1.0).abs() < 1e-12);
        assert!((g.spacing(GridAxis::Latitude, 1e-9).unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_decreasing() {
        let lon = Array1::from(vec![-20.0, -21.0, -22.0]);
        let lat = Array1::from(vec![79.0, 79.5]);
        let err = GeodeticGrid::new(lon, lat, &PolarStereographic::epsg_3413()).unwrap_err();
        assert!(matches!(err, GridError::NotMonotonic { axis: GridAxis::Longitude, index: 1, .. }));
    }

    #[test]
    fn test_non_uniform_spacing() {
        let lat = Array1::from(vec![79.0, 79.1, 79.3]);
        let err = uniform_spacing(GridAxis::Latitude, &lat, 1e-9).unwrap_err();
        assert!(matches!(err, GridError::NonUniformSpacing { index: 2, .. }));
    }

    #[test]
    fn test_crop() {
        let g = grid();
        let (rows, cols) = g
            .crop_ranges(&GeoBoundingBox::new(-22.5, 79.2, -19.5, 79.8))
            .unwrap();
        assert_eq!(rows, 1..4);
        assert_eq!(cols, 2..5);
        let sub = g.slice(rows, cols);
        assert_eq!(sub.shape(), (3, 3));
        assert_eq!(sub.lon[0], -22.0);
        assert_eq!(sub.x[[0, 0]], g.x[[1, 2]]);

        let outside = GeoBoundingBox::new(10.0, 79.2, 11.0, 79.8);
        assert!(matches!(g.crop_ranges(&outside), Err(GridError::EmptyCrop { .. })));
    }
}

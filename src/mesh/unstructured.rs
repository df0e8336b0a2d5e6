//! Unstructured source mesh and the fields living on it.
//!
//! Layouts are fixed:
//! - node coordinates: `(node)`
//! - averaged fields: `(node, level)`
//! - monthly series: `(time, node, level)`
//!
//! Level 0 is the shallowest level; level depths are positive down.

use ndarray::{Array1, Array2, Array3, Axis, Zip};

use super::geodetic_grid::GridError;
use crate::io::{CoordinateProjection, GeoBoundingBox};
use crate::types::{YearMonth, day_weights};

/// Horizontal nodes and vertical levels of an unstructured ocean mesh.
#[derive(Debug, Clone)]
pub struct UnstructuredMesh {
    /// Node longitudes in degrees
    pub lon: Array1<f64>,
    /// Node latitudes in degrees
    pub lat: Array1<f64>,
    /// Planar node x in m
    pub x: Array1<f64>,
    /// Planar node y in m
    pub y: Array1<f64>,
    /// Level depths in m, positive down, shallowest first
    pub depth: Array1<f64>,
}

impl UnstructuredMesh {
    /// Build a mesh from node coordinates, attaching planar coordinates.
    pub fn new<P: CoordinateProjection + ?Sized>(
        lon: Array1<f64>,
        lat: Array1<f64>,
        depth: Array1<f64>,
        projection: &P,
    ) -> Result<Self, GridError> {
        if lat.len() != lon.len() {
            return Err(GridError::LengthMismatch {
                what: "node latitudes".to_string(),
                expected: lon.len(),
                found: lat.len(),
            });
        }
        let mut x = Array1::zeros(lon.len());
        let mut y = Array1::zeros(lon.len());
        for i in 0..lon.len() {
            let (xi, yi) = projection.to_planar(lon[i], lat[i]);
            x[i] = xi;
            y[i] = yi;
        }
        Ok(Self { lon, lat, x, y, depth })
    }

    /// Number of horizontal nodes.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.lon.len()
    }

    /// Number of vertical levels.
    #[inline]
    pub fn n_levels(&self) -> usize {
        self.depth.len()
    }

    /// Planar node positions.
    pub fn planar_points(&self) -> Vec<[f64; 2]> {
        self.x.iter().zip(self.y.iter()).map(|(&x, &y)| [x, y]).collect()
    }

    /// Indices of the nodes inside `bbox`.
    pub fn nodes_within(&self, bbox: &GeoBoundingBox) -> Vec<usize> {
        (0..self.n_nodes())
            .filter(|&i| bbox.contains(self.lon[i], self.lat[i]))
            .collect()
    }

    /// Mesh restricted to the given nodes (all levels kept).
    pub fn select_nodes(&self, nodes: &[usize]) -> Self {
        Self {
            lon: self.lon.select(Axis(0), nodes),
            lat: self.lat.select(Axis(0), nodes),
            x: self.x.select(Axis(0), nodes),
            y: self.y.select(Axis(0), nodes),
            depth: self.depth.clone(),
        }
    }

    /// Keep only the first `n_levels` levels.
    pub fn truncate_levels(&mut self, n_levels: usize) {
        let n = n_levels.min(self.n_levels());
        self.depth = self.depth.slice(ndarray::s![..n]).to_owned();
    }
}

/// A time-averaged scalar on the mesh, `(node, level)`.
#[derive(Debug, Clone)]
pub struct MeshField {
    /// Variable name, e.g. `salt`
    pub name: String,
    /// Units attribute
    pub units: String,
    /// Values `(node, level)`; NaN marks invalid node-levels
    pub values: Array2<f64>,
}

impl MeshField {
    /// Values of one level over all nodes.
    pub fn level(&self, k: usize) -> ndarray::ArrayView1<'_, f64> {
        self.values.index_axis(Axis(1), k)
    }

    /// Number of vertical levels.
    pub fn n_levels(&self) -> usize {
        self.values.ncols()
    }
}

/// Monthly-mean series of one scalar on the mesh, `(time, node, level)`.
#[derive(Debug, Clone)]
pub struct MeshTimeSeries {
    /// Variable name, e.g. `salt`
    pub name: String,
    /// Units attribute
    pub units: String,
    /// Month of each time record
    pub months: Vec<YearMonth>,
    /// Values `(time, node, level)`
    pub values: Array3<f64>,
}

impl MeshTimeSeries {
    /// Bundle a series, checking that each time record has a month.
    ///
    /// # Errors
    /// `EmptyTimeAxis` for a series without months, `LengthMismatch` if
    /// the time axis and the months differ in length.
    pub fn new(
        name: impl Into<String>,
        units: impl Into<String>,
        months: Vec<YearMonth>,
        values: Array3<f64>,
    ) -> Result<Self, GridError> {
        let name = name.into();
        if months.is_empty() {
            return Err(GridError::EmptyTimeAxis {
                what: format!("{name} series"),
            });
        }
        if values.len_of(Axis(0)) != months.len() {
            return Err(GridError::LengthMismatch {
                what: format!("{name} time axis"),
                expected: months.len(),
                found: values.len_of(Axis(0)),
            });
        }
        Ok(Self {
            name,
            units: units.into(),
            months,
            values,
        })
    }

    /// Number of horizontal nodes.
    pub fn n_nodes(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    /// Number of vertical levels.
    pub fn n_levels(&self) -> usize {
        self.values.len_of(Axis(2))
    }

    /// Series restricted to the given nodes.
    pub fn select_nodes(&self, nodes: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            units: self.units.clone(),
            months: self.months.clone(),
            values: self.values.select(Axis(1), nodes),
        }
    }

    /// Keep only the first `n_levels` levels.
    pub fn truncate_levels(&mut self, n_levels: usize) {
        let n = n_levels.min(self.n_levels());
        self.values = self.values.slice(ndarray::s![.., .., ..n]).to_owned();
    }

    /// Average over time with weights proportional to days per month.
    ///
    /// Weights are normalized to mean 1, so the result is `sum(w * v) / n_months`.
    /// A NaN at any time propagates to the mean; a series without months
    /// averages to NaN everywhere.
    pub fn day_weighted_mean(&self) -> MeshField {
        let weights = day_weights(&self.months);
        let n = if weights.is_empty() { f64::NAN } else { weights.len() as f64 };
        let mut sum = Array2::<f64>::zeros((self.n_nodes(), self.n_levels()));
        for (t, w) in weights.iter().enumerate() {
            Zip::from(&mut sum)
                .and(&self.values.index_axis(Axis(0), t))
                .for_each(|s, &v| *s += w * v);
        }
        sum.mapv_inplace(|s| s / n);
        MeshField {
            name: self.name.clone(),
            units: self.units.clone(),
            values: sum,
        }
    }
}

/// Replace sentinel node-levels by NaN.
///
/// A salinity of exactly zero marks a node-level without data; the same
/// entries are invalidated in `salinity` and every companion series.
/// Returns the number of sentinel entries found.
pub fn mask_salinity_sentinels(salinity: &mut MeshTimeSeries, companions: &mut [&mut MeshTimeSeries]) -> usize {
    let sentinel = salinity.values.mapv(|s| s == 0.0);
    let count = sentinel.iter().filter(|&&s| s).count();
    if count == 0 {
        return 0;
    }
    let invalidate = |values: &mut Array3<f64>| {
        Zip::from(values).and(&sentinel).for_each(|v, &bad| {
            if bad {
                *v = f64::NAN;
            }
        });
    };
    invalidate(&mut salinity.values);
    for series in companions.iter_mut() {
        invalidate(&mut series.values);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::PolarStereographic;
    use ndarray::array;

    fn months() -> Vec<YearMonth> {
        vec![YearMonth::new(2015, 1).unwrap(), YearMonth::new(2015, 2).unwrap()]
    }

    #[test]
    fn test_day_weighted_mean() {
        // January (31 d) = 1.0, February (28 d) = 2.0
        let values = Array3::from_shape_fn((2, 1, 1), |(t, _, _)| (t + 1) as f64);
        let series = MeshTimeSeries::new("salt", "psu", months(), values).unwrap();
        let mean = series.day_weighted_mean();
        let expected = (31.0 * 1.0 + 28.0 * 2.0) / 59.0;
        assert!((mean.values[[0, 0]] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_time_axis_checked() {
        let err = MeshTimeSeries::new("salt", "psu", months(), Array3::zeros((3, 1, 1))).unwrap_err();
        assert!(matches!(err, GridError::LengthMismatch { expected: 2, found: 3, .. }));

        let err = MeshTimeSeries::new("salt", "psu", Vec::new(), Array3::zeros((0, 4, 2))).unwrap_err();
        assert!(matches!(err, GridError::EmptyTimeAxis { .. }));

        // fields are public, so an empty series can still be built by hand
        let empty = MeshTimeSeries {
            name: "salt".into(),
            units: "psu".into(),
            months: Vec::new(),
            values: Array3::zeros((0, 4, 2)),
        };
        let mean = empty.day_weighted_mean();
        assert_eq!(mean.values.dim(), (4, 2));
        assert!(mean.values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_salinity_sentinels() {
        let mut salt = MeshTimeSeries::new(
            "salt",
            "psu",
            months(),
            Array3::from_shape_vec((2, 2, 1), vec![34.0, 0.0, 34.5, 34.2]).unwrap(),
        )
        .unwrap();
        let mut temp = MeshTimeSeries::new(
            "temp",
            "degC",
            months(),
            Array3::from_shape_vec((2, 2, 1), vec![1.0, 0.5, 1.2, 0.7]).unwrap(),
        )
        .unwrap();
        let n = mask_salinity_sentinels(&mut salt, &mut [&mut temp]);
        assert_eq!(n, 1);
        assert!(salt.values[[0, 1, 0]].is_nan());
        assert!(temp.values[[0, 1, 0]].is_nan());
        assert_eq!(temp.values[[1, 1, 0]], 0.7);
    }

    #[test]
    fn test_select_nodes() {
        let mesh = UnstructuredMesh::new(
            array![-20.0, -19.0, -10.0],
            array![79.5, 79.6, 70.0],
            array![5.0, 15.0],
            &PolarStereographic::epsg_3413(),
        )
        .unwrap();
        let inside = mesh.nodes_within(&GeoBoundingBox::new(-21.0, 79.0, -18.0, 80.0));
        assert_eq!(inside, vec![0, 1]);
        let sub = mesh.select_nodes(&inside);
        assert_eq!(sub.n_nodes(), 2);
        assert_eq!(sub.x[1], mesh.x[1]);
        assert_eq!(sub.n_levels(), 2);
    }
}

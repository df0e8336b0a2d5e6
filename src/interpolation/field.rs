//! Mesh-to-grid interpolation of 3D fields.
//!
//! Per level, only node-levels with a defined value take part: the
//! triangulation is built on the valid nodes of that level, and target
//! points outside their hull fall back to the nearest valid node. Levels
//! sharing the same valid node set share one triangulation.
//!
//! With a target bathymetry, a wet cell only counts on the levels its
//! seafloor reaches. Deep levels of the source are undefined below the
//! local seafloor, so shallow cells outside the hull of a deep level are
//! left to the vertical fill instead of the nearest fallback.
//!
//! After the horizontal step the mask is applied, wet columns are filled
//! vertically, and the sponge bands are flattened.

use ndarray::{Array1, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::InterpolationError;
use super::scattered::{NearestInterpolator, ScatterMethod, ScatteredInterpolator, build_interpolator};
use crate::boundary::{OpenBoundaries, SpongeZone};
use crate::mask::OceanMask;
use crate::mesh::{GeodeticGrid, MeshField, MeshTimeSeries, UnstructuredMesh};
use crate::types::GridPoint;

/// Field interpolation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Primary scattered interpolation method
    pub method: ScatterMethod,
    /// Largest accepted share of wet cells filled by the nearest fallback, per level
    pub max_fallback_fraction: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            method: ScatterMethod::Linear,
            max_fallback_fraction: 0.1,
        }
    }
}

impl InterpolationConfig {
    /// Set the primary method.
    pub fn with_method(mut self, method: ScatterMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the fallback bound.
    pub fn with_max_fallback_fraction(mut self, fraction: f64) -> Self {
        self.max_fallback_fraction = fraction;
        self
    }
}

/// Nearest-fallback usage of one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackReport {
    /// Level index
    pub level: usize,
    /// Wet cells filled by the fallback
    pub fallback: usize,
    /// Wet cells whose seafloor reaches the level
    pub wet: usize,
    /// Wet cells outside the hull with the seafloor above the level,
    /// left to the vertical fill
    pub below_seafloor: usize,
}

impl FallbackReport {
    /// Share of wet cells that needed the fallback.
    pub fn fraction(&self) -> f64 {
        if self.wet == 0 {
            0.0
        } else {
            self.fallback as f64 / self.wet as f64
        }
    }
}

impl fmt::Display for FallbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level {}: {} of {} wet cells by nearest fallback ({:.1}%)",
            self.level,
            self.fallback,
            self.wet,
            100.0 * self.fraction()
        )?;
        if self.below_seafloor > 0 {
            write!(f, ", {} below the seafloor", self.below_seafloor)?;
        }
        Ok(())
    }
}

/// A field on the structured grid, `(level, lat, lon)`.
#[derive(Debug, Clone)]
pub struct InterpolatedField {
    /// Variable name
    pub name: String,
    /// Units attribute
    pub units: String,
    /// Level depths in m, positive down
    pub depth: Array1<f64>,
    /// Values `(level, lat, lon)`; NaN on dry columns
    pub values: Array3<f64>,
    /// Fallback usage per level
    pub fallback: Vec<FallbackReport>,
}

impl InterpolatedField {
    /// Number of levels.
    pub fn n_levels(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    /// Total number of fallback cells over all levels.
    pub fn total_fallback(&self) -> usize {
        self.fallback.iter().map(|r| r.fallback).sum()
    }

    /// Wet cells holding an undefined value.
    pub fn undefined_wet_cells(&self, mask: &OceanMask) -> usize {
        self.values
            .axis_iter(Axis(0))
            .map(|level| {
                level
                    .indexed_iter()
                    .filter(|&((r, c), v)| v.is_nan() && mask.is_wet(GridPoint::new(r, c)))
                    .count()
            })
            .sum()
    }

    /// Sample the field along the open boundaries, `(boundary point, level)`.
    ///
    /// Points follow descriptor order.
    pub fn sample_boundary(&self, boundaries: &OpenBoundaries) -> Array2<f64> {
        let points = boundaries.points();
        let n_levels = self.n_levels();
        Array2::from_shape_fn((points.len(), n_levels), |(b, k)| {
            let p = points[b];
            self.values[[k, p.row, p.col]]
        })
    }
}

/// Boundary-condition series, `(time, boundary point, level)`.
#[derive(Debug, Clone)]
pub struct BoundaryField {
    /// Variable name
    pub name: String,
    /// Units attribute
    pub units: String,
    /// Level depths in m, positive down
    pub depth: Array1<f64>,
    /// Values `(time, boundary point, level)`
    pub values: Array3<f64>,
}

/// Valid node set of one or more levels, with its interpolators.
struct LevelSource {
    nodes: Vec<usize>,
    primary: Box<dyn ScatteredInterpolator>,
    nearest: NearestInterpolator,
}

/// Interpolates mesh fields onto a masked target grid.
pub struct FieldInterpolator<'a> {
    grid: &'a GeodeticGrid,
    mask: &'a OceanMask,
    bathymetry: Option<&'a Array2<f64>>,
    config: InterpolationConfig,
    targets: Vec<[f64; 2]>,
}

impl<'a> FieldInterpolator<'a> {
    /// Create an interpolator for `grid` and `mask`.
    pub fn new(
        grid: &'a GeodeticGrid,
        mask: &'a OceanMask,
        config: InterpolationConfig,
    ) -> Result<Self, InterpolationError> {
        grid.check_shape("ocean mask", mask.wet())?;
        let targets = grid.x.iter().zip(grid.y.iter()).map(|(&x, &y)| [x, y]).collect();
        Ok(Self {
            grid,
            mask,
            bathymetry: None,
            config,
            targets,
        })
    }

    /// Restrict the fallback accounting to the levels each cell's seafloor
    /// reaches. `bathymetry` is positive down, in m.
    pub fn with_bathymetry(mut self, bathymetry: &'a Array2<f64>) -> Result<Self, InterpolationError> {
        self.grid.check_shape("bathymetry", bathymetry)?;
        self.bathymetry = Some(bathymetry);
        Ok(self)
    }

    /// Whether the seafloor at `(r, c)` lies at or below `depth`.
    ///
    /// Always true without a bathymetry.
    fn reaches(&self, r: usize, c: usize, depth: f64) -> bool {
        self.bathymetry.map_or(true, |b| !(b[[r, c]] < depth))
    }

    /// Settings in use.
    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    /// Full interpolation of one time-averaged field.
    ///
    /// Horizontal interpolation with fallback, mask, vertical fill, sponge.
    pub fn interpolate(
        &self,
        mesh: &UnstructuredMesh,
        field: &MeshField,
        sponge: &SpongeZone,
    ) -> Result<InterpolatedField, InterpolationError> {
        self.check_field(mesh, field)?;
        let sources = self.level_sources(mesh, field);
        let levels: Vec<(Array2<f64>, FallbackReport)> = (0..field.n_levels())
            .map(|k| self.horizontal_level(field, k, mesh.depth[k], sources[k].as_deref()))
            .collect();
        self.finish(mesh, field, levels, sponge)
    }

    /// Same as [`interpolate`](Self::interpolate), levels in parallel.
    #[cfg(feature = "parallel")]
    pub fn interpolate_parallel(
        &self,
        mesh: &UnstructuredMesh,
        field: &MeshField,
        sponge: &SpongeZone,
    ) -> Result<InterpolatedField, InterpolationError> {
        use rayon::prelude::*;

        self.check_field(mesh, field)?;
        let sources = self.level_sources(mesh, field);
        let levels: Vec<(Array2<f64>, FallbackReport)> = (0..field.n_levels())
            .into_par_iter()
            .map(|k| self.horizontal_level(field, k, mesh.depth[k], sources[k].as_deref()))
            .collect();
        self.finish(mesh, field, levels, sponge)
    }

    /// Interpolate every month of a series and sample it along the boundaries.
    pub fn boundary_series(
        &self,
        mesh: &UnstructuredMesh,
        series: &MeshTimeSeries,
        sponge: &SpongeZone,
        boundaries: &OpenBoundaries,
    ) -> Result<BoundaryField, InterpolationError> {
        let n_time = series.months.len();
        let mut values = Array3::from_elem((n_time, boundaries.n_points(), series.n_levels()), f64::NAN);
        for t in 0..n_time {
            let month = MeshField {
                name: series.name.clone(),
                units: series.units.clone(),
                values: series.values.index_axis(Axis(0), t).to_owned(),
            };
            let field = self.interpolate(mesh, &month, sponge)?;
            values.index_axis_mut(Axis(0), t).assign(&field.sample_boundary(boundaries));
            log::debug!("{} boundary values for {}", series.name, series.months[t]);
        }
        Ok(BoundaryField {
            name: series.name.clone(),
            units: series.units.clone(),
            depth: mesh.depth.clone(),
            values,
        })
    }

    fn check_field(&self, mesh: &UnstructuredMesh, field: &MeshField) -> Result<(), InterpolationError> {
        if field.values.nrows() != mesh.n_nodes() {
            return Err(InterpolationError::LengthMismatch {
                what: format!("{} nodes", field.name),
                expected: mesh.n_nodes(),
                found: field.values.nrows(),
            });
        }
        if field.n_levels() != mesh.n_levels() {
            return Err(InterpolationError::LengthMismatch {
                what: format!("{} levels", field.name),
                expected: mesh.n_levels(),
                found: field.n_levels(),
            });
        }
        Ok(())
    }

    /// One source per level, `None` where a level has no valid node.
    fn level_sources(&self, mesh: &UnstructuredMesh, field: &MeshField) -> Vec<Option<Arc<LevelSource>>> {
        let points = mesh.planar_points();
        let mut cache: HashMap<Vec<usize>, Arc<LevelSource>> = HashMap::new();
        (0..field.n_levels())
            .map(|k| {
                let nodes: Vec<usize> = field
                    .level(k)
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| !v.is_nan())
                    .map(|(i, _)| i)
                    .collect();
                if nodes.is_empty() {
                    return None;
                }
                let source = cache.entry(nodes).or_insert_with_key(|nodes| {
                    let valid: Vec<[f64; 2]> = nodes.iter().map(|&i| points[i]).collect();
                    Arc::new(LevelSource {
                        nodes: nodes.clone(),
                        primary: build_interpolator(self.config.method, &valid),
                        nearest: NearestInterpolator::new(&valid),
                    })
                });
                Some(Arc::clone(source))
            })
            .collect()
    }

    fn horizontal_level(
        &self,
        field: &MeshField,
        k: usize,
        depth: f64,
        source: Option<&LevelSource>,
    ) -> (Array2<f64>, FallbackReport) {
        let shape = self.grid.shape();
        let n_cols = shape.1;
        let mut out = Array2::from_elem(shape, f64::NAN);
        let mut report = FallbackReport {
            level: k,
            fallback: 0,
            wet: 0,
            below_seafloor: 0,
        };
        if source.is_none() {
            log::debug!("{} level {k}: no valid source nodes", field.name);
        }
        let values: Vec<f64> = source.map_or_else(Vec::new, |source| {
            let level = field.level(k);
            source.nodes.iter().map(|&i| level[i]).collect()
        });

        for (idx, &p) in self.targets.iter().enumerate() {
            let (r, c) = (idx / n_cols, idx % n_cols);
            if !self.mask.is_wet(GridPoint::new(r, c)) {
                continue;
            }
            let reaches = self.reaches(r, c, depth);
            if reaches {
                report.wet += 1;
            }
            let Some(source) = source else { continue };

            let mut v = source.primary.interpolate(&values, p);
            if v.is_nan() {
                if !reaches {
                    report.below_seafloor += 1;
                    continue;
                }
                v = source.nearest.interpolate(&values, p);
                report.fallback += 1;
            }
            out[[r, c]] = v;
        }

        (out, report)
    }

    fn finish(
        &self,
        mesh: &UnstructuredMesh,
        field: &MeshField,
        levels: Vec<(Array2<f64>, FallbackReport)>,
        sponge: &SpongeZone,
    ) -> Result<InterpolatedField, InterpolationError> {
        let (n_rows, n_cols) = self.grid.shape();
        let mut values = Array3::from_elem((levels.len(), n_rows, n_cols), f64::NAN);
        let mut fallback = Vec::with_capacity(levels.len());
        for (k, (level, report)) in levels.into_iter().enumerate() {
            values.index_axis_mut(Axis(0), k).assign(&level);
            if report.fraction() > self.config.max_fallback_fraction {
                return Err(InterpolationError::FallbackExceeded {
                    name: field.name.clone(),
                    level: report.level,
                    fallback: report.fallback,
                    wet: report.wet,
                    fraction: report.fraction(),
                    max: self.config.max_fallback_fraction,
                });
            }
            if report.fallback > 0 {
                log::warn!("{}: {report}", field.name);
            } else if report.below_seafloor > 0 {
                log::debug!("{}: {report}", field.name);
            }
            fallback.push(report);
        }

        extrapolate_vertically(&mut values, self.mask)?;
        sponge.flatten_levels(&mut values);

        let total: usize = fallback.iter().map(|r| r.fallback).sum();
        log::info!(
            "interpolated {} onto {}x{} grid, {} levels, {} fallback cells",
            field.name,
            n_rows,
            n_cols,
            fallback.len(),
            total
        );

        Ok(InterpolatedField {
            name: field.name.clone(),
            units: field.units.clone(),
            depth: mesh.depth.clone(),
            values,
            fallback,
        })
    }
}

/// Apply the mask and fill every wet column vertically, `(level, lat, lon)`.
///
/// Undefined levels take the nearest defined level of the same column; at
/// equal distance the shallower one wins. Dry columns become NaN.
///
/// # Errors
/// `EmptyWaterColumn` if a wet column has no defined level at all.
pub fn extrapolate_vertically(values: &mut Array3<f64>, mask: &OceanMask) -> Result<(), InterpolationError> {
    let (n_levels, n_rows, n_cols) = values.dim();
    if (n_rows, n_cols) != mask.shape() {
        return Err(InterpolationError::LengthMismatch {
            what: "mask columns".to_string(),
            expected: n_rows * n_cols,
            found: mask.shape().0 * mask.shape().1,
        });
    }
    if n_levels == 0 {
        return Ok(());
    }

    for r in 0..n_rows {
        for c in 0..n_cols {
            let point = GridPoint::new(r, c);
            let mut column = values.slice_mut(ndarray::s![.., r, c]);
            if !mask.is_wet(point) {
                column.fill(f64::NAN);
                continue;
            }
            let valid: Vec<usize> = (0..n_levels).filter(|&k| !column[k].is_nan()).collect();
            if valid.is_empty() {
                return Err(InterpolationError::EmptyWaterColumn { point });
            }
            for k in 0..n_levels {
                if !column[k].is_nan() {
                    continue;
                }
                // valid is sorted; min_by_key keeps the first (shallower) on ties
                let nearest = valid.iter().copied().min_by_key(|&v| v.abs_diff(k)).unwrap_or(k);
                column[k] = column[nearest];
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryConfig, SpongeConfig, build_open_boundaries, sponge_deviation};
    use crate::io::PolarStereographic;
    use crate::types::SideBoundaries;
    use approx::assert_relative_eq;
    use ndarray::{Array1, array};

    fn grid() -> GeodeticGrid {
        let lon = Array1::linspace(-20.0, -19.0, 6);
        let lat = Array1::linspace(79.0, 79.2, 5);
        GeodeticGrid::new(lon, lat, &PolarStereographic::epsg_3413()).unwrap()
    }

    /// Mesh nodes on a wider lon/lat lattice covering the grid.
    fn mesh(n_levels: usize) -> UnstructuredMesh {
        let mut lon = Vec::new();
        let mut lat = Vec::new();
        for j in 0..8 {
            for i in 0..10 {
                lon.push(-20.3 + 0.18 * i as f64);
                lat.push(78.95 + 0.04 * j as f64);
            }
        }
        let depth = Array1::from_iter((0..n_levels).map(|k| 5.0 + 10.0 * k as f64));
        UnstructuredMesh::new(
            Array1::from(lon),
            Array1::from(lat),
            depth,
            &PolarStereographic::epsg_3413(),
        )
        .unwrap()
    }

    fn closed_sponge(shape: (usize, usize)) -> SpongeZone {
        SpongeZone::new(&SpongeConfig::default().with_width(0), SideBoundaries::uniform(false), shape).unwrap()
    }

    fn plane_field(mesh: &UnstructuredMesh) -> MeshField {
        let values = Array2::from_shape_fn((mesh.n_nodes(), mesh.n_levels()), |(i, k)| {
            1e-3 * mesh.x[i] + 2e-3 * mesh.y[i] + k as f64
        });
        MeshField {
            name: "salt".into(),
            units: "psu".into(),
            values,
        }
    }

    #[test]
    fn test_linear_reproduces_plane() {
        let grid = grid();
        let mask = OceanMask::all_wet(grid.shape());
        let mesh = mesh(2);
        let field = plane_field(&mesh);
        let interp = FieldInterpolator::new(&grid, &mask, InterpolationConfig::default()).unwrap();
        let out = interp.interpolate(&mesh, &field, &closed_sponge(grid.shape())).unwrap();

        assert_eq!(out.values.dim(), (2, 5, 6));
        assert_eq!(out.total_fallback(), 0);
        for ((k, r, c), &v) in out.values.indexed_iter() {
            let expected = 1e-3 * grid.x[[r, c]] + 2e-3 * grid.y[[r, c]] + k as f64;
            assert_relative_eq!(v, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_masked_and_filled() {
        let grid = grid();
        let mut mask = OceanMask::all_wet(grid.shape());
        mask.set_wet(GridPoint::new(2, 2), false);
        let mesh = mesh(3);
        let mut field = plane_field(&mesh);
        // deepest level undefined everywhere
        field.values.column_mut(2).fill(f64::NAN);

        let interp = FieldInterpolator::new(&grid, &mask, InterpolationConfig::default()).unwrap();
        let out = interp.interpolate(&mesh, &field, &closed_sponge(grid.shape())).unwrap();

        assert!(out.values[[0, 2, 2]].is_nan());
        assert_eq!(out.undefined_wet_cells(&mask), 0);
        assert_eq!(out.values[[2, 1, 1]], out.values[[1, 1, 1]]);
        assert_eq!(out.fallback[2].wet, mask.wet_count());
    }

    #[test]
    fn test_fallback_bound() {
        let grid = grid();
        let mask = OceanMask::all_wet(grid.shape());
        let mesh = mesh(1);
        let mut field = plane_field(&mesh);
        // keep only a small patch of nodes in the south-west
        for i in 0..mesh.n_nodes() {
            if i % 10 > 3 || i / 10 > 3 {
                field.values[[i, 0]] = f64::NAN;
            }
        }
        let strict = InterpolationConfig::default().with_max_fallback_fraction(0.0);
        let interp = FieldInterpolator::new(&grid, &mask, strict).unwrap();
        let err = interp.interpolate(&mesh, &field, &closed_sponge(grid.shape())).unwrap_err();
        assert!(matches!(err, InterpolationError::FallbackExceeded { level: 0, .. }));

        let loose = InterpolationConfig::default().with_max_fallback_fraction(1.0);
        let interp = FieldInterpolator::new(&grid, &mask, loose).unwrap();
        let out = interp.interpolate(&mesh, &field, &closed_sponge(grid.shape())).unwrap();
        assert!(out.total_fallback() > 0);
        assert_eq!(out.undefined_wet_cells(&mask), 0);
    }

    #[test]
    fn test_shallow_cells_skip_deep_levels() {
        let grid = grid();
        let mask = OceanMask::all_wet(grid.shape());
        let mesh = mesh(2);
        let mut field = plane_field(&mesh);
        // level 1 (15 m) defined only north of the second node row
        for i in 0..mesh.n_nodes() {
            if i / 10 < 2 {
                field.values[[i, 1]] = f64::NAN;
            }
        }
        // southern grid row is 10 m deep, outside the hull of level 1
        let bathymetry = Array2::from_shape_fn(grid.shape(), |(r, _)| if r == 0 { 10.0 } else { 100.0 });
        let strict = InterpolationConfig::default().with_max_fallback_fraction(0.0);

        let interp = FieldInterpolator::new(&grid, &mask, strict).unwrap();
        let err = interp.interpolate(&mesh, &field, &closed_sponge(grid.shape())).unwrap_err();
        assert!(matches!(err, InterpolationError::FallbackExceeded { level: 1, fallback: 6, .. }));

        let interp = FieldInterpolator::new(&grid, &mask, strict)
            .unwrap()
            .with_bathymetry(&bathymetry)
            .unwrap();
        let out = interp.interpolate(&mesh, &field, &closed_sponge(grid.shape())).unwrap();
        let deep = out.fallback[1];
        assert_eq!((deep.fallback, deep.wet, deep.below_seafloor), (0, 24, 6));
        assert_eq!(out.fallback[0].wet, 30);
        for c in 0..6 {
            assert_eq!(out.values[[1, 0, c]], out.values[[0, 0, c]]);
        }
        assert_relative_eq!(
            out.values[[1, 2, 3]],
            1e-3 * grid.x[[2, 3]] + 2e-3 * grid.y[[2, 3]] + 1.0,
            epsilon = 1e-6
        );

        let wrong = Array2::zeros((2, 2));
        assert!(FieldInterpolator::new(&grid, &mask, strict).unwrap().with_bathymetry(&wrong).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let grid = grid();
        let mask = OceanMask::all_wet(grid.shape());
        let mesh = mesh(2);
        let field = MeshField {
            name: "temp".into(),
            units: "degC".into(),
            values: Array2::zeros((3, 2)),
        };
        let interp = FieldInterpolator::new(&grid, &mask, InterpolationConfig::default()).unwrap();
        let err = interp.interpolate(&mesh, &field, &closed_sponge(grid.shape())).unwrap_err();
        assert!(matches!(err, InterpolationError::LengthMismatch { .. }));
    }

    #[test]
    fn test_vertical_fill_nearest_level() {
        let mask = OceanMask::all_wet((1, 1));
        let mut values = Array3::from_elem((11, 1, 1), f64::NAN);
        for k in 3..=7 {
            values[[k, 0, 0]] = k as f64;
        }
        extrapolate_vertically(&mut values, &mask).unwrap();
        for k in 0..=2 {
            assert_eq!(values[[k, 0, 0]], 3.0);
        }
        for k in 8..=10 {
            assert_eq!(values[[k, 0, 0]], 7.0);
        }
    }

    #[test]
    fn test_vertical_fill_interior_gap_prefers_shallower() {
        let mask = OceanMask::all_wet((1, 1));
        let mut values = Array3::from_shape_vec((5, 1, 1), vec![1.0, f64::NAN, f64::NAN, f64::NAN, 5.0]).unwrap();
        extrapolate_vertically(&mut values, &mask).unwrap();
        assert_eq!(values.iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0, 1.0, 5.0, 5.0]);
    }

    #[test]
    fn test_empty_water_column() {
        let mask = OceanMask::from_array(array![[true, false]]);
        let mut values = Array3::from_elem((2, 1, 2), f64::NAN);
        let err = extrapolate_vertically(&mut values, &mask).unwrap_err();
        assert!(matches!(err, InterpolationError::EmptyWaterColumn { point } if point == GridPoint::new(0, 0)));
    }

    #[test]
    fn test_sponge_and_boundary_sampling() {
        let grid = grid();
        let mask = OceanMask::all_wet(grid.shape());
        let mesh = mesh(2);
        let field = plane_field(&mesh);
        let open = BoundaryConfig::default().open;
        let sponge = SpongeZone::new(&SpongeConfig::default().with_width(1), open, grid.shape()).unwrap();
        let interp = FieldInterpolator::new(&grid, &mask, InterpolationConfig::default()).unwrap();
        let out = interp.interpolate(&mesh, &field, &sponge).unwrap();

        for level in out.values.axis_iter(Axis(0)) {
            assert_eq!(sponge_deviation(&sponge, &level.to_owned()), 0.0);
        }

        let boundaries = build_open_boundaries(&mask, &BoundaryConfig::default());
        let sampled = out.sample_boundary(&boundaries);
        assert_eq!(sampled.dim(), (boundaries.n_points(), 2));
        let first = boundaries.points()[0];
        assert_eq!(sampled[[0, 1]], out.values[[1, first.row, first.col]]);
    }

    #[test]
    fn test_boundary_series_shape() {
        let grid = grid();
        let mask = OceanMask::all_wet(grid.shape());
        let mesh = mesh(2);
        let field = plane_field(&mesh);
        let months = vec![
            crate::types::YearMonth::new(2015, 12).unwrap(),
            crate::types::YearMonth::new(2016, 1).unwrap(),
        ];
        let values = ndarray::stack(Axis(0), &[field.values.view(), field.values.view()]).unwrap();
        let series = MeshTimeSeries::new("salt", "psu", months, values).unwrap();
        let boundaries = build_open_boundaries(&mask, &BoundaryConfig::default());
        let interp = FieldInterpolator::new(&grid, &mask, InterpolationConfig::default()).unwrap();
        let bc = interp
            .boundary_series(&mesh, &series, &closed_sponge(grid.shape()), &boundaries)
            .unwrap();
        assert_eq!(bc.values.dim(), (2, boundaries.n_points(), 2));
        assert_eq!(bc.values.index_axis(Axis(0), 0), bc.values.index_axis(Axis(0), 1));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let grid = grid();
        let mask = OceanMask::all_wet(grid.shape());
        let mesh = mesh(4);
        let field = plane_field(&mesh);
        let interp = FieldInterpolator::new(&grid, &mask, InterpolationConfig::default()).unwrap();
        let sponge = closed_sponge(grid.shape());
        let a = interp.interpolate(&mesh, &field, &sponge).unwrap();
        let b = interp.interpolate_parallel(&mesh, &field, &sponge).unwrap();
        assert_eq!(a.values, b.values);
    }
}

//! Unstructured ocean-model output: node coordinates and monthly series.

use ndarray::{Array1, Array3, Axis, concatenate};

use super::{DomainConfig, LoaderError};
use crate::io::{CoordinateProjection, ManifestEntry, TimeSeriesManifest};
use crate::mesh::{GridError, MeshTimeSeries, UnstructuredMesh, mask_salinity_sentinels};
use crate::types::YearMonth;

/// Mesh output as read from the source files.
#[derive(Debug, Clone)]
pub struct MeshSource {
    /// Node longitudes in degrees
    pub lon: Array1<f64>,
    /// Node latitudes in degrees
    pub lat: Array1<f64>,
    /// Level depths in m, positive down
    pub depth: Array1<f64>,
    /// Monthly salinity `(time, node, level)`
    pub salinity: MeshTimeSeries,
    /// Monthly temperature `(time, node, level)`
    pub temperature: MeshTimeSeries,
}

/// Cropped mesh with aligned, sentinel-masked series.
#[derive(Debug, Clone)]
pub struct LoadedMesh {
    /// Nodes inside the domain window
    pub mesh: UnstructuredMesh,
    /// Salinity on the kept nodes
    pub salinity: MeshTimeSeries,
    /// Temperature on the kept nodes
    pub temperature: MeshTimeSeries,
    /// Node-levels invalidated by the salinity sentinel
    pub sentinels: usize,
}

/// Trim two companion series to a common level count.
///
/// A difference of one level is accepted and the extra deepest level is
/// dropped. Returns the common count.
///
/// # Errors
/// `LevelCountMismatch` if the counts differ by more than one.
pub fn align_level_counts(a: &mut MeshTimeSeries, b: &mut MeshTimeSeries) -> Result<usize, LoaderError> {
    let (na, nb) = (a.n_levels(), b.n_levels());
    if na.abs_diff(nb) > 1 {
        return Err(LoaderError::LevelCountMismatch {
            first: a.name.clone(),
            first_levels: na,
            second: b.name.clone(),
            second_levels: nb,
        });
    }
    let n = na.min(nb);
    if na != nb {
        log::warn!(
            "{} has {} levels, {} has {}; dropping the deepest level",
            a.name,
            na,
            b.name,
            nb
        );
        a.truncate_levels(n);
        b.truncate_levels(n);
    }
    Ok(n)
}

/// Read the files of a manifest and join them along time.
///
/// `read` returns the months and `(time, node, level)` values of one file;
/// the months must match the entry's declaration.
pub fn concatenate_series<F>(
    name: &str,
    units: &str,
    manifest: &TimeSeriesManifest,
    mut read: F,
) -> Result<MeshTimeSeries, LoaderError>
where
    F: FnMut(&ManifestEntry) -> Result<(Vec<YearMonth>, Array3<f64>), LoaderError>,
{
    let mut months = Vec::new();
    let mut parts: Vec<Array3<f64>> = Vec::new();
    for entry in manifest.entries() {
        let (file_months, values) = read(entry)?;
        entry.check_records(&file_months)?;
        if let Some(first) = parts.first() {
            let expected = [first.len_of(Axis(1)), first.len_of(Axis(2))];
            let found = [values.len_of(Axis(1)), values.len_of(Axis(2))];
            if expected != found {
                return Err(LoaderError::ShapeMismatch {
                    what: format!("{name} in {}", entry.file.display()),
                    expected: expected.to_vec(),
                    found: found.to_vec(),
                });
            }
        }
        log::debug!("{name}: {} months from {}", file_months.len(), entry.file.display());
        months.extend(file_months);
        parts.push(values);
    }
    let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
    let values = concatenate(Axis(0), &views).map_err(|_| LoaderError::ShapeMismatch {
        what: format!("{name} series"),
        expected: Vec::new(),
        found: Vec::new(),
    })?;
    Ok(MeshTimeSeries::new(name, units, months, values)?)
}

impl MeshSource {
    /// Align, mask and crop the mesh output.
    ///
    /// # Errors
    /// - `Grid` if coordinate or node counts disagree
    /// - `ShapeMismatch` if the two series cover different months
    /// - `LevelCountMismatch` if level counts differ by more than one
    /// - `NoNodes` if no node lies inside the domain window
    pub fn load<P: CoordinateProjection + ?Sized>(
        self,
        domain: &DomainConfig,
        projection: &P,
    ) -> Result<LoadedMesh, LoaderError> {
        let MeshSource {
            lon,
            lat,
            mut depth,
            mut salinity,
            mut temperature,
        } = self;

        for series in [&salinity, &temperature] {
            if series.n_nodes() != lon.len() {
                return Err(GridError::LengthMismatch {
                    what: format!("{} nodes", series.name),
                    expected: lon.len(),
                    found: series.n_nodes(),
                }
                .into());
            }
        }
        if salinity.months != temperature.months {
            return Err(LoaderError::ShapeMismatch {
                what: format!("{} time axis", temperature.name),
                expected: vec![salinity.months.len()],
                found: vec![temperature.months.len()],
            });
        }

        let n_levels = align_level_counts(&mut salinity, &mut temperature)?;
        if depth.len() < n_levels {
            return Err(GridError::LengthMismatch {
                what: "level depths".to_string(),
                expected: n_levels,
                found: depth.len(),
            }
            .into());
        }
        depth = depth.slice(ndarray::s![..n_levels]).to_owned();

        let sentinels = mask_salinity_sentinels(&mut salinity, &mut [&mut temperature]);
        if sentinels > 0 {
            log::info!("{sentinels} salinity sentinel node-levels masked");
        }

        let mesh = UnstructuredMesh::new(lon, lat, depth, projection)?;
        let window = domain.mesh_window();
        let nodes = mesh.nodes_within(&window);
        if nodes.is_empty() {
            return Err(LoaderError::NoNodes { bbox: window });
        }
        log::info!(
            "mesh cropped to {} of {} nodes, {} levels, {} months",
            nodes.len(),
            mesh.n_nodes(),
            n_levels,
            salinity.months.len()
        );
        Ok(LoadedMesh {
            mesh: mesh.select_nodes(&nodes),
            salinity: salinity.select_nodes(&nodes),
            temperature: temperature.select_nodes(&nodes),
            sentinels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{GeoBoundingBox, ManifestError, PolarStereographic};
    use ndarray::array;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn series(name: &str, n_levels: usize, fill: f64) -> MeshTimeSeries {
        MeshTimeSeries::new(
            name,
            "",
            vec![ym(2015, 1), ym(2015, 2)],
            Array3::from_elem((2, 3, n_levels), fill),
        )
        .unwrap()
    }

    fn source() -> MeshSource {
        MeshSource {
            lon: array![-20.0, -19.0, 10.0],
            lat: array![79.5, 79.6, 60.0],
            depth: array![5.0, 15.0, 25.0, 35.0],
            salinity: series("salt", 4, 34.0),
            temperature: series("temp", 3, 1.0),
        }
    }

    fn domain() -> DomainConfig {
        DomainConfig::default().with_bbox(GeoBoundingBox::new(-21.0, 79.0, -18.0, 80.0))
    }

    #[test]
    fn test_load_aligns_and_crops() {
        let mut src = source();
        src.salinity.values[[1, 0, 0]] = 0.0;
        let loaded = src.load(&domain(), &PolarStereographic::epsg_3413()).unwrap();
        assert_eq!(loaded.mesh.n_nodes(), 2);
        assert_eq!(loaded.mesh.n_levels(), 3);
        assert_eq!(loaded.salinity.values.dim(), (2, 2, 3));
        assert_eq!(loaded.sentinels, 1);
        assert!(loaded.temperature.values[[1, 0, 0]].is_nan());
        assert_eq!(loaded.temperature.values[[0, 0, 0]], 1.0);
    }

    #[test]
    fn test_level_count_mismatch() {
        let mut a = series("salt", 5, 34.0);
        let mut b = series("temp", 3, 1.0);
        let err = align_level_counts(&mut a, &mut b).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::LevelCountMismatch {
                first_levels: 5,
                second_levels: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_no_nodes() {
        let far = DomainConfig::default()
            .with_bbox(GeoBoundingBox::new(100.0, 10.0, 101.0, 11.0))
            .with_mesh_margin(0.0);
        let err = source().load(&far, &PolarStereographic::epsg_3413()).unwrap_err();
        assert!(matches!(err, LoaderError::NoNodes { .. }));
    }

    #[test]
    fn test_concatenate_series() {
        let manifest = TimeSeriesManifest::new(vec![
            ManifestEntry::new("a.nc", ym(2015, 12), ym(2015, 12)),
            ManifestEntry::new("b.nc", ym(2016, 1), ym(2016, 2)),
        ])
        .unwrap();
        let series = concatenate_series("salt", "psu", &manifest, |entry| {
            let months = entry.months();
            let n = months.len();
            Ok((months, Array3::from_elem((n, 4, 2), n as f64)))
        })
        .unwrap();
        assert_eq!(series.months, vec![ym(2015, 12), ym(2016, 1), ym(2016, 2)]);
        assert_eq!(series.values.dim(), (3, 4, 2));
        assert_eq!(series.values[[0, 0, 0]], 1.0);
        assert_eq!(series.values[[2, 0, 0]], 2.0);
    }

    #[test]
    fn test_concatenate_checks_records() {
        let manifest = TimeSeriesManifest::new(vec![ManifestEntry::new("a.nc", ym(2015, 1), ym(2015, 3))]).unwrap();
        let err = concatenate_series("salt", "psu", &manifest, |_| {
            Ok((vec![ym(2015, 1)], Array3::zeros((1, 4, 2))))
        })
        .unwrap_err();
        assert!(matches!(err, LoaderError::Manifest(ManifestError::RecordMismatch { .. })));
    }
}

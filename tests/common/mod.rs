//! Synthetic fjord shared by the integration tests.
#![allow(dead_code)]

use fjord_setup::{
    BoundaryConfig, CoordinateProjection, DomainConfig, GeoBoundingBox, IceThicknessSource, MeshSource,
    MeshTimeSeries, PipelineConfig, PolarStereographic, SideBoundaries, SmoothingConfig, TopographySource,
    YearMonth,
};
use ndarray::{Array1, Array2, Array3};

pub const N_LON: usize = 41;
pub const N_LAT: usize = 61;
pub const N_LEVELS: usize = 11;

/// Rows of the source grid holding the fjord.
pub fn wet_row(r: usize) -> bool {
    (15..45).contains(&r)
}

/// Fjord running west to east between two land strips, with a floating ice
/// tongue in the western columns.
pub fn topography_source() -> TopographySource {
    let shape = (N_LAT, N_LON);
    TopographySource {
        lon: Array1::linspace(-21.0, -17.0, N_LON),
        lat: Array1::linspace(79.0, 80.0, N_LAT),
        bedrock: Array2::from_shape_fn(shape, |(r, c)| if wet_row(r) { -300.0 - c as f64 } else { 100.0 }),
        ice_base: Array2::from_shape_fn(shape, |(r, c)| match (wet_row(r), c < 12) {
            (true, true) => -80.0,
            (true, false) => 0.0,
            (false, _) => 100.0,
        }),
        surface_type: Array2::from_shape_fn(shape, |(r, c)| match (wet_row(r), c < 12) {
            (true, true) => 3,
            (true, false) => 0,
            (false, _) => 2,
        }),
    }
}

pub fn ice_thickness_source() -> IceThicknessSource {
    IceThicknessSource {
        x: Array1::linspace(300_000.0, 600_000.0, 61),
        y: Array1::linspace(-900_000.0, -1_200_000.0, 61),
        thickness: Array2::from_elem((61, 61), 90.0),
        surface_type: Array2::from_elem((61, 61), 3),
        projection: PolarStereographic::epsg_3413().descriptor(),
    }
}

/// Fjord open to the east only.
pub fn config() -> PipelineConfig {
    PipelineConfig::default()
        .with_domain(DomainConfig::default().with_bbox(GeoBoundingBox::new(-21.0, 79.0, -17.0, 80.0)))
        .with_boundary(BoundaryConfig::default().with_open(SideBoundaries::new(false, false, true, false)))
        .with_smoothing(SmoothingConfig { pm_i: 1, pm_j: 1 })
}

pub fn months() -> Vec<YearMonth> {
    vec![YearMonth::new(2016, 1).unwrap(), YearMonth::new(2016, 2).unwrap()]
}

/// Salinity linear in planar x.
pub fn salinity_at(x: f64, level: usize) -> f64 {
    34.0 + 1e-6 * x + 0.01 * level as f64
}

/// Mesh lattice enclosing the domain.
///
/// Salinity is linear in planar x at every level; temperature equals the
/// level index and is defined on levels 3..=7 only.
pub fn mesh_source() -> MeshSource {
    let projection = PolarStereographic::epsg_3413();
    let (mut lon, mut lat) = (Vec::new(), Vec::new());
    for i in 0..17 {
        for j in 0..13 {
            lon.push(-21.5 + 0.3 * i as f64);
            lat.push(78.8 + 0.12 * j as f64);
        }
    }
    let n_nodes = lon.len();
    let (x, _) = projection.to_planar_points(&lon, &lat);

    let salinity = Array3::from_shape_fn((2, n_nodes, N_LEVELS), |(_, n, k)| salinity_at(x[n], k));
    let temperature = Array3::from_shape_fn((2, n_nodes, N_LEVELS), |(_, _, k)| {
        if (3..=7).contains(&k) { k as f64 } else { f64::NAN }
    });
    MeshSource {
        lon: Array1::from(lon),
        lat: Array1::from(lat),
        depth: Array1::linspace(5.0, 105.0, N_LEVELS),
        salinity: MeshTimeSeries::new("salt", "psu", months(), salinity).unwrap(),
        temperature: MeshTimeSeries::new("temp", "degC", months(), temperature).unwrap(),
    }
}

/// Source rows of the deep trough along the fjord axis.
pub fn trough_row(r: usize) -> bool {
    (27..33).contains(&r)
}

/// Same fjord with a 90 m shelf and a 300 m trough in source rows 27..33
/// (coarse rows 9 and 10).
pub fn trough_topography_source() -> TopographySource {
    let mut source = topography_source();
    for ((r, c), bed) in source.bedrock.indexed_iter_mut() {
        if wet_row(r) && !trough_row(r) {
            *bed = -90.0;
        } else if trough_row(r) {
            *bed = -300.0 - c as f64;
        }
    }
    source
}

/// Mesh whose two deepest salinity levels are defined only over the trough,
/// at node latitudes 79.40, 79.52 and 79.64.
pub fn trough_mesh_source() -> MeshSource {
    let mut source = mesh_source();
    let mut values = source.salinity.values.clone();
    for (n, &lat) in source.lat.iter().enumerate() {
        if lat < 79.35 || lat > 79.7 {
            for k in N_LEVELS - 2..N_LEVELS {
                values.slice_mut(ndarray::s![.., n, k]).fill(f64::NAN);
            }
        }
    }
    source.salinity = MeshTimeSeries::new("salt", "psu", months(), values).unwrap();
    source
}

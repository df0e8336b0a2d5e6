//! Initial and boundary fields interpolated from a synthetic mesh.

mod common;

use approx::assert_relative_eq;
use fjord_setup::interpolation::InterpolationError;
use fjord_setup::{
    FieldInterpolator, GridPoint, InterpolationConfig, MeshField, OceanMask, PipelineError, StratificationConfig,
    TopographyProducts, build_boundary_conditions, build_initial_conditions, build_topography,
    extrapolate_vertically,
};
use ndarray::{Array2, Array3};

fn products() -> TopographyProducts {
    build_topography(
        common::topography_source(),
        common::ice_thickness_source(),
        &common::config(),
    )
    .unwrap()
}

fn loaded_mesh() -> fjord_setup::LoadedMesh {
    let config = common::config();
    common::mesh_source()
        .load(&config.domain, &config.projection.projection())
        .unwrap()
}

#[test]
fn initial_conditions_reproduce_linear_field() {
    let products = products();
    let mesh = loaded_mesh();
    let fields = build_initial_conditions(&products, &mesh, &common::config()).unwrap();
    assert_eq!(fields.len(), 2);

    let salt = &fields[0];
    let dataset = &products.dataset;
    assert_eq!(salt.name, "salt");
    assert_eq!(salt.values.dim(), (common::N_LEVELS, 20, common::N_LON));
    assert_eq!(salt.total_fallback(), 0);

    for row in 5..15 {
        for col in 0..30 {
            let x = dataset.grid.x[[row, col]];
            for level in [0, 5, 10] {
                assert_relative_eq!(
                    salt.values[[level, row, col]],
                    common::salinity_at(x, level),
                    epsilon = 1e-9
                );
            }
        }
    }
    // dry cells stay undefined
    assert!(salt.values[[0, 0, 0]].is_nan());
}

#[test]
fn wet_columns_are_fully_defined() {
    let products = products();
    let fields = build_initial_conditions(&products, &loaded_mesh(), &common::config()).unwrap();
    for field in &fields {
        assert_eq!(field.undefined_wet_cells(&products.dataset.mask), 0, "{}", field.name);
    }
    assert!(fjord_setup::pipeline::undefined_wet_cells(&products, &fields).is_empty());
}

#[test]
fn valid_levels_three_to_seven_fill_the_column() {
    let products = products();
    let fields = build_initial_conditions(&products, &loaded_mesh(), &common::config()).unwrap();
    let temp = &fields[1];
    assert_eq!(temp.name, "temp");

    let p = GridPoint::new(10, 20);
    assert!(products.dataset.mask.is_wet(p));
    for level in 0..=2 {
        assert_relative_eq!(temp.values[[level, p.row, p.col]], 3.0, epsilon = 1e-12);
    }
    for level in 3..=7 {
        assert_relative_eq!(temp.values[[level, p.row, p.col]], level as f64, epsilon = 1e-12);
    }
    for level in 8..=10 {
        assert_relative_eq!(temp.values[[level, p.row, p.col]], 7.0, epsilon = 1e-12);
    }
}

#[test]
fn vertical_fill_on_plain_arrays() {
    let mask = OceanMask::from_array(Array2::from_shape_fn((2, 3), |(r, c)| !(r == 1 && c == 2)));
    let mut values = Array3::from_shape_fn((11, 2, 3), |(k, _, _)| {
        if (3..=7).contains(&k) { k as f64 } else { f64::NAN }
    });
    extrapolate_vertically(&mut values, &mask).unwrap();
    for k in 0..11 {
        let expected = (k as f64).clamp(3.0, 7.0);
        assert_eq!(values[[k, 0, 0]], expected);
    }
    assert!(values[[5, 1, 2]].is_nan());

    let mut empty = Array3::from_elem((4, 2, 3), f64::NAN);
    let err = extrapolate_vertically(&mut empty, &mask).unwrap_err();
    assert!(matches!(err, InterpolationError::EmptyWaterColumn { .. }));
}

#[test]
fn boundary_conditions_follow_the_segments() {
    let products = products();
    let mesh = loaded_mesh();
    let (months, fields) = build_boundary_conditions(&products, &mesh, &common::config()).unwrap();
    assert_eq!(months, common::months());
    assert_eq!(fields.len(), 2);

    let points = products.boundaries.points();
    let salt = &fields[0];
    assert_eq!(salt.values.dim(), (2, points.len(), common::N_LEVELS));
    assert!(salt.values.iter().all(|v| v.is_finite()));

    // boundary cells lie in the sponge and copy the innermost interior column
    let dataset = &products.dataset;
    let inner_col = dataset.grid.n_lon() - 5;
    for (i, p) in points.iter().enumerate() {
        let x = dataset.grid.x[[p.row, inner_col]];
        assert_relative_eq!(salt.values[[1, i, 4]], common::salinity_at(x, 4), epsilon = 1e-9);
    }
}

#[test]
fn stratification_gives_uniform_fields() {
    let products = products();
    let config = common::config().with_stratification(
        StratificationConfig::default()
            .with_level(0.0, 30.0, -1.0)
            .with_level(-105.0, 34.0, 2.0),
    );
    let fields = build_initial_conditions(&products, &loaded_mesh(), &config).unwrap();
    let salt = &fields[0];
    let p = GridPoint::new(8, 10);
    // depth 5 m is 5/105 of the way down
    assert_relative_eq!(salt.values[[0, p.row, p.col]], 30.0 + 4.0 * 5.0 / 105.0, epsilon = 1e-12);
    assert_relative_eq!(salt.values[[10, p.row, p.col]], 34.0, epsilon = 1e-12);
    assert!(salt.values[[0, 0, 0]].is_nan());
}

#[test]
fn deep_levels_defined_only_in_the_trough() {
    let config = common::config();
    let products = build_topography(
        common::trough_topography_source(),
        common::ice_thickness_source(),
        &config,
    )
    .unwrap();
    let dataset = &products.dataset;
    assert!(dataset.bathymetry[[6, 20]] < 95.0);
    assert!(dataset.bathymetry[[9, 20]] > 105.0);

    let mesh = common::trough_mesh_source()
        .load(&config.domain, &config.projection.projection())
        .unwrap();
    let fields = build_initial_conditions(&products, &mesh, &config).unwrap();
    let salt = &fields[0];
    assert_eq!(salt.total_fallback(), 0);
    assert_eq!(salt.undefined_wet_cells(&dataset.mask), 0);

    // coarse rows 8..12 reach 95 m after smoothing
    let deep = salt.fallback[9];
    assert_eq!(deep.wet, 4 * common::N_LON);
    assert!(deep.below_seafloor > 0);
    assert_eq!(salt.fallback[8].below_seafloor, 0);

    for col in 0..30 {
        let x = dataset.grid.x[[9, col]];
        assert_relative_eq!(salt.values[[10, 9, col]], common::salinity_at(x, 10), epsilon = 1e-9);
        // the shelf takes its deepest reached level
        let x = dataset.grid.x[[6, col]];
        assert_relative_eq!(salt.values[[10, 6, col]], common::salinity_at(x, 8), epsilon = 1e-9);
    }

    let (_, boundary) = build_boundary_conditions(&products, &mesh, &config).unwrap();
    assert!(boundary[0].values.iter().all(|v| v.is_finite()));
}

#[test]
fn fallback_bound_is_enforced() {
    let products = products();
    let dataset = &products.dataset;
    let mesh = loaded_mesh();

    // keep only nodes west of the fjord centre so most wet cells fall outside the hull
    let nodes: Vec<usize> = (0..mesh.mesh.n_nodes()).filter(|&n| mesh.mesh.lon[n] < -19.5).collect();
    let sub = mesh.mesh.select_nodes(&nodes);
    let field = MeshField {
        name: "salt".into(),
        units: "psu".into(),
        values: Array2::from_shape_fn((nodes.len(), sub.n_levels()), |(n, k)| {
            common::salinity_at(sub.x[n], k)
        }),
    };

    let interpolator = FieldInterpolator::new(&dataset.grid, &dataset.mask, InterpolationConfig::default()).unwrap();
    let err = interpolator.interpolate(&sub, &field, &products.sponge).unwrap_err();
    assert!(matches!(err, InterpolationError::FallbackExceeded { level: 0, .. }));

    let lenient = InterpolationConfig::default().with_max_fallback_fraction(1.0);
    let interpolator = FieldInterpolator::new(&dataset.grid, &dataset.mask, lenient).unwrap();
    let filled = interpolator.interpolate(&sub, &field, &products.sponge).unwrap();
    assert!(filled.total_fallback() > 0);
    assert_eq!(filled.undefined_wet_cells(&dataset.mask), 0);

    let err: PipelineError = InterpolationError::EmptyWaterColumn {
        point: GridPoint::new(0, 0),
    }
    .into();
    assert!(err.to_string().starts_with("field interpolation: "));
}

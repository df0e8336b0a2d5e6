//! Stage orchestration.
//!
//! Each step consumes an immutable snapshot and returns the next one:
//!
//! ```text
//! TopographySource ─ load/crop ─ box filter ─┐
//! IceThicknessSource ─ load ─ regrid ────────┴─ reconcile mask ─ TopographyDataset
//!     ─ smooth ─ sponge ─ grounding line ─ open boundaries        (TopographyProducts)
//!
//! MeshSource ─ load ─ day-weighted mean ─ interpolate ─ initial conditions
//!                   └ monthly series    ─ interpolate ─ boundary conditions
//! ```

use std::fs;

use ndarray::Zip;

use crate::boundary::{
    GroundingLine, OpenBoundaries, SpongeZone, build_open_boundaries, locate_grounding_line,
};
use crate::config::{ModelPaths, PipelineConfig};
use crate::error::PipelineError;
use crate::interpolation::{BoundaryField, FieldInterpolator, InterpolatedField};
use crate::io::{
    ProfileVariable, StratificationProfile, write_bdyinfo_file, write_grounding_line_file,
};
use crate::loader::{IceThicknessSource, LoadedMesh, TopographySource};
use crate::mask::{MaskError, MaskStatistics, ReferenceCheck, reconcile_mask};
use crate::mesh::{MeshField, TopographyDataset, UnstructuredMesh};
use crate::resample::BoxFilter;
use crate::smoothing::{SmoothingReport, smooth_topography};
use crate::types::{GridPoint, YearMonth};

/// Everything derived from the topography sources.
#[derive(Debug, Clone)]
pub struct TopographyProducts {
    /// Final model topography
    pub dataset: TopographyDataset,
    /// Load-time agreement with the reference classification
    pub reference: ReferenceCheck,
    /// Mask before overrides and connectivity filtering
    pub derived_mask: MaskStatistics,
    /// Smoothing summary
    pub smoothing: SmoothingReport,
    /// Sponge bands of the model grid
    pub sponge: SpongeZone,
    /// Discharge cells
    pub grounding_line: GroundingLine,
    /// Open-boundary segments
    pub boundaries: OpenBoundaries,
}

/// Build the model topography, grounding line and open boundaries.
pub fn build_topography(
    source: TopographySource,
    ice: IceThicknessSource,
    config: &PipelineConfig,
) -> Result<TopographyProducts, PipelineError> {
    config.validate()?;
    let projection = config.projection.projection();
    let open = config.boundary.open;

    let loaded = source.load(&config.domain, &config.mask, &projection)?;
    let filter = BoxFilter::new(config.resample.factor)?;
    let coarse = filter.apply_topography(&loaded.topography, config.resample.axis, &projection)?;

    let raster = ice.load(&projection)?;
    let thickness = raster.regrid(&coarse.grid, config.ice_regrid);

    let reconciliation = reconcile_mask(&coarse, &open, &config.mask)?;
    let dataset = TopographyDataset::from_elevations(&coarse, reconciliation.mask, &thickness)?
        .with_depths(config.mask.patched_depths())
        .with_attribute("box_filter_factor", config.resample.factor.to_string())
        .with_attribute("box_filter_axis", config.resample.axis.to_string())
        .with_attribute("min_depth", config.mask.min_depth.to_string())
        .with_attribute("mask_overrides", reconciliation.patched.to_string())
        .with_attribute("projection", crate::io::CoordinateProjection::descriptor(&projection));

    let (smoothed, smoothing) = smooth_topography(&dataset, &config.smoothing, config.mask.min_depth, &open)?;
    let smoothed = smoothed
        .with_attribute("smoothing_pm_i", config.smoothing.pm_i.to_string())
        .with_attribute("smoothing_pm_j", config.smoothing.pm_j.to_string());

    let sponge = SpongeZone::new(&config.sponge, open, smoothed.grid.shape())?;
    let dataset = reconnect(sponge.flatten_topography(&smoothed), config)?
        .with_attribute("sponge_width", config.sponge.width.to_string());

    let violations = dataset.violations();
    if let Some(first) = violations.first() {
        return Err(PipelineError::InvalidTopography {
            count: violations.len(),
            first: format!("{first:?}"),
        });
    }

    let grounding_line = locate_grounding_line(&dataset.grid, &dataset.mask, &config.grounding_line)?;
    let boundaries = build_open_boundaries(&dataset.mask, &config.boundary);
    log::info!(
        "topography ready: {:?} grid, {} wet cells, mean water column {:.1} m, {} grounding-line points, {} boundary points",
        dataset.grid.shape(),
        dataset.mask.wet_count(),
        dataset.mean_water_column(),
        grounding_line.len(),
        boundaries.n_points()
    );

    Ok(TopographyProducts {
        dataset,
        reference: loaded.reference,
        derived_mask: reconciliation.derived,
        smoothing,
        sponge,
        grounding_line,
        boundaries,
    })
}

/// Drop wet cells that the sponge cut off from the open sides.
fn reconnect(mut dataset: TopographyDataset, config: &PipelineConfig) -> Result<TopographyDataset, PipelineError> {
    let (mask, removed) = dataset.mask.keep_connected_to(&config.boundary.open);
    if mask.wet_count() == 0 {
        return Err(MaskError::NoOpenWater.into());
    }
    if removed > 0 {
        log::info!("{removed} wet cells disconnected by the sponge zone");
        Zip::from(&mut dataset.bathymetry)
            .and(&mut dataset.ice_draft)
            .and(mask.wet())
            .for_each(|depth, draft, &wet| {
                if !wet {
                    *depth = f64::NAN;
                    *draft = 0.0;
                }
            });
    }
    dataset.mask = mask;
    Ok(dataset)
}

fn interpolate_field(
    interpolator: &FieldInterpolator<'_>,
    mesh: &UnstructuredMesh,
    field: &MeshField,
    sponge: &SpongeZone,
) -> Result<InterpolatedField, PipelineError> {
    #[cfg(feature = "parallel")]
    let field = interpolator.interpolate_parallel(mesh, field, sponge)?;
    #[cfg(not(feature = "parallel"))]
    let field = interpolator.interpolate(mesh, field, sponge)?;
    Ok(field)
}

/// Initial salinity and temperature on the model grid.
///
/// With a stratification configured the fields are horizontally uniform at
/// the mesh level depths; otherwise the day-weighted mean of the mesh
/// series is interpolated.
pub fn build_initial_conditions(
    products: &TopographyProducts,
    mesh: &LoadedMesh,
    config: &PipelineConfig,
) -> Result<Vec<InterpolatedField>, PipelineError> {
    let dataset = &products.dataset;
    if let Some(stratification) = &config.stratification {
        let profile = StratificationProfile::new(stratification)?;
        let depth = mesh.mesh.depth.clone();
        let fields: Vec<InterpolatedField> = [
            (ProfileVariable::Salinity, mesh.salinity.name.as_str(), mesh.salinity.units.as_str()),
            (ProfileVariable::Temperature, mesh.temperature.name.as_str(), mesh.temperature.units.as_str()),
        ]
        .into_iter()
        .map(|(variable, name, units)| {
            let mut values = profile.uniform_field(variable, &depth, &dataset.mask);
            products.sponge.flatten_levels(&mut values);
            InterpolatedField {
                name: name.to_string(),
                units: units.to_string(),
                depth: depth.clone(),
                values,
                fallback: Vec::new(),
            }
        })
        .collect();
        log::info!("initial conditions from a {}-level stratification", profile.levels().len());
        return Ok(fields);
    }

    let interpolator = FieldInterpolator::new(&dataset.grid, &dataset.mask, config.interpolation)?
        .with_bathymetry(&dataset.bathymetry)?;
    [&mesh.salinity, &mesh.temperature]
        .into_iter()
        .map(|series| interpolate_field(&interpolator, &mesh.mesh, &series.day_weighted_mean(), &products.sponge))
        .collect()
}

/// Monthly salinity and temperature along the open boundaries.
pub fn build_boundary_conditions(
    products: &TopographyProducts,
    mesh: &LoadedMesh,
    config: &PipelineConfig,
) -> Result<(Vec<YearMonth>, Vec<BoundaryField>), PipelineError> {
    let dataset = &products.dataset;
    let interpolator = FieldInterpolator::new(&dataset.grid, &dataset.mask, config.interpolation)?
        .with_bathymetry(&dataset.bathymetry)?;
    let fields = [&mesh.salinity, &mesh.temperature]
        .into_iter()
        .map(|series| interpolator.boundary_series(&mesh.mesh, series, &products.sponge, &products.boundaries))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((mesh.salinity.months.clone(), fields))
}

/// Write the text outputs: boundary descriptor, discharge points and, when
/// configured, the stratification profiles.
pub fn write_text_outputs(
    products: &TopographyProducts,
    config: &PipelineConfig,
    paths: &ModelPaths,
) -> Result<(), PipelineError> {
    fs::create_dir_all(&paths.output_dir)?;
    write_bdyinfo_file(&paths.bdyinfo(), &products.boundaries)?;
    write_grounding_line_file(&paths.discharge(), &products.grounding_line)?;
    if let Some(stratification) = &config.stratification {
        StratificationProfile::new(stratification)?.write_files(&paths.salt_profile(), &paths.temp_profile())?;
    }
    log::info!("text outputs written to {}", paths.output_dir.display());
    Ok(())
}

/// Wet cells left undefined in any field.
pub fn undefined_wet_cells(products: &TopographyProducts, fields: &[InterpolatedField]) -> Vec<(String, usize)> {
    fields
        .iter()
        .map(|f| (f.name.clone(), f.undefined_wet_cells(&products.dataset.mask)))
        .filter(|(_, n)| *n > 0)
        .collect()
}

/// Cells of the open boundaries that are dry on the final mask.
pub fn dry_boundary_points(products: &TopographyProducts) -> Vec<GridPoint> {
    products
        .boundaries
        .points()
        .into_iter()
        .filter(|&p| products.dataset.mask.is_dry(p))
        .collect()
}

/// Run the whole pipeline from the configured inputs to the output directory.
#[cfg(feature = "netcdf")]
pub fn run(config: &PipelineConfig) -> Result<TopographyProducts, PipelineError> {
    use crate::config::ConfigError;
    use crate::io::{
        NetCDFWriterConfig, read_ice_thickness_source, read_manifest_file, read_mesh_coordinates,
        read_mesh_series_files, read_topography_source, write_boundary_conditions, write_initial_conditions,
        write_topography_dataset,
    };
    use crate::loader::MeshSource;

    let missing = |field: &'static str| ConfigError::Invalid {
        field,
        message: "input path is required".to_string(),
    };
    let inputs = &config.inputs;
    let paths = &config.outputs;
    let writer = NetCDFWriterConfig::new().with_title(format!("{} fjord model input", config.grounding_line.tag));

    let topography = read_topography_source(inputs.topography.as_ref().ok_or_else(|| missing("inputs.topography"))?)?;
    let ice = read_ice_thickness_source(
        inputs
            .ice_thickness
            .as_ref()
            .ok_or_else(|| missing("inputs.ice_thickness"))?,
    )?;
    let products = build_topography(topography, ice, config)?;
    write_text_outputs(&products, config, paths)?;
    write_topography_dataset(&paths.topography(), &products.dataset, &writer)?;

    let (Some(mesh_path), Some(salt_manifest), Some(temp_manifest)) = (
        inputs.mesh.as_ref(),
        inputs.salinity_manifest.as_ref(),
        inputs.temperature_manifest.as_ref(),
    ) else {
        log::warn!("no mesh inputs configured; skipping initial and boundary conditions");
        return Ok(products);
    };

    let (lon, lat, depth) = read_mesh_coordinates(mesh_path)?;
    let salt_manifest = read_manifest_file(salt_manifest)?;
    let temp_manifest = read_manifest_file(temp_manifest)?;
    let salinity = read_mesh_series_files(&salt_manifest, &["salt", "so", "salinity"], "psu", depth.len())?;
    let temperature = read_mesh_series_files(&temp_manifest, &["temp", "thetao", "temperature"], "degC", depth.len())?;
    let mesh = MeshSource {
        lon,
        lat,
        depth,
        salinity,
        temperature,
    }
    .load(&config.domain, &config.projection.projection())?;

    let initial = build_initial_conditions(&products, &mesh, config)?;
    for (name, count) in undefined_wet_cells(&products, &initial) {
        log::warn!("{name}: {count} wet cells undefined");
    }
    write_initial_conditions(&paths.initial_conditions(), &products.dataset.grid, &initial, &writer)?;

    let (months, boundary) = build_boundary_conditions(&products, &mesh, config)?;
    write_boundary_conditions(&paths.boundary_conditions(), &months, &boundary, &writer)?;
    Ok(products)
}

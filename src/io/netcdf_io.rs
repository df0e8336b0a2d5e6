//! NetCDF reading of the source datasets and writing of the model inputs.
//!
//! # Readers
//!
//! - **Topography**: geodetic bedrock, ice base and surface codes
//! - **Ice thickness**: planar thickness and surface codes with a PROJ
//!   descriptor
//! - **Mesh output**: node coordinates, level depths and monthly series
//!
//! Variable and dimension names differ between product versions, so every
//! reader tries a list of alternatives. Packed variables are unpacked with
//! `scale_factor` and `add_offset`; fill values become NaN.
//!
//! # Writers
//!
//! - **Topography dataset**: `(lat, lon)` fields with coordinates and
//!   provenance attributes
//! - **Initial conditions**: `(time, depth, lat, lon)`
//! - **Boundary conditions**: `(time, bdy_points, depth)`
//!
//! Time is an unlimited dimension; no `_FillValue` is declared.
//!
//! # Example
//!
//! ```rust,ignore
//! use fjord_setup::io::{NetCDFWriterConfig, write_topography_dataset};
//!
//! let config = NetCDFWriterConfig::new().with_title("79NG fjord topography");
//! write_topography_dataset(Path::new("model/topo.nc"), &dataset, &config)?;
//! ```

use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use ndarray::{Array1, Array2, Array3, ArrayD, IxDyn};
use netcdf::create;
use thiserror::Error;

use crate::interpolation::{BoundaryField, InterpolatedField};
use crate::loader::{IceThicknessSource, TopographySource};
use crate::mesh::{GeodeticGrid, MeshTimeSeries, TopographyDataset};
use crate::types::YearMonth;

/// Error type for NetCDF operations.
#[derive(Debug, Error)]
pub enum NetCDFError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// NetCDF library error
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Missing variable
    #[error("Missing variable: {0}")]
    MissingVariable(String),
}

/// Check if a value is valid (not a fill value).
#[inline]
pub fn is_valid_f64(v: f64) -> bool {
    v.is_finite() && v.abs() < 1.0e+30
}

const LON_NAMES: [&str; 4] = ["lon", "longitude", "nav_lon", "x_lon"];
const LAT_NAMES: [&str; 4] = ["lat", "latitude", "nav_lat", "y_lat"];
const BEDROCK_NAMES: [&str; 4] = ["bedrock_topography", "bedrock", "bed", "topg"];
const ICE_BASE_NAMES: [&str; 3] = ["ice_base_topography", "ice_base", "lsrf"];
const SURFACE_NAMES: [&str; 4] = ["amask", "mask", "surface_type", "surface_mask"];
const THICKNESS_NAMES: [&str; 3] = ["thickness", "ice_thickness", "thk"];
const DEPTH_NAMES: [&str; 5] = ["depth", "nz1", "deptht", "z", "level"];
const TIME_NAMES: [&str; 3] = ["time", "Time", "time_counter"];
const LEVEL_DIM_NAMES: [&str; 6] = ["nz1", "nz", "depth", "deptht", "level", "z"];
const DESCRIPTOR_ATTRS: [&str; 4] = ["proj4", "proj4text", "proj4_string", "spatial_proj4"];

// ============================================================================
// Readers
// ============================================================================

/// Read the geodetic topography source.
///
/// Fields stored `(lon, lat)` are transposed to `(lat, lon)`.
pub fn read_topography_source(path: impl AsRef<Path>) -> Result<TopographySource, NetCDFError> {
    let file = netcdf::open(path)?;
    let lon = Array1::from(read_coord(&file, &LON_NAMES)?);
    let lat = Array1::from(read_coord(&file, &LAT_NAMES)?);
    let shape = (lat.len(), lon.len());

    let bedrock = read_2d(&file, &BEDROCK_NAMES, shape, &LAT_NAMES)?;
    let ice_base = read_2d(&file, &ICE_BASE_NAMES, shape, &LAT_NAMES)?;
    let surface_type = to_codes(read_2d(&file, &SURFACE_NAMES, shape, &LAT_NAMES)?)?;

    Ok(TopographySource {
        lon,
        lat,
        bedrock,
        ice_base,
        surface_type,
    })
}

/// Read the planar ice-thickness source.
///
/// The projection descriptor is taken from a global attribute or from the
/// grid-mapping variable `mapping`/`polar_stereographic`.
pub fn read_ice_thickness_source(path: impl AsRef<Path>) -> Result<IceThicknessSource, NetCDFError> {
    let file = netcdf::open(path)?;
    let x = Array1::from(read_coord(&file, &["x"])?);
    let y = Array1::from(read_coord(&file, &["y"])?);
    let shape = (y.len(), x.len());

    let thickness = read_2d(&file, &THICKNESS_NAMES, shape, &["y"])?;
    let surface_type = to_codes(read_2d(&file, &["mask", "surface_type"], shape, &["y"])?)?;
    let projection = read_descriptor(&file)?;

    Ok(IceThicknessSource {
        x,
        y,
        thickness,
        surface_type,
        projection,
    })
}

/// Read node coordinates and level depths (positive down) of the mesh.
pub fn read_mesh_coordinates(
    path: impl AsRef<Path>,
) -> Result<(Array1<f64>, Array1<f64>, Array1<f64>), NetCDFError> {
    let file = netcdf::open(path)?;
    let lon = Array1::from(read_coord(&file, &LON_NAMES)?);
    let lat = Array1::from(read_coord(&file, &LAT_NAMES)?);
    let depth = Array1::from(read_coord(&file, &DEPTH_NAMES)?).mapv(f64::abs);
    Ok((lon, lat, depth))
}

/// Read one file of a monthly mesh series as `(months, (time, node, level))`.
pub fn read_mesh_series(
    path: impl AsRef<Path>,
    names: &[&str],
    n_levels: usize,
) -> Result<(Vec<YearMonth>, Array3<f64>), NetCDFError> {
    let file = netcdf::open(path)?;
    let months = read_months(&file)?;

    let var = names
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| NetCDFError::MissingVariable(names.join(" or ")))?;
    let dims: Vec<(String, usize)> = var.dimensions().iter().map(|d| (d.name(), d.len())).collect();
    if dims.len() != 3 {
        return Err(NetCDFError::InvalidData(format!(
            "{} has {} dimensions, expected (time, node, level) in some order",
            names[0],
            dims.len()
        )));
    }
    let values = unpack(&var)?;

    let time_axis = dims
        .iter()
        .position(|(n, _)| TIME_NAMES.contains(&n.as_str()))
        .ok_or_else(|| NetCDFError::InvalidData(format!("{} has no time dimension", names[0])))?;
    let level_axis = dims
        .iter()
        .enumerate()
        .position(|(i, (n, _))| i != time_axis && LEVEL_DIM_NAMES.contains(&n.as_str()))
        .or_else(|| {
            dims.iter()
                .enumerate()
                .position(|(i, (_, len))| i != time_axis && *len == n_levels)
        })
        .ok_or_else(|| NetCDFError::InvalidData(format!("{} has no level dimension", names[0])))?;
    let node_axis = 3 - time_axis - level_axis;

    let shape: Vec<usize> = dims.iter().map(|(_, len)| *len).collect();
    let array = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| NetCDFError::InvalidData(e.to_string()))?
        .permuted_axes(IxDyn(&[time_axis, node_axis, level_axis]))
        .as_standard_layout()
        .into_owned()
        .into_dimensionality::<ndarray::Ix3>()
        .map_err(|e| NetCDFError::InvalidData(e.to_string()))?;

    if array.len_of(ndarray::Axis(0)) != months.len() {
        return Err(NetCDFError::InvalidData(format!(
            "{} has {} time records, time axis has {}",
            names[0],
            array.len_of(ndarray::Axis(0)),
            months.len()
        )));
    }
    Ok((months, array))
}

/// Read a coordinate variable.
fn read_coord(file: &netcdf::File, names: &[&str]) -> Result<Vec<f64>, NetCDFError> {
    for name in names {
        if let Some(var) = file.variable(name) {
            let data: Vec<f64> = var.get_values(..)?;
            return Ok(data);
        }
    }
    Err(NetCDFError::MissingVariable(names.join(" or ")))
}

/// Read a 2D field as `(row, col)` of `shape`, transposing when the first
/// dimension is not a row dimension.
fn read_2d(
    file: &netcdf::File,
    names: &[&str],
    shape: (usize, usize),
    row_dims: &[&str],
) -> Result<Array2<f64>, NetCDFError> {
    for name in names {
        if let Some(var) = file.variable(name) {
            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            let values = unpack(&var)?;
            let rows_first = dims.first().map_or(true, |d| row_dims.contains(&d.as_str()));
            let array = if rows_first {
                Array2::from_shape_vec(shape, values)
            } else {
                Array2::from_shape_vec((shape.1, shape.0), values).map(|a| a.reversed_axes())
            };
            return array
                .map(|a| a.as_standard_layout().into_owned())
                .map_err(|e| NetCDFError::InvalidData(format!("{name}: {e}")));
        }
    }
    Err(NetCDFError::MissingVariable(names.join(" or ")))
}

/// Read all values, applying `scale_factor`/`add_offset` and mapping fill values to NaN.
fn unpack(var: &netcdf::Variable) -> Result<Vec<f64>, NetCDFError> {
    let scale = get_attr_f64(var, "scale_factor").unwrap_or(1.0);
    let offset = get_attr_f64(var, "add_offset").unwrap_or(0.0);
    let fill = get_attr_f64(var, "_FillValue");
    let raw: Vec<f64> = var.get_values(..)?;
    Ok(raw
        .into_iter()
        .map(|v| {
            if !is_valid_f64(v) || fill == Some(v) {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect())
}

/// Get f64 attribute value.
fn get_attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Short(s) => Some(s as f64),
            netcdf::AttributeValue::Int(i) => Some(i as f64),
            netcdf::AttributeValue::Schar(b) => Some(b as f64),
            netcdf::AttributeValue::Uchar(b) => Some(b as f64),
            _ => None,
        })
}

/// Get string attribute value.
fn get_attr_str(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}

fn to_codes(values: Array2<f64>) -> Result<Array2<u8>, NetCDFError> {
    if let Some(bad) = values
        .iter()
        .find(|v| !(v.is_finite() && v.fract() == 0.0 && (0.0..=255.0).contains(*v)))
    {
        return Err(NetCDFError::InvalidData(format!("surface code {bad} is not a byte")));
    }
    Ok(values.mapv(|v| v as u8))
}

fn read_descriptor(file: &netcdf::File) -> Result<String, NetCDFError> {
    for name in DESCRIPTOR_ATTRS {
        if let Some(Ok(netcdf::AttributeValue::Str(s))) = file.attribute(name).map(|a| a.value()) {
            return Ok(s);
        }
    }
    for var_name in ["mapping", "polar_stereographic", "crs"] {
        if let Some(var) = file.variable(var_name) {
            if let Some(s) = DESCRIPTOR_ATTRS.iter().find_map(|a| get_attr_str(&var, a)) {
                return Ok(s);
            }
        }
    }
    Err(NetCDFError::MissingVariable("projection descriptor (proj4 attribute)".to_string()))
}

/// Decode the time axis into months.
fn read_months(file: &netcdf::File) -> Result<Vec<YearMonth>, NetCDFError> {
    let var = TIME_NAMES
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| NetCDFError::MissingVariable(TIME_NAMES.join(" or ")))?;
    let units = get_attr_str(&var, "units").ok_or_else(|| NetCDFError::InvalidData("time has no units".into()))?;
    let values: Vec<f64> = var.get_values(..)?;
    let (step, reference) = parse_time_units(&units)?;
    Ok(values
        .into_iter()
        .map(|v| YearMonth::from_date((reference + Duration::seconds((v * step).round() as i64)).date()))
        .collect())
}

/// Parse CF time units such as `days since 1958-01-01 00:00:00`.
///
/// Returns the step in seconds and the reference time.
fn parse_time_units(units: &str) -> Result<(f64, NaiveDateTime), NetCDFError> {
    let invalid = || NetCDFError::InvalidData(format!("unsupported time units '{units}'"));
    let (step, since) = units.split_once(" since ").ok_or_else(invalid)?;
    let step = match step.trim() {
        "seconds" | "second" | "s" => 1.0,
        "minutes" | "minute" => 60.0,
        "hours" | "hour" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        _ => return Err(invalid()),
    };
    let date = since.trim().get(..10).ok_or_else(invalid)?;
    let reference = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(invalid)?;
    Ok((step, reference))
}

/// Assemble a mesh series from the files of a manifest.
pub fn read_mesh_series_files(
    manifest: &crate::io::TimeSeriesManifest,
    names: &[&str],
    units: &str,
    n_levels: usize,
) -> Result<MeshTimeSeries, crate::loader::LoaderError> {
    crate::loader::concatenate_series(names[0], units, manifest, |entry| {
        Ok(read_mesh_series(&entry.file, names, n_levels)?)
    })
}

// ============================================================================
// Writers
// ============================================================================

/// Global attributes of written files.
#[derive(Debug, Clone)]
pub struct NetCDFWriterConfig {
    /// Title attribute
    pub title: Option<String>,
    /// Institution attribute
    pub institution: Option<String>,
    /// Source attribute
    pub source: Option<String>,
    /// Comment attribute
    pub comment: Option<String>,
}

impl Default for NetCDFWriterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NetCDFWriterConfig {
    /// Default attributes.
    pub fn new() -> Self {
        Self {
            title: None,
            institution: None,
            source: Some(format!("fjord-setup {}", env!("CARGO_PKG_VERSION"))),
            comment: None,
        }
    }

    /// Set the title attribute.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the institution attribute.
    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    /// Set the comment attribute.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    fn put_global(&self, file: &mut netcdf::FileMut) -> Result<(), NetCDFError> {
        file.add_attribute("Conventions", "CF-1.8")?;
        if let Some(ref title) = self.title {
            file.add_attribute("title", title.as_str())?;
        }
        if let Some(ref institution) = self.institution {
            file.add_attribute("institution", institution.as_str())?;
        }
        if let Some(ref source) = self.source {
            file.add_attribute("source", source.as_str())?;
        }
        if let Some(ref comment) = self.comment {
            file.add_attribute("comment", comment.as_str())?;
        }
        let now = Utc::now();
        file.add_attribute(
            "history",
            format!("{}: Created by fjord-setup", now.format("%Y-%m-%d %H:%M:%S UTC")).as_str(),
        )?;
        Ok(())
    }
}

fn add_grid_coordinates(file: &mut netcdf::FileMut, grid: &GeodeticGrid) -> Result<(), NetCDFError> {
    file.add_dimension("lat", grid.n_lat())?;
    file.add_dimension("lon", grid.n_lon())?;
    {
        let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
        lon.put_attribute("standard_name", "longitude")?;
        lon.put_attribute("long_name", "longitude")?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_values(&grid.lon.to_vec(), ..)?;
    }
    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_attribute("standard_name", "latitude")?;
        lat.put_attribute("long_name", "latitude")?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put_values(&grid.lat.to_vec(), ..)?;
    }
    Ok(())
}

fn put_2d(
    file: &mut netcdf::FileMut,
    name: &str,
    long_name: &str,
    units: &str,
    values: &Array2<f64>,
) -> Result<(), NetCDFError> {
    let mut var = file.add_variable::<f64>(name, &["lat", "lon"])?;
    var.put_attribute("long_name", long_name)?;
    var.put_attribute("units", units)?;
    var.put_values(&values.iter().copied().collect::<Vec<_>>(), ..)?;
    Ok(())
}

/// Write the model topography dataset.
pub fn write_topography_dataset(
    path: &Path,
    dataset: &TopographyDataset,
    config: &NetCDFWriterConfig,
) -> Result<(), NetCDFError> {
    let mut file = create(path)?;
    add_grid_coordinates(&mut file, &dataset.grid)?;

    put_2d(&mut file, "x", "projected x coordinate", "m", &dataset.grid.x)?;
    put_2d(&mut file, "y", "projected y coordinate", "m", &dataset.grid.y)?;
    {
        let mask: Vec<i32> = dataset.mask.wet().iter().map(|&w| i32::from(w)).collect();
        let mut var = file.add_variable::<i32>("mask", &["lat", "lon"])?;
        var.put_attribute("long_name", "ocean mask (1 = water)")?;
        var.put_values(&mask, ..)?;
    }
    put_2d(&mut file, "bathymetry", "sea floor depth below sea level", "m", &dataset.bathymetry)?;
    put_2d(&mut file, "ice_draft", "ice base depth below sea level", "m", &dataset.ice_draft)?;
    put_2d(&mut file, "ice_thickness", "ice thickness", "m", &dataset.ice_thickness)?;

    let (dlon, dlat) = dataset.grid.resolution_arcsec();
    file.add_attribute("resolution_lon_arcsec", dlon)?;
    file.add_attribute("resolution_lat_arcsec", dlat)?;
    for (key, value) in &dataset.attributes {
        file.add_attribute(key, value.as_str())?;
    }
    config.put_global(&mut file)?;
    log::info!("wrote topography dataset {}", path.display());
    Ok(())
}

fn long_name(name: &str) -> &str {
    match name {
        "salt" | "salinity" => "salinity",
        "temp" | "temperature" => "potential temperature",
        other => other,
    }
}

fn add_depth(file: &mut netcdf::FileMut, depth: &Array1<f64>) -> Result<(), NetCDFError> {
    file.add_dimension("depth", depth.len())?;
    let mut var = file.add_variable::<f64>("depth", &["depth"])?;
    var.put_attribute("long_name", "depth below sea surface")?;
    var.put_attribute("units", "m")?;
    var.put_attribute("positive", "down")?;
    var.put_values(&depth.to_vec(), ..)?;
    Ok(())
}

/// Write initial conditions, one record of `(depth, lat, lon)` per field.
pub fn write_initial_conditions(
    path: &Path,
    grid: &GeodeticGrid,
    fields: &[InterpolatedField],
    config: &NetCDFWriterConfig,
) -> Result<(), NetCDFError> {
    let depth = fields
        .first()
        .map(|f| f.depth.clone())
        .ok_or_else(|| NetCDFError::InvalidData("no field to write".into()))?;
    let mut file = create(path)?;
    file.add_unlimited_dimension("time")?;
    add_depth(&mut file, &depth)?;
    add_grid_coordinates(&mut file, grid)?;
    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("long_name", "time")?;
        time.put_attribute("units", "seconds since 2000-01-01 00:00:00")?;
        time.put_value(0.0, [0usize])?;
    }
    for field in fields {
        if field.values.dim() != (depth.len(), grid.n_lat(), grid.n_lon()) {
            return Err(NetCDFError::InvalidData(format!(
                "{} has shape {:?}",
                field.name,
                field.values.dim()
            )));
        }
        let mut var = file.add_variable::<f64>(&field.name, &["time", "depth", "lat", "lon"])?;
        var.put_attribute("long_name", long_name(&field.name))?;
        var.put_attribute("units", field.units.as_str())?;
        let values: Vec<f64> = field.values.iter().copied().collect();
        var.put_values(&values, (0, .., .., ..))?;
    }
    config.put_global(&mut file)?;
    log::info!("wrote initial conditions {}", path.display());
    Ok(())
}

/// Write boundary conditions, one record of `(bdy_points, depth)` per month.
///
/// Time is in days since the first day of the first month.
pub fn write_boundary_conditions(
    path: &Path,
    months: &[YearMonth],
    fields: &[BoundaryField],
    config: &NetCDFWriterConfig,
) -> Result<(), NetCDFError> {
    let first = fields
        .first()
        .ok_or_else(|| NetCDFError::InvalidData("no field to write".into()))?;
    let (_, n_bdy, n_depth) = first.values.dim();
    let start = months
        .first()
        .and_then(|m| m.first_day())
        .ok_or_else(|| NetCDFError::InvalidData("no month to write".into()))?;

    let mut file = create(path)?;
    file.add_unlimited_dimension("time")?;
    file.add_dimension("bdy_points", n_bdy)?;
    add_depth(&mut file, &first.depth)?;
    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("long_name", "time")?;
        time.put_attribute("units", format!("days since {start} 00:00:00").as_str())?;
        for (t_idx, month) in months.iter().enumerate() {
            let day = month.first_day().map_or(0, |d| (d - start).num_days());
            time.put_value(day as f64, [t_idx])?;
        }
    }
    for field in fields {
        if field.values.dim() != (months.len(), n_bdy, n_depth) {
            return Err(NetCDFError::InvalidData(format!(
                "{} has shape {:?}",
                field.name,
                field.values.dim()
            )));
        }
        let mut var = file.add_variable::<f64>(&field.name, &["time", "bdy_points", "depth"])?;
        var.put_attribute("long_name", long_name(&field.name))?;
        var.put_attribute("units", field.units.as_str())?;
        for (t_idx, record) in field.values.outer_iter().enumerate() {
            let values: Vec<f64> = record.iter().copied().collect();
            var.put_values(&values, (t_idx, .., ..))?;
        }
    }
    config.put_global(&mut file)?;
    log::info!("wrote boundary conditions {} ({} months)", path.display(), months.len());
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

//! Coordinate projection utilities for geographic data.
//!
//! Provides transformations between geodetic coordinates (WGS84 lon/lat)
//! and projected Cartesian coordinates (meters).
//!
//! At fjord latitudes (~80°N) one degree of longitude is less than a fifth of
//! a degree of latitude in length, so any distance-based operation
//! (interpolation neighbourhoods, nearest-neighbour search) must run in
//! projected coordinates.
//!
//! # Supported Projections
//!
//! - **PolarStereographic**: Ellipsoidal polar stereographic with a standard
//!   parallel, e.g. NSIDC Sea Ice Polar Stereographic North (EPSG:3413) used by
//!   Greenland ice-sheet products
//!
//! # Example
//!
//! ```
//! use fjord_setup::io::{CoordinateProjection, PolarStereographic};
//!
//! let proj = PolarStereographic::epsg_3413();
//!
//! let (x, y) = proj.to_planar(-20.0, 79.5);
//! let (lon, lat) = proj.to_geodetic(x, y);
//! assert!((lon + 20.0).abs() < 1e-9);
//! assert!((lat - 79.5).abs() < 1e-9);
//! ```

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBoundingBox {
    /// Minimum longitude (western edge) in degrees
    pub min_lon: f64,
    /// Minimum latitude (southern edge) in degrees
    pub min_lat: f64,
    /// Maximum longitude (eastern edge) in degrees
    pub max_lon: f64,
    /// Maximum latitude (northern edge) in degrees
    pub max_lat: f64,
}

impl GeoBoundingBox {
    /// Create a new bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Check if a point is within this bounding box (inclusive).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Grow the box by `margin` degrees on every side.
    pub fn with_margin(&self, margin: f64) -> Self {
        Self {
            min_lon: self.min_lon - margin,
            min_lat: self.min_lat - margin,
            max_lon: self.max_lon + margin,
            max_lat: self.max_lat + margin,
        }
    }

    /// Whether the box has positive extent in both directions.
    pub fn is_valid(&self) -> bool {
        self.max_lon > self.min_lon && self.max_lat > self.min_lat
    }
}

/// Trait for coordinate projections.
///
/// Implementations are pure functions of their input and safe to share
/// between threads.
pub trait CoordinateProjection {
    /// Convert geodetic coordinates `(lon, lat)` in degrees to planar `(x, y)` in meters.
    fn to_planar(&self, lon: f64, lat: f64) -> (f64, f64);

    /// Convert planar coordinates `(x, y)` to geodetic `(lon, lat)` in degrees.
    fn to_geodetic(&self, x: f64, y: f64) -> (f64, f64);

    /// PROJ-style descriptor of the projection, e.g. `+proj=stere +lat_0=90 ...`.
    fn descriptor(&self) -> String;

    /// Project paired coordinate slices.
    fn to_planar_points(&self, lon: &[f64], lat: &[f64]) -> (Vec<f64>, Vec<f64>) {
        lon.iter()
            .zip(lat)
            .map(|(&lon, &lat)| self.to_planar(lon, lat))
            .unzip()
    }

    /// Project the outer product of coordinate vectors.
    ///
    /// Returns `(x, y)` arrays of shape `(lat.len(), lon.len())`.
    fn to_planar_grid(&self, lon: &Array1<f64>, lat: &Array1<f64>) -> (Array2<f64>, Array2<f64>) {
        let shape = (lat.len(), lon.len());
        let mut x = Array2::zeros(shape);
        let mut y = Array2::zeros(shape);
        for (j, &phi) in lat.iter().enumerate() {
            for (i, &lambda) in lon.iter().enumerate() {
                let (px, py) = self.to_planar(lambda, phi);
                x[[j, i]] = px;
                y[[j, i]] = py;
            }
        }
        (x, y)
    }

    /// Whether a descriptor string found in a dataset describes this projection.
    ///
    /// Comparison ignores token order and whitespace.
    fn matches_descriptor(&self, other: &str) -> bool {
        descriptor_tokens(&self.descriptor()) == descriptor_tokens(other)
    }
}

fn descriptor_tokens(descriptor: &str) -> Vec<String> {
    let mut tokens: Vec<String> = descriptor
        .split_whitespace()
        .map(|t| t.trim_start_matches('+').to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort();
    tokens
}

/// Ellipsoidal polar stereographic projection (northern hemisphere).
///
/// Follows Snyder (1987), "Map Projections: A Working Manual", eqs. 21-33 to
/// 21-41, with the true-scale latitude `lat_ts`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarStereographic {
    /// Latitude of true scale in degrees
    lat_ts: f64,
    /// Central meridian (straight down from the pole) in degrees
    lon_0: f64,
    /// First eccentricity
    e: f64,
    /// Precomputed ρ = factor · t(φ)
    rho_factor: f64,
}

impl PolarStereographic {
    /// WGS84 equatorial radius in meters
    const A: f64 = 6_378_137.0;
    /// WGS84 flattening
    const F: f64 = 1.0 / 298.257_223_563;
    /// Convergence tolerance for the inverse latitude iteration (radians)
    const INVERSE_TOL: f64 = 1e-14;
    const MAX_ITERATIONS: usize = 30;

    /// NSIDC Sea Ice Polar Stereographic North (EPSG:3413).
    ///
    /// `lat_ts = 70°N`, `lon_0 = -45°`, WGS84.
    pub fn epsg_3413() -> Self {
        Self::north(70.0, -45.0)
    }

    /// North polar stereographic with the given true-scale latitude and central meridian.
    pub fn north(lat_ts: f64, lon_0: f64) -> Self {
        let e2 = 2.0 * Self::F - Self::F * Self::F;
        let e = e2.sqrt();

        let rho_factor = if (lat_ts - 90.0).abs() < 1e-12 {
            // True scale at the pole
            2.0 * Self::A / ((1.0 + e).powf(1.0 + e) * (1.0 - e).powf(1.0 - e)).sqrt()
        } else {
            let phi_c = lat_ts.to_radians();
            let m_c = phi_c.cos() / (1.0 - e2 * phi_c.sin().powi(2)).sqrt();
            let t_c = Self::t(phi_c, e);
            Self::A * m_c / t_c
        };

        Self {
            lat_ts,
            lon_0,
            e,
            rho_factor,
        }
    }

    /// Latitude of true scale in degrees.
    pub fn lat_ts(&self) -> f64 {
        self.lat_ts
    }

    /// Central meridian in degrees.
    pub fn lon_0(&self) -> f64 {
        self.lon_0
    }

    /// Snyder's t(φ), eq. 15-9.
    fn t(phi: f64, e: f64) -> f64 {
        let e_sin = e * phi.sin();
        (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - e_sin) / (1.0 + e_sin)).powf(e / 2.0)
    }
}

impl CoordinateProjection for PolarStereographic {
    fn to_planar(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let dlambda = (lon - self.lon_0).to_radians();
        let rho = self.rho_factor * Self::t(phi, self.e);
        (rho * dlambda.sin(), -rho * dlambda.cos())
    }

    fn to_geodetic(&self, x: f64, y: f64) -> (f64, f64) {
        let rho = x.hypot(y);
        if rho == 0.0 {
            return (self.lon_0, 90.0);
        }
        let t = rho / self.rho_factor;

        let half_e = self.e / 2.0;
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..Self::MAX_ITERATIONS {
            let e_sin = self.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - e_sin) / (1.0 + e_sin)).powf(half_e)).atan();
            let converged = (next - phi).abs() < Self::INVERSE_TOL;
            phi = next;
            if converged {
                break;
            }
        }

        let lon = self.lon_0 + x.atan2(-y).to_degrees();
        (normalize_longitude(lon), phi.to_degrees())
    }

    fn descriptor(&self) -> String {
        format!(
            "+proj=stere +lat_0=90 +lat_ts={} +lon_0={} +k=1 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs",
            self.lat_ts, self.lon_0
        )
    }
}

/// Wrap a longitude into `[-180, 180)`.
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped >= 180.0 { wrapped - 360.0 } else { wrapped }
}

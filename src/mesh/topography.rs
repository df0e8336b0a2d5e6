//! Topography fields on a geodetic grid.
//!
//! Two stages are represented:
//!
//! - [`Topography`]: source elevations (bedrock and ice base, meters above sea
//!   level, negative below) as delivered by a global ice-sheet topography product
//! - [`TopographyDataset`]: model input with positive-down bathymetry, ice draft
//!   and ice thickness, the reconciled ocean mask and provenance attributes

use ndarray::{Array2, Zip};
use std::collections::BTreeMap;

use super::geodetic_grid::{GeodeticGrid, GridError};
use crate::mask::OceanMask;
use crate::types::GridPoint;

/// Source elevations on a geodetic grid.
#[derive(Debug, Clone)]
pub struct Topography {
    /// Grid the fields live on
    pub grid: GeodeticGrid,
    /// Bedrock elevation in m (negative below sea level)
    pub bedrock: Array2<f64>,
    /// Elevation of the ice base in m; equals the sea surface (0) in open water
    /// and the bedrock where there is no water column
    pub ice_base: Array2<f64>,
}

impl Topography {
    /// Bundle fields with their grid.
    ///
    /// # Errors
    /// `ShapeMismatch` if a field does not match the grid.
    pub fn new(grid: GeodeticGrid, bedrock: Array2<f64>, ice_base: Array2<f64>) -> Result<Self, GridError> {
        grid.check_shape("bedrock", &bedrock)?;
        grid.check_shape("ice_base", &ice_base)?;
        Ok(Self {
            grid,
            bedrock,
            ice_base,
        })
    }

    /// Water column thickness `ice_base - bedrock` (0 where grounded or on land).
    pub fn water_column(&self) -> Array2<f64> {
        Zip::from(&self.ice_base)
            .and(&self.bedrock)
            .map_collect(|&base, &bed| (base - bed).max(0.0))
    }

    /// Whether any water sits between bedrock and ice base at each cell.
    pub fn has_water(&self) -> Array2<bool> {
        Zip::from(&self.ice_base)
            .and(&self.bedrock)
            .map_collect(|&base, &bed| base > bed)
    }
}

/// Invariant violations found in a [`TopographyDataset`].
#[derive(Debug, Clone, PartialEq)]
pub enum TopographyViolation {
    /// Wet cell without a finite positive bathymetry
    MissingDepth(GridPoint),
    /// Wet cell whose ice draft reaches the sea floor
    NoWaterColumn(GridPoint),
    /// Negative or undefined ice thickness
    InvalidIceThickness(GridPoint),
}

/// Model topography: the first dataset handed to the ocean model.
#[derive(Debug, Clone)]
pub struct TopographyDataset {
    /// Model grid
    pub grid: GeodeticGrid,
    /// Reconciled wet/dry mask
    pub mask: OceanMask,
    /// Depth of the sea floor below sea level in m (positive down), NaN on land
    pub bathymetry: Array2<f64>,
    /// Depth of the ice base below sea level in m (positive down), 0 without ice
    pub ice_draft: Array2<f64>,
    /// Ice thickness in m, 0 without ice
    pub ice_thickness: Array2<f64>,
    /// Free-text provenance attributes written as global file attributes
    pub attributes: BTreeMap<String, String>,
}

impl TopographyDataset {
    /// Convert source elevations to model depths on a reconciled mask.
    ///
    /// Dry cells get NaN bathymetry and zero ice draft; undefined ice
    /// thickness becomes 0.
    pub fn from_elevations(
        topography: &Topography,
        mask: OceanMask,
        ice_thickness: &Array2<f64>,
    ) -> Result<Self, GridError> {
        let grid = topography.grid.clone();
        grid.check_shape("mask", mask.wet())?;
        grid.check_shape("ice_thickness", ice_thickness)?;
        let bathymetry = Zip::from(&topography.bedrock)
            .and(mask.wet())
            .map_collect(|&bed, &wet| if wet { -bed } else { f64::NAN });
        let ice_draft = Zip::from(&topography.ice_base)
            .and(mask.wet())
            .map_collect(|&base, &wet| if wet { (-base).max(0.0) } else { 0.0 });
        let ice_thickness = ice_thickness.mapv(|h| if h.is_finite() { h.max(0.0) } else { 0.0 });
        Ok(Self {
            grid,
            mask,
            bathymetry,
            ice_draft,
            ice_thickness,
            attributes: BTreeMap::new(),
        })
    }

    /// Set the depth of wet cells, e.g. cells opened by a mask override.
    ///
    /// Dry cells are left untouched.
    pub fn with_depths(mut self, depths: impl IntoIterator<Item = (GridPoint, f64)>) -> Self {
        for (p, depth) in depths {
            if self.mask.is_wet(p) {
                self.bathymetry[[p.row, p.col]] = depth;
            }
        }
        self
    }

    /// Record a provenance attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Check the physical consistency of the dataset.
    ///
    /// Returns every violation found; an empty list means the dataset is valid.
    pub fn violations(&self) -> Vec<TopographyViolation> {
        let mut found = Vec::new();
        for ((row, col), &thickness) in self.ice_thickness.indexed_iter() {
            let p = GridPoint::new(row, col);
            if !(thickness >= 0.0) {
                found.push(TopographyViolation::InvalidIceThickness(p));
            }
            if !self.mask.is_wet(p) {
                continue;
            }
            let depth = self.bathymetry[[row, col]];
            if !(depth.is_finite() && depth > 0.0) {
                found.push(TopographyViolation::MissingDepth(p));
            } else if !(depth > self.ice_draft[[row, col]]) {
                found.push(TopographyViolation::NoWaterColumn(p));
            }
        }
        found
    }

    /// Mean water column thickness over wet cells.
    pub fn mean_water_column(&self) -> f64 {
        let (sum, count) = Zip::from(self.mask.wet())
            .and(&self.bathymetry)
            .and(&self.ice_draft)
            .fold((0.0, 0usize), |(sum, count), &wet, &depth, &draft| {
                if wet { (sum + depth - draft, count + 1) } else { (sum, count) }
            });
        if count == 0 { 0.0 } else { sum / count as f64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::PolarStereographic;
    use ndarray::{Array1, array};

    fn grid() -> GeodeticGrid {
        GeodeticGrid::new(
            Array1::from(vec![-21.0, -20.0]),
            Array1::from(vec![79.0, 79.5]),
            &PolarStereographic::epsg_3413(),
        )
        .unwrap()
    }

    #[test]
    fn test_water_column() {
        let topo = Topography::new(
            grid(),
            array![[-100.0, 50.0], [-300.0, -20.0]],
            array![[0.0, 50.0], [-250.0, -20.0]],
        )
        .unwrap();
        let wc = topo.water_column();
        assert_eq!(wc, array![[100.0, 0.0], [50.0, 0.0]]);
        assert_eq!(topo.has_water(), array![[true, false], [true, false]]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = Topography::new(grid(), Array2::zeros((3, 2)), Array2::zeros((2, 2))).unwrap_err();
        assert!(matches!(err, GridError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_from_elevations() {
        let topo = Topography::new(
            grid(),
            array![[-100.0, 50.0], [-300.0, -20.0]],
            array![[0.0, 50.0], [-250.0, -20.0]],
        )
        .unwrap();
        let mask = OceanMask::from_array(array![[true, false], [true, false]]);
        let thickness = array![[0.0, f64::NAN], [280.0, 900.0]];
        let ds = TopographyDataset::from_elevations(&topo, mask, &thickness).unwrap();
        assert_eq!(ds.bathymetry[[1, 0]], 300.0);
        assert!(ds.bathymetry[[0, 1]].is_nan());
        assert_eq!(ds.ice_draft, array![[0.0, 0.0], [250.0, 0.0]]);
        assert_eq!(ds.ice_thickness[[0, 1]], 0.0);
        assert!(ds.violations().is_empty());
    }

    #[test]
    fn test_violations() {
        let dataset = TopographyDataset {
            grid: grid(),
            mask: OceanMask::from_array(array![[true, false], [true, true]]),
            bathymetry: array![[100.0, f64::NAN], [40.0, f64::NAN]],
            ice_draft: array![[0.0, 0.0], [45.0, 0.0]],
            ice_thickness: array![[0.0, 0.0], [50.0, -1.0]],
            attributes: BTreeMap::new(),
        };
        let v = dataset.violations();
        assert_eq!(
            v,
            vec![
                TopographyViolation::NoWaterColumn(GridPoint::new(1, 0)),
                TopographyViolation::InvalidIceThickness(GridPoint::new(1, 1)),
                TopographyViolation::MissingDepth(GridPoint::new(1, 1)),
            ]
        );
    }
}

//! Manual mask overrides.
//!
//! Some cells are known to be misclassified by the elevation-based rule
//! (e.g. a narrow channel closed by the coarse resolution). Each override
//! names the cell, the state it is expected to have before the edit and,
//! optionally, the approximate location of the cell. If an expectation does
//! not hold, the override is stale and applying it fails.

use serde::{Deserialize, Serialize};

use super::{MaskError, OceanMask};
use crate::mesh::GeodeticGrid;
use crate::types::GridPoint;

/// Approximate geographic location an override expects its cell at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedLocation {
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
    /// Allowed deviation in degrees along each axis
    pub tolerance_deg: f64,
}

/// One audited edit of the ocean mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskPatch {
    /// Row (latitude index, 0-based)
    pub row: usize,
    /// Column (longitude index, 0-based)
    pub col: usize,
    /// State the cell must have before the edit
    pub expect_wet: bool,
    /// State after the edit
    pub set_wet: bool,
    /// Depth of an opened cell in m, positive down; the bedrock depth if absent
    #[serde(default)]
    pub depth: Option<f64>,
    /// Optional location check
    #[serde(default)]
    pub near: Option<ExpectedLocation>,
    /// Why the edit is needed
    #[serde(default)]
    pub reason: String,
}

impl MaskPatch {
    /// Override that opens a dry cell.
    pub fn open(row: usize, col: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            col,
            expect_wet: false,
            set_wet: true,
            depth: None,
            near: None,
            reason: reason.into(),
        }
    }

    /// Override that closes a wet cell.
    pub fn close(row: usize, col: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            col,
            expect_wet: true,
            set_wet: false,
            depth: None,
            near: None,
            reason: reason.into(),
        }
    }

    /// Give an opened cell its own depth.
    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Require the cell to lie near the given location.
    pub fn near(mut self, lon: f64, lat: f64, tolerance_deg: f64) -> Self {
        self.near = Some(ExpectedLocation {
            lon,
            lat,
            tolerance_deg,
        });
        self
    }

    /// Target cell.
    #[inline]
    pub fn point(&self) -> GridPoint {
        GridPoint::new(self.row, self.col)
    }

    fn check(&self, index: usize, mask: &OceanMask, grid: &GeodeticGrid) -> Result<(), MaskError> {
        let p = self.point();
        if !mask.contains(p) {
            return Err(MaskError::PatchOutOfBounds {
                index,
                point: p,
                shape: mask.shape(),
            });
        }
        if let Some(loc) = self.near {
            let (lon, lat) = (grid.lon[p.col], grid.lat[p.row]);
            if (lon - loc.lon).abs() > loc.tolerance_deg || (lat - loc.lat).abs() > loc.tolerance_deg {
                return Err(MaskError::PatchLocation {
                    index,
                    point: p,
                    lon,
                    lat,
                    expected_lon: loc.lon,
                    expected_lat: loc.lat,
                });
            }
        }
        let found_wet = mask.is_wet(p);
        if found_wet != self.expect_wet {
            return Err(MaskError::PatchPrecondition {
                index,
                point: p,
                expected_wet: self.expect_wet,
                found_wet,
                reason: self.reason.clone(),
            });
        }
        Ok(())
    }
}

/// Apply overrides in order, returning the edited mask.
///
/// Each override sees the result of the previous ones.
///
/// # Errors
/// The first override whose expectations do not hold.
pub fn apply_patches(mask: &OceanMask, grid: &GeodeticGrid, patches: &[MaskPatch]) -> Result<OceanMask, MaskError> {
    let mut edited = mask.clone();
    for (index, patch) in patches.iter().enumerate() {
        patch.check(index, &edited, grid)?;
        edited.set_wet(patch.point(), patch.set_wet);
        log::debug!(
            "mask patch {index}: {} set {} ({})",
            patch.point(),
            if patch.set_wet { "wet" } else { "dry" },
            patch.reason
        );
    }
    Ok(edited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::PolarStereographic;
    use ndarray::{Array1, array};

    fn grid() -> GeodeticGrid {
        GeodeticGrid::new(
            Array1::from(vec![-20.0, -19.0, -18.0]),
            Array1::from(vec![79.0, 79.5]),
            &PolarStereographic::epsg_3413(),
        )
        .unwrap()
    }

    fn mask() -> OceanMask {
        OceanMask::from_array(array![[true, false, true], [true, true, true]])
    }

    #[test]
    fn test_apply_is_pure() {
        let original = mask();
        let patches = vec![MaskPatch::open(0, 1, "channel"), MaskPatch::close(1, 2, "ice tongue")];
        let edited = apply_patches(&original, &grid(), &patches).unwrap();
        assert!(edited.is_wet(GridPoint::new(0, 1)));
        assert!(edited.is_dry(GridPoint::new(1, 2)));
        assert!(original.is_dry(GridPoint::new(0, 1)));
    }

    #[test]
    fn test_stale_precondition_fails() {
        let patches = vec![MaskPatch::open(0, 0, "already wet")];
        let err = apply_patches(&mask(), &grid(), &patches).unwrap_err();
        assert!(matches!(
            err,
            MaskError::PatchPrecondition { index: 0, expected_wet: false, found_wet: true, .. }
        ));
    }

    #[test]
    fn test_location_check() {
        let ok = MaskPatch::open(0, 1, "channel").near(-19.0, 79.0, 0.1);
        assert!(apply_patches(&mask(), &grid(), &[ok]).is_ok());

        let moved = MaskPatch::open(0, 1, "channel").near(-18.0, 79.0, 0.1);
        let err = apply_patches(&mask(), &grid(), &[moved]).unwrap_err();
        assert!(matches!(err, MaskError::PatchLocation { .. }));
    }

    #[test]
    fn test_out_of_bounds() {
        let err = apply_patches(&mask(), &grid(), &[MaskPatch::open(5, 0, "")]).unwrap_err();
        assert!(matches!(err, MaskError::PatchOutOfBounds { .. }));
    }

    #[test]
    fn test_patches_chain() {
        // Second patch expects the state left by the first.
        let patches = vec![MaskPatch::open(0, 1, "a"), MaskPatch::close(0, 1, "b")];
        let edited = apply_patches(&mask(), &grid(), &patches).unwrap();
        assert_eq!(edited, mask());
    }
}

//! Reconciliation of the derived ocean mask with the source products.
//!
//! Two checks protect the mask:
//!
//! 1. At load time, on the source grid, the water-presence part of the rule
//!    (`ice_base > bedrock`) must agree with the surface classification that
//!    ships with the product. Disagreements are tolerated only at documented
//!    cells or at isolated cells (no disagreeing 8-neighbour).
//! 2. On the model grid, the mask is derived, edited by the audited override
//!    list and finally restricted to water connected to an open side.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::patch::{MaskPatch, apply_patches};
use super::{MaskError, MaskStatistics, OceanMask, SurfaceType};
use crate::mesh::Topography;
use crate::types::{GridPoint, SideBoundaries};

/// Mask derivation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Minimum depth of the sea floor below sea level for a wet cell (m).
    /// Empirical value that suppresses spurious shallow cells.
    pub min_depth: f64,
    /// Source-grid cells where a reference disagreement is known and accepted
    pub documented_discrepancies: Vec<GridPoint>,
    /// Upper bound on accepted isolated disagreements (`None` = no bound)
    pub max_isolated_discrepancies: Option<usize>,
    /// Audited manual overrides on the model grid
    pub patches: Vec<MaskPatch>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            min_depth: 2.0,
            documented_discrepancies: Vec::new(),
            max_isolated_discrepancies: None,
            patches: Vec::new(),
        }
    }
}

impl MaskConfig {
    /// Set the minimum depth.
    pub fn with_min_depth(mut self, min_depth: f64) -> Self {
        self.min_depth = min_depth;
        self
    }

    /// Accept a known disagreement with the reference classification.
    pub fn with_documented_discrepancy(mut self, p: GridPoint) -> Self {
        self.documented_discrepancies.push(p);
        self
    }

    /// Bound the number of isolated disagreements.
    pub fn with_max_isolated(mut self, max: usize) -> Self {
        self.max_isolated_discrepancies = Some(max);
        self
    }

    /// Append an override.
    pub fn with_patch(mut self, patch: MaskPatch) -> Self {
        self.patches.push(patch);
        self
    }

    /// Depths carried by opening overrides, in override order.
    pub fn patched_depths(&self) -> impl Iterator<Item = (GridPoint, f64)> + '_ {
        self.patches
            .iter()
            .filter(|patch| patch.set_wet)
            .filter_map(|patch| patch.depth.map(|depth| (patch.point(), depth)))
    }
}

/// Outcome of the reference check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceCheck {
    /// Number of cells compared
    pub compared: usize,
    /// Disagreements at documented cells
    pub documented: Vec<GridPoint>,
    /// Isolated disagreements
    pub isolated: Vec<GridPoint>,
}

impl ReferenceCheck {
    /// Whether the derived water presence matched the reference everywhere.
    pub fn is_exact(&self) -> bool {
        self.documented.is_empty() && self.isolated.is_empty()
    }
}

/// Compare water presence (`ice_base > bedrock`) with reference surface codes.
///
/// # Errors
/// - `UnknownSurfaceCode` for a code outside the known classification
/// - `ReferenceDisagreement` for clustered disagreements, or more isolated
///   ones than allowed
pub fn check_reference(
    bedrock: &Array2<f64>,
    ice_base: &Array2<f64>,
    reference: &Array2<u8>,
    config: &MaskConfig,
) -> Result<ReferenceCheck, MaskError> {
    for found in [ice_base.dim(), reference.dim()] {
        if found != bedrock.dim() {
            return Err(MaskError::ShapeMismatch {
                expected: bedrock.dim(),
                found,
            });
        }
    }
    let shape = bedrock.dim();

    let mut disagreeing = Array2::from_elem(shape, false);
    let mut all = Vec::new();
    for ((row, col), &code) in reference.indexed_iter() {
        let point = GridPoint::new(row, col);
        let surface = SurfaceType::from_code(code).ok_or(MaskError::UnknownSurfaceCode { code, point })?;
        let water = ice_base[[row, col]] > bedrock[[row, col]];
        if water != surface.has_ocean_water() {
            disagreeing[[row, col]] = true;
            all.push(point);
        }
    }

    let documented_set: BTreeSet<GridPoint> = config.documented_discrepancies.iter().copied().collect();
    let mut check = ReferenceCheck {
        compared: reference.len(),
        ..Default::default()
    };
    let mut clustered = Vec::new();
    for p in all {
        if documented_set.contains(&p) {
            check.documented.push(p);
        } else if p.neighbours8(shape).any(|q| disagreeing[q.as_index()]) {
            clustered.push(p);
        } else {
            check.isolated.push(p);
        }
    }

    if !clustered.is_empty() {
        return Err(MaskError::ReferenceDisagreement {
            clustered: clustered.len(),
            isolated: check.isolated.len(),
            first: clustered[0],
        });
    }
    if let Some(max) = config.max_isolated_discrepancies {
        if check.isolated.len() > max {
            return Err(MaskError::TooManyIsolated {
                found: check.isolated.len(),
                max,
            });
        }
    }
    if !check.is_exact() {
        log::warn!(
            "water presence disagrees with reference classification at {} documented and {} isolated cells",
            check.documented.len(),
            check.isolated.len()
        );
    }
    Ok(check)
}

/// Reconciled model mask with a summary of each step.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Final mask
    pub mask: OceanMask,
    /// Statistics of the raw derived mask
    pub derived: MaskStatistics,
    /// Number of overrides applied
    pub patched: usize,
    /// Wet cells removed as not connected to an open side
    pub disconnected: usize,
}

/// Derive, edit and connectivity-filter the mask of a model-grid topography.
///
/// # Errors
/// Failing overrides, or `NoOpenWater` if no wet cell reaches an open side.
pub fn reconcile_mask(
    topography: &Topography,
    open: &SideBoundaries<bool>,
    config: &MaskConfig,
) -> Result<Reconciliation, MaskError> {
    let derived = OceanMask::from_elevations(&topography.bedrock, &topography.ice_base, config.min_depth)?;
    let derived_stats = derived.statistics();
    let patched = apply_patches(&derived, &topography.grid, &config.patches)?;
    check_opened_cells(topography, config)?;
    let (mask, disconnected) = patched.keep_connected_to(open);
    if mask.wet_count() == 0 {
        return Err(MaskError::NoOpenWater);
    }
    log::info!(
        "ocean mask: {} wet of {} cells, {} overrides, {} disconnected cells removed",
        mask.wet_count(),
        derived_stats.total_cells,
        config.patches.len(),
        disconnected
    );
    Ok(Reconciliation {
        mask,
        derived: derived_stats,
        patched: config.patches.len(),
        disconnected,
    })
}

/// Every opened cell must end up deeper than `min_depth` and its ice draft.
fn check_opened_cells(topography: &Topography, config: &MaskConfig) -> Result<(), MaskError> {
    for (index, patch) in config.patches.iter().enumerate().filter(|(_, patch)| patch.set_wet) {
        let p = patch.point();
        let depth = patch.depth.unwrap_or(-topography.bedrock[[p.row, p.col]]);
        let ice_draft = (-topography.ice_base[[p.row, p.col]]).max(0.0);
        if !(depth > config.min_depth && depth > ice_draft) {
            return Err(MaskError::PatchWithoutWater {
                index,
                point: p,
                depth,
                ice_draft,
                min_depth: config.min_depth,
                reason: patch.reason.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::PolarStereographic;
    use crate::mesh::GeodeticGrid;
    use ndarray::Array1;

    // 5 x 5 source grid, ocean in the southern three rows.
    fn source() -> (Array2<f64>, Array2<f64>, Array2<u8>) {
        let bedrock = Array2::from_shape_fn((5, 5), |(r, _)| if r < 3 { -100.0 } else { 10.0 });
        let ice_base = Array2::from_shape_fn((5, 5), |(r, _)| if r < 3 { 0.0 } else { 10.0 });
        let codes = Array2::from_shape_fn((5, 5), |(r, _)| if r < 3 { 0 } else { 1 });
        (bedrock, ice_base, codes)
    }

    #[test]
    fn test_reference_exact() {
        let (bed, base, codes) = source();
        let check = check_reference(&bed, &base, &codes, &MaskConfig::default()).unwrap();
        assert!(check.is_exact());
        assert_eq!(check.compared, 25);
    }

    #[test]
    fn test_isolated_disagreement_accepted() {
        let (bed, base, mut codes) = source();
        codes[[0, 0]] = 2;
        let check = check_reference(&bed, &base, &codes, &MaskConfig::default()).unwrap();
        assert_eq!(check.isolated, vec![GridPoint::new(0, 0)]);

        let strict = MaskConfig::default().with_max_isolated(0);
        let err = check_reference(&bed, &base, &codes, &strict).unwrap_err();
        assert!(matches!(err, MaskError::TooManyIsolated { found: 1, max: 0 }));
    }

    #[test]
    fn test_clustered_disagreement_fails() {
        let (bed, base, mut codes) = source();
        codes[[1, 1]] = 1;
        codes[[1, 2]] = 1;
        let err = check_reference(&bed, &base, &codes, &MaskConfig::default()).unwrap_err();
        assert!(matches!(err, MaskError::ReferenceDisagreement { clustered: 2, .. }));

        let documented = MaskConfig::default()
            .with_documented_discrepancy(GridPoint::new(1, 1))
            .with_documented_discrepancy(GridPoint::new(1, 2));
        let check = check_reference(&bed, &base, &codes, &documented).unwrap();
        assert_eq!(check.documented.len(), 2);
    }

    #[test]
    fn test_floating_ice_counts_as_water() {
        let (bed, mut base, mut codes) = source();
        base[[2, 2]] = -50.0;
        codes[[2, 2]] = SurfaceType::FloatingIce.code();
        assert!(check_reference(&bed, &base, &codes, &MaskConfig::default()).unwrap().is_exact());
    }

    #[test]
    fn test_unknown_code() {
        let (bed, base, mut codes) = source();
        codes[[4, 4]] = 7;
        let err = check_reference(&bed, &base, &codes, &MaskConfig::default()).unwrap_err();
        assert!(matches!(err, MaskError::UnknownSurfaceCode { code: 7, .. }));
    }

    #[test]
    fn test_reconcile_removes_lake() {
        let grid = GeodeticGrid::new(
            Array1::linspace(-20.0, -18.0, 5),
            Array1::linspace(79.0, 80.0, 5),
            &PolarStereographic::epsg_3413(),
        )
        .unwrap();
        let (mut bed, mut base, _) = source();
        // lake in the dry north
        bed[[4, 2]] = -30.0;
        base[[4, 2]] = 0.0;
        let topo = Topography::new(grid, bed, base).unwrap();
        let open = SideBoundaries::new(false, false, true, true);
        let rec = reconcile_mask(&topo, &open, &MaskConfig::default()).unwrap();
        assert_eq!(rec.disconnected, 1);
        assert_eq!(rec.mask.wet_count(), 15);
        assert_eq!(rec.derived.wet_cells, 16);
    }

    #[test]
    fn test_opened_cell_needs_water() {
        let grid = GeodeticGrid::new(
            Array1::linspace(-20.0, -18.0, 5),
            Array1::linspace(79.0, 80.0, 5),
            &PolarStereographic::epsg_3413(),
        )
        .unwrap();
        let (bed, base, _) = source();
        let topo = Topography::new(grid, bed, base).unwrap();
        let open = SideBoundaries::new(false, false, false, true);

        let dry = MaskConfig::default().with_patch(MaskPatch::open(3, 2, "inlet"));
        let err = reconcile_mask(&topo, &open, &dry).unwrap_err();
        assert!(matches!(err, MaskError::PatchWithoutWater { index: 0, depth, .. } if depth == -10.0));

        let deepened = MaskConfig::default().with_patch(MaskPatch::open(3, 2, "inlet").with_depth(25.0));
        let rec = reconcile_mask(&topo, &open, &deepened).unwrap();
        assert!(rec.mask.is_wet(GridPoint::new(3, 2)));
        assert_eq!(deepened.patched_depths().collect::<Vec<_>>(), vec![(GridPoint::new(3, 2), 25.0)]);

        let shallow = MaskConfig::default().with_patch(MaskPatch::open(3, 2, "inlet").with_depth(1.0));
        assert!(reconcile_mask(&topo, &open, &shallow).is_err());
    }
}

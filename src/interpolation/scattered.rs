//! Scattered-data interpolation on planar node positions.
//!
//! Both interpolators return NaN where they cannot produce a value, so the
//! caller decides how to fill gaps.

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::{Deserialize, Serialize};

use super::triangulation::Triangulation;

/// Primary interpolation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScatterMethod {
    /// Value of the nearest node
    Nearest,
    /// Barycentric interpolation on the Delaunay triangulation
    #[default]
    Linear,
}

/// Node entry stored in the R-tree.
#[derive(Debug, Clone)]
struct NodeEntry {
    index: usize,
    position: [f64; 2],
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Nearest-node lookup over a fixed set of planar points.
#[derive(Debug, Clone)]
pub struct NodeIndex {
    tree: RTree<NodeEntry>,
    len: usize,
}

impl NodeIndex {
    /// Bulk-load an index over `points`.
    pub fn new(points: &[[f64; 2]]) -> Self {
        let entries: Vec<NodeEntry> = points
            .iter()
            .enumerate()
            .map(|(index, &position)| NodeEntry { index, position })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            len: points.len(),
        }
    }

    /// Number of indexed points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the point closest to `p`.
    ///
    /// Ties go to the lowest index.
    pub fn nearest(&self, p: [f64; 2]) -> Option<usize> {
        let mut iter = self.tree.nearest_neighbor_iter_with_distance_2(&p);
        let (first, d0) = iter.next()?;
        let mut best = first.index;
        for (entry, d) in iter {
            if d > d0 {
                break;
            }
            best = best.min(entry.index);
        }
        Some(best)
    }
}

/// Interpolation from node values to arbitrary planar points.
pub trait ScatteredInterpolator: Send + Sync {
    /// Number of source nodes the interpolator was built on.
    fn n_nodes(&self) -> usize;

    /// Interpolate `values` (one per node) at `p`. NaN where undefined.
    fn interpolate(&self, values: &[f64], p: [f64; 2]) -> f64;

    /// Interpolate at many points.
    fn interpolate_points(&self, values: &[f64], points: &[[f64; 2]]) -> Vec<f64> {
        points.iter().map(|&p| self.interpolate(values, p)).collect()
    }
}

/// Nearest-neighbour interpolation.
#[derive(Debug, Clone)]
pub struct NearestInterpolator {
    index: NodeIndex,
}

impl NearestInterpolator {
    /// Build over the given nodes.
    pub fn new(points: &[[f64; 2]]) -> Self {
        Self {
            index: NodeIndex::new(points),
        }
    }

    /// The underlying node index.
    pub fn index(&self) -> &NodeIndex {
        &self.index
    }
}

impl ScatteredInterpolator for NearestInterpolator {
    fn n_nodes(&self) -> usize {
        self.index.len()
    }

    fn interpolate(&self, values: &[f64], p: [f64; 2]) -> f64 {
        self.index.nearest(p).map_or(f64::NAN, |i| values[i])
    }
}

/// Piecewise-linear interpolation; NaN outside the convex hull.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    triangulation: Triangulation,
}

impl LinearInterpolator {
    /// Triangulate the given nodes.
    pub fn new(points: &[[f64; 2]]) -> Self {
        Self {
            triangulation: Triangulation::new(points),
        }
    }

    /// The underlying triangulation.
    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }
}

impl ScatteredInterpolator for LinearInterpolator {
    fn n_nodes(&self) -> usize {
        self.triangulation.n_points()
    }

    fn interpolate(&self, values: &[f64], p: [f64; 2]) -> f64 {
        self.triangulation.interpolate(values, p)
    }
}

/// Build the interpolator for `method`.
pub fn build_interpolator(method: ScatterMethod, points: &[[f64; 2]]) -> Box<dyn ScatteredInterpolator> {
    match method {
        ScatterMethod::Nearest => Box::new(NearestInterpolator::new(points)),
        ScatterMethod::Linear => Box::new(LinearInterpolator::new(points)),
    }
}

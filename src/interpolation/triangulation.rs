//! Delaunay triangulation of scattered planar points.
//!
//! Bowyer-Watson insertion into a large enclosing triangle. Coordinates are
//! shifted by their mean before insertion to keep the in-circle
//! determinants well conditioned for projected coordinates of order 1e6 m.
//! The triangles whose circumcircle holds a new point are found through an
//! R-tree of circumcircle boxes, so each insertion only visits triangles
//! near the point.
//!
//! Triangles touching the enclosing triangle are dropped at the end. For
//! nearly collinear hull points this can leave thin slivers of the convex
//! hull untriangulated; lookups there return `None` like any point outside
//! the hull.

use rstar::{AABB, RTree, RTreeObject};
use std::collections::{HashMap, HashSet};

/// Relative tolerance of the point-in-triangle test.
const BARYCENTRIC_TOLERANCE: f64 = 1e-12;

/// Scale of the enclosing triangle relative to the point extent.
const SUPER_TRIANGLE_SCALE: f64 = 20.0;

/// Relative growth of circumcircle boxes so rounding never hides a candidate.
const CIRCUMCIRCLE_PADDING: f64 = 1e-9;

/// Bounding box of one triangle (or of its circumcircle during insertion),
/// indexed in the R-tree.
#[derive(Debug, Clone, PartialEq)]
struct TriangleEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for TriangleEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Delaunay triangulation with point location.
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// Input points shifted by `origin`
    points: Vec<[f64; 2]>,
    origin: [f64; 2],
    /// Counter-clockwise vertex triples, indices into the input points
    triangles: Vec<[usize; 3]>,
    tree: RTree<TriangleEnvelope>,
}

impl Triangulation {
    /// Triangulate `points`.
    ///
    /// Duplicate points are inserted once; triangles refer to the first
    /// occurrence. Fewer than three distinct non-collinear points give an
    /// empty triangulation.
    pub fn new(points: &[[f64; 2]]) -> Self {
        let n = points.len();
        let origin = if n == 0 {
            [0.0, 0.0]
        } else {
            let sx: f64 = points.iter().map(|p| p[0]).sum();
            let sy: f64 = points.iter().map(|p| p[1]).sum();
            [sx / n as f64, sy / n as f64]
        };
        let shifted: Vec<[f64; 2]> = points.iter().map(|p| [p[0] - origin[0], p[1] - origin[1]]).collect();

        let mut seen = HashMap::new();
        let unique: Vec<usize> = (0..n)
            .filter(|&i| {
                let key = (points[i][0].to_bits(), points[i][1].to_bits());
                seen.insert(key, i).is_none()
            })
            .collect();

        let triangles = if unique.len() < 3 {
            Vec::new()
        } else {
            bowyer_watson(&shifted, &unique)
        };

        let envelopes = triangles
            .iter()
            .enumerate()
            .map(|(index, t)| {
                let (a, b, c) = (shifted[t[0]], shifted[t[1]], shifted[t[2]]);
                let lower = [a[0].min(b[0]).min(c[0]), a[1].min(b[1]).min(c[1])];
                let upper = [a[0].max(b[0]).max(c[0]), a[1].max(b[1]).max(c[1])];
                TriangleEnvelope {
                    index,
                    aabb: AABB::from_corners(lower, upper),
                }
            })
            .collect();

        Self {
            points: shifted,
            origin,
            triangles,
            tree: RTree::bulk_load(envelopes),
        }
    }

    /// Number of input points (duplicates included).
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// Triangles as counter-clockwise index triples.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Triangle containing `p` and the barycentric weights of its vertices.
    pub fn locate(&self, p: [f64; 2]) -> Option<(usize, [f64; 3])> {
        let q = [p[0] - self.origin[0], p[1] - self.origin[1]];
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point(q))
            .filter_map(|env| {
                let t = self.triangles[env.index];
                barycentric(self.points[t[0]], self.points[t[1]], self.points[t[2]], q).map(|w| (env.index, w))
            })
            .min_by_key(|(index, _)| *index)
    }

    /// Linear interpolation of per-point `values` at `p`.
    ///
    /// NaN outside the triangulation or when a vertex value is NaN.
    pub fn interpolate(&self, values: &[f64], p: [f64; 2]) -> f64 {
        match self.locate(p) {
            Some((index, w)) => {
                let t = self.triangles[index];
                w[0] * values[t[0]] + w[1] * values[t[1]] + w[2] * values[t[2]]
            }
            None => f64::NAN,
        }
    }
}

/// Triangles under construction with an R-tree of their circumcircle boxes.
///
/// Removed triangles are only marked dead, so indices stay stable.
struct Cavities {
    vertices: Vec<[f64; 2]>,
    domain: AABB<[f64; 2]>,
    triangles: Vec<[usize; 3]>,
    alive: Vec<bool>,
    circles: Vec<TriangleEnvelope>,
    tree: RTree<TriangleEnvelope>,
}

impl Cavities {
    fn add(&mut self, t: [usize; 3]) {
        let [a, b, c] = t.map(|v| self.vertices[v]);
        let envelope = TriangleEnvelope {
            index: self.triangles.len(),
            aabb: circumcircle_envelope(a, b, c, &self.domain),
        };
        self.triangles.push(t);
        self.alive.push(true);
        self.tree.insert(envelope.clone());
        self.circles.push(envelope);
    }

    fn remove(&mut self, index: usize) {
        self.alive[index] = false;
        self.tree.remove(&self.circles[index]);
    }

    /// Live triangles whose circumcircle strictly contains `p`.
    fn conflicts(&self, p: [f64; 2]) -> Vec<usize> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point(p))
            .map(|env| env.index)
            .filter(|&i| {
                let [a, b, c] = self.triangles[i].map(|v| self.vertices[v]);
                in_circumcircle(a, b, c, p)
            })
            .collect()
    }
}

fn bowyer_watson(points: &[[f64; 2]], order: &[usize]) -> Vec<[usize; 3]> {
    let n = points.len();
    let extent = order
        .iter()
        .map(|&i| points[i][0].abs().max(points[i][1].abs()))
        .fold(1.0_f64, f64::max);
    let d = SUPER_TRIANGLE_SCALE * extent;

    // Vertices n, n + 1, n + 2 enclose every point.
    let mut vertices = points.to_vec();
    vertices.push([-d, -d]);
    vertices.push([d, -d]);
    vertices.push([0.0, d]);
    let mut cavities = Cavities {
        vertices,
        domain: AABB::from_corners([-d, -d], [d, d]),
        triangles: Vec::new(),
        alive: Vec::new(),
        circles: Vec::new(),
        tree: RTree::new(),
    };
    cavities.add([n, n + 1, n + 2]);

    for &ip in order {
        let bad = cavities.conflicts(cavities.vertices[ip]);
        if bad.is_empty() {
            continue;
        }

        let edges: Vec<(usize, usize)> = bad
            .iter()
            .flat_map(|&b| {
                let t = cavities.triangles[b];
                [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]
            })
            .collect();
        let edge_set: HashSet<(usize, usize)> = edges.iter().copied().collect();

        for &b in &bad {
            cavities.remove(b);
        }
        for (u, v) in edges {
            if !edge_set.contains(&(v, u)) {
                cavities.add([u, v, ip]);
            }
        }
    }

    cavities
        .triangles
        .into_iter()
        .zip(cavities.alive)
        .filter(|(t, live)| *live && t.iter().all(|&v| v < n))
        .map(|(t, _)| t)
        .collect()
}

/// Bounding box of the circumcircle of `abc`, clipped to `domain`.
///
/// Degenerate triangles get the whole domain.
fn circumcircle_envelope(a: [f64; 2], b: [f64; 2], c: [f64; 2], domain: &AABB<[f64; 2]>) -> AABB<[f64; 2]> {
    let det = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
    let (a2, b2, c2) = (
        a[0] * a[0] + a[1] * a[1],
        b[0] * b[0] + b[1] * b[1],
        c[0] * c[0] + c[1] * c[1],
    );
    let ux = (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / det;
    let uy = (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / det;
    let r = (a[0] - ux).hypot(a[1] - uy) * (1.0 + CIRCUMCIRCLE_PADDING);
    if !(ux.is_finite() && uy.is_finite() && r.is_finite()) {
        return *domain;
    }
    let (lo, hi) = (domain.lower(), domain.upper());
    AABB::from_corners(
        [(ux - r).max(lo[0]), (uy - r).max(lo[1])],
        [(ux + r).min(hi[0]), (uy + r).min(hi[1])],
    )
}

/// Whether `p` lies strictly inside the circumcircle of the counter-clockwise triangle `abc`.
fn in_circumcircle(a: [f64; 2], b: [f64; 2], c: [f64; 2], p: [f64; 2]) -> bool {
    let (adx, ady) = (a[0] - p[0], a[1] - p[1]);
    let (bdx, bdy) = (b[0] - p[0], b[1] - p[1]);
    let (cdx, cdy) = (c[0] - p[0], c[1] - p[1]);
    let det = (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy) - (bdx * bdx + bdy * bdy) * (adx * cdy - cdx * ady)
        + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady);
    det > 0.0
}

/// Barycentric weights of `p` in `abc`, `None` if outside.
fn barycentric(a: [f64; 2], b: [f64; 2], c: [f64; 2], p: [f64; 2]) -> Option<[f64; 3]> {
    let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
    if det.abs() < f64::MIN_POSITIVE {
        return None;
    }
    let l1 = ((b[1] - c[1]) * (p[0] - c[0]) + (c[0] - b[0]) * (p[1] - c[1])) / det;
    let l2 = ((c[1] - a[1]) * (p[0] - c[0]) + (a[0] - c[0]) * (p[1] - c[1])) / det;
    let l3 = 1.0 - l1 - l2;
    let tol = -BARYCENTRIC_TOLERANCE;
    (l1 >= tol && l2 >= tol && l3 >= tol).then_some([l1, l2, l3])
}

//! Piecewise-linear interpolation on a Delaunay triangulation of the samples,
//! with nearest-sample fill outside the convex hull.
//!
//! Triangulation is incremental Bowyer–Watson in a normalised frame (samples
//! shifted to the origin and scaled to the unit square), started from a large
//! enclosing triangle whose vertices are dropped at the end. Triangles are then
//! indexed by bounding box in an R-tree for point location.
use std::collections::HashSet;

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;

use crate::coords::Point2D;
use crate::error::{Error, Result};

use super::{Interpolator, NearestInterpolator};

/// Half-size of the enclosing triangle, in normalised units.
const SUPER_SCALE: f64 = 1.0e3;
/// Barycentric slack for points on a triangle edge.
const EDGE_EPS: f64 = 1.0e-9;
/// Relative cross product below which the sample set counts as collinear.
const COLLINEAR_EPS: f64 = 1.0e-12;

#[derive(Debug, Clone, Copy)]
struct Tri {
    v: [usize; 3],
    centre: [f64; 2],
    r2: f64,
}

impl Tri {
    fn new(v: [usize; 3], pts: &[[f64; 2]]) -> Self {
        let (centre, r2) = circumcircle(pts[v[0]], pts[v[1]], pts[v[2]])
            .unwrap_or(([0.0, 0.0], f64::INFINITY));
        Self { v, centre, r2 }
    }

    #[inline]
    fn circle_contains(&self, p: [f64; 2]) -> bool {
        if self.r2.is_infinite() {
            return true;
        }
        let dx = p[0] - self.centre[0];
        let dy = p[1] - self.centre[1];
        dx * dx + dy * dy < self.r2
    }

    fn edges(&self) -> [(usize, usize); 3] {
        [(self.v[0], self.v[1]), (self.v[1], self.v[2]), (self.v[2], self.v[0])]
    }
}

fn circumcircle(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Option<([f64; 2], f64)> {
    let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
    if d.abs() < f64::EPSILON * 1e-3 {
        return None;
    }
    let a2 = a[0] * a[0] + a[1] * a[1];
    let b2 = b[0] * b[0] + b[1] * b[1];
    let c2 = c[0] * c[0] + c[1] * c[1];
    let ux = (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d;
    let uy = (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d;
    let dx = a[0] - ux;
    let dy = a[1] - uy;
    Some(([ux, uy], dx * dx + dy * dy))
}

/// Bounding box of one triangle, for the R-tree.
#[derive(Debug, Clone, Copy)]
struct TriBox {
    tri: usize,
    min: [f64; 2],
    max: [f64; 2],
}

impl RTreeObject for TriBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PointDistance for TriBox {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = (self.min[0] - point[0]).max(0.0).max(point[0] - self.max[0]);
        let dy = (self.min[1] - point[1]).max(0.0).max(point[1] - self.max[1]);
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        point[0] >= self.min[0] && point[0] <= self.max[0] && point[1] >= self.min[1] && point[1] <= self.max[1]
    }
}

/// Delaunay triangulation of a point set.
pub struct Triangulation {
    /// Distinct input points, in input coordinates.
    points: Vec<Point2D>,
    /// Position of each distinct point in the caller's slice.
    source: Vec<usize>,
    triangles: Vec<[usize; 3]>,
    tree: RTree<TriBox>,
}

impl Triangulation {
    /// Triangulate the finite, distinct points of `input`. For repeated
    /// coordinates the first occurrence is kept. Fewer than three points, or a
    /// collinear set, gives an empty triangulation.
    pub fn build(input: &[Point2D]) -> Self {
        let mut seen = HashSet::new();
        let mut points = Vec::new();
        let mut source = Vec::new();
        for (i, p) in input.iter().enumerate() {
            if !(p.x.is_finite() && p.y.is_finite()) {
                continue;
            }
            if seen.insert((p.x.to_bits(), p.y.to_bits())) {
                points.push(*p);
                source.push(i);
            }
        }

        let triangles = if points.len() < 3 || is_collinear(&points) {
            Vec::new()
        } else {
            bowyer_watson(&points)
        };

        let boxes: Vec<TriBox> = triangles
            .iter()
            .enumerate()
            .map(|(tri, v)| {
                let (a, b, c) = (points[v[0]], points[v[1]], points[v[2]]);
                TriBox {
                    tri,
                    min: [a.x.min(b.x).min(c.x), a.y.min(b.y).min(c.y)],
                    max: [a.x.max(b.x).max(c.x), a.y.max(b.y).max(c.y)],
                }
            })
            .collect();

        debug!(points = points.len(), triangles = triangles.len(), "delaunay triangulation");
        Self {
            points,
            source,
            triangles,
            tree: RTree::bulk_load(boxes),
        }
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    /// Indices (into the caller's slice) of the distinct points.
    pub fn source_indices(&self) -> &[usize] {
        &self.source
    }

    /// Triangles as indices into [`Self::points`], counter-clockwise.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Containing triangle and barycentric weights of `p`.
    pub fn locate(&self, p: Point2D) -> Option<([usize; 3], [f64; 3])> {
        self.tree.locate_all_at_point(&[p.x, p.y]).find_map(|b| {
            let v = self.triangles[b.tri];
            barycentric(p, self.points[v[0]], self.points[v[1]], self.points[v[2]])
                .filter(|l| l.iter().all(|&w| w >= -EDGE_EPS))
                .map(|l| (v, l))
        })
    }
}

fn barycentric(p: Point2D, a: Point2D, b: Point2D, c: Point2D) -> Option<[f64; 3]> {
    let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if det == 0.0 {
        return None;
    }
    let l1 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
    let l2 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
    Some([l1, l2, 1.0 - l1 - l2])
}

fn is_collinear(points: &[Point2D]) -> bool {
    let a = points[0];
    let (far, _) = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, a.distance2_to(p)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    let b = points[far];
    let len2 = a.distance2_to(&b);
    if len2 == 0.0 {
        return true;
    }
    points.iter().all(|p| {
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        cross.abs() <= COLLINEAR_EPS * len2
    })
}

fn bowyer_watson(points: &[Point2D]) -> Vec<[usize; 3]> {
    let n = points.len();
    let (min_x, max_x) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
    let (min_y, max_y) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    let scale = (max_x - min_x).max(max_y - min_y);
    let scale = if scale > 0.0 { scale } else { 1.0 };

    let mut pts: Vec<[f64; 2]> = points
        .iter()
        .map(|p| [(p.x - min_x) / scale, (p.y - min_y) / scale])
        .collect();
    let m = SUPER_SCALE;
    pts.extend_from_slice(&[[-m, -m], [2.0 * m, -m], [-m, 2.0 * m]]);

    let mut tris = vec![Tri::new([n, n + 1, n + 2], &pts)];

    for i in 0..n {
        let p = pts[i];
        let (bad, good): (Vec<Tri>, Vec<Tri>) = tris.into_iter().partition(|t| t.circle_contains(p));

        let edges: Vec<(usize, usize)> = bad.iter().flat_map(|t| t.edges()).collect();
        let boundary = edges
            .iter()
            .filter(|&&(a, b)| !edges.contains(&(b, a)))
            .copied();

        tris = good;
        tris.extend(boundary.map(|(a, b)| Tri::new([a, b, i], &pts)));
    }

    tris.into_iter()
        .map(|t| t.v)
        .filter(|v| v.iter().all(|&k| k < n))
        .collect()
}

/// Linear interpolation inside the hull, nearest sample outside it.
pub struct LinearInterpolator {
    tri: Triangulation,
    values: Vec<f64>,
    fallback: NearestInterpolator,
}

impl LinearInterpolator {
    pub fn new(points: &[Point2D], values: &[f64]) -> Result<Self> {
        if points.len() != values.len() {
            return Err(Error::ShapeMismatch {
                what: "sample values".into(),
                expected: points.len(),
                actual: values.len(),
            });
        }
        let tri = Triangulation::build(points);
        if tri.points().is_empty() {
            return Err(Error::NoSamples);
        }
        let values: Vec<f64> = tri.source_indices().iter().map(|&i| values[i]).collect();
        let fallback = NearestInterpolator::new(tri.points(), &values)?;
        Ok(Self { tri, values, fallback })
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.tri
    }

    /// Linear value, or `None` outside the triangulated hull.
    pub fn linear_at(&self, target: Point2D) -> Option<f64> {
        self.tri
            .locate(target)
            .map(|(v, l)| l[0] * self.values[v[0]] + l[1] * self.values[v[1]] + l[2] * self.values[v[2]])
    }
}

impl Interpolator for LinearInterpolator {
    fn interpolate_at(&self, target: Point2D) -> f64 {
        self.linear_at(target)
            .unwrap_or_else(|| self.fallback.interpolate_at(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct Lcg(u64);

    impl Lcg {
        fn next_f64(&mut self) -> f64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }
    }

    fn plane(p: Point2D) -> f64 {
        2.0 * p.x - 3.0 * p.y + 1.0
    }

    fn scattered(n: usize) -> Vec<Point2D> {
        let mut rng = Lcg(7);
        let mut pts = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(1.0, 1.0),
        ];
        for _ in 0..n {
            pts.push(Point2D::new(rng.next_f64(), rng.next_f64()));
        }
        pts
    }

    #[test]
    fn square_with_centre_gives_four_triangles() {
        let pts = [
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(0.5, 0.5),
        ];
        let t = Triangulation::build(&pts);
        assert_eq!(t.triangles().len(), 4);
    }

    #[test]
    fn triangles_are_delaunay() {
        let pts = scattered(40);
        let t = Triangulation::build(&pts);
        assert!(t.triangles().len() >= pts.len());
        for v in t.triangles() {
            let [a, b, c] = (*v).map(|k| [t.points()[k].x, t.points()[k].y]);
            let (centre, r2) = circumcircle(a, b, c).unwrap();
            for (k, p) in t.points().iter().enumerate() {
                if v.contains(&k) {
                    continue;
                }
                let d2 = (p.x - centre[0]).powi(2) + (p.y - centre[1]).powi(2);
                assert!(d2 >= r2 * (1.0 - 1e-9), "point {k} inside circumcircle of {v:?}");
            }
        }
    }

    #[test]
    fn reproduces_samples_and_planes() {
        let pts = scattered(40);
        let values: Vec<f64> = pts.iter().map(|&p| plane(p)).collect();
        let li = LinearInterpolator::new(&pts, &values).unwrap();

        for (p, v) in pts.iter().zip(&values) {
            assert_abs_diff_eq!(li.interpolate_at(*p), *v, epsilon = 1e-9);
        }

        let mut rng = Lcg(99);
        for _ in 0..200 {
            let q = Point2D::new(0.3 + 0.4 * rng.next_f64(), 0.3 + 0.4 * rng.next_f64());
            let got = li.linear_at(q).expect("inside hull");
            assert_abs_diff_eq!(got, plane(q), epsilon = 1e-9);
        }
    }

    #[test]
    fn outside_hull_falls_back_to_nearest() {
        let pts = [Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0), Point2D::new(0.0, 1.0)];
        let li = LinearInterpolator::new(&pts, &[1.0, 2.0, 3.0]).unwrap();
        assert!(li.linear_at(Point2D::new(2.0, 2.0)).is_none());
        assert_eq!(li.interpolate_at(Point2D::new(1.5, -0.2)), 2.0);
        assert_abs_diff_eq!(li.interpolate_at(Point2D::new(0.25, 0.25)), 1.75, epsilon = 1e-12);
    }

    #[test]
    fn collinear_samples_use_nearest() {
        let pts = [Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0), Point2D::new(2.0, 2.0)];
        let li = LinearInterpolator::new(&pts, &[0.0, 10.0, 20.0]).unwrap();
        assert!(li.triangulation().triangles().is_empty());
        assert_eq!(li.interpolate_at(Point2D::new(1.1, 0.9)), 10.0);
    }

    #[test]
    fn duplicate_location_keeps_first() {
        let pts = [
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(0.0, 0.0),
        ];
        let li = LinearInterpolator::new(&pts, &[5.0, 1.0, 1.0, 99.0]).unwrap();
        assert_eq!(li.triangulation().points().len(), 3);
        assert_abs_diff_eq!(li.interpolate_at(Point2D::new(0.0, 0.0)), 5.0, epsilon = 1e-12);
    }
}

//! Scattered-data interpolation of sample values onto grid cell centres.
//!
//! Four methods share one entry shape: sample positions + values in, one value
//! per target point out (NaN where the method has no answer). Nearest and
//! linear work in whatever frame the caller supplies (lon/lat degrees in the
//! pipeline); IDW and kriging expect a metric frame.
pub mod idw;
pub mod kriging;
pub mod linear;
pub mod nearest;
pub mod variogram;

use std::fmt;
use std::str::FromStr;

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::coords::Point2D;
use crate::error::Error;

pub use idw::{IdwConfig, IdwInterpolator};
pub use kriging::{KrigingConfig, KrigingInterpolator};
pub use linear::{LinearInterpolator, Triangulation};
pub use nearest::NearestInterpolator;
pub use variogram::{EmpiricalVariogram, VariogramModel, VariogramModelKind};

/// Interpolation method for the sample → grid step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Value of the closest sample everywhere.
    NearestFill,
    /// Delaunay-linear inside the sample hull, nearest outside.
    #[default]
    LinearNearest,
    /// Inverse-distance weighting within a search radius.
    Idw,
    /// Local ordinary kriging with a fitted variogram.
    Kriging,
}

impl Method {
    /// True when the method needs samples and targets in a metric frame.
    pub fn is_metric(self) -> bool {
        matches!(self, Method::Idw | Method::Kriging)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::NearestFill => "nearest",
            Method::LinearNearest => "linear",
            Method::Idw => "idw",
            Method::Kriging => "kriging",
        };
        f.write_str(s)
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "nearest_fill" => Ok(Method::NearestFill),
            "linear" | "linear_nearest" => Ok(Method::LinearNearest),
            "idw" => Ok(Method::Idw),
            "kriging" | "ok" => Ok(Method::Kriging),
            other => Err(Error::InvalidConfig(format!(
                "unknown method '{other}' (expected nearest, linear, idw or kriging)"
            ))),
        }
    }
}

/// Anything that turns a set of target points into interpolated values.
pub trait Interpolator {
    fn interpolate_at(&self, target: Point2D) -> f64;

    /// Evaluate every target, in parallel with the `threading` feature.
    fn interpolate(&self, targets: &[Point2D]) -> Vec<f64>
    where
        Self: Sync,
    {
        map_points(targets, |p| self.interpolate_at(p))
    }
}

/// Apply `f` to every point; NaN targets stay NaN.
pub(crate) fn map_points<F>(targets: &[Point2D], f: F) -> Vec<f64>
where
    F: Fn(Point2D) -> f64 + Sync + Send,
{
    let eval = |p: &Point2D| {
        if p.x.is_finite() && p.y.is_finite() {
            f(*p)
        } else {
            f64::NAN
        }
    };
    #[cfg(feature = "threading")]
    {
        use rayon::prelude::*;
        targets.par_iter().map(eval).collect()
    }
    #[cfg(not(feature = "threading"))]
    {
        targets.iter().map(eval).collect()
    }
}

// ── Spatial index ─────────────────────────────────────────────────────────────

/// A sample position tagged with its index in the input slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedPoint {
    pub pos: [f64; 2],
    pub idx: usize,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.pos[0] - point[0];
        let dy = self.pos[1] - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree over sample positions.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    tree: RTree<IndexedPoint>,
}

impl SampleIndex {
    /// Index the finite points; points with NaN coordinates are skipped.
    pub fn new(points: &[Point2D]) -> Self {
        let entries: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.x.is_finite() && p.y.is_finite())
            .map(|(idx, p)| IndexedPoint { pos: [p.x, p.y], idx })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Index and distance of the closest point.
    pub fn nearest(&self, p: Point2D) -> Option<(usize, f64)> {
        let q = [p.x, p.y];
        self.tree
            .nearest_neighbor(&q)
            .map(|e| (e.idx, e.distance_2(&q).sqrt()))
    }

    /// Up to `k` closest points, nearest first.
    pub fn k_nearest(&self, p: Point2D, k: usize) -> Vec<(usize, f64)> {
        let q = [p.x, p.y];
        self.tree
            .nearest_neighbor_iter(&q)
            .take(k)
            .map(|e| (e.idx, e.distance_2(&q).sqrt()))
            .collect()
    }

    /// All points within `radius`, nearest first.
    pub fn within(&self, p: Point2D, radius: f64) -> Vec<(usize, f64)> {
        let q = [p.x, p.y];
        let mut hits: Vec<(usize, f64)> = self
            .tree
            .locate_within_distance(q, radius * radius)
            .map(|e| (e.idx, e.distance_2(&q).sqrt()))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts() -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(f64::NAN, 3.0),
            Point2D::new(3.0, 4.0),
        ]
    }

    #[test]
    fn method_parses_cli_names() {
        assert_eq!("nearest".parse::<Method>().unwrap(), Method::NearestFill);
        assert_eq!("Linear".parse::<Method>().unwrap(), Method::LinearNearest);
        assert_eq!("idw".parse::<Method>().unwrap(), Method::Idw);
        assert_eq!("kriging".parse::<Method>().unwrap(), Method::Kriging);
        assert!("spline".parse::<Method>().is_err());
        assert_eq!(Method::Idw.to_string(), "idw");
    }

    #[test]
    fn method_serde_names() {
        assert_eq!(serde_json::to_string(&Method::LinearNearest).unwrap(), "\"linear_nearest\"");
        let m: Method = serde_json::from_str("\"nearest_fill\"").unwrap();
        assert_eq!(m, Method::NearestFill);
    }

    #[test]
    fn index_skips_nan_points() {
        let idx = SampleIndex::new(&pts());
        assert_eq!(idx.len(), 4);
    }

    #[test]
    fn nearest_and_radius_queries() {
        let idx = SampleIndex::new(&pts());
        let (i, d) = idx.nearest(Point2D::new(2.9, 4.1)).unwrap();
        assert_eq!(i, 4);
        assert!(d < 0.2);

        let hits = idx.within(Point2D::new(0.0, 0.0), 5.0);
        let ids: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(ids, vec![0, 4]);
        assert!((hits[1].1 - 5.0).abs() < 1e-12);

        let k = idx.k_nearest(Point2D::new(9.0, 1.0), 2);
        assert_eq!(k[0].0, 1);
        assert_eq!(k.len(), 2);
    }

    #[test]
    fn empty_index() {
        let idx = SampleIndex::new(&[]);
        assert!(idx.is_empty());
        assert!(idx.nearest(Point2D::new(0.0, 0.0)).is_none());
    }
}

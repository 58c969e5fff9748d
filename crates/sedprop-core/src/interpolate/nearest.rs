//! Nearest-sample fill.
use crate::coords::Point2D;
use crate::error::{Error, Result};

use super::{Interpolator, SampleIndex};

pub struct NearestInterpolator {
    index: SampleIndex,
    values: Vec<f64>,
}

impl NearestInterpolator {
    pub fn new(points: &[Point2D], values: &[f64]) -> Result<Self> {
        if points.len() != values.len() {
            return Err(Error::ShapeMismatch {
                what: "sample values".into(),
                expected: points.len(),
                actual: values.len(),
            });
        }
        let index = SampleIndex::new(points);
        if index.is_empty() {
            return Err(Error::NoSamples);
        }
        Ok(Self {
            index,
            values: values.to_vec(),
        })
    }

    /// Index of the closest sample.
    pub fn nearest_index(&self, target: Point2D) -> Option<usize> {
        self.index.nearest(target).map(|(i, _)| i)
    }
}

impl Interpolator for NearestInterpolator {
    fn interpolate_at(&self, target: Point2D) -> f64 {
        self.nearest_index(target)
            .map_or(f64::NAN, |i| self.values[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_closest_value() {
        let pts = [Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0)];
        let n = NearestInterpolator::new(&pts, &[10.0, 20.0]).unwrap();
        let out = n.interpolate(&[Point2D::new(0.2, 0.3), Point2D::new(0.8, -5.0), Point2D::new(f64::NAN, 0.0)]);
        assert_eq!(out[0], 10.0);
        assert_eq!(out[1], 20.0);
        assert!(out[2].is_nan());
    }

    #[test]
    fn empty_is_error() {
        assert!(matches!(NearestInterpolator::new(&[], &[]), Err(Error::NoSamples)));
    }

    #[test]
    fn length_mismatch_is_error() {
        let pts = [Point2D::new(0.0, 0.0)];
        assert!(NearestInterpolator::new(&pts, &[1.0, 2.0]).is_err());
    }
}

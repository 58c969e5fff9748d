//! Inverse-distance weighting within a search radius.
//!
//! z(x) = Σ wᵢ zᵢ / Σ wᵢ with wᵢ = 1 / dᵢᵖ, over the samples within
//! `search_radius` of x (nearest first, optionally capped at `max_neighbors`).
//! A target closer than `distance_tolerance` to a sample takes that sample's
//! value. Distances are Euclidean, so coordinates must be metric.
use serde::{Deserialize, Serialize};

use crate::coords::Point2D;
use crate::error::{Error, Result};

use super::{Interpolator, SampleIndex};

/// Default search radius in projected metres.
pub const IDW_SEARCH_RADIUS_M: f64 = 5_000.0;
pub const IDW_POWER: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwConfig {
    pub power: f64,
    /// `None` searches all samples.
    pub search_radius: Option<f64>,
    pub max_neighbors: Option<usize>,
    /// Fewer neighbours than this inside the radius gives NaN.
    pub min_neighbors: usize,
    pub distance_tolerance: f64,
}

impl Default for IdwConfig {
    fn default() -> Self {
        Self {
            power: IDW_POWER,
            search_radius: Some(IDW_SEARCH_RADIUS_M),
            max_neighbors: None,
            min_neighbors: 1,
            distance_tolerance: 1e-10,
        }
    }
}

impl IdwConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_search_radius(mut self, radius: f64) -> Self {
        self.search_radius = Some(radius);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.search_radius = None;
        self
    }

    pub fn with_max_neighbors(mut self, n: usize) -> Self {
        self.max_neighbors = Some(n);
        self
    }

    pub fn with_min_neighbors(mut self, n: usize) -> Self {
        self.min_neighbors = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.power.is_finite() && self.power > 0.0) {
            return Err(Error::InvalidConfig(format!("IDW power must be positive, got {}", self.power)));
        }
        if let Some(r) = self.search_radius {
            if !(r.is_finite() && r > 0.0) {
                return Err(Error::InvalidConfig(format!("IDW search radius must be positive, got {r}")));
            }
        }
        if self.max_neighbors == Some(0) {
            return Err(Error::InvalidConfig("IDW max_neighbors must be at least 1".into()));
        }
        if let Some(max) = self.max_neighbors {
            if self.min_neighbors > max {
                return Err(Error::InvalidConfig(format!(
                    "IDW min_neighbors ({}) exceeds max_neighbors ({max})",
                    self.min_neighbors
                )));
            }
        }
        if self.distance_tolerance < 0.0 {
            return Err(Error::InvalidConfig("IDW distance tolerance must be non-negative".into()));
        }
        Ok(())
    }
}

/// Leave-one-out error summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub rmse: f64,
    pub mae: f64,
    pub max_error: f64,
    /// Samples that had at least one neighbour once left out.
    pub count: usize,
}

pub struct IdwInterpolator {
    points: Vec<Point2D>,
    values: Vec<f64>,
    index: SampleIndex,
    config: IdwConfig,
}

impl IdwInterpolator {
    pub fn new(points: &[Point2D], values: &[f64], config: IdwConfig) -> Result<Self> {
        config.validate()?;
        if points.len() != values.len() {
            return Err(Error::ShapeMismatch {
                what: "sample values".into(),
                expected: points.len(),
                actual: values.len(),
            });
        }
        if points.is_empty() {
            return Err(Error::NoSamples);
        }
        Ok(Self {
            points: points.to_vec(),
            values: values.to_vec(),
            index: SampleIndex::new(points),
            config,
        })
    }

    pub fn config(&self) -> &IdwConfig {
        &self.config
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// Interpolate, leaving out sample `skip` if given.
    fn estimate(&self, target: Point2D, skip: Option<usize>) -> f64 {
        let mut neighbours = match self.config.search_radius {
            Some(r) => self.index.within(target, r),
            None => self.index.k_nearest(target, self.index.len()),
        };
        if let Some(s) = skip {
            neighbours.retain(|&(i, _)| i != s);
        }
        if let Some(max_n) = self.config.max_neighbors {
            neighbours.truncate(max_n);
        }

        if let Some(&(i, d)) = neighbours.first() {
            if d < self.config.distance_tolerance {
                return self.values[i];
            }
        }
        if neighbours.is_empty() || neighbours.len() < self.config.min_neighbors {
            return f64::NAN;
        }
        if let [(i, _)] = neighbours[..] {
            return self.values[i];
        }

        let p = self.config.power;
        let (num, den) = neighbours.iter().fold((0.0, 0.0), |(num, den), &(i, d)| {
            let w = 1.0 / d.powf(p);
            (num + w * self.values[i], den + w)
        });
        if den > 0.0 {
            num / den
        } else {
            f64::NAN
        }
    }

    /// Leave-one-out cross-validation over all samples.
    pub fn cross_validation(&self) -> CrossValidation {
        let mut sum_sq = 0.0;
        let mut sum_abs = 0.0;
        let mut max_error: f64 = 0.0;
        let mut count = 0usize;

        for (i, (p, &truth)) in self.points.iter().zip(&self.values).enumerate() {
            let predicted = self.estimate(*p, Some(i));
            if predicted.is_nan() {
                continue;
            }
            let err = (predicted - truth).abs();
            sum_sq += err * err;
            sum_abs += err;
            max_error = max_error.max(err);
            count += 1;
        }

        if count == 0 {
            return CrossValidation {
                rmse: f64::NAN,
                mae: f64::NAN,
                max_error: f64::NAN,
                count,
            };
        }
        CrossValidation {
            rmse: (sum_sq / count as f64).sqrt(),
            mae: sum_abs / count as f64,
            max_error,
            count,
        }
    }
}

impl Interpolator for IdwInterpolator {
    fn interpolate_at(&self, target: Point2D) -> f64 {
        self.estimate(target, None)
    }
}

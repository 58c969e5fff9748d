//! Local ordinary kriging.
//!
//! Each target is estimated from its `max_neighbors` nearest samples by solving
//! the bordered semivariogram system
//!
//! ```text
//! | Γ  1 | | λ |   | γ₀ |
//! | 1ᵀ 0 | | μ | = | 1  |
//! ```
//!
//! with an LU decomposition. The estimate is Σ λᵢ zᵢ and the kriging variance
//! Σ λᵢ γ₀ᵢ + μ. Unless one is supplied, the variogram is fitted to the
//! samples' empirical semivariogram.
use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::coords::Point2D;
use crate::error::{Error, Result};

use super::variogram::{EmpiricalVariogram, VariogramModel, VariogramModelKind};
use super::{map_points, Interpolator, SampleIndex};

pub const KRIGING_MAX_NEIGHBORS: usize = 16;
pub const KRIGING_N_LAGS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KrigingConfig {
    /// Model family used when fitting.
    pub model: VariogramModelKind,
    pub n_lags: usize,
    /// Defaults to half the largest sample separation.
    pub max_lag: Option<f64>,
    pub max_neighbors: usize,
    /// Fixed model; skips fitting when set.
    pub variogram: Option<VariogramModel>,
}

impl Default for KrigingConfig {
    fn default() -> Self {
        Self {
            model: VariogramModelKind::Spherical,
            n_lags: KRIGING_N_LAGS,
            max_lag: None,
            max_neighbors: KRIGING_MAX_NEIGHBORS,
            variogram: None,
        }
    }
}

impl KrigingConfig {
    pub fn with_model(mut self, model: VariogramModelKind) -> Self {
        self.model = model;
        self
    }

    pub fn with_variogram(mut self, variogram: VariogramModel) -> Self {
        self.variogram = Some(variogram);
        self
    }

    pub fn with_max_neighbors(mut self, n: usize) -> Self {
        self.max_neighbors = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_neighbors == 0 {
            return Err(Error::InvalidConfig("kriging max_neighbors must be at least 1".into()));
        }
        if self.n_lags == 0 {
            return Err(Error::InvalidConfig("kriging n_lags must be at least 1".into()));
        }
        if let Some(m) = self.max_lag {
            if !(m.is_finite() && m > 0.0) {
                return Err(Error::InvalidConfig(format!("kriging max_lag must be positive, got {m}")));
            }
        }
        if let Some(v) = &self.variogram {
            v.validate()?;
        }
        Ok(())
    }
}

pub struct KrigingInterpolator {
    points: Vec<Point2D>,
    values: Vec<f64>,
    index: SampleIndex,
    variogram: VariogramModel,
    max_neighbors: usize,
}

impl KrigingInterpolator {
    /// Build from samples; repeated locations keep their first value.
    pub fn new(points: &[Point2D], values: &[f64], config: &KrigingConfig) -> Result<Self> {
        config.validate()?;
        if points.len() != values.len() {
            return Err(Error::ShapeMismatch {
                what: "sample values".into(),
                expected: points.len(),
                actual: values.len(),
            });
        }

        let mut seen = HashSet::new();
        let (points, values): (Vec<Point2D>, Vec<f64>) = points
            .iter()
            .zip(values)
            .filter(|(p, _)| p.x.is_finite() && p.y.is_finite() && seen.insert((p.x.to_bits(), p.y.to_bits())))
            .map(|(p, v)| (*p, *v))
            .unzip();
        if points.is_empty() {
            return Err(Error::NoSamples);
        }

        let variogram = match config.variogram {
            Some(v) => v,
            None => match EmpiricalVariogram::compute(&points, &values, config.n_lags, config.max_lag)
                .and_then(|ev| ev.fit(config.model))
            {
                Ok((model, _)) => model,
                // Too few pairs to fit: estimates become neighbour means.
                Err(Error::Statistics(reason)) => {
                    debug!(%reason, samples = points.len(), "no variogram fit, using flat model");
                    VariogramModel::new(config.model, 0.0, 0.0, 1.0)
                }
                Err(e) => return Err(e),
            },
        };
        info!(
            samples = points.len(),
            model = %variogram.kind,
            nugget = variogram.nugget,
            sill = variogram.sill,
            range = variogram.range,
            "kriging variogram"
        );

        Ok(Self {
            index: SampleIndex::new(&points),
            points,
            values,
            variogram,
            max_neighbors: config.max_neighbors,
        })
    }

    pub fn variogram(&self) -> &VariogramModel {
        &self.variogram
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// Estimate and kriging variance at `target`; (NaN, NaN) if the local
    /// system is singular.
    pub fn estimate(&self, target: Point2D) -> (f64, f64) {
        let neighbours = self.index.k_nearest(target, self.max_neighbors);
        let m = neighbours.len();
        if m == 0 {
            return (f64::NAN, f64::NAN);
        }
        if self.variogram.total_sill() <= 0.0 {
            // Flat variogram: every weighting is optimal, take the mean.
            let mean = neighbours.iter().map(|&(i, _)| self.values[i]).sum::<f64>() / m as f64;
            return (mean, 0.0);
        }

        let mut a = DMatrix::zeros(m + 1, m + 1);
        let mut b = DVector::zeros(m + 1);
        for (r, &(i, d0)) in neighbours.iter().enumerate() {
            for (c, &(j, _)) in neighbours.iter().enumerate().skip(r + 1) {
                let g = self.variogram.gamma(self.points[i].distance_to(&self.points[j]));
                a[(r, c)] = g;
                a[(c, r)] = g;
            }
            a[(r, m)] = 1.0;
            a[(m, r)] = 1.0;
            b[r] = self.variogram.gamma(d0);
        }
        b[m] = 1.0;

        let Some(x) = a.lu().solve(&b) else {
            debug!(x = target.x, y = target.y, neighbours = m, "singular kriging system");
            return (f64::NAN, f64::NAN);
        };

        let estimate: f64 = neighbours
            .iter()
            .enumerate()
            .map(|(r, &(i, _))| x[r] * self.values[i])
            .sum();
        let variance = b.dot(&x).max(0.0);
        (estimate, variance)
    }

    /// Kriging variance at every target.
    pub fn variance(&self, targets: &[Point2D]) -> Vec<f64> {
        map_points(targets, |p| self.estimate(p).1)
    }
}

impl Interpolator for KrigingInterpolator {
    fn interpolate_at(&self, target: Point2D) -> f64 {
        self.estimate(target).0
    }
}

//! Semivariogram models, the empirical semivariogram and model fitting.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coords::Point2D;
use crate::error::{Error, Result};

/// Range candidates tried per fit, as fractions of the maximum lag.
const RANGE_STEPS: usize = 60;
const RANGE_DIVISOR: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariogramModelKind {
    #[default]
    Spherical,
    Exponential,
    Gaussian,
}

impl VariogramModelKind {
    /// Normalised structure function: 0 at h = 0, → 1 at and beyond the range.
    /// Exponential and gaussian use the practical range (95 % of the sill).
    pub fn structure(self, h: f64, range: f64) -> f64 {
        let r = h / range;
        match self {
            Self::Spherical => {
                if r >= 1.0 {
                    1.0
                } else {
                    1.5 * r - 0.5 * r.powi(3)
                }
            }
            Self::Exponential => 1.0 - (-3.0 * r).exp(),
            Self::Gaussian => 1.0 - (-3.0 * r * r).exp(),
        }
    }
}

impl fmt::Display for VariogramModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spherical => "spherical",
            Self::Exponential => "exponential",
            Self::Gaussian => "gaussian",
        })
    }
}

impl FromStr for VariogramModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spherical" | "sph" => Ok(Self::Spherical),
            "exponential" | "exp" => Ok(Self::Exponential),
            "gaussian" | "gau" => Ok(Self::Gaussian),
            other => Err(Error::InvalidConfig(format!(
                "unknown variogram model '{other}' (expected spherical, exponential or gaussian)"
            ))),
        }
    }
}

/// A bounded semivariogram model: γ(h) = nugget + sill · f(h / range), γ(0) = 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariogramModel {
    pub kind: VariogramModelKind,
    pub nugget: f64,
    /// Partial sill (above the nugget).
    pub sill: f64,
    pub range: f64,
}

impl VariogramModel {
    pub fn new(kind: VariogramModelKind, nugget: f64, sill: f64, range: f64) -> Self {
        Self { kind, nugget, sill, range }
    }

    pub fn spherical(nugget: f64, sill: f64, range: f64) -> Self {
        Self::new(VariogramModelKind::Spherical, nugget, sill, range)
    }

    pub fn exponential(nugget: f64, sill: f64, range: f64) -> Self {
        Self::new(VariogramModelKind::Exponential, nugget, sill, range)
    }

    pub fn gaussian(nugget: f64, sill: f64, range: f64) -> Self {
        Self::new(VariogramModelKind::Gaussian, nugget, sill, range)
    }

    pub fn gamma(&self, h: f64) -> f64 {
        if h < 1e-10 {
            0.0
        } else {
            self.nugget + self.sill * self.kind.structure(h, self.range)
        }
    }

    pub fn covariance(&self, h: f64) -> f64 {
        self.total_sill() - self.gamma(h)
    }

    pub fn total_sill(&self) -> f64 {
        self.nugget + self.sill
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(Error::InvalidConfig(format!("variogram range must be positive, got {}", self.range)));
        }
        if self.nugget < 0.0 || self.sill < 0.0 {
            return Err(Error::InvalidConfig("variogram nugget and sill must be non-negative".into()));
        }
        Ok(())
    }
}

/// Binned half mean squared differences of sample pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalVariogram {
    /// Mean pair distance per non-empty bin.
    pub lags: Vec<f64>,
    pub gamma: Vec<f64>,
    /// Pair count per bin.
    pub counts: Vec<usize>,
    pub max_lag: f64,
}

impl EmpiricalVariogram {
    /// Bin all pairs with 0 < d ≤ `max_lag` into `n_lags` equal-width bins.
    /// `max_lag` defaults to half the largest pair distance.
    pub fn compute(points: &[Point2D], values: &[f64], n_lags: usize, max_lag: Option<f64>) -> Result<Self> {
        if points.len() != values.len() {
            return Err(Error::ShapeMismatch {
                what: "sample values".into(),
                expected: points.len(),
                actual: values.len(),
            });
        }
        if points.len() < 2 {
            return Err(Error::Statistics("semivariogram needs at least two samples".into()));
        }
        if n_lags == 0 {
            return Err(Error::InvalidConfig("n_lags must be at least 1".into()));
        }

        let max_lag = match max_lag {
            Some(m) => m,
            None => {
                let mut max_d: f64 = 0.0;
                for i in 0..points.len() {
                    for j in (i + 1)..points.len() {
                        max_d = max_d.max(points[i].distance_to(&points[j]));
                    }
                }
                max_d / 2.0
            }
        };
        if !(max_lag.is_finite() && max_lag > 0.0) {
            return Err(Error::Statistics("all samples share one location".into()));
        }

        let width = max_lag / n_lags as f64;
        let mut sum_d = vec![0.0; n_lags];
        let mut sum_g = vec![0.0; n_lags];
        let mut counts = vec![0usize; n_lags];

        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let d = points[i].distance_to(&points[j]);
                if d <= 0.0 || d > max_lag {
                    continue;
                }
                let bin = ((d / width).ceil() as usize).saturating_sub(1).min(n_lags - 1);
                let diff = values[i] - values[j];
                sum_d[bin] += d;
                sum_g[bin] += 0.5 * diff * diff;
                counts[bin] += 1;
            }
        }

        let mut out = Self {
            lags: Vec::new(),
            gamma: Vec::new(),
            counts: Vec::new(),
            max_lag,
        };
        for b in 0..n_lags {
            if counts[b] > 0 {
                let n = counts[b] as f64;
                out.lags.push(sum_d[b] / n);
                out.gamma.push(sum_g[b] / n);
                out.counts.push(counts[b]);
            }
        }
        if out.lags.is_empty() {
            return Err(Error::Statistics("no sample pairs within the maximum lag".into()));
        }
        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.lags.is_empty()
    }

    /// Fit a model of the given kind.
    ///
    /// Ranges are searched on a grid of multiples of `max_lag / 40`; for each
    /// range, nugget and partial sill come from a pair-count-weighted,
    /// non-negative least-squares fit. The range with the lowest weighted SSE
    /// wins.
    pub fn fit(&self, kind: VariogramModelKind) -> Result<(VariogramModel, f64)> {
        if self.is_empty() {
            return Err(Error::Statistics("cannot fit an empty semivariogram".into()));
        }
        let mut best: Option<(VariogramModel, f64)> = None;
        for step in 1..=RANGE_STEPS {
            let range = self.max_lag * step as f64 / RANGE_DIVISOR;
            let f: Vec<f64> = self.lags.iter().map(|&h| kind.structure(h, range)).collect();
            let (nugget, sill, sse) = nnls_affine(&f, &self.gamma, &self.counts);
            if best.as_ref().map_or(true, |(_, s)| sse < *s) {
                best = Some((VariogramModel::new(kind, nugget, sill, range), sse));
            }
        }
        let (model, sse) = best.ok_or_else(|| Error::Statistics("variogram fit failed".into()))?;
        debug!(
            kind = %model.kind,
            nugget = model.nugget,
            sill = model.sill,
            range = model.range,
            sse,
            "fitted variogram"
        );
        Ok((model, sse))
    }
}

/// Weighted least squares of g ≈ c0 + c1·f with c0, c1 ≥ 0.
/// Returns (c0, c1, weighted SSE).
fn nnls_affine(f: &[f64], g: &[f64], w: &[usize]) -> (f64, f64, f64) {
    let (mut sw, mut sf, mut sg, mut sff, mut sfg) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for ((&fi, &gi), &wi) in f.iter().zip(g).zip(w) {
        let wi = wi as f64;
        sw += wi;
        sf += wi * fi;
        sg += wi * gi;
        sff += wi * fi * fi;
        sfg += wi * fi * gi;
    }
    let sse = |c0: f64, c1: f64| -> f64 {
        f.iter()
            .zip(g)
            .zip(w)
            .map(|((&fi, &gi), &wi)| {
                let r = gi - c0 - c1 * fi;
                wi as f64 * r * r
            })
            .sum()
    };

    let mut candidates = Vec::with_capacity(3);
    let det = sw * sff - sf * sf;
    if det.abs() > 1e-12 * sw * sff.max(1e-300) {
        let c1 = (sw * sfg - sf * sg) / det;
        let c0 = (sg - c1 * sf) / sw;
        if c0 >= 0.0 && c1 >= 0.0 {
            candidates.push((c0, c1));
        }
    }
    if sff > 0.0 {
        candidates.push((0.0, (sfg / sff).max(0.0)));
    }
    if sw > 0.0 {
        candidates.push(((sg / sw).max(0.0), 0.0));
    }

    candidates
        .into_iter()
        .map(|(c0, c1)| (c0, c1, sse(c0, c1)))
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .unwrap_or((0.0, 0.0, f64::INFINITY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn spherical_shape() {
        let m = VariogramModel::spherical(0.1, 0.9, 100.0);
        assert_eq!(m.gamma(0.0), 0.0);
        assert_abs_diff_eq!(m.gamma(100.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.gamma(250.0), 1.0, epsilon = 1e-12);
        let g = m.gamma(50.0);
        assert!(g > 0.1 && g < 1.0);
        assert_abs_diff_eq!(m.covariance(0.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn practical_range_reaches_95_percent() {
        for m in [VariogramModel::exponential(0.0, 1.0, 100.0), VariogramModel::gaussian(0.0, 1.0, 100.0)] {
            assert_abs_diff_eq!(m.gamma(100.0), 1.0 - (-3.0f64).exp(), epsilon = 1e-12);
            assert!(m.gamma(1_000.0) > 0.999);
        }
    }

    #[test]
    fn kind_parses() {
        assert_eq!("Gaussian".parse::<VariogramModelKind>().unwrap(), VariogramModelKind::Gaussian);
        assert!("cubic".parse::<VariogramModelKind>().is_err());
    }

    #[test]
    fn empirical_of_linear_profile() {
        // v = x on a line: every pair has γ = d² / 2.
        let pts: Vec<Point2D> = (0..=10).map(|i| Point2D::new(i as f64, 0.0)).collect();
        let vals: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let ev = EmpiricalVariogram::compute(&pts, &vals, 5, None).unwrap();
        assert_abs_diff_eq!(ev.max_lag, 5.0, epsilon = 1e-12);
        assert_eq!(ev.lags.len(), 5);
        assert_abs_diff_eq!(ev.lags[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ev.gamma[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(ev.gamma[1], 2.0, epsilon = 1e-12);
        assert_eq!(ev.counts[0], 10);
        assert_eq!(ev.counts[4], 6);
    }

    #[test]
    fn fit_recovers_known_model() {
        let truth = VariogramModel::spherical(0.1, 2.0, 3_000.0);
        let lags: Vec<f64> = (1..=50).map(|k| k as f64 * 100.0).collect();
        let ev = EmpiricalVariogram {
            gamma: lags.iter().map(|&h| truth.gamma(h)).collect(),
            counts: vec![10; lags.len()],
            lags,
            max_lag: 5_000.0,
        };
        let (fit, sse) = ev.fit(VariogramModelKind::Spherical).unwrap();
        assert_abs_diff_eq!(fit.range, 3_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.nugget, 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.sill, 2.0, epsilon = 1e-6);
        assert!(sse < 1e-12);
    }

    #[test]
    fn fit_never_returns_negative_parameters() {
        // Decreasing semivariogram would want a negative sill.
        let ev = EmpiricalVariogram {
            lags: vec![1.0, 2.0, 3.0, 4.0],
            gamma: vec![4.0, 3.0, 2.0, 1.0],
            counts: vec![5, 5, 5, 5],
            max_lag: 4.0,
        };
        let (m, _) = ev.fit(VariogramModelKind::Exponential).unwrap();
        assert!(m.nugget >= 0.0 && m.sill >= 0.0);
        assert_abs_diff_eq!(m.total_sill(), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn coincident_samples_are_an_error() {
        let pts = vec![Point2D::new(1.0, 1.0); 3];
        assert!(EmpiricalVariogram::compute(&pts, &[1.0, 2.0, 3.0], 5, None).is_err());
    }
}

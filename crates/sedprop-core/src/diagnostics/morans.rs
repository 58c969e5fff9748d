//! Global Moran's I of sample values with k-nearest-neighbour weights.
//!
//! Weights are binary kNN, row-standardised (each row sums to 1, so S0 = n).
//! Inference uses the normality assumption:
//! Var(I) = (n² S1 − n S2 + 3 S0²) / ((n² − 1) S0²) − E[I]².
use serde::{Deserialize, Serialize};

use crate::coords::Point2D;
use crate::error::{Error, Result};
use crate::interpolate::SampleIndex;

pub const MORANS_K: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoransI {
    pub i: f64,
    pub expected: f64,
    pub variance: f64,
    pub z_score: f64,
    pub n: usize,
    /// Neighbours per sample actually used (k capped at n − 1).
    pub k: usize,
}

pub fn compute_morans_i(points: &[Point2D], values: &[f64], k: usize) -> Result<MoransI> {
    let n = points.len();
    if n != values.len() {
        return Err(Error::ShapeMismatch {
            what: "sample values".into(),
            expected: n,
            actual: values.len(),
        });
    }
    if n < 3 {
        return Err(Error::Statistics(format!("Moran's I needs at least 3 samples, got {n}")));
    }
    if k == 0 {
        return Err(Error::InvalidConfig("Moran's I needs k >= 1".into()));
    }
    let k = k.min(n - 1);

    let mean = values.iter().sum::<f64>() / n as f64;
    let z: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let m2: f64 = z.iter().map(|d| d * d).sum();
    if m2 <= f64::EPSILON * n as f64 * mean.abs().max(1.0) {
        return Err(Error::Statistics("Moran's I is undefined for constant values".into()));
    }

    // neighbours[i] = k nearest other samples of i
    let index = SampleIndex::new(points);
    let neighbours: Vec<Vec<usize>> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            index
                .k_nearest(*p, k + 1)
                .into_iter()
                .map(|(j, _)| j)
                .filter(|&j| j != i)
                .take(k)
                .collect()
        })
        .collect();

    let w = 1.0 / k as f64;
    let mut num = 0.0;
    let mut col_sums = vec![0.0; n];
    for (i, nb) in neighbours.iter().enumerate() {
        for &j in nb {
            num += w * z[i] * z[j];
            col_sums[j] += w;
        }
    }
    let s0 = n as f64;
    let i_stat = (n as f64 / s0) * num / m2;

    // S1 = ½ Σ (w_ij + w_ji)²; a mutual pair is visited once from each end.
    let mut s1 = 0.0;
    for (i, nb) in neighbours.iter().enumerate() {
        for &j in nb {
            let mutual = neighbours[j].contains(&i);
            s1 += if mutual { 0.5 * (2.0 * w).powi(2) } else { w * w };
        }
    }
    // Row sums are 1 by construction.
    let s2: f64 = col_sums.iter().map(|c| (1.0 + c).powi(2)).sum();

    let nf = n as f64;
    let expected = -1.0 / (nf - 1.0);
    let variance = (nf * nf * s1 - nf * s2 + 3.0 * s0 * s0) / ((nf * nf - 1.0) * s0 * s0) - expected * expected;
    let z_score = if variance > 0.0 {
        (i_stat - expected) / variance.sqrt()
    } else {
        f64::NAN
    };

    Ok(MoransI {
        i: i_stat,
        expected,
        variance,
        z_score,
        n,
        k,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn lattice(n: usize) -> Vec<Point2D> {
        (0..n)
            .flat_map(|r| (0..n).map(move |c| Point2D::new(c as f64 * 100.0, r as f64 * 100.0)))
            .collect()
    }

    #[test]
    fn smooth_gradient_is_positive() {
        let pts = lattice(10);
        let vals: Vec<f64> = pts.iter().map(|p| p.x + 0.5 * p.y).collect();
        let m = compute_morans_i(&pts, &vals, MORANS_K).unwrap();
        assert!(m.i > 0.5, "I = {}", m.i);
        assert!(m.z_score > 3.0);
        assert_abs_diff_eq!(m.expected, -1.0 / 99.0, epsilon = 1e-12);
    }

    #[test]
    fn checkerboard_is_negative() {
        let pts = lattice(10);
        let vals: Vec<f64> = (0..100).map(|i| if (i / 10 + i % 10) % 2 == 0 { 1.0 } else { 0.0 }).collect();
        let m = compute_morans_i(&pts, &vals, 4).unwrap();
        assert!(m.i < -0.5, "I = {}", m.i);
        assert!(m.z_score < -3.0);
    }

    #[test]
    fn k_is_capped() {
        let pts = [Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0), Point2D::new(5.0, 0.0)];
        let m = compute_morans_i(&pts, &[1.0, 2.0, 9.0], 8).unwrap();
        assert_eq!(m.k, 2);
        assert!(m.i.is_finite());
    }

    #[test]
    fn degenerate_inputs_are_errors() {
        let pts = lattice(3);
        assert!(matches!(compute_morans_i(&pts, &[4.0; 9], 8), Err(Error::Statistics(_))));
        assert!(matches!(compute_morans_i(&pts[..2], &[1.0, 2.0], 8), Err(Error::Statistics(_))));
        assert!(compute_morans_i(&pts, &[1.0; 3], 8).is_err());
    }
}

//! Empirical percentage-mud → porosity conversion.
//!
//! porosity = 0.38662 + 0.415 · mud / 100, a linear fit of measured porosity
//! against fine-sediment content in Wadden Sea surface sediments.
use serde::{Deserialize, Serialize};

/// Porosity of pure sand (0 % mud).
pub const POROSITY_INTERCEPT: f64 = 0.38662;
/// Porosity increase from 0 % to 100 % mud.
pub const POROSITY_SLOPE: f64 = 0.415;

/// Affine coefficients of the conversion; defaults are the named constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PorosityCoefficients {
    pub intercept: f64,
    pub slope: f64,
}

impl Default for PorosityCoefficients {
    fn default() -> Self {
        Self {
            intercept: POROSITY_INTERCEPT,
            slope: POROSITY_SLOPE,
        }
    }
}

impl PorosityCoefficients {
    #[inline]
    pub fn porosity(&self, percentage_mud: f64) -> f64 {
        self.intercept + self.slope * percentage_mud / 100.0
    }

    #[inline]
    pub fn mud(&self, porosity: f64) -> f64 {
        (porosity - self.intercept) * 100.0 / self.slope
    }

    /// Elementwise conversion; NaN stays NaN.
    pub fn field(&self, percentage_mud: &[f64]) -> Vec<f64> {
        percentage_mud.iter().map(|&p| self.porosity(p)).collect()
    }
}

/// Porosity for a percentage mud value, with the default coefficients.
#[inline]
pub fn mud_to_porosity(percentage_mud: f64) -> f64 {
    PorosityCoefficients::default().porosity(percentage_mud)
}

/// Inverse of [`mud_to_porosity`].
#[inline]
pub fn porosity_to_mud(porosity: f64) -> f64 {
    PorosityCoefficients::default().mud(porosity)
}

pub fn porosity_field(percentage_mud: &[f64]) -> Vec<f64> {
    PorosityCoefficients::default().field(percentage_mud)
}

//! Run parameters. Every field has a default, so a JSON config file only
//! needs the values it changes; CLI flags override on top.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::MORANS_K;
use crate::error::{Error, Result};
use crate::export::ExportConfig;
use crate::interpolate::idw::IdwConfig;
use crate::interpolate::kriging::KrigingConfig;
use crate::interpolate::Method;
use crate::land_mask::{FILL_VALUE, LAND_SENTINEL};
use crate::porosity::PorosityCoefficients;
use crate::samples::SampleColumns;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub method: Method,
    pub idw: IdwConfig,
    pub kriging: KrigingConfig,
    /// Neighbours per sample for Moran's I.
    pub morans_k: usize,
    /// Working UTM zone for metric methods; derived from the grid when unset.
    pub utm_zone: Option<u8>,
    pub land_sentinel: f64,
    pub fill_value: f64,
    pub porosity: PorosityCoefficients,
    pub columns: SampleColumns,
    pub export: ExportConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            idw: IdwConfig::default(),
            kriging: KrigingConfig::default(),
            morans_k: MORANS_K,
            utm_zone: None,
            land_sentinel: LAND_SENTINEL,
            fill_value: FILL_VALUE,
            porosity: PorosityCoefficients::default(),
            columns: SampleColumns::default(),
            export: ExportConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.idw.validate()?;
        self.kriging.validate()?;
        if self.morans_k == 0 {
            return Err(Error::InvalidConfig("morans_k must be at least 1".into()));
        }
        if let Some(z) = self.utm_zone {
            if !(1..=60).contains(&z) {
                return Err(Error::InvalidConfig(format!("UTM zone {z} out of range (1-60)")));
            }
        }
        if !self.land_sentinel.is_finite() {
            return Err(Error::InvalidConfig("land sentinel must be finite".into()));
        }
        if !self.fill_value.is_finite() {
            return Err(Error::InvalidConfig("fill value must be finite".into()));
        }
        if !(self.porosity.slope.is_finite() && self.porosity.intercept.is_finite()) {
            return Err(Error::InvalidConfig("porosity coefficients must be finite".into()));
        }
        Ok(())
    }
}

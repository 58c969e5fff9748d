//! Subcommands and the file loading they share.
pub mod diagnose;
pub mod inspect;
pub mod interpolate;
pub mod raster;

use std::path::Path;

use anyhow::{Context, Result};
use sedprop_core::{samples, Grid, PipelineConfig, Sample};

/// Config file if given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_json_file(p).with_context(|| format!("Cannot load config {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

pub fn load_grid(path: &Path) -> Result<Grid> {
    Grid::load(path).with_context(|| format!("Cannot load grid {}", path.display()))
}

pub fn load_samples(path: &Path, config: &PipelineConfig) -> Result<Vec<Sample>> {
    samples::load_samples(path, &config.columns, &config.porosity)
        .with_context(|| format!("Cannot load samples {}", path.display()))
}

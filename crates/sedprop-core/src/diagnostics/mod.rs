//! Quick statistics of the inputs and spatial-structure diagnostics of the samples.
pub mod morans;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::interpolate::idw::{CrossValidation, IdwInterpolator};
use crate::interpolate::variogram::{EmpiricalVariogram, VariogramModel};
use crate::land_mask::LandMask;
use crate::pipeline::working_projection;
use crate::samples::{self, Sample};

pub use morans::{compute_morans_i, MoransI, MORANS_K};

/// Cell counts and sea-only bathymetry range of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSummary {
    pub rows: usize,
    pub cols: usize,
    pub total_cells: usize,
    pub land_cells: usize,
    pub sea_cells: usize,
    pub min_depth: f64,
    pub max_depth: f64,
}

impl GridSummary {
    pub fn compute(grid: &Grid, land_sentinel: f64) -> Self {
        let mask = LandMask::from_grid(grid, land_sentinel);
        let (min_depth, max_depth) = grid
            .bathymetry
            .iter()
            .zip(mask.as_slice())
            .filter(|(b, &land)| !land && b.is_finite())
            .fold((f64::NAN, f64::NAN), |(lo, hi), (&b, _)| (lo.min(b), hi.max(b)));
        Self {
            rows: grid.rows,
            cols: grid.cols,
            total_cells: grid.cell_count(),
            land_cells: mask.land_count(),
            sea_cells: mask.sea_count(),
            min_depth,
            max_depth,
        }
    }
}

impl fmt::Display for GridSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "grid:        {} x {}", self.rows, self.cols)?;
        writeln!(f, "total cells: {}", self.total_cells)?;
        writeln!(f, "land cells:  {}", self.land_cells)?;
        writeln!(f, "sea cells:   {}", self.sea_cells)?;
        write!(f, "sea depth:   {:.2} .. {:.2} m", self.min_depth, self.max_depth)
    }
}

/// Count and value ranges of a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub count: usize,
    pub mud_min: f64,
    pub mud_max: f64,
    pub porosity_min: f64,
    pub porosity_max: f64,
}

impl SampleSummary {
    pub fn compute(samples: &[Sample]) -> Self {
        let (mud_min, mud_max) = samples::range_of(samples, |s| s.percentage_mud);
        let (porosity_min, porosity_max) = samples::range_of(samples, |s| s.porosity);
        Self {
            count: samples.len(),
            mud_min,
            mud_max,
            porosity_min,
            porosity_max,
        }
    }
}

impl fmt::Display for SampleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "samples:     {}", self.count)?;
        writeln!(f, "mud:         {:.2} .. {:.2} %", self.mud_min, self.mud_max)?;
        write!(f, "porosity:    {:.4} .. {:.4}", self.porosity_min, self.porosity_max)
    }
}

/// Spatial structure of the percentage-mud samples in the working UTM frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialReport {
    pub utm_epsg: u32,
    pub morans_i: MoransI,
    pub variogram: EmpiricalVariogram,
    pub model: VariogramModel,
    pub model_sse: f64,
    pub idw_cross_validation: CrossValidation,
}

/// Moran's I, fitted variogram and IDW leave-one-out errors of the samples.
pub fn spatial_report(grid: &Grid, samples: &[Sample], config: &PipelineConfig) -> Result<SpatialReport> {
    if samples.is_empty() {
        return Err(Error::NoSamples);
    }
    let proj = working_projection(grid, config)?;
    let projected = samples::project(samples, &proj)?;
    let points: Vec<_> = projected.iter().map(|p| p.point()).collect();
    let values: Vec<f64> = samples.iter().map(|s| s.percentage_mud).collect();

    let morans_i = compute_morans_i(&points, &values, config.morans_k)?;
    let variogram = EmpiricalVariogram::compute(&points, &values, config.kriging.n_lags, config.kriging.max_lag)?;
    let (model, model_sse) = variogram.fit(config.kriging.model)?;
    let idw_cross_validation = IdwInterpolator::new(&points, &values, config.idw.clone())?.cross_validation();

    info!(
        i = morans_i.i,
        z = morans_i.z_score,
        range = model.range,
        idw_rmse = idw_cross_validation.rmse,
        "spatial diagnostics"
    );
    Ok(SpatialReport {
        utm_epsg: proj.epsg(),
        morans_i,
        variogram,
        model,
        model_sse,
        idw_cross_validation,
    })
}

impl fmt::Display for SpatialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.morans_i;
        writeln!(f, "frame:       EPSG:{}", self.utm_epsg)?;
        writeln!(f, "Moran's I:   {:.4} (E[I] = {:.4}, z = {:.2}, k = {}, n = {})", m.i, m.expected, m.z_score, m.k, m.n)?;
        writeln!(
            f,
            "variogram:   {} nugget {:.3}, sill {:.3}, range {:.0} m",
            self.model.kind, self.model.nugget, self.model.sill, self.model.range
        )?;
        let cv = &self.idw_cross_validation;
        write!(f, "IDW LOO-CV:  rmse {:.3}, mae {:.3}, max {:.3} ({} samples)", cv.rmse, cv.mae, cv.max_error, cv.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::land_mask::LAND_SENTINEL;

    #[test]
    fn grid_summary_ignores_land_for_depth() {
        let mut g = Grid::regular(2, 3, 4.0, 53.0, 0.1, 0.1, 0.0);
        g.bathymetry = vec![LAND_SENTINEL, 2.0, 15.5, 7.0, LAND_SENTINEL, 1.0];
        let s = GridSummary::compute(&g, LAND_SENTINEL);
        assert_eq!(s.total_cells, 6);
        assert_eq!(s.land_cells, 2);
        assert_eq!(s.sea_cells, 4);
        assert_eq!(s.min_depth, 1.0);
        assert_eq!(s.max_depth, 15.5);
        assert!(s.to_string().contains("land cells:  2"));
    }

    #[test]
    fn sample_summary_ranges() {
        let s = vec![Sample::new(4.0, 53.0, 10.0), Sample::new(4.1, 53.1, 60.0)];
        let sum = SampleSummary::compute(&s);
        assert_eq!(sum.count, 2);
        assert_eq!(sum.mud_min, 10.0);
        assert_eq!(sum.mud_max, 60.0);
        assert!(sum.porosity_min < sum.porosity_max);
    }

    #[test]
    fn spatial_report_on_gradient() {
        let grid = Grid::regular(5, 5, 4.5, 53.0, 0.05, 0.05, 10.0);
        let samples: Vec<Sample> = (0..36)
            .map(|i| {
                let (r, c) = (i / 6, i % 6);
                Sample::new(4.5 + c as f64 * 0.04, 53.0 + r as f64 * 0.04, 5.0 + 10.0 * c as f64)
            })
            .collect();
        let report = spatial_report(&grid, &samples, &PipelineConfig::default()).unwrap();
        assert_eq!(report.utm_epsg, 32631);
        assert!(report.morans_i.i > 0.0);
        assert!(report.idw_cross_validation.count > 0);
        assert!(report.to_string().contains("Moran's I"));
    }
}

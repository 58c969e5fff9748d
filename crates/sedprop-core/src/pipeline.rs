//! Samples (or a raster) → mud fraction on the grid → porosity → land mask.
//!
//! Porosity is derived after interpolation: the transform is affine and every
//! method's weights sum to one, so interpolating porosity directly would give
//! the same field.
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::coords::{auto_utm_zone, Point2D, UtmProjection};
use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::interpolate::{
    IdwInterpolator, Interpolator, KrigingInterpolator, LinearInterpolator, Method, NearestInterpolator,
};
use crate::land_mask::LandMask;
use crate::raster::Raster;
use crate::samples::{self, Sample};

/// Interpolated mud fraction and porosity on the grid; land and unfilled
/// cells are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct SedimentField {
    pub rows: usize,
    pub cols: usize,
    pub mud_fraction: Vec<f64>,
    pub porosity: Vec<f64>,
    pub land: LandMask,
}

impl SedimentField {
    /// Sea cells that received a value.
    pub fn filled_count(&self) -> usize {
        self.porosity.iter().filter(|v| v.is_finite()).count()
    }

    /// Sea cells left without a value (e.g. outside every IDW radius).
    pub fn unfilled_sea_count(&self) -> usize {
        self.land.sea_count() - self.filled_count()
    }

    #[inline]
    pub fn porosity_at(&self, row: usize, col: usize) -> f64 {
        self.porosity[row * self.cols + col]
    }

    #[inline]
    pub fn mud_at(&self, row: usize, col: usize) -> f64 {
        self.mud_fraction[row * self.cols + col]
    }
}

/// Where the mud field came from, for log lines and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Samples(Method),
    Raster,
}

/// UTM frame for the metric methods: the configured zone, or the zone of the
/// grid's mean longitude. Hemisphere follows the grid's mean latitude.
pub fn working_projection(grid: &Grid, config: &PipelineConfig) -> Result<UtmProjection> {
    let lat = grid.mean_lat();
    let zone = match config.utm_zone {
        Some(z) => z,
        None => {
            let lon = grid.mean_lon();
            if !lon.is_finite() {
                return Err(Error::Projection("grid has no finite longitudes".into()));
            }
            auto_utm_zone(lon)
        }
    };
    UtmProjection::new(zone, lat.is_nan() || lat >= 0.0)
}

/// Interpolate the samples onto `grid` with `config.method`.
pub fn run(grid: &Grid, samples: &[Sample], config: &PipelineConfig) -> Result<SedimentField> {
    config.validate()?;
    grid.validate()?;
    if samples.is_empty() {
        return Err(Error::NoSamples);
    }
    let values: Vec<f64> = samples.iter().map(|s| s.percentage_mud).collect();

    let mud = match config.method {
        Method::NearestFill | Method::LinearNearest => {
            let points: Vec<Point2D> = samples.iter().map(|s| Point2D::new(s.x, s.y)).collect();
            let targets: Vec<Point2D> = grid.centres().map(|(lon, lat)| Point2D::new(lon, lat)).collect();
            if config.method == Method::NearestFill {
                NearestInterpolator::new(&points, &values)?.interpolate(&targets)
            } else {
                LinearInterpolator::new(&points, &values)?.interpolate(&targets)
            }
        }
        Method::Idw | Method::Kriging => {
            let proj = working_projection(grid, config)?;
            debug!(epsg = proj.epsg(), "working frame");
            let points: Vec<Point2D> = samples::project(samples, &proj)?.iter().map(|p| p.point()).collect();
            // Cells outside the UTM domain stay NaN.
            let targets: Vec<Point2D> = grid
                .centres()
                .map(|(lon, lat)| proj.forward(lon, lat).unwrap_or(Point2D::new(f64::NAN, f64::NAN)))
                .collect();
            if config.method == Method::Idw {
                IdwInterpolator::new(&points, &values, config.idw.clone())?.interpolate(&targets)
            } else {
                KrigingInterpolator::new(&points, &values, &config.kriging)?.interpolate(&targets)
            }
        }
    };

    finish(grid, mud, config, FieldSource::Samples(config.method))
}

/// Take the mud fraction from a raster instead of interpolating samples.
pub fn from_raster(grid: &Grid, raster: &Raster, config: &PipelineConfig) -> Result<SedimentField> {
    config.validate()?;
    grid.validate()?;
    let mud = raster.sample_grid(grid);
    finish(grid, mud, config, FieldSource::Raster)
}

fn finish(grid: &Grid, mut mud: Vec<f64>, config: &PipelineConfig, source: FieldSource) -> Result<SedimentField> {
    let land = LandMask::from_grid(grid, config.land_sentinel);
    land.apply_nan(&mut mud)?;
    let porosity = config.porosity.field(&mud);

    let field = SedimentField {
        rows: grid.rows,
        cols: grid.cols,
        mud_fraction: mud,
        porosity,
        land,
    };
    info!(
        source = ?source,
        cells = grid.cell_count(),
        land = field.land.land_count(),
        filled = field.filled_count(),
        unfilled_sea = field.unfilled_sea_count(),
        "sediment field ready"
    );
    Ok(field)
}

//! Sediment porosity on a curvilinear ocean-model grid.
//!
//! Percentage-mud samples are interpolated onto the grid cell centres, turned
//! into porosity with an affine relation, masked on land and written out for
//! the ocean model.
pub mod config;
pub mod coords;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod grid;
pub mod interpolate;
pub mod land_mask;
pub mod pipeline;
pub mod porosity;
pub mod raster;
pub mod samples;

pub use config::PipelineConfig;
pub use coords::{LatLon, Point2D, UtmProjection};
pub use error::{Error, Result};
pub use export::{write_field, ExportConfig, ExportedField};
pub use grid::Grid;
pub use interpolate::Method;
pub use land_mask::LandMask;
pub use pipeline::{from_raster, run, SedimentField};
pub use porosity::{mud_to_porosity, PorosityCoefficients};
pub use raster::{Raster, RasterCrs};
pub use samples::{load_samples, Sample};

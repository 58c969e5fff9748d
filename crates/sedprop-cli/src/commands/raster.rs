use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sedprop_core::{pipeline, write_field, Raster, RasterCrs};

use super::{load_config, load_grid};

#[derive(Args)]
pub struct RasterArgs {
    /// Grid file (.nc or .json)
    #[arg(short, long)]
    pub grid: PathBuf,

    /// Single-band GeoTIFF of percentage mud
    #[arg(short, long)]
    pub raster: PathBuf,

    /// CRS of the raster: geographic, utm:31N, epsg:32631 ...
    #[arg(long, default_value = "geographic")]
    pub raster_crs: String,

    /// Nodata value, when the file carries no GDAL_NODATA tag
    #[arg(long)]
    pub nodata: Option<f64>,

    /// Output file (.nc or .json)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Write porosity only
    #[arg(long)]
    pub porosity_only: bool,

    /// JSON run configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: RasterArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.porosity_only {
        config.export.porosity_only = true;
    }
    let crs: RasterCrs = args.raster_crs.parse()?;

    let grid = load_grid(&args.grid)?;
    let mut raster =
        Raster::open(&args.raster, crs).with_context(|| format!("Cannot read raster {}", args.raster.display()))?;
    if let Some(nd) = args.nodata {
        raster = raster.with_nodata(nd);
    }

    let field = pipeline::from_raster(&grid, &raster, &config).context("Raster sampling failed")?;
    write_field(&args.output, &grid, &field, &config.export, config.fill_value)
        .with_context(|| format!("Cannot write {}", args.output.display()))?;

    println!(
        "raster ({crs}): {} of {} sea cells filled -> {}",
        field.filled_count(),
        field.land.sea_count(),
        args.output.display()
    );
    Ok(())
}

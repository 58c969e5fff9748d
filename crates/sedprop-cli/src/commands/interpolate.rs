use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sedprop_core::interpolate::VariogramModelKind;
use sedprop_core::{pipeline, write_field, Method};
use tracing::info;

use super::{load_config, load_grid, load_samples};

#[derive(Args)]
pub struct InterpolateArgs {
    /// Grid file (.nc or .json) with lonc, latc, bathymetry
    #[arg(short, long)]
    pub grid: PathBuf,

    /// Delimited sample file with x, y, percentage_mud
    #[arg(short, long)]
    pub samples: PathBuf,

    /// Output file (.nc or .json)
    #[arg(short, long)]
    pub output: PathBuf,

    /// nearest, linear, idw or kriging
    #[arg(short, long)]
    pub method: Option<String>,

    /// IDW distance exponent
    #[arg(long)]
    pub power: Option<f64>,

    /// IDW search radius in metres
    #[arg(long)]
    pub radius: Option<f64>,

    /// Use every sample for IDW regardless of distance
    #[arg(long, conflicts_with = "radius")]
    pub no_radius: bool,

    /// Kriging variogram model (spherical, exponential, gaussian)
    #[arg(long)]
    pub model: Option<String>,

    /// Working UTM zone for IDW and kriging (default: from the grid)
    #[arg(long)]
    pub utm_zone: Option<u8>,

    /// Write porosity only
    #[arg(long)]
    pub porosity_only: bool,

    /// JSON run configuration; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: InterpolateArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(m) = &args.method {
        config.method = m.parse::<Method>()?;
    }
    if let Some(p) = args.power {
        config.idw.power = p;
    }
    if let Some(r) = args.radius {
        config.idw.search_radius = Some(r);
    }
    if args.no_radius {
        config.idw.search_radius = None;
    }
    if let Some(m) = &args.model {
        config.kriging.model = m.parse::<VariogramModelKind>()?;
    }
    if args.utm_zone.is_some() {
        config.utm_zone = args.utm_zone;
    }
    if args.porosity_only {
        config.export.porosity_only = true;
    }
    config.validate().context("Invalid configuration")?;

    let grid = load_grid(&args.grid)?;
    let samples = load_samples(&args.samples, &config)?;
    info!(method = %config.method, samples = samples.len(), cells = grid.cell_count(), "interpolating");

    let field = pipeline::run(&grid, &samples, &config).context("Interpolation failed")?;
    write_field(&args.output, &grid, &field, &config.export, config.fill_value)
        .with_context(|| format!("Cannot write {}", args.output.display()))?;

    println!(
        "{}: {} of {} sea cells filled ({} land) -> {}",
        config.method,
        field.filled_count(),
        field.land.sea_count(),
        field.land.land_count(),
        args.output.display()
    );
    Ok(())
}

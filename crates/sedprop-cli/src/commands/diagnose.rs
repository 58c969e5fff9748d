use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sedprop_core::diagnostics::spatial_report;
use sedprop_core::interpolate::VariogramModelKind;

use super::{load_config, load_grid, load_samples};

#[derive(Args)]
pub struct DiagnoseArgs {
    /// Grid file (.nc or .json); fixes the working UTM zone
    #[arg(short, long)]
    pub grid: PathBuf,

    /// Delimited sample file
    #[arg(short, long)]
    pub samples: PathBuf,

    /// Neighbours per sample for Moran's I
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Variogram model to fit (spherical, exponential, gaussian)
    #[arg(long)]
    pub model: Option<String>,

    /// Working UTM zone (default: from the grid)
    #[arg(long)]
    pub utm_zone: Option<u8>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// JSON run configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: DiagnoseArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(k) = args.k {
        config.morans_k = k;
    }
    if let Some(m) = &args.model {
        config.kriging.model = m.parse::<VariogramModelKind>()?;
    }
    if args.utm_zone.is_some() {
        config.utm_zone = args.utm_zone;
    }
    config.validate().context("Invalid configuration")?;

    let grid = load_grid(&args.grid)?;
    let samples = load_samples(&args.samples, &config)?;
    let report = spatial_report(&grid, &samples, &config).context("Diagnostics failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

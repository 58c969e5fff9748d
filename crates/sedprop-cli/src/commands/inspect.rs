use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use sedprop_core::diagnostics::{GridSummary, SampleSummary};
use tracing::info;

use super::{load_config, load_grid, load_samples};

#[derive(Args)]
pub struct InspectArgs {
    /// Grid file (.nc or .json)
    #[arg(short, long)]
    pub grid: PathBuf,

    /// Sample file to summarise as well
    #[arg(short, long)]
    pub samples: Option<PathBuf>,

    /// JSON run configuration (land sentinel, column names)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let grid = load_grid(&args.grid)?;

    let g = GridSummary::compute(&grid, config.land_sentinel);
    info!(
        cells = g.total_cells,
        land = g.land_cells,
        min_depth = g.min_depth,
        max_depth = g.max_depth,
        "grid summary"
    );
    println!("{g}");

    if let Some(path) = &args.samples {
        let samples = load_samples(path, &config)?;
        let s = SampleSummary::compute(&samples);
        info!(count = s.count, porosity_min = s.porosity_min, porosity_max = s.porosity_max, "sample summary");
        println!();
        println!("{s}");
    }
    Ok(())
}

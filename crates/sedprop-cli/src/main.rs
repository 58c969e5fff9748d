//! `sedprop`: sediment porosity for the ocean-model grid from mud-fraction
//! samples or a mud raster.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "sedprop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Map sediment mud fraction and porosity onto an ocean-model grid", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpolate samples onto the grid and write mud fraction + porosity
    Interpolate(commands::interpolate::InterpolateArgs),
    /// Sample a mud-fraction GeoTIFF at the grid cells instead of interpolating
    Raster(commands::raster::RasterArgs),
    /// Print grid and sample summaries
    Inspect(commands::inspect::InspectArgs),
    /// Moran's I, variogram fit and IDW cross-validation of the samples
    Diagnose(commands::diagnose::DiagnoseArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Interpolate(args) => commands::interpolate::execute(args),
        Commands::Raster(args) => commands::raster::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::Diagnose(args) => commands::diagnose::execute(args),
    }
}

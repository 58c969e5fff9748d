//! Diagnostic visualizer: writes bathymetry / porosity / mud-fraction PNGs
//! in grid index space, row 0 at the bottom. Land and missing cells are black.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use sedprop_core::land_mask::LandMask;
use sedprop_core::porosity::{POROSITY_INTERCEPT, POROSITY_SLOPE};
use sedprop_core::{samples, ExportedField, Grid, PipelineConfig};

const BLACK: [u8; 3] = [0, 0, 0];
const WHITE: [u8; 3] = [255, 255, 255];

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "visualize", about = "Render grid, samples and exported fields as PNG colour maps")]
struct Args {
    /// Grid file (.nc or .json)
    #[arg(short, long)]
    grid: PathBuf,

    /// Sample file; samples are drawn on the bathymetry map
    #[arg(short, long)]
    samples: Option<PathBuf>,

    /// JSON field written by `sedprop interpolate`/`raster`
    #[arg(short, long)]
    field: Option<PathBuf>,

    /// Output directory (created if absent)
    #[arg(short, long, default_value = "plots")]
    out_dir: PathBuf,

    /// Pixels per grid cell
    #[arg(long, default_value = "4")]
    scale: u32,

    /// JSON run configuration (land sentinel, sample columns)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

// ── Colour helpers ───────────────────────────────────────────────────────────

/// Viridis anchors at t = 0, 0.125, ... 1.
const VIRIDIS: [[u8; 3]; 9] = [
    [68, 1, 84],
    [71, 44, 122],
    [59, 81, 139],
    [44, 113, 142],
    [33, 144, 141],
    [39, 173, 129],
    [92, 200, 99],
    [170, 220, 50],
    [253, 231, 37],
];

/// Terrain ramp: deep water → shallows → lowland → upland → peaks.
const TERRAIN: [[u8; 3]; 6] = [
    [51, 51, 153],
    [0, 153, 255],
    [0, 204, 102],
    [255, 255, 153],
    [128, 92, 84],
    [255, 255, 255],
];

/// Piecewise-linear lookup in evenly spaced anchors; `t` is clamped to [0, 1].
fn ramp(anchors: &[[u8; 3]], t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0) * (anchors.len() - 1) as f64;
    let i = (t.floor() as usize).min(anchors.len() - 2);
    let f = t - i as f64;
    let (a, b) = (anchors[i], anchors[i + 1]);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * f).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

/// `v` over [lo, hi] → viridis, black when missing.
fn viridis(v: f64, lo: f64, hi: f64) -> [u8; 3] {
    if !v.is_finite() {
        return BLACK;
    }
    ramp(&VIRIDIS, (v - lo) / (hi - lo))
}

fn finite_range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// One colour per cell, upscaled by `scale`, flipped so row 0 is at the bottom.
fn render(rows: usize, cols: usize, scale: u32, colour: impl Fn(usize) -> [u8; 3]) -> image::RgbImage {
    let (w, h) = (cols as u32 * scale, rows as u32 * scale);
    image::RgbImage::from_fn(w, h, |x, y| {
        let col = (x / scale) as usize;
        let row = rows - 1 - (y / scale) as usize;
        image::Rgb(colour(row * cols + col))
    })
}

fn save(img: &image::RgbImage, out_dir: &Path, name: &str) -> Result<()> {
    let path = out_dir.join(name);
    img.save(&path).with_context(|| format!("failed to save {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

// ── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let scale = args.scale.max(1);
    let config = match &args.config {
        Some(p) => PipelineConfig::from_json_file(p).with_context(|| format!("Cannot load config {}", p.display()))?,
        None => PipelineConfig::default(),
    };

    let grid = Grid::load(&args.grid).with_context(|| format!("Cannot load grid {}", args.grid.display()))?;
    let land = LandMask::from_grid(&grid, config.land_sentinel);
    fs::create_dir_all(&args.out_dir).with_context(|| format!("cannot create {}", args.out_dir.display()))?;

    // ── 1. bathymetry.png ────────────────────────────────────────────────────
    {
        let sea: Vec<f64> = grid
            .bathymetry
            .iter()
            .zip(land.as_slice())
            .map(|(&b, &is_land)| if is_land { f64::NAN } else { b })
            .collect();
        let (lo, hi) = finite_range(&sea);
        let span = (hi - lo).max(f64::EPSILON);

        // Sample porosity at the cell each sample snaps to.
        let mut marks: Vec<Option<f64>> = vec![None; grid.cell_count()];
        if let Some(path) = &args.samples {
            let s = samples::load_samples(path, &config.columns, &config.porosity)
                .with_context(|| format!("Cannot load samples {}", path.display()))?;
            for sample in &s {
                if let Some(i) = grid.nearest_cell(sample.x, sample.y) {
                    marks[i] = Some(sample.porosity);
                }
            }
        }

        // Deeper water is darker: depth is inverted onto the lower half of the ramp.
        let img = render(grid.rows, grid.cols, scale, |i| match marks[i] {
            Some(p) => viridis(p, POROSITY_INTERCEPT, POROSITY_INTERCEPT + POROSITY_SLOPE),
            None if sea[i].is_finite() => ramp(&TERRAIN, 0.5 * (1.0 - (sea[i] - lo) / span)),
            None => BLACK,
        });
        save(&img, &args.out_dir, "bathymetry.png")?;
    }

    let Some(field_path) = &args.field else {
        println!("Done.");
        return Ok(());
    };
    let field = ExportedField::from_json_file(field_path)
        .with_context(|| format!("Cannot load field {}", field_path.display()))?;
    if field.rows != grid.rows || field.cols != grid.cols {
        anyhow::bail!(
            "field is {}x{} but grid is {}x{}",
            field.rows,
            field.cols,
            grid.rows,
            grid.cols
        );
    }

    // ── 2. porosity.png ──────────────────────────────────────────────────────
    {
        let porosity = field.unfilled(&field.porosity);
        let img = render(field.rows, field.cols, scale, |i| viridis(porosity[i], 0.0, 1.0));
        save(&img, &args.out_dir, "porosity.png")?;
    }

    // ── 3. mud_fraction.png ──────────────────────────────────────────────────
    match &field.mud_fraction {
        Some(m) => {
            let mud = field.unfilled(m);
            let img = render(field.rows, field.cols, scale, |i| viridis(mud[i], 0.0, 100.0));
            save(&img, &args.out_dir, "mud_fraction.png")?;
        }
        None => println!("Field is porosity-only; skipping mud_fraction.png"),
    }

    // Colour bar strip for reading values off the maps.
    let bar = image::RgbImage::from_fn(256, 16, |x, y| {
        if y == 0 || y == 15 {
            image::Rgb(WHITE)
        } else {
            image::Rgb(ramp(&VIRIDIS, x as f64 / 255.0))
        }
    });
    save(&bar, &args.out_dir, "viridis_bar.png")?;

    println!("Done.");
    Ok(())
}

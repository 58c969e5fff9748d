use std::fs;

use approx::assert_abs_diff_eq;
use sedprop_core::land_mask::{FILL_VALUE, LAND_SENTINEL};
use sedprop_core::{load_samples, pipeline, write_field, Error, ExportedField, Grid, Method, PipelineConfig};

fn two_by_two() -> Grid {
    let mut g = Grid::regular(2, 2, 8.00, 54.00, 0.02, 0.02, 15.0);
    g.bathymetry[1] = LAND_SENTINEL;
    g
}

#[test]
fn single_sample_fills_sea_and_masks_land() {
    let dir = tempfile::tempdir().unwrap();
    let grid_path = dir.path().join("grid.json");
    let samples_path = dir.path().join("samples.csv");
    let out_path = dir.path().join("porosity.json");

    two_by_two().to_json_file(&grid_path).unwrap();
    fs::write(&samples_path, "x,y,percentage_mud\n8.00,54.00,50\n").unwrap();

    let config = PipelineConfig::default();
    let grid = Grid::load(&grid_path).unwrap();
    let samples = load_samples(&samples_path, &config.columns, &config.porosity).unwrap();
    let field = pipeline::run(&grid, &samples, &config).unwrap();
    write_field(&out_path, &grid, &field, &config.export, config.fill_value).unwrap();

    let out = ExportedField::from_json_file(&out_path).unwrap();
    assert_abs_diff_eq!(out.porosity[0], 0.59412, epsilon = 1e-12);
    assert_eq!(out.porosity[1], FILL_VALUE);
    assert_eq!(out.mud_fraction.as_ref().unwrap()[1], FILL_VALUE);
    assert_abs_diff_eq!(out.lonc.as_ref().unwrap()[1], 8.02, epsilon = 1e-12);
    assert!(out.history.starts_with("Created: "));
}

#[test]
fn every_method_keeps_land_at_fill() {
    let grid = two_by_two();
    let samples = load_samples_from_str(
        "x;y;Percentage_Mud\n8.00;54.00;10\n8.02;54.02;40\n8.00;54.02;NA\n8.00;54.02;25\n8.03;54.00;30\n",
    );
    assert_eq!(samples.len(), 4);

    for method in [Method::NearestFill, Method::LinearNearest, Method::Idw, Method::Kriging] {
        let mut config = PipelineConfig {
            method,
            ..PipelineConfig::default()
        };
        config.columns.delimiter = ';';
        let field = pipeline::run(&grid, &samples, &config).unwrap();
        let out = ExportedField::build(&grid, &field, &config.export, config.fill_value).unwrap();
        assert_eq!(out.porosity[1], FILL_VALUE, "{method}");
        for i in [0, 2, 3] {
            let p = out.porosity[i];
            assert!((0.38662..=0.80162).contains(&p), "{method} cell {i}: {p}");
        }
    }
}

#[test]
fn linear_reproduces_samples_on_cell_centres() {
    let grid = Grid::regular(3, 3, 8.0, 54.0, 0.01, 0.01, 20.0);
    let samples: Vec<_> = grid
        .centres()
        .enumerate()
        .filter(|(i, _)| i % 2 == 0)
        .map(|(i, (lon, lat))| sedprop_core::Sample::new(lon, lat, 5.0 * i as f64))
        .collect();
    let field = pipeline::run(&grid, &samples, &PipelineConfig::default()).unwrap();
    for i in (0..9).step_by(2) {
        assert_abs_diff_eq!(field.mud_fraction[i], 5.0 * i as f64, epsilon = 1e-9);
    }
}

#[test]
fn missing_column_is_reported_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "lon,lat,percentage_mud\n8.0,54.0,3\n").unwrap();
    let config = PipelineConfig::default();
    let err = load_samples(&path, &config.columns, &config.porosity).unwrap_err();
    assert!(matches!(err, Error::MissingColumn(ref c) if c == "x"));
    assert_eq!(err.to_string(), "sample file missing required column 'x'");
}

#[test]
fn config_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");
    fs::write(
        &path,
        r#"{ "method": "idw", "idw": { "search_radius": 1000.0 }, "export": { "porosity_only": true } }"#,
    )
    .unwrap();
    let config = PipelineConfig::from_json_file(&path).unwrap();

    // Cells 0 and 1 lie within 1 km of the sample, the northern row does not.
    let grid = Grid::regular(2, 2, 8.0, 54.0, 0.01, 0.05, 15.0);
    let samples = [sedprop_core::Sample::new(8.0, 54.0, 60.0)];
    let field = pipeline::run(&grid, &samples, &config).unwrap();
    let out = ExportedField::build(&grid, &field, &config.export, config.fill_value).unwrap();

    assert!(out.mud_fraction.is_none());
    assert_abs_diff_eq!(out.porosity[0], 0.38662 + 0.415 * 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(out.porosity[1], 0.38662 + 0.415 * 0.6, epsilon = 1e-12);
    assert_eq!(out.porosity[2], FILL_VALUE);
    assert_eq!(out.porosity[3], FILL_VALUE);
}

fn load_samples_from_str(text: &str) -> Vec<sedprop_core::Sample> {
    let mut columns = PipelineConfig::default().columns;
    columns.delimiter = ';';
    sedprop_core::samples::read_samples(text.as_bytes(), &columns, &Default::default()).unwrap()
}

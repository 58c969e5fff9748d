//! Curvilinear ocean-model grid: cell-centre longitude, latitude and bathymetry.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coords::LatLon;
use crate::error::{Error, Result};

/// Default name of the row (north-south) dimension.
pub const ROW_DIM: &str = "yc";
/// Default name of the column (east-west) dimension.
pub const COL_DIM: &str = "xc";

/// Variable names read from a topography file.
pub const LON_VAR: &str = "lonc";
pub const LAT_VAR: &str = "latc";
pub const BATHY_VAR: &str = "bathymetry";

fn default_row_dim() -> String {
    ROW_DIM.to_string()
}

fn default_col_dim() -> String {
    COL_DIM.to_string()
}

/// A 2D curvilinear grid storing cell-centre coordinates and bathymetry, row-major.
///
/// Row 0 is the first index of the row dimension; no geographic ordering is
/// assumed, since the grid may be rotated or curved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    #[serde(rename = "lonc")]
    pub lon: Vec<f64>,
    #[serde(rename = "latc")]
    pub lat: Vec<f64>,
    /// Depth in metres; the land sentinel marks dry cells.
    pub bathymetry: Vec<f64>,
    #[serde(default = "default_row_dim")]
    pub row_dim: String,
    #[serde(default = "default_col_dim")]
    pub col_dim: String,
}

impl Grid {
    /// Build a grid, checking that all three arrays hold `rows * cols` values.
    pub fn new(rows: usize, cols: usize, lon: Vec<f64>, lat: Vec<f64>, bathymetry: Vec<f64>) -> Result<Self> {
        let grid = Self {
            rows,
            cols,
            lon,
            lat,
            bathymetry,
            row_dim: default_row_dim(),
            col_dim: default_col_dim(),
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Regular lon/lat grid, handy for tests and synthetic runs.
    pub fn regular(rows: usize, cols: usize, min_lon: f64, min_lat: f64, dlon: f64, dlat: f64, depth: f64) -> Self {
        let n = rows * cols;
        let mut lon = Vec::with_capacity(n);
        let mut lat = Vec::with_capacity(n);
        for r in 0..rows {
            for c in 0..cols {
                lon.push(min_lon + c as f64 * dlon);
                lat.push(min_lat + r as f64 * dlat);
            }
        }
        Self {
            rows,
            cols,
            lon,
            lat,
            bathymetry: vec![depth; n],
            row_dim: default_row_dim(),
            col_dim: default_col_dim(),
        }
    }

    /// Override the dimension names used on export.
    pub fn with_dims(mut self, row_dim: impl Into<String>, col_dim: impl Into<String>) -> Self {
        self.row_dim = row_dim.into();
        self.col_dim = col_dim.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let expected = self.rows * self.cols;
        for (what, len) in [
            (LON_VAR, self.lon.len()),
            (LAT_VAR, self.lat.len()),
            (BATHY_VAR, self.bathymetry.len()),
        ] {
            if len != expected {
                return Err(Error::ShapeMismatch {
                    what: what.to_string(),
                    expected,
                    actual: len,
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Cell centre of (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> LatLon {
        let i = self.index(row, col);
        LatLon::new(self.lat[i], self.lon[i])
    }

    #[inline]
    pub fn bathymetry_at(&self, row: usize, col: usize) -> f64 {
        self.bathymetry[self.index(row, col)]
    }

    /// Iterate (lon, lat) cell centres in row-major order.
    pub fn centres(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lon.iter().copied().zip(self.lat.iter().copied())
    }

    pub fn lon_range(&self) -> (f64, f64) {
        finite_range(&self.lon)
    }

    pub fn lat_range(&self) -> (f64, f64) {
        finite_range(&self.lat)
    }

    /// Mean of the finite cell-centre longitudes; NaN for an empty grid.
    pub fn mean_lon(&self) -> f64 {
        let (sum, n) = self
            .lon
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
        if n == 0 {
            f64::NAN
        } else {
            sum / n as f64
        }
    }

    /// Mean of the finite cell-centre latitudes; NaN for an empty grid.
    pub fn mean_lat(&self) -> f64 {
        let (sum, n) = self
            .lat
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
        if n == 0 {
            f64::NAN
        } else {
            sum / n as f64
        }
    }

    /// Index of the cell centre closest to (lon, lat) in degree space.
    pub fn nearest_cell(&self, lon: f64, lat: f64) -> Option<usize> {
        self.centres()
            .enumerate()
            .filter(|(_, (x, y))| x.is_finite() && y.is_finite())
            .map(|(i, (x, y))| (i, (x - lon).powi(2) + (y - lat).powi(2)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    // ── I/O ───────────────────────────────────────────────────────────────────

    /// Load a grid from JSON or NetCDF, chosen by file extension.
    pub fn load(path: &Path) -> Result<Self> {
        match extension(path).as_deref() {
            Some("json") => Self::from_json_file(path),
            Some("nc") | Some("nc4") | Some("cdf") => Self::from_netcdf(path),
            other => Err(Error::Unsupported(format!(
                "grid format '{}' (expected .json or .nc)",
                other.unwrap_or("")
            ))),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let grid: Grid = serde_json::from_reader(reader)?;
        grid.validate()?;
        info!(rows = grid.rows, cols = grid.cols, path = %path.display(), "loaded grid");
        Ok(grid)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Read `lonc`, `latc` and `bathymetry` from a GETM-style topography file.
    #[cfg(feature = "netcdf")]
    pub fn from_netcdf(path: &Path) -> Result<Self> {
        let file = netcdf::open(path)?;

        let bathy_var = file
            .variable(BATHY_VAR)
            .ok_or_else(|| Error::MissingVariable(BATHY_VAR.to_string()))?;
        let dims = bathy_var.dimensions();
        if dims.len() != 2 {
            return Err(Error::ShapeMismatch {
                what: format!("{BATHY_VAR} rank"),
                expected: 2,
                actual: dims.len(),
            });
        }
        let rows = dims[0].len();
        let cols = dims[1].len();
        let row_dim = dims[0].name();
        let col_dim = dims[1].name();
        let bathymetry: Vec<f64> = bathy_var.get_values(..)?;

        let read = |name: &str| -> Result<Vec<f64>> {
            let var = file
                .variable(name)
                .ok_or_else(|| Error::MissingVariable(name.to_string()))?;
            Ok(var.get_values(..)?)
        };
        let lon = read(LON_VAR)?;
        let lat = read(LAT_VAR)?;

        tracing::debug!(%row_dim, %col_dim, rows, cols, "grid dimensions");
        let grid = Self::new(rows, cols, lon, lat, bathymetry)?.with_dims(row_dim, col_dim);
        info!(rows, cols, path = %path.display(), "loaded grid");
        Ok(grid)
    }

    #[cfg(not(feature = "netcdf"))]
    pub fn from_netcdf(path: &Path) -> Result<Self> {
        Err(Error::Unsupported(format!(
            "reading {} requires the `netcdf` feature",
            path.display()
        )))
    }
}

pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn finite_range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_mismatched_arrays() {
        let err = Grid::new(2, 2, vec![0.0; 4], vec![0.0; 3], vec![0.0; 4]).unwrap_err();
        match err {
            Error::ShapeMismatch { what, expected, actual } => {
                assert_eq!(what, "latc");
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn regular_grid_is_row_major() {
        let g = Grid::regular(3, 4, 4.0, 52.0, 0.5, 0.25, 12.0);
        assert_eq!(g.cell_count(), 12);
        let c = g.get(2, 3);
        assert!((c.lon - 5.5).abs() < 1e-12);
        assert!((c.lat - 52.5).abs() < 1e-12);
        assert_eq!(g.lon_range(), (4.0, 5.5));
        assert_eq!(g.lat_range(), (52.0, 52.5));
        assert!((g.mean_lon() - 4.75).abs() < 1e-12);
    }

    #[test]
    fn nearest_cell_picks_closest_centre() {
        let g = Grid::regular(2, 2, 0.0, 0.0, 1.0, 1.0, 5.0);
        assert_eq!(g.nearest_cell(0.9, 0.1), Some(1));
        assert_eq!(g.nearest_cell(0.2, 0.8), Some(2));
    }

    #[test]
    fn json_roundtrip_keeps_dims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let g = Grid::regular(2, 3, 6.0, 53.0, 0.1, 0.1, 8.0).with_dims("y", "x");
        g.to_json_file(&path).unwrap();
        let back = Grid::load(&path).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn json_without_dims_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        std::fs::write(
            &path,
            r#"{"rows":1,"cols":2,"lonc":[4.0,4.1],"latc":[53.0,53.0],"bathymetry":[-10.0,5.0]}"#,
        )
        .unwrap();
        let g = Grid::from_json_file(&path).unwrap();
        assert_eq!(g.row_dim, "yc");
        assert_eq!(g.col_dim, "xc");
        assert_eq!(g.bathymetry, vec![-10.0, 5.0]);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = Grid::load(Path::new("grid.txt")).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}

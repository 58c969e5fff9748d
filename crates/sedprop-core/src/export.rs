//! Writing interpolated fields: NetCDF for the ocean model, JSON everywhere else.
//!
//! Land and missing cells are written as the numeric fill value; longitude and
//! latitude use their own fill (1e20) for missing coordinates.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::grid::{extension, Grid, LAT_VAR, LON_VAR};
use crate::pipeline::SedimentField;

/// Fill value for missing longitude/latitude.
pub const COORD_FILL_VALUE: f64 = 1.0e20;

pub const MUD_VAR: &str = "mud_fraction";
pub const POROSITY_VAR: &str = "porosity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Omit the mud fraction and coordinates, write porosity only.
    pub porosity_only: bool,
    pub title: String,
    pub file_type: String,
    pub gridid: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            porosity_only: false,
            title: "Sediment porosity from mud fraction".into(),
            file_type: "Sediment mud fraction file for GETM".into(),
            gridid: "North Sea and Wadden Sea".into(),
        }
    }
}

/// Output format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    NetCdf,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match extension(path).as_deref() {
            Some("nc") | Some("nc4") | Some("cdf") => Ok(OutputFormat::NetCdf),
            Some("json") => Ok(OutputFormat::Json),
            other => Err(Error::Unsupported(format!(
                "output format '{}' (expected .nc or .json)",
                other.unwrap_or("")
            ))),
        }
    }
}

/// A field ready to be written: fill values applied, metadata attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedField {
    pub title: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub gridid: String,
    pub history: String,
    pub conventions: String,
    /// Dimension names, row first.
    pub dims: [String; 2],
    pub rows: usize,
    pub cols: usize,
    pub fill_value: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lonc: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latc: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mud_fraction: Option<Vec<f64>>,
    pub porosity: Vec<f64>,
}

impl ExportedField {
    pub fn build(grid: &Grid, field: &SedimentField, config: &ExportConfig, fill_value: f64) -> Result<Self> {
        let porosity = field.land.apply_fill(&field.porosity, fill_value)?;
        let coords = |v: &[f64]| -> Vec<f64> {
            v.iter()
                .map(|&x| if x.is_finite() { x } else { COORD_FILL_VALUE })
                .collect()
        };
        let (lonc, latc, mud_fraction) = if config.porosity_only {
            (None, None, None)
        } else {
            (
                Some(coords(&grid.lon)),
                Some(coords(&grid.lat)),
                Some(field.land.apply_fill(&field.mud_fraction, fill_value)?),
            )
        };
        Ok(Self {
            title: config.title.clone(),
            file_type: config.file_type.clone(),
            gridid: config.gridid.clone(),
            history: format!("Created: {}", Utc::now().format("%Y-%m-%d %H:%M")),
            conventions: "CF-1.8".into(),
            dims: [grid.row_dim.clone(), grid.col_dim.clone()],
            rows: grid.rows,
            cols: grid.cols,
            fill_value,
            lonc,
            latc,
            mud_fraction,
            porosity,
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let field: Self = serde_json::from_reader(reader)?;
        let n = field.rows * field.cols;
        let arrays = [
            (POROSITY_VAR, Some(&field.porosity)),
            (MUD_VAR, field.mud_fraction.as_ref()),
            (LON_VAR, field.lonc.as_ref()),
            (LAT_VAR, field.latc.as_ref()),
        ];
        for (what, values) in arrays {
            if let Some(v) = values {
                if v.len() != n {
                    return Err(Error::ShapeMismatch {
                        what: what.to_string(),
                        expected: n,
                        actual: v.len(),
                    });
                }
            }
        }
        Ok(field)
    }

    /// `values` with the fill sentinel turned back into NaN.
    pub fn unfilled(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&v| if v == self.fill_value { f64::NAN } else { v })
            .collect()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        match OutputFormat::from_path(path)? {
            OutputFormat::Json => self.write_json(path)?,
            OutputFormat::NetCdf => self.write_netcdf(path)?,
        }
        info!(
            path = %path.display(),
            rows = self.rows,
            cols = self.cols,
            porosity_only = self.mud_fraction.is_none(),
            "wrote field"
        );
        Ok(())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    #[cfg(feature = "netcdf")]
    pub fn write_netcdf(&self, path: &Path) -> Result<()> {
        let to_f32 = |v: &[f64]| -> Vec<f32> { v.iter().map(|&x| x as f32).collect() };

        let mut file = netcdf::create(path)?;
        file.add_dimension(&self.dims[0], self.rows)?;
        file.add_dimension(&self.dims[1], self.cols)?;
        let dims = [self.dims[0].as_str(), self.dims[1].as_str()];

        let vars: [(&str, Option<&Vec<f64>>, f32, &str, &str); 4] = [
            (LON_VAR, self.lonc.as_ref(), COORD_FILL_VALUE as f32, "degrees_east", "longitude"),
            (LAT_VAR, self.latc.as_ref(), COORD_FILL_VALUE as f32, "degrees_north", "latitude"),
            (MUD_VAR, self.mud_fraction.as_ref(), self.fill_value as f32, "%", "mud fraction of surface sediment"),
            (POROSITY_VAR, Some(&self.porosity), self.fill_value as f32, "1", "sediment porosity"),
        ];
        for (name, values, fill, units, long_name) in vars {
            let Some(values) = values else { continue };
            let mut var = file.add_variable::<f32>(name, &dims)?;
            var.put_attribute("_FillValue", fill)?;
            var.put_attribute("units", units)?;
            var.put_attribute("long_name", long_name)?;
            var.put_values(&to_f32(values), ..)?;
        }

        file.add_attribute("title", self.title.as_str())?;
        file.add_attribute("type", self.file_type.as_str())?;
        file.add_attribute("gridid", self.gridid.as_str())?;
        file.add_attribute("Conventions", self.conventions.as_str())?;
        file.add_attribute("history", self.history.as_str())?;
        Ok(())
    }

    #[cfg(not(feature = "netcdf"))]
    pub fn write_netcdf(&self, path: &Path) -> Result<()> {
        Err(Error::Unsupported(format!(
            "writing {} requires the `netcdf` feature",
            path.display()
        )))
    }
}

/// Build and write in one step.
pub fn write_field(path: &Path, grid: &Grid, field: &SedimentField, config: &ExportConfig, fill_value: f64) -> Result<()> {
    ExportedField::build(grid, field, config, fill_value)?.write(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::land_mask::{LandMask, FILL_VALUE, LAND_SENTINEL};

    fn field() -> (Grid, SedimentField) {
        let mut g = Grid::regular(2, 2, 4.0, 53.0, 0.1, 0.1, 5.0);
        g.bathymetry[3] = LAND_SENTINEL;
        let land = LandMask::from_grid(&g, LAND_SENTINEL);
        let f = SedimentField {
            rows: 2,
            cols: 2,
            mud_fraction: vec![10.0, f64::NAN, 30.0, 40.0],
            porosity: vec![0.43, f64::NAN, 0.51, 0.55],
            land,
        };
        (g, f)
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a/out.nc")).unwrap(), OutputFormat::NetCdf);
        assert_eq!(OutputFormat::from_path(Path::new("out.JSON")).unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_path(Path::new("out.csv")).is_err());
    }

    #[test]
    fn fill_applied_to_land_and_missing() {
        let (g, f) = field();
        let e = ExportedField::build(&g, &f, &ExportConfig::default(), FILL_VALUE).unwrap();
        assert_eq!(e.porosity, vec![0.43, FILL_VALUE, 0.51, FILL_VALUE]);
        assert_eq!(e.mud_fraction.as_deref(), Some(&[10.0, FILL_VALUE, 30.0, FILL_VALUE][..]));
        assert!(e.history.starts_with("Created: "));
        assert_eq!(e.dims, ["yc".to_string(), "xc".to_string()]);
    }

    #[test]
    fn porosity_only_drops_other_variables() {
        let (g, f) = field();
        let cfg = ExportConfig {
            porosity_only: true,
            ..ExportConfig::default()
        };
        let e = ExportedField::build(&g, &f, &cfg, FILL_VALUE).unwrap();
        assert!(e.mud_fraction.is_none() && e.lonc.is_none() && e.latc.is_none());
        let json = serde_json::to_string(&e).unwrap();
        assert!(!json.contains("mud_fraction"));
    }

    #[test]
    fn json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let (g, f) = field();
        write_field(&path, &g, &f, &ExportConfig::default(), FILL_VALUE).unwrap();
        let back = ExportedField::from_json_file(&path).unwrap();
        assert_eq!(back.rows, 2);
        assert_eq!(back.file_type, "Sediment mud fraction file for GETM");
        let p = back.unfilled(&back.porosity);
        assert!(p[1].is_nan() && p[3].is_nan());
        assert_eq!(p[0], 0.43);
    }

    #[cfg(not(feature = "netcdf"))]
    #[test]
    fn netcdf_needs_feature() {
        let (g, f) = field();
        let err = write_field(Path::new("out.nc"), &g, &f, &ExportConfig::default(), FILL_VALUE).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}

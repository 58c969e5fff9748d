//! Point samples of percentage mud read from delimited text.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coords::{Point2D, UtmProjection};
use crate::error::{Error, Result};
use crate::porosity::PorosityCoefficients;

/// Cell contents treated as missing (the row is dropped).
const NA_TOKENS: [&str; 6] = ["", "na", "nan", "null", "none", "n/a"];

/// One surface-sediment sample in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Longitude (degrees east).
    pub x: f64,
    /// Latitude (degrees north).
    pub y: f64,
    pub percentage_mud: f64,
    pub porosity: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, percentage_mud: f64) -> Self {
        Self::with_coefficients(x, y, percentage_mud, &PorosityCoefficients::default())
    }

    pub fn with_coefficients(x: f64, y: f64, percentage_mud: f64, coeffs: &PorosityCoefficients) -> Self {
        Self {
            x,
            y,
            percentage_mud,
            porosity: coeffs.porosity(percentage_mud),
        }
    }
}

/// A sample together with its position in the working UTM frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedSample {
    pub sample: Sample,
    pub x_m: f64,
    pub y_m: f64,
}

impl ProjectedSample {
    #[inline]
    pub fn point(&self) -> Point2D {
        Point2D::new(self.x_m, self.y_m)
    }
}

/// Project every sample into `proj`.
pub fn project(samples: &[Sample], proj: &UtmProjection) -> Result<Vec<ProjectedSample>> {
    samples
        .iter()
        .map(|s| {
            let p = proj.forward(s.x, s.y)?;
            Ok(ProjectedSample {
                sample: *s,
                x_m: p.x,
                y_m: p.y,
            })
        })
        .collect()
}

/// Column names and delimiter of the sample table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleColumns {
    pub x: String,
    pub y: String,
    pub mud: String,
    pub delimiter: char,
}

impl Default for SampleColumns {
    fn default() -> Self {
        Self {
            x: "x".into(),
            y: "y".into(),
            mud: "percentage_mud".into(),
            delimiter: ',',
        }
    }
}

pub fn load_samples(path: &Path, columns: &SampleColumns, coeffs: &PorosityCoefficients) -> Result<Vec<Sample>> {
    let reader = BufReader::new(File::open(path)?);
    let samples = read_samples(reader, columns, coeffs)?;
    info!(count = samples.len(), path = %path.display(), "loaded samples");
    Ok(samples)
}

/// Parse samples from any reader. Rows with a missing x, y or mud value are
/// dropped; negative mud or non-finite coordinates are errors.
pub fn read_samples<R: Read>(reader: R, columns: &SampleColumns, coeffs: &PorosityCoefficients) -> Result<Vec<Sample>> {
    let delimiter = u8::try_from(columns.delimiter)
        .map_err(|_| Error::InvalidConfig(format!("delimiter '{}' is not a single byte", columns.delimiter)))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let x_idx = resolve_column(&headers, &columns.x)?;
    let y_idx = resolve_column(&headers, &columns.y)?;
    let mud_idx = resolve_column(&headers, &columns.mud)?;

    let mut samples = Vec::new();
    let mut dropped = 0usize;
    let mut over_100 = 0usize;

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;

        let x = parse_cell(record.get(x_idx), row, &columns.x)?;
        let y = parse_cell(record.get(y_idx), row, &columns.y)?;
        let mud = parse_cell(record.get(mud_idx), row, &columns.mud)?;
        let (Some(x), Some(y), Some(mud)) = (x, y, mud) else {
            dropped += 1;
            continue;
        };

        for (name, v) in [(&columns.x, x), (&columns.y, y), (&columns.mud, mud)] {
            if v.is_infinite() {
                return Err(Error::InvalidSample {
                    row,
                    column: name.clone(),
                    reason: "value is infinite".into(),
                });
            }
        }
        if mud < 0.0 {
            return Err(Error::InvalidSample {
                row,
                column: columns.mud.clone(),
                reason: format!("negative percentage mud {mud}"),
            });
        }
        if mud > 100.0 {
            over_100 += 1;
        }
        samples.push(Sample::with_coefficients(x, y, mud, coeffs));
    }

    if dropped > 0 {
        debug!(dropped, "dropped incomplete sample rows");
    }
    if over_100 > 0 {
        warn!(count = over_100, "samples with percentage mud above 100 kept as given");
    }
    Ok(samples)
}

fn resolve_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::MissingColumn(name.to_string()))
}

/// `Ok(None)` for a missing cell or NA token.
fn parse_cell(cell: Option<&str>, row: usize, column: &str) -> Result<Option<f64>> {
    let Some(s) = cell else { return Ok(None) };
    if NA_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(Error::InvalidSample {
            row,
            column: column.to_string(),
            reason: format!("cannot parse '{s}' as a number"),
        }),
    }
}

/// Min and max of a sample attribute.
pub fn range_of(samples: &[Sample], f: impl Fn(&Sample) -> f64) -> (f64, f64) {
    samples
        .iter()
        .map(f)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

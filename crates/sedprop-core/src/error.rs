//! Error type shared by every stage of the pipeline.

use thiserror::Error;

/// Errors raised while loading, interpolating or exporting sediment data.
#[derive(Debug, Error)]
pub enum Error {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited text
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed JSON (config, grid or exported field)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// GeoTIFF decoding error
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// NetCDF library error
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// A required column is absent from the sample table header.
    #[error("sample file missing required column '{0}'")]
    MissingColumn(String),

    /// A required variable is absent from the grid file.
    #[error("grid file missing required variable '{0}'")]
    MissingVariable(String),

    /// Arrays that must share a shape do not.
    #[error("shape mismatch for {what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// A sample row holds a value that cannot be used.
    #[error("invalid sample at row {row}, column '{column}': {reason}")]
    InvalidSample {
        row: usize,
        column: String,
        reason: String,
    },

    /// Interpolation was requested with an empty sample set.
    #[error("no usable samples")]
    NoSamples,

    /// Coordinate outside the domain of the projection.
    #[error("projection error: {0}")]
    Projection(String),

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Format or feature not available in this build.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A statistic is undefined for the given data.
    #[error("statistics error: {0}")]
    Statistics(String),
}

pub type Result<T> = std::result::Result<T, Error>;

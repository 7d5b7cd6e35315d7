use std::path::PathBuf;
use thiserror::Error;

/// Failures the pipeline distinguishes. Everything else is surfaced as
/// `anyhow` context on top of these.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("geographic source not found or unreadable: {path:?}")]
    MissingGeographicSource { path: PathBuf },

    #[error("unsupported geometry format: {0}")]
    UnsupportedFormat(String),

    #[error("region '{name}' has a non-positive area ({area} km²)")]
    DivisionByZeroArea { name: String, area: f64 },

    #[error("invalid bin boundaries: {0}")]
    InvalidBins(String),

    #[error("invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("name field '{field}' not found in geographic source")]
    MissingNameField { field: String },

    #[error("font error: {0}")]
    Font(String),
}

//! Error types for deck synthesis.
//!
//! Only package-level failures surface as [`Error`]. Per-slide and
//! configuration problems are recovered locally and recorded as
//! [`Diagnostic`](crate::Diagnostic)s instead.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a synthesis or canonicalization run.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read, or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The template package is unusable (no masters, no layouts, bad parts).
    #[error("Template error: {0}")]
    TemplateError(String),

    /// ZIP container error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or serialization error.
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// Raster decoding or encoding error.
    #[error("Image error: {0}")]
    ImageError(String),

    /// Invalid rules file or slide input.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A package part that must exist is missing or malformed.
    #[error("Invalid or corrupted package: {0}")]
    CorruptedFile(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ConfigError(e.to_string())
    }
}

//! Error types for the watermark removal library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the watermark removal library
#[derive(Error, Debug)]
pub enum Error {
    /// No usable input was supplied (empty list, no `.pdf` paths)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// PDF parsing or writing error (corrupt document)
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Password-protected documents are not supported
    #[error("PDF is encrypted: {}", .0.display())]
    Encrypted(PathBuf),

    /// External compression tool missing or failing
    #[error("Compression unavailable: {0}")]
    CompressionUnavailable(String),

    /// Configuration could not be read or parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error stems from an unreadable or malformed document
    pub fn is_corrupt_document(&self) -> bool {
        matches!(self, Error::Pdf(_) | Error::EmptyPdf(_))
    }
}

//! Error types for the render-and-export workflow

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering a document to PDF
#[derive(Error, Debug)]
pub enum Error {
    /// The input document does not exist or is not a regular file
    #[error("Input document not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Failed to launch the browser or open a tab
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Failed to load the document
    #[error("Failed to load document: {0}")]
    Load(String),

    /// Failed to produce or write the PDF
    #[error("PDF export failed: {0}")]
    Export(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

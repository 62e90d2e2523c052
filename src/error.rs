//! Error types for report loading and tree construction.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`ReportError`].
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur while loading a memory usage report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// I/O error while reading the report or config file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The report JSON could not be parsed.
    #[error("Invalid report JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTML export did not contain the embedded `jsonData` element.
    #[error("No embedded report data found in {}", path.display())]
    MissingEmbeddedData {
        /// File that was searched.
        path: PathBuf,
    },

    /// A file record id cannot be placed in the folder tree.
    #[error("Malformed file id {id:?} (common prefix {prefix:?})")]
    MalformedPath {
        /// Offending record id.
        id: String,
        /// Common prefix computed for the report.
        prefix: String,
    },

    /// The config file exists but could not be parsed.
    #[error("Invalid config {}: {message}", path.display())]
    Config {
        /// Config file location.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

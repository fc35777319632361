//! Error types for xl2json-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an export run.
///
/// Sheets that are skipped (blank origin cell, no data rows) are not errors;
/// see [`crate::SkipReason`].
#[derive(Debug, Error)]
pub enum Error {
    /// An address string does not match the A1 grammar
    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    /// The spreadsheet application failed to answer a request
    #[error("Spreadsheet source error: {0}")]
    Source(String),

    /// Writing an output artifact failed
    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing an output artifact failed
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new malformed-address error for `address`
    pub fn malformed<S: Into<String>>(address: S) -> Self {
        Error::MalformedAddress(address.into())
    }

    /// Create a new source error with a message
    pub fn source_error<S: Into<String>>(msg: S) -> Self {
        Error::Source(msg.into())
    }
}

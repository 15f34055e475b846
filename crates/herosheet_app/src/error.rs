//! Error types for herosheet_app

use thiserror::Error;

/// Errors that can occur while fetching and opening an item
#[derive(Error, Debug)]
pub enum SheetError {
    /// Transport failure (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Response body did not match the expected shape
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for SheetError {
    fn from(err: anyhow::Error) -> Self {
        SheetError::Other(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for SheetError {
    fn from(err: serde_json::Error) -> Self {
        SheetError::Decode(err.to_string())
    }
}

/// Result type for herosheet_app operations
pub type Result<T> = std::result::Result<T, SheetError>;

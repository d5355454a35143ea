//! Error types for card rendering, export and manager lookup

use thiserror::Error;

/// Result type alias for cardsmith operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, exporting or resolving cards
#[derive(Error, Debug)]
pub enum Error {
    /// The export target is not mounted on the stage
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Rasterization or PNG encoding failed
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// Photo bytes in a format the rasterizer cannot decode
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// Another capture is still running on this exporter
    #[error("An export is already in progress")]
    ExportBusy,

    /// The record store query failed (transport, status, decoding or credentials)
    #[error("Manager lookup failed: {0}")]
    LookupFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Saving the exported file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Fold any store-side error into `LookupFailed`, keeping its message.
    pub(crate) fn into_lookup(self) -> Self {
        match self {
            e @ Error::LookupFailed(_) => e,
            other => Error::LookupFailed(other.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::CaptureError(err.to_string())
    }
}

#[cfg(feature = "airtable")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::LookupFailed(err.to_string())
    }
}

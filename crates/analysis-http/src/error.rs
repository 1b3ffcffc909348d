use std::path::PathBuf;

use thiserror::Error;

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, AnalysisHttpError>;

/// Errors produced while talking to the analysis service.
#[derive(Debug, Error)]
pub enum AnalysisHttpError {
    #[error("invalid upload {}: {reason}", .path.display())]
    InvalidUpload { path: PathBuf, reason: String },

    #[error("upload rejected ({status}): {message}")]
    UploadRejected { status: u16, message: String },

    #[error("{url} returned HTTP {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisHttpError {
    /// Returns true when the request never left the client.
    pub fn is_client_side(&self) -> bool {
        matches!(self, Self::InvalidUpload { .. } | Self::Io { .. })
    }
}

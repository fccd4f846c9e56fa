use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error: {status} for URL: {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot read {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Page limit of {limit} reached before the last page")]
    PageLimit { limit: usize },

    #[error("{failed} of {total} sources failed during the cycle")]
    Incomplete { failed: usize, total: usize },

    #[error("Job cycle aborted: {0}")]
    Aborted(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ExporterError {
    /// Network level failures, including non-success statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, ExporterError::Transport(_) | ExporterError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;

//! Client error types

use std::path::PathBuf;

use thiserror::Error;

/// Result type for backend calls
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures below the application level.
///
/// A response whose `status` is not `"success"` is not an error; it is an
/// [`ApiOutcome::Failure`](super::ApiOutcome::Failure).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, timeout or body transfer failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("server returned HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },

    /// Local file could not be read or written
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Base URL or returned href could not be turned into a URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClientError::Io { path: path.into(), source }
    }

    /// Whether the request failed before any HTTP answer arrived
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

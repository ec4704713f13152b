//! Error types shared across the queue and its collaborators

use blob_fetch::FetchError;
use thiserror::Error;

/// Rejected queue configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("simultaneousDownloads must be at least 1")]
    NoConcurrency,

    #[error("progressThrottleIntervalSeconds must be a non-negative number, got {0}")]
    InvalidThrottle(f64),

    #[error("unsupported downloadMethod: {0}")]
    InvalidMethod(String),

    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A transfer that ended without a usable payload for a reason other than
/// cancellation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("server responded with status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unsupported transfer method: {0}")]
    InvalidMethod(String),

    /// The transport gave up on its own, without the queue asking it to
    #[error("transfer aborted by transport")]
    Interrupted,
}

impl From<FetchError> for TransportError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Status(code) => TransportError::Status(code),
            FetchError::InvalidMethod(method) => TransportError::InvalidMethod(method),
            FetchError::Request(e) => TransportError::Request(e.to_string()),
            FetchError::Cancelled => TransportError::Interrupted,
        }
    }
}

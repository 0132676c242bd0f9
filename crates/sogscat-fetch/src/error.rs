//! Error types for sogscat-fetch.

use thiserror::Error;

/// Errors raised while building or stepping fetch tasks.
///
/// A request that fails is not an error at this level: its outcome is handed
/// back to the owning task, which decides what failure means.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("fetch task stepped after it finished")]
    TaskFinished,

    #[error("fetch task resumed without the outcome of its pending request")]
    MissingResult,

    #[error("fetch task received an outcome before issuing a request")]
    UnexpectedResult,
}

/// Transport-level failure of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors that abort a whole scheduler run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("completed request belongs to unknown task #{0}")]
    UnknownTask(usize),

    #[error("task #{id} failed: {source}")]
    Task {
        id: usize,
        #[source]
        source: FetchError,
    },
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_connect() {
            HttpError::Connect(e.to_string())
        } else {
            HttpError::Transport(e.to_string())
        }
    }
}

//! Error types for sogscat-server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("join link carries no public key: {0}")]
    MissingPublicKey(String),

    #[error("server {0} has no resolved public key")]
    UnresolvedPublicKey(String),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Violations of merge preconditions.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("cannot merge servers by hostname: {left} differs from {right}")]
    HostnameMismatch { left: String, right: String },

    #[error("cannot merge servers by identity: public key {left} differs from {right}")]
    PublicKeyMismatch { left: String, right: String },

    #[error("server {base_url} has no single public key to sort by")]
    UnresolvedPublicKey { base_url: String },
}

pub type Result<T> = std::result::Result<T, ServerError>;

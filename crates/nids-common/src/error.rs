//! Error types for OpenNIDS

use thiserror::Error;

/// OpenNIDS error type
#[derive(Error, Debug)]
pub enum NidsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed value (flag string, attack tag, address)
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Event channel closed or saturated
    #[error("channel error: {0}")]
    Channel(String),
}

/// Result type for OpenNIDS
pub type NidsResult<T> = Result<T, NidsError>;

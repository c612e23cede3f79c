//! Client-side error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The relay could not be reached or the body could not be read.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a non-success status.
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// The response body failed mid-stream.
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// Local persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A session or message id that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a `{"error": "..."}` JSON body with an appropriate status code.
//!
//! Transport errors are logged with full detail but only a generic message
//! is returned to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relaychat_types::ErrorBody;
use thiserror::Error;
use tracing::error;

/// All errors that can occur in the relay request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the accepted size.
    #[error("request body larger than {0} bytes")]
    PayloadTooLarge(usize),

    /// The upstream provider answered with a non-success status.
    #[error("upstream provider error: {status}")]
    Upstream { status: StatusCode },

    /// The upstream provider could not be reached.
    #[error("upstream unreachable: {0}")]
    BadGateway(#[from] reqwest::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body larger than {limit} bytes"),
            ),
            ServerError::Upstream { status } => {
                (*status, format!("upstream provider error: {}", status.as_u16()))
            }
            ServerError::BadGateway(e) => {
                error!(error = %e, "upstream request failed");
                (StatusCode::BAD_GATEWAY, "upstream provider unreachable".to_owned())
            }
        };
        (status, Json(ErrorBody { error: client_message })).into_response()
    }
}

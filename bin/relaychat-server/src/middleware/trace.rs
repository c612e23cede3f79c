use crate::state::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::ServerError;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Requests with a larger body are refused before reaching a handler.
pub const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Request bodies below this size are logged when they are JSON.
const MAX_LOGGED_BODY_BYTES: usize = 1024;

/// Wrap each request in an `http_request` span keyed by a trace id.
///
/// The id is taken from an incoming `x-trace-id` header when it is a valid
/// UUID, otherwise generated, and echoed on the response. Response bodies are
/// passed through untouched so streamed replies are not buffered.
pub async fn trace_middleware(
    State(_state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        info!("→ request started");
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (parts, body) = req.into_parts();
        let req_bytes = match buffer_and_log(&parts.headers, body).await {
            Ok(bytes) => bytes,
            Err(e) => return e.into_response(),
        };
        let mut req = Request::from_parts(parts, Body::from(req_bytes));
        if let Some(v) = &header_value {
            req.headers_mut().insert(X_TRACE_ID, v.clone());
        }

        let mut response = next.run(req).await;
        if let Some(v) = header_value {
            response.headers_mut().insert(X_TRACE_ID, v);
        }

        // For streamed bodies this marks the headers, not the end of the body.
        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response headers sent"
        );

        response
    }
    .instrument(span)
    .await
}

/// Collect the request body (at most [`MAX_REQUEST_BODY_BYTES`]) and log it.
async fn buffer_and_log(headers: &header::HeaderMap, body: Body) -> Result<Bytes, ServerError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let is_json = content_type.contains("application/json");

    let bytes = match Limited::new(body, MAX_REQUEST_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(limit = MAX_REQUEST_BODY_BYTES, "request body too large");
            return Err(ServerError::PayloadTooLarge(MAX_REQUEST_BODY_BYTES));
        }
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return Err(ServerError::BadRequest("failed to read request body".into()));
        }
    };

    if is_json && bytes.len() < MAX_LOGGED_BODY_BYTES {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            debug!("request body: {}", text);
        }
    } else if !bytes.is_empty() {
        debug!("request body: [skipped: type={}, size={}]", content_type, bytes.len());
    }

    Ok(bytes)
}

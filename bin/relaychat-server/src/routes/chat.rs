//! Streaming chat relay (`POST /api/chat`).
//!
//! Forwards the conversation to the upstream provider with a fixed parameter
//! envelope and streams the provider's SSE body back line by line. The relay
//! keeps no state between requests; dropping the client connection drops the
//! upstream response with it.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use relaychat_types::{ErrorBody, RelayMessage, RelayRequest, RelaySettings, Role, UpstreamRequest};
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::config::Config;
use crate::error::ServerError;
use crate::relay::relay_lines;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(relay_chat),
    components(schemas(RelayRequest, RelayMessage, RelaySettings, Role, ErrorBody))
)]
pub struct ChatApi;

/// Register relay routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(relay_chat))
}

/// Relay a chat turn to the upstream provider (`POST /api/chat`).
///
/// On success the body is `text/plain`, one upstream line per `\n`.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = RelayRequest,
    responses(
        (status = 200, description = "Upstream SSE lines, newline-delimited", content_type = "text/plain", body = String),
        (status = 400, description = "Malformed request body", body = ErrorBody),
        (status = 502, description = "Upstream unreachable", body = ErrorBody),
    )
)]
pub async fn relay_chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ServerError> {
    let req = parse_relay_request(&body)?;
    let upstream_req = upstream_request(&state.config, req);

    debug!(
        model = %upstream_req.model,
        messages = upstream_req.messages.len(),
        temperature = upstream_req.temperature,
        max_tokens = upstream_req.max_tokens,
        "relay request"
    );

    let upstream = state.upstream.open_stream(&upstream_req).await?;
    info!(model = %upstream_req.model, "relaying upstream stream");

    let body = Body::from_stream(relay_lines(upstream.bytes_stream()));
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// Parse the body, rejecting anything without a `messages` array.
fn parse_relay_request(body: &[u8]) -> Result<RelayRequest, ServerError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))?;

    if !value.get("messages").is_some_and(serde_json::Value::is_array) {
        return Err(ServerError::BadRequest("Messages array is required".into()));
    }

    serde_json::from_value(value)
        .map_err(|e| ServerError::BadRequest(format!("invalid request body: {e}")))
}

/// Fill absent generation parameters from the configured defaults.
fn upstream_request(cfg: &Config, req: RelayRequest) -> UpstreamRequest {
    let RelayRequest { messages, settings } = req;
    UpstreamRequest {
        model: settings
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| cfg.default_model.clone()),
        messages,
        stream: true,
        temperature: settings.temperature.unwrap_or(cfg.default_temperature),
        max_tokens: settings.max_tokens.unwrap_or(cfg.default_max_tokens),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

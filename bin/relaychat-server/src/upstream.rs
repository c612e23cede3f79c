//! HTTP client for the upstream completion provider.
//!
//! One [`UpstreamClient`] is shared by every request: same endpoint, same
//! credential, no per-user handling.

use std::time::Duration;

use relaychat_types::UpstreamRequest;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ServerError;

/// Header carrying the provider-side customer identifier.
pub const CUSTOMER_ID_HEADER: &str = "customerId";

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    customer_id: Option<String>,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("url", &self.url)
            .field("authenticated", &self.api_key.is_some())
            .finish()
    }
}

impl UpstreamClient {
    pub fn new(cfg: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(cfg.upstream_connect_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: cfg.upstream_url.clone(),
            api_key: cfg.upstream_api_key.clone(),
            customer_id: cfg.upstream_customer_id.clone(),
        })
    }

    /// Send `body` and return the response once its status is known to be a
    /// success. The body is left unread for the caller to stream.
    pub async fn open_stream(&self, body: &UpstreamRequest) -> Result<reqwest::Response, ServerError> {
        let mut req = self.http.post(&self.url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        if let Some(customer_id) = &self.customer_id {
            req = req.header(CUSTOMER_ID_HEADER, customer_id);
        }

        debug!(url = %self.url, model = %body.model, messages = body.messages.len(), "calling upstream");
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %detail, "upstream provider returned an error");
            return Err(ServerError::Upstream { status });
        }
        Ok(resp)
    }
}

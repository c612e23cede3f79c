//! Request bodies on the two HTTP hops: client → relay and relay → upstream.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::chat::{ChatSettings, Role};

/// One entry of the outbound conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RelayMessage {
    /// `"system"`, `"user"` or `"assistant"`.
    pub role: Role,
    pub content: String,
}

impl RelayMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Generation parameters sent with a relay request.
///
/// Every field is optional; the relay substitutes its configured defaults.
/// Unknown fields (e.g. `systemPrompt`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl From<&ChatSettings> for RelaySettings {
    fn from(settings: &ChatSettings) -> Self {
        Self {
            model: Some(settings.model.clone()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RelayRequest {
    /// Full outbound conversation, system prompt first.
    pub messages: Vec<RelayMessage>,
    #[serde(default)]
    pub settings: RelaySettings,
}

/// Body sent to the upstream completion provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamRequest {
    pub model: String,
    pub messages: Vec<RelayMessage>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// JSON error body returned by the relay on any non-success status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

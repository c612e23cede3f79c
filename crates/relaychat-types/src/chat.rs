//! Conversation records.
//!
//! These are the shapes persisted by the client's key-value store, so field
//! names serialise in camelCase (`isStreaming`, `createdAt`, `systemPrompt`)
//! and timestamps as RFC 3339 strings.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Title every new session starts with.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Number of characters of the first user message kept in a derived title.
pub const TITLE_MAX_CHARS: usize = 50;

pub const DEFAULT_MODEL: &str = "openrouter/anthropic/claude-sonnet-4";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Provide clear, accurate, \
     and helpful responses to user questions. Be concise but thorough in your explanations.";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// `true` while deltas are still being appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_streaming: Option<bool>,
    /// Human-readable failure text for an assistant turn that did not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_streaming: None,
            error: None,
        }
    }

    pub fn streaming(mut self) -> Self {
        self.is_streaming = Some(true);
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming.unwrap_or(false)
    }
}

/// An ordered conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: DEFAULT_SESSION_TITLE.to_owned(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`; call after every mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Append `message`, deriving the title from it when it is the first user
    /// message of a session still carrying the default title.
    pub fn push_message(&mut self, message: Message) {
        if self.title == DEFAULT_SESSION_TITLE && message.role == Role::User {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
        self.touch();
    }

    /// Id for the next message: creation-time derived, unique within the session.
    pub fn next_message_id(&self, now: DateTime<Utc>) -> String {
        next_time_id(now, self.messages.iter().map(|m| m.id.as_str()))
    }
}

/// First [`TITLE_MAX_CHARS`] characters of `content`, with `...` appended when
/// anything was cut.
pub fn derive_title(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Millisecond timestamp id, bumped past the largest numeric id in `existing`
/// so ids created within the same millisecond stay distinct.
///
/// A stored id of `i64::MAX` cannot be bumped past; the first free value at or
/// after `now` is used instead.
pub fn next_time_id<'a>(now: DateTime<Utc>, existing: impl Iterator<Item = &'a str>) -> String {
    let candidate = now.timestamp_millis();
    let taken: HashSet<i64> = existing.filter_map(|id| id.parse::<i64>().ok()).collect();
    let next = match taken.iter().max() {
        Some(&n) if n >= candidate => n
            .checked_add(1)
            .or_else(|| (candidate..=i64::MAX).find(|v| !taken.contains(v))),
        _ => Some(candidate),
    };
    next.unwrap_or(candidate).to_string()
}

/// Global generation preferences, read before every outbound request.
///
/// Deserialisation fills absent fields from [`ChatSettings::default`], so a
/// stored partial object is merged over the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSettings {
    pub model: String,
    pub system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

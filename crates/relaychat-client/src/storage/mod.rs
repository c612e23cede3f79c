//! Local persistence for sessions and settings.
//!
//! [`KeyValueStore`] is the seam: a flat string-to-string map. The default
//! implementation is [`SqliteStore`]; [`MemoryStore`] backs tests and
//! throwaway runs. [`ChatStorage`] layers the typed records on top, replacing
//! whole collections on every write.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required.

mod memory;
mod sqlite;

use std::future::Future;

use relaychat_types::{ChatSession, ChatSettings};
use tracing::warn;

use crate::error::ClientError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const SESSIONS_KEY: &str = "ai-chat-sessions";
pub const SETTINGS_KEY: &str = "ai-chat-settings";
pub const CURRENT_SESSION_KEY: &str = "ai-chat-current-session";

/// Flat string key-value persistence.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, ClientError>> + Send;

    /// Insert or replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Remove `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// Typed access to the chat records kept in a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct ChatStorage<S> {
    store: S,
}

impl<S: KeyValueStore> ChatStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored sessions, or an empty list when nothing (or nothing readable)
    /// is stored.
    pub async fn get_sessions(&self) -> Result<Vec<ChatSession>, ClientError> {
        let Some(raw) = self.store.get(SESSIONS_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(sessions) => Ok(sessions),
            Err(e) => {
                warn!(error = %e, "stored sessions are unreadable; starting empty");
                Ok(Vec::new())
            }
        }
    }

    pub async fn save_sessions(&self, sessions: &[ChatSession]) -> Result<(), ClientError> {
        let raw = serde_json::to_string(sessions)?;
        self.store.set(SESSIONS_KEY, &raw).await
    }

    /// Stored settings merged over the defaults.
    pub async fn get_settings(&self) -> Result<ChatSettings, ClientError> {
        let Some(raw) = self.store.get(SETTINGS_KEY).await? else {
            return Ok(ChatSettings::default());
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(error = %e, "stored settings are unreadable; using defaults");
                Ok(ChatSettings::default())
            }
        }
    }

    pub async fn save_settings(&self, settings: &ChatSettings) -> Result<(), ClientError> {
        let raw = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, &raw).await
    }

    pub async fn get_current_session_id(&self) -> Result<Option<String>, ClientError> {
        self.store.get(CURRENT_SESSION_KEY).await
    }

    /// `None` removes the stored id.
    pub async fn set_current_session_id(&self, id: Option<&str>) -> Result<(), ClientError> {
        match id {
            Some(id) => self.store.set(CURRENT_SESSION_KEY, id).await,
            None => self.store.remove(CURRENT_SESSION_KEY).await,
        }
    }

    pub async fn clear_all_data(&self) -> Result<(), ClientError> {
        for key in [SESSIONS_KEY, SETTINGS_KEY, CURRENT_SESSION_KEY] {
            self.store.remove(key).await?;
        }
        Ok(())
    }
}

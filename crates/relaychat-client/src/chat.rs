//! Conversation controller.
//!
//! [`ChatController`] owns the session list, the current-session pointer,
//! the settings and the loading/error flags, and drives one turn at a time
//! through the [`StreamConsumer`]. Views observe it through
//! [`ChatController::subscribe`].
//!
//! Sessions are written to storage when a turn starts and when it ends;
//! streamed deltas only touch the in-memory copy.

use chrono::Utc;
use relaychat_types::chat::next_time_id;
use relaychat_types::{ChatSession, ChatSettings, Message, Role};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::consumer::{StreamConsumer, StreamOutcome};
use crate::error::ClientError;
use crate::slot::RequestSlot;
use crate::storage::{ChatStorage, KeyValueStore};

const EVENT_CAPACITY: usize = 256;

/// Change notifications for views.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// The session list, the current session or a whole session changed.
    SessionsChanged,
    /// One message changed in place (streamed delta or finalisation).
    MessageUpdated { session_id: String, message: Message },
}

/// How a [`ChatController::send_message`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input, or a turn was already running.
    Skipped,
    Completed { session_id: String, message_id: String },
    Cancelled { session_id: String, message_id: String },
    Failed { session_id: String, message_id: String, error: String },
}

pub struct ChatController<S> {
    storage: ChatStorage<S>,
    consumer: StreamConsumer,
    sessions: Vec<ChatSession>,
    current_session_id: Option<String>,
    settings: ChatSettings,
    is_loading: bool,
    error: Option<String>,
    slot: RequestSlot,
    events: broadcast::Sender<ChatEvent>,
}

impl<S: KeyValueStore> ChatController<S> {
    /// Build a controller and restore settings and sessions from `storage`.
    pub async fn open(storage: ChatStorage<S>, consumer: StreamConsumer) -> Result<Self, ClientError> {
        let settings = storage.get_settings().await?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut controller = Self {
            storage,
            consumer,
            sessions: Vec::new(),
            current_session_id: None,
            settings,
            is_loading: false,
            error: None,
            slot: RequestSlot::new(),
            events,
        };
        controller.load_sessions().await?;
        Ok(controller)
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        self.current_session_id
            .as_deref()
            .and_then(|id| self.session(id))
    }

    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Failure text of the last turn, cleared when the next one starts.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Shared handle on the in-flight request, for cancelling from another task.
    pub fn request_slot(&self) -> RequestSlot {
        self.slot.clone()
    }

    // ── Sessions ────────────────────────────────────────────────────────────

    /// Replace the in-memory sessions with the stored ones.
    ///
    /// The stored current id wins if it still names a session; otherwise the
    /// first session becomes current. Messages left streaming by an earlier
    /// process are finalised with the content they had.
    pub async fn load_sessions(&mut self) -> Result<(), ClientError> {
        let mut sessions = self.storage.get_sessions().await?;
        for message in sessions.iter_mut().flat_map(|s| s.messages.iter_mut()) {
            if message.is_streaming() {
                message.is_streaming = Some(false);
            }
        }

        let stored = self.storage.get_current_session_id().await?;
        self.current_session_id = match stored {
            Some(id) if sessions.iter().any(|s| s.id == id) => Some(id),
            _ => sessions.first().map(|s| s.id.clone()),
        };
        info!(sessions = sessions.len(), current = ?self.current_session_id, "sessions loaded");
        self.sessions = sessions;
        self.emit(ChatEvent::SessionsChanged);
        Ok(())
    }

    /// Start an empty session at the head of the list and make it current.
    pub async fn create_new_session(&mut self) -> Result<String, ClientError> {
        let id = next_time_id(Utc::now(), self.sessions.iter().map(|s| s.id.as_str()));
        self.sessions.insert(0, ChatSession::new(id.clone()));
        self.current_session_id = Some(id.clone());

        self.storage.save_sessions(&self.sessions).await?;
        self.storage.set_current_session_id(Some(&id)).await?;
        debug!(session_id = %id, "session created");
        self.emit(ChatEvent::SessionsChanged);
        Ok(id)
    }

    pub async fn switch_session(&mut self, id: &str) -> Result<(), ClientError> {
        if self.session(id).is_none() {
            return Err(ClientError::NotFound(format!("session {id}")));
        }
        self.current_session_id = Some(id.to_owned());
        self.storage.set_current_session_id(Some(id)).await?;
        self.emit(ChatEvent::SessionsChanged);
        Ok(())
    }

    /// Remove a session. When it was current, the first remaining session (or
    /// none) takes its place. Returns `false` for an unknown id.
    pub async fn delete_session(&mut self, id: &str) -> Result<bool, ClientError> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return Ok(false);
        }
        self.storage.save_sessions(&self.sessions).await?;

        if self.current_session_id.as_deref() == Some(id) {
            self.current_session_id = self.sessions.first().map(|s| s.id.clone());
            self.storage
                .set_current_session_id(self.current_session_id.as_deref())
                .await?;
        }
        self.emit(ChatEvent::SessionsChanged);
        Ok(true)
    }

    /// Wipe every stored record and reset to an empty, default-configured
    /// controller.
    pub async fn clear_all_data(&mut self) -> Result<(), ClientError> {
        self.slot.cancel();
        self.storage.clear_all_data().await?;
        self.sessions.clear();
        self.current_session_id = None;
        self.settings = ChatSettings::default();
        self.error = None;
        self.is_loading = false;
        self.emit(ChatEvent::SessionsChanged);
        Ok(())
    }

    // ── Messages ────────────────────────────────────────────────────────────

    /// Append a message to `session_id` and persist. Returns the new id.
    pub async fn add_message(
        &mut self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<String, ClientError> {
        let id = self.push_message(session_id, |id| Message::new(id, role, content))?;
        self.storage.save_sessions(&self.sessions).await?;
        self.emit(ChatEvent::SessionsChanged);
        Ok(id)
    }

    /// Apply `update` to a message that is not yet finalised.
    ///
    /// Returns `false` when the message does not exist or has already
    /// stopped streaming.
    pub fn update_message(
        &mut self,
        session_id: &str,
        message_id: &str,
        update: impl FnOnce(&mut Message),
    ) -> bool {
        update_in_place(&mut self.sessions, &self.events, session_id, message_id, update)
    }

    fn push_message(
        &mut self,
        session_id: &str,
        build: impl FnOnce(String) -> Message,
    ) -> Result<String, ClientError> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| ClientError::NotFound(format!("session {session_id}")))?;
        let id = session.next_message_id(Utc::now());
        session.push_message(build(id.clone()));
        Ok(id)
    }

    // ── Turns ───────────────────────────────────────────────────────────────

    /// Run one conversation turn for `content`.
    ///
    /// Relay failures do not surface as `Err`: they end up on the assistant
    /// message and in [`ChatController::error`]. `Err` is reserved for local
    /// storage failures.
    pub async fn send_message(&mut self, content: &str) -> Result<TurnOutcome, ClientError> {
        let content = content.trim();
        if content.is_empty() || self.is_loading {
            return Ok(TurnOutcome::Skipped);
        }

        self.error = None;
        self.is_loading = true;
        let result = self.run_turn(content).await;
        self.is_loading = false;
        result
    }

    async fn run_turn(&mut self, content: &str) -> Result<TurnOutcome, ClientError> {
        let session_id = match self.current_session_id.clone() {
            Some(id) if self.session(&id).is_some() => id,
            _ => self.create_new_session().await?,
        };

        self.push_message(&session_id, |id| Message::new(id, Role::User, content))?;
        let history = self
            .session(&session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default();
        let message_id = self.push_message(&session_id, |id| {
            Message::new(id, Role::Assistant, "").streaming()
        })?;
        if let Err(e) = self.storage.save_sessions(&self.sessions).await {
            // The turn never starts; the placeholder must not stay open.
            let error = e.to_string();
            warn!(session_id = %session_id, error = %error, "could not persist turn start");
            self.finalize(&session_id, &message_id, String::new(), Some(error.clone()));
            self.error = Some(error);
            self.emit(ChatEvent::SessionsChanged);
            return Err(e);
        }
        self.emit(ChatEvent::SessionsChanged);

        let request = StreamConsumer::build_request(&history, &self.settings);
        let flight = self.slot.begin();
        info!(
            session_id = %session_id,
            messages = request.messages.len(),
            model = ?request.settings.model,
            "turn started"
        );

        let result = {
            let sessions = &mut self.sessions;
            let events = &self.events;
            self.consumer
                .stream_reply(&request, &flight.token, |text| {
                    update_in_place(sessions, events, &session_id, &message_id, |m| {
                        m.content = text.to_owned();
                    });
                })
                .await
        };
        self.slot.finish(&flight);

        let outcome = match result {
            Ok(StreamOutcome::Completed(text)) => {
                self.finalize(&session_id, &message_id, text, None);
                info!(session_id = %session_id, "turn completed");
                TurnOutcome::Completed { session_id, message_id }
            }
            Ok(StreamOutcome::Cancelled(text)) => {
                self.finalize(&session_id, &message_id, text, None);
                info!(session_id = %session_id, "turn cancelled");
                TurnOutcome::Cancelled { session_id, message_id }
            }
            Err(e) => {
                let error = e.to_string();
                warn!(session_id = %session_id, error = %error, "turn failed");
                self.finalize(&session_id, &message_id, String::new(), Some(error.clone()));
                self.error = Some(error.clone());
                TurnOutcome::Failed { session_id, message_id, error }
            }
        };

        self.storage.save_sessions(&self.sessions).await?;
        Ok(outcome)
    }

    fn finalize(&mut self, session_id: &str, message_id: &str, content: String, error: Option<String>) {
        self.update_message(session_id, message_id, |m| {
            m.content = content;
            m.is_streaming = Some(false);
            m.error = error;
        });
    }

    /// Cancel the in-flight turn, if any. The partial reply is kept.
    pub fn cancel_generation(&mut self) -> bool {
        let cancelled = self.slot.cancel();
        if cancelled {
            self.is_loading = false;
        }
        cancelled
    }

    /// Resend the nearest user message before `message_id` in the current
    /// session as a new turn.
    pub async fn retry_message(&mut self, message_id: &str) -> Result<TurnOutcome, ClientError> {
        let content = {
            let session = self
                .current_session()
                .ok_or_else(|| ClientError::NotFound("current session".into()))?;
            let index = session
                .messages
                .iter()
                .position(|m| m.id == message_id)
                .ok_or_else(|| ClientError::NotFound(format!("message {message_id}")))?;
            session.messages[..index]
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .ok_or_else(|| ClientError::NotFound(format!("user message before {message_id}")))?
        };
        self.send_message(&content).await
    }

    // ── Settings ────────────────────────────────────────────────────────────

    /// Apply `patch` to the settings and persist the result.
    pub async fn update_settings(&mut self, patch: impl FnOnce(&mut ChatSettings)) -> Result<(), ClientError> {
        patch(&mut self.settings);
        self.storage.save_settings(&self.settings).await
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn update_in_place(
    sessions: &mut [ChatSession],
    events: &broadcast::Sender<ChatEvent>,
    session_id: &str,
    message_id: &str,
    update: impl FnOnce(&mut Message),
) -> bool {
    let Some(session) = sessions.iter_mut().find(|s| s.id == session_id) else {
        return false;
    };
    let Some(message) = session.message_mut(message_id) else {
        return false;
    };
    if message.is_streaming == Some(false) {
        return false;
    }
    update(message);
    let message = message.clone();
    session.touch();
    let _ = events.send(ChatEvent::MessageUpdated {
        session_id: session_id.to_owned(),
        message,
    });
    true
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::storage::MemoryStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HELLO: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
                         data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\
                         data: [DONE]\n";

    async fn relay(response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    async fn controller(server: &MockServer, store: MemoryStore) -> ChatController<MemoryStore> {
        let consumer = StreamConsumer::new(format!("{}/api/chat", server.uri()));
        ChatController::open(ChatStorage::new(store), consumer)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn completed_turn_streams_titles_and_persists() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let store = MemoryStore::new();
        let mut chat = controller(&server, store.clone()).await;
        let mut events = chat.subscribe();

        let outcome = chat.send_message("  What is Rust?  ").await.unwrap();
        let TurnOutcome::Completed { session_id, message_id } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };

        let session = chat.current_session().unwrap();
        assert_eq!(session.id, session_id);
        assert_eq!(session.title, "What is Rust?");
        assert_eq!(session.messages[0].content, "What is Rust?");
        let reply = session.message(&message_id).unwrap();
        assert_eq!(reply.content, "Hello");
        assert_eq!(reply.is_streaming, Some(false));
        assert!(reply.error.is_none());
        assert!(!chat.is_loading());

        let mut streamed = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ChatEvent::MessageUpdated { message, .. } = event {
                streamed.push(message.content);
            }
        }
        assert_eq!(streamed, vec!["Hel", "Hello", "Hello"]);

        let stored = ChatStorage::new(store).get_sessions().await.unwrap();
        assert_eq!(stored[0].messages[1].content, "Hello");
        assert_eq!(stored[0].messages[1].is_streaming, Some(false));
    }

    #[tokio::test]
    async fn outbound_request_carries_system_prompt_and_history() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let mut chat = controller(&server, MemoryStore::new()).await;
        chat.update_settings(|s| s.system_prompt = "be brief".into())
            .await
            .unwrap();

        chat.send_message("first").await.unwrap();
        chat.send_message("second").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        let roles: Vec<_> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| (m["role"].as_str().unwrap(), m["content"].as_str().unwrap()))
            .collect();
        assert_eq!(
            roles,
            vec![
                ("system", "be brief"),
                ("user", "first"),
                ("assistant", "Hello"),
                ("user", "second"),
            ]
        );
        assert_eq!(body["settings"]["maxTokens"], 4000);
    }

    #[tokio::test]
    async fn relay_failure_marks_message_and_controller() {
        let server = relay(ResponseTemplate::new(500).set_body_string(r#"{"error":"boom"}"#)).await;
        let mut chat = controller(&server, MemoryStore::new()).await;

        let outcome = chat.send_message("hi").await.unwrap();
        let TurnOutcome::Failed { message_id, error, .. } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(error, "HTTP 500: Internal Server Error");
        assert_eq!(chat.error(), Some(error.as_str()));

        let reply = chat.current_session().unwrap().message(&message_id).unwrap();
        assert_eq!(reply.content, "");
        assert_eq!(reply.is_streaming, Some(false));
        assert_eq!(reply.error.as_deref(), Some(error.as_str()));
    }

    #[tokio::test]
    async fn cancelled_turn_is_not_an_error() {
        let delayed = ResponseTemplate::new(200)
            .set_body_string(HELLO)
            .set_delay(Duration::from_secs(30));
        let server = relay(delayed).await;
        let mut chat = controller(&server, MemoryStore::new()).await;

        let slot = chat.request_slot();
        let canceller = tokio::spawn(async move {
            while !slot.cancel() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        let outcome = chat.send_message("hi").await.unwrap();
        canceller.await.unwrap();
        let TurnOutcome::Cancelled { message_id, .. } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        let reply = chat.current_session().unwrap().message(&message_id).unwrap();
        assert_eq!(reply.is_streaming, Some(false));
        assert!(reply.error.is_none());
        assert!(chat.error().is_none());
        assert!(!chat.is_loading());
    }

    #[tokio::test]
    async fn blank_input_is_skipped() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let mut chat = controller(&server, MemoryStore::new()).await;
        assert_eq!(chat.send_message("   ").await.unwrap(), TurnOutcome::Skipped);
        assert!(chat.sessions().is_empty());
    }

    #[tokio::test]
    async fn retry_resends_preceding_user_message() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let mut chat = controller(&server, MemoryStore::new()).await;
        let TurnOutcome::Completed { message_id, .. } = chat.send_message("again?").await.unwrap() else {
            panic!("first turn failed");
        };

        let outcome = chat.retry_message(&message_id).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Completed { .. }));
        let messages = &chat.current_session().unwrap().messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].content, "again?");
        assert_eq!(messages[2].role, Role::User);
    }

    #[tokio::test]
    async fn finalised_messages_are_immutable() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let mut chat = controller(&server, MemoryStore::new()).await;
        let TurnOutcome::Completed { session_id, message_id } = chat.send_message("hi").await.unwrap() else {
            panic!("turn failed");
        };
        assert!(!chat.update_message(&session_id, &message_id, |m| m.content.clear()));
        assert_eq!(chat.session(&session_id).unwrap().message(&message_id).unwrap().content, "Hello");
    }

    #[tokio::test]
    async fn deleting_current_session_selects_first_remaining() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let mut chat = controller(&server, MemoryStore::new()).await;
        let older = chat.create_new_session().await.unwrap();
        let newer = chat.create_new_session().await.unwrap();
        assert_ne!(older, newer);
        assert_eq!(chat.sessions()[0].id, newer);

        assert!(chat.delete_session(&newer).await.unwrap());
        assert_eq!(chat.current_session_id(), Some(older.as_str()));
        assert!(chat.delete_session(&older).await.unwrap());
        assert_eq!(chat.current_session_id(), None);
        assert!(!chat.delete_session(&older).await.unwrap());
    }

    #[tokio::test]
    async fn reopening_restores_current_session_and_settings() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let store = MemoryStore::new();
        let (first, second) = {
            let mut chat = controller(&server, store.clone()).await;
            let first = chat.create_new_session().await.unwrap();
            let second = chat.create_new_session().await.unwrap();
            chat.switch_session(&first).await.unwrap();
            chat.update_settings(|s| s.temperature = Some(0.0)).await.unwrap();
            (first, second)
        };

        let chat = controller(&server, store).await;
        assert_eq!(chat.sessions().len(), 2);
        assert_eq!(chat.sessions()[0].id, second);
        assert_eq!(chat.current_session_id(), Some(first.as_str()));
        assert_eq!(chat.settings().temperature, Some(0.0));
    }

    #[tokio::test]
    async fn add_message_persists_and_cancel_without_turn_is_a_no_op() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let store = MemoryStore::new();
        let mut chat = controller(&server, store.clone()).await;
        let session_id = chat.create_new_session().await.unwrap();

        let id = chat.add_message(&session_id, Role::System, "note").await.unwrap();
        let stored = ChatStorage::new(store).get_sessions().await.unwrap();
        assert_eq!(stored[0].messages[0].id, id);
        assert_eq!(stored[0].title, "New Chat");

        assert!(!chat.cancel_generation());
        assert!(!chat.is_loading());
    }

    /// Memory store whose writes start failing once `broken` is set.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        broken: std::sync::Arc<std::sync::atomic::AtomicBool>,
    }

    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
            if self.broken.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(ClientError::Storage(sqlx::Error::PoolClosed));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), ClientError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn failed_turn_start_write_closes_the_placeholder() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let store = FlakyStore::default();
        let consumer = StreamConsumer::new(format!("{}/api/chat", server.uri()));
        let mut chat = ChatController::open(ChatStorage::new(store.clone()), consumer)
            .await
            .unwrap();
        let session_id = chat.create_new_session().await.unwrap();

        store.broken.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = chat.send_message("hi").await.unwrap_err();
        assert!(matches!(err, ClientError::Storage(_)));

        let placeholder = chat.session(&session_id).unwrap().messages.last().unwrap().clone();
        assert_eq!(placeholder.role, Role::Assistant);
        assert_eq!(placeholder.is_streaming, Some(false));
        assert!(placeholder.error.is_some());
        assert!(!chat.update_message(&session_id, &placeholder.id, |m| m.content.push('x')));
        assert!(chat.error().is_some());
        assert!(!chat.is_loading());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn switching_to_unknown_session_fails() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let mut chat = controller(&server, MemoryStore::new()).await;
        let err = chat.switch_session("nope").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn interrupted_streams_are_finalised_on_load() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let store = MemoryStore::new();
        let mut session = ChatSession::new("1");
        session.push_message(Message::new("1", Role::User, "hi"));
        session.push_message(Message::new("2", Role::Assistant, "par").streaming());
        ChatStorage::new(store.clone()).save_sessions(&[session]).await.unwrap();

        let chat = controller(&server, store).await;
        let reply = chat.current_session().unwrap().message("2").unwrap();
        assert_eq!(reply.is_streaming, Some(false));
        assert_eq!(reply.content, "par");
    }

    #[tokio::test]
    async fn clear_all_data_resets_everything() {
        let server = relay(ResponseTemplate::new(200).set_body_string(HELLO)).await;
        let store = MemoryStore::new();
        let mut chat = controller(&server, store.clone()).await;
        chat.send_message("hi").await.unwrap();
        chat.update_settings(|s| s.model = "other".into()).await.unwrap();

        chat.clear_all_data().await.unwrap();
        assert!(chat.sessions().is_empty());
        assert_eq!(chat.settings(), &ChatSettings::default());
        assert!(ChatStorage::new(store).get_sessions().await.unwrap().is_empty());
    }
}

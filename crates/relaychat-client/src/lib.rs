//! relaychat client library.
//!
//! - [`consumer`]: issues relay requests and turns the streamed SSE lines
//!   into growing message text.
//! - [`chat`]: the conversation controller (sessions, turns, settings).
//! - [`storage`]: local key-value persistence for sessions and settings.

pub mod chat;
pub mod consumer;
pub mod error;
pub mod slot;
pub mod sse;
pub mod storage;

pub use chat::{ChatController, ChatEvent, TurnOutcome};
pub use consumer::{StreamConsumer, StreamOutcome};
pub use error::ClientError;
pub use slot::{InFlight, RequestSlot};
pub use storage::{ChatStorage, KeyValueStore, MemoryStore, SqliteStore};

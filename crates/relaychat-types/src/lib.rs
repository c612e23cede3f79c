//! Shared types for relaychat.
//!
//! - [`chat`]: the conversation records kept by the client
//!   ([`Message`], [`ChatSession`], [`ChatSettings`]).
//! - [`wire`]: request bodies exchanged between client, relay and the
//!   upstream completion provider.
//! - [`lines`]: newline framing with carry-over, shared by the relay and the
//!   stream consumer.

pub mod chat;
pub mod lines;
pub mod wire;

pub use chat::{ChatSession, ChatSettings, Message, Role, DEFAULT_SESSION_TITLE};
pub use lines::LineBuffer;
pub use wire::{ErrorBody, RelayMessage, RelayRequest, RelaySettings, UpstreamRequest};

//! Terminal rendering of chat state.

use std::io::Write;

use relaychat_client::ChatEvent;
use relaychat_types::{ChatSession, ChatSettings, Message, Role};

/// Prints streamed assistant text as it grows.
///
/// Content only ever grows while a message streams, so each update prints
/// the suffix past what is already on screen.
#[derive(Debug, Default)]
pub struct DeltaPrinter {
    message_id: Option<String>,
    printed: usize,
}

impl DeltaPrinter {
    pub fn render(&mut self, out: &mut impl Write, event: &ChatEvent) -> std::io::Result<()> {
        let ChatEvent::MessageUpdated { message, .. } = event else {
            return Ok(());
        };
        if message.role != Role::Assistant {
            return Ok(());
        }
        if self.message_id.as_deref() != Some(message.id.as_str()) {
            self.message_id = Some(message.id.clone());
            self.printed = 0;
        }

        if let Some(tail) = message.content.get(self.printed..) {
            out.write_all(tail.as_bytes())?;
            self.printed = message.content.len();
        }
        if !message.is_streaming() {
            if let Some(error) = &message.error {
                write!(out, "[error: {error}]")?;
            }
            writeln!(out)?;
            self.message_id = None;
            self.printed = 0;
        }
        out.flush()
    }
}

pub fn transcript(out: &mut impl Write, session: &ChatSession) -> std::io::Result<()> {
    writeln!(out, "── {} ──", session.title)?;
    for message in session.messages.iter().filter(|m| m.role != Role::System) {
        message_line(out, message)?;
    }
    Ok(())
}

fn message_line(out: &mut impl Write, message: &Message) -> std::io::Result<()> {
    match &message.error {
        Some(error) => writeln!(out, "{}: [error: {error}]", message.role),
        None => writeln!(out, "{}: {}", message.role, message.content),
    }
}

pub fn session_list(out: &mut impl Write, sessions: &[ChatSession], current: Option<&str>) -> std::io::Result<()> {
    if sessions.is_empty() {
        return writeln!(out, "no sessions");
    }
    for session in sessions {
        let marker = if Some(session.id.as_str()) == current { '*' } else { ' ' };
        writeln!(
            out,
            "{marker} {}  {}  ({} messages, updated {})",
            session.id,
            session.title,
            session.messages.len(),
            session.updated_at.format("%Y-%m-%d %H:%M"),
        )?;
    }
    Ok(())
}

pub fn settings(out: &mut impl Write, settings: &ChatSettings) -> std::io::Result<()> {
    writeln!(out, "model:        {}", settings.model)?;
    writeln!(out, "system:       {}", settings.system_prompt)?;
    match settings.temperature {
        Some(t) => writeln!(out, "temperature:  {t}")?,
        None => writeln!(out, "temperature:  (relay default)")?,
    }
    match settings.max_tokens {
        Some(n) => writeln!(out, "max tokens:   {n}"),
        None => writeln!(out, "max tokens:   (relay default)"),
    }
}

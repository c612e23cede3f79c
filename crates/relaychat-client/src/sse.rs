//! Minimal SSE line handling for completion streams.
//!
//! Only single-line `data: ` fields are understood; `event:`, `id:` and
//! comment lines are ignored, and a `data:` field spanning several lines is
//! not reassembled.

use serde_json::Value;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// What a single complete line means to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// A `data: ` payload, prefix stripped.
    Data(&'a str),
    /// `data: [DONE]`: normal end of the stream.
    Done,
    /// Anything else.
    Ignored,
}

pub fn classify(line: &str) -> SseLine<'_> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    match line.strip_prefix(DATA_PREFIX) {
        Some(DONE_SENTINEL) => SseLine::Done,
        Some(payload) => SseLine::Data(payload),
        None => SseLine::Ignored,
    }
}

/// Extract the text delta carried by one JSON frame.
///
/// Looks at `choices[0].delta.content` first and falls back to a flat
/// `content` field. Returns `Ok(None)` for frames without text (role
/// announcements, finish reasons, usage) and `Err` when the payload is not
/// JSON at all.
pub fn parse_delta(payload: &str) -> Result<Option<String>, serde_json::Error> {
    let frame: Value = serde_json::from_str(payload)?;
    let delta = non_empty(frame.pointer("/choices/0/delta/content"))
        .or_else(|| non_empty(frame.get("content")));
    Ok(delta.map(str::to_owned))
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

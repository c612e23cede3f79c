//! Stream Consumer: issues relay requests and accumulates streamed deltas.
//!
//! The relay body is read chunk by chunk. A [`LineBuffer`] carries partial
//! lines (and with them any split multi-byte characters) over to the next
//! read, so the accumulated text does not depend on where the network cut
//! the stream. Deltas are applied strictly in arrival order.

use std::ops::ControlFlow;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use relaychat_types::{ChatSettings, LineBuffer, Message, RelayMessage, RelayRequest, RelaySettings, Role};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::ClientError;
use crate::sse::{self, SseLine};

/// How a read loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The body ended or `[DONE]` arrived; carries the full text.
    Completed(String),
    /// The cancellation token fired; carries whatever had arrived.
    Cancelled(String),
}

impl StreamOutcome {
    pub fn content(&self) -> &str {
        match self {
            StreamOutcome::Completed(c) | StreamOutcome::Cancelled(c) => c,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamOutcome::Cancelled(_))
    }
}

/// HTTP side of the consumer: one relay endpoint, one shared client.
#[derive(Debug, Clone)]
pub struct StreamConsumer {
    http: reqwest::Client,
    relay_url: String,
}

impl StreamConsumer {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), relay_url)
    }

    pub fn with_client(http: reqwest::Client, relay_url: impl Into<String>) -> Self {
        Self {
            http,
            relay_url: relay_url.into(),
        }
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    /// Build the relay body: system prompt first, then `history` without its
    /// system messages and without failed assistant turns.
    pub fn build_request(history: &[Message], settings: &ChatSettings) -> RelayRequest {
        let system = (!settings.system_prompt.trim().is_empty())
            .then(|| RelayMessage::new(Role::System, settings.system_prompt.clone()));

        let messages = system
            .into_iter()
            .chain(
                history
                    .iter()
                    .filter(|m| m.role != Role::System && m.error.is_none())
                    .map(|m| RelayMessage::new(m.role, m.content.clone())),
            )
            .collect();

        RelayRequest {
            messages,
            settings: RelaySettings::from(settings),
        }
    }

    /// POST `request` to the relay and consume the reply.
    ///
    /// `on_content` receives the accumulated text after every applied delta.
    /// Cancellation through `cancel` is not an error: it yields
    /// [`StreamOutcome::Cancelled`] whether it fires before or during the read.
    pub async fn stream_reply<F>(
        &self,
        request: &RelayRequest,
        cancel: &CancellationToken,
        on_content: F,
    ) -> Result<StreamOutcome, ClientError>
    where
        F: FnMut(&str),
    {
        let send = self.http.post(&self.relay_url).json(request).send();
        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("request cancelled before the relay answered");
                return Ok(StreamOutcome::Cancelled(String::new()));
            }
            resp = send => resp?,
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_owned(),
            });
        }

        consume_body(resp.bytes_stream(), cancel, on_content).await
    }
}

/// Read loop over a relay body.
pub async fn consume_body<S, E, F>(
    body: S,
    cancel: &CancellationToken,
    mut on_content: F,
) -> Result<StreamOutcome, ClientError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<ClientError>,
    F: FnMut(&str),
{
    futures::pin_mut!(body);
    let mut lines = LineBuffer::new();
    let mut content = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled(content)),
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for line in lines.push(&chunk) {
                    if cancel.is_cancelled() {
                        return Ok(StreamOutcome::Cancelled(content));
                    }
                    if apply_line(&line, &mut content, &mut on_content).is_break() {
                        return Ok(StreamOutcome::Completed(content));
                    }
                }
            }
            Some(Err(e)) => return Err(e.into()),
            None => break,
        }
    }

    if let Some(line) = lines.finish() {
        let _ = apply_line(&line, &mut content, &mut on_content);
    }
    Ok(StreamOutcome::Completed(content))
}

/// Apply one complete line; `Break` means `[DONE]`.
fn apply_line<F: FnMut(&str)>(line: &[u8], content: &mut String, on_content: &mut F) -> ControlFlow<()> {
    let line = String::from_utf8_lossy(line);
    match sse::classify(&line) {
        SseLine::Done => ControlFlow::Break(()),
        SseLine::Ignored => ControlFlow::Continue(()),
        SseLine::Data(payload) => {
            match sse::parse_delta(payload) {
                Ok(Some(delta)) => {
                    content.push_str(&delta);
                    on_content(content);
                }
                Ok(None) => {}
                Err(e) => trace!(error = %e, "skipping malformed frame"),
            }
            ControlFlow::Continue(())
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use futures::stream;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HELLO: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
                         data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\
                         data: [DONE]\n";

    fn chunks(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, ClientError>> {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    async fn run(parts: Vec<Vec<u8>>) -> (StreamOutcome, Vec<String>) {
        let mut seen = Vec::new();
        let outcome = consume_body(chunks(parts), &CancellationToken::new(), |c| seen.push(c.to_owned()))
            .await
            .expect("stream");
        (outcome, seen)
    }

    #[tokio::test]
    async fn deltas_accumulate_until_done() {
        let (outcome, seen) = run(vec![HELLO.as_bytes().to_vec()]).await;
        assert_eq!(outcome, StreamOutcome::Completed("Hello".into()));
        assert_eq!(seen, vec!["Hel", "Hello"]);
    }

    #[tokio::test]
    async fn content_is_independent_of_chunk_cut_points() {
        let fixture = "data: {\"choices\":[{\"delta\":{\"content\":\"Grüß \"}}]}\n\n\
                       data: {\"content\":\"dich 👋\"}\n\n\
                       data: [DONE]\n";
        let bytes = fixture.as_bytes();
        let (whole, _) = run(vec![bytes.to_vec()]).await;
        assert_eq!(whole.content(), "Grüß dich 👋");

        for cut in 1..bytes.len() {
            let (split, _) = run(vec![bytes[..cut].to_vec(), bytes[cut..].to_vec()]).await;
            assert_eq!(split, whole, "cut at {cut}");
        }
        let singles = bytes.iter().map(|b| vec![*b]).collect();
        let (byte_by_byte, _) = run(singles).await;
        assert_eq!(byte_by_byte, whole);
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let body = "data: {not json\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n";
        let (outcome, _) = run(vec![body.as_bytes().to_vec()]).await;
        assert_eq!(outcome, StreamOutcome::Completed("ok".into()));
    }

    #[tokio::test]
    async fn lines_after_done_are_not_applied() {
        let body = "data: {\"content\":\"a\"}\ndata: [DONE]\ndata: {\"content\":\"b\"}\n";
        let (outcome, _) = run(vec![body.as_bytes().to_vec()]).await;
        assert_eq!(outcome.content(), "a");
    }

    #[tokio::test]
    async fn crlf_lines_and_unterminated_tail_are_handled() {
        let body = "data: {\"content\":\"a\"}\r\ndata: {\"content\":\"b\"}";
        let (outcome, _) = run(vec![body.as_bytes().to_vec()]).await;
        assert_eq!(outcome, StreamOutcome::Completed("ab".into()));
    }

    #[tokio::test]
    async fn cancellation_mid_stream_keeps_partial_content() {
        let cancel = CancellationToken::new();
        let first = Bytes::from_static(b"data: {\"content\":\"Hel\"}\n");
        // Never yields again: the loop can only leave through cancellation.
        let body = stream::iter(vec![Ok::<_, ClientError>(first)]).chain(stream::pending());

        let outcome = consume_body(body, &cancel, |_| cancel.cancel())
            .await
            .expect("cancellation is not an error");
        assert_eq!(outcome, StreamOutcome::Cancelled("Hel".into()));
    }

    #[tokio::test]
    async fn read_error_is_returned() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"content\":\"a\"}\n")),
            Err(ClientError::Stream("connection reset".into())),
        ]);
        let err = consume_body(body, &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Stream(_)));
    }

    #[tokio::test]
    async fn non_success_relay_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"x"}"#))
            .mount(&server)
            .await;

        let consumer = StreamConsumer::new(format!("{}/api/chat", server.uri()));
        let req = StreamConsumer::build_request(&[], &ChatSettings::default());
        let err = consumer
            .stream_reply(&req, &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
    }

    #[tokio::test]
    async fn relay_body_is_consumed_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HELLO))
            .mount(&server)
            .await;

        let consumer = StreamConsumer::new(format!("{}/api/chat", server.uri()));
        let req = StreamConsumer::build_request(&[], &ChatSettings::default());
        let outcome = consumer
            .stream_reply(&req, &CancellationToken::new(), |_| {})
            .await
            .expect("reply");
        assert_eq!(outcome, StreamOutcome::Completed("Hello".into()));
    }

    #[test]
    fn request_puts_system_prompt_first_and_drops_system_history() {
        let settings = ChatSettings {
            system_prompt: "be brief".into(),
            ..ChatSettings::default()
        };
        let mut failed = Message::new("3", Role::Assistant, "");
        failed.error = Some("HTTP 500".into());
        let history = vec![
            Message::new("1", Role::System, "old system"),
            Message::new("2", Role::User, "hi"),
            failed,
            Message::new("4", Role::User, "again"),
        ];

        let req = StreamConsumer::build_request(&history, &settings);
        assert_eq!(
            req.messages,
            vec![
                RelayMessage::new(Role::System, "be brief"),
                RelayMessage::new(Role::User, "hi"),
                RelayMessage::new(Role::User, "again"),
            ]
        );
        assert_eq!(req.settings.model.as_deref(), Some(settings.model.as_str()));
    }
}

//! Line-by-line pass-through of the upstream body.
//!
//! The relay does not interpret SSE: it forwards every non-blank line of the
//! upstream stream, each followed by `\n`, in arrival order. Lines cut by a
//! chunk boundary are reassembled before being forwarded, and an
//! unterminated last line is forwarded when the upstream ends.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use relaychat_types::LineBuffer;

struct RelayState<S> {
    upstream: Pin<Box<S>>,
    lines: LineBuffer,
    ready: VecDeque<Bytes>,
    finished: bool,
}

/// Re-frame `upstream` into newline-terminated, non-blank lines.
///
/// The first upstream error is passed through and ends the stream, which
/// makes hyper abort the outgoing response body.
pub fn relay_lines<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes, E>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    let state = RelayState {
        upstream: Box::pin(upstream),
        lines: LineBuffer::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.ready.pop_front() {
                return Some((Ok(line), st));
            }
            if st.finished {
                return None;
            }
            match st.upstream.next().await {
                Some(Ok(chunk)) => {
                    st.ready.extend(st.lines.push(&chunk).into_iter().filter_map(frame));
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.finished = true;
                    st.ready.extend(st.lines.finish().and_then(frame));
                }
            }
        }
    })
}

fn frame(mut line: Vec<u8>) -> Option<Bytes> {
    if String::from_utf8_lossy(&line).trim().is_empty() {
        return None;
    }
    line.push(b'\n');
    Some(Bytes::from(line))
}

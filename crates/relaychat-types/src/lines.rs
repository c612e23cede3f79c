//! Newline framing over a chunked byte stream.
//!
//! Network reads cut the stream at arbitrary byte offsets, which may fall in
//! the middle of a line or of a multi-byte UTF-8 sequence. [`LineBuffer`]
//! keeps the unterminated tail between reads and only hands out complete
//! lines. Splitting happens on raw bytes: `\n` never occurs inside a UTF-8
//! multi-byte sequence, so every complete line is decodable on its own.

/// Carry-over buffer that turns byte chunks into complete lines.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completes, without the `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let mut line = std::mem::take(&mut self.pending);
            line.extend_from_slice(&rest[..pos]);
            lines.push(line);
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
        lines
    }

    /// Take whatever unterminated fragment is left once the stream has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    /// Bytes buffered but not yet terminated by `\n`.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn text(lines: Vec<Vec<u8>>) -> Vec<String> {
        lines
            .into_iter()
            .map(|l| String::from_utf8(l).expect("utf-8"))
            .collect()
    }

    #[test]
    fn complete_lines_are_returned_and_tail_is_kept() {
        let mut buf = LineBuffer::new();
        assert_eq!(text(buf.push(b"one\ntwo\nthr")), vec!["one", "two"]);
        assert_eq!(buf.pending(), 3);
        assert_eq!(text(buf.push(b"ee\n")), vec!["three"]);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn multibyte_character_split_across_chunks_survives() {
        let bytes = "héllo\n".as_bytes();
        let mut buf = LineBuffer::new();
        assert!(buf.push(&bytes[..2]).is_empty());
        assert_eq!(text(buf.push(&bytes[2..])), vec!["héllo"]);
    }

    #[test]
    fn empty_lines_are_reported() {
        let mut buf = LineBuffer::new();
        assert_eq!(text(buf.push(b"a\n\nb\n")), vec!["a", "", "b"]);
    }

    #[test]
    fn finish_returns_unterminated_fragment_once() {
        let mut buf = LineBuffer::new();
        buf.push(b"data: [DONE]");
        assert_eq!(buf.finish(), Some(b"data: [DONE]".to_vec()));
        assert_eq!(buf.finish(), None);
    }
}

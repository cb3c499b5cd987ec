//! Line framing for streamed response bodies.
//!
//! Network reads split lines (and multi-byte characters) arbitrarily, so bytes
//! are buffered until a newline arrives and only complete lines are handed on.

/// Accumulates raw bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the
    /// trailing `\n` or `\r\n`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_reads() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"{\"a\":").is_empty());
        assert_eq!(buffer.push(b"1}\n{\"b\""), vec!["{\"a\":1}"]);
        assert_eq!(buffer.push(b":2}\r\n\n"), vec!["{\"b\":2}", ""]);
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_multibyte_character_split() {
        let mut buffer = LineBuffer::new();
        let text = "§ 10\n".as_bytes();
        assert!(buffer.push(&text[..1]).is_empty());
        assert_eq!(buffer.push(&text[1..]), vec!["§ 10"]);
    }

    #[test]
    fn test_finish_returns_unterminated_tail() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"done\npartial");
        assert_eq!(buffer.finish().as_deref(), Some("partial"));
        assert_eq!(buffer.finish(), None);
    }
}

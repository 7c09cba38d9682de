//! Incremental `text/event-stream` framing.
//!
//! Only the `data` field matters for the log channel: every blank line
//! terminates an event and the event's `data` lines are joined with `\n`.
//! Comment lines (`:` prefix) and other fields (`event`, `id`, `retry`) are
//! skipped. Chunks may split lines, UTF-8 sequences and CRLF pairs anywhere.

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the payloads of every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut raw: Vec<u8> = self.pending.drain(..=pos).collect();
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8_lossy(&raw).into_owned();

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };
            if field == "data" {
                self.data.push(value.to_string());
            }
        }

        events
    }

    /// Bytes buffered without a terminating newline yet.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push(b"data: {\"a\":1}\n\n"), vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"da").is_empty());
        assert!(d.push(b"ta: hel").is_empty());
        assert!(d.push(b"lo\r").is_empty());
        assert_eq!(d.push(b"\n\r\n"), vec!["hello".to_string()]);
        assert_eq!(d.buffered(), 0);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut d = SseDecoder::new();
        let bytes = "data: 操作日志\n\n".as_bytes();
        let (a, b) = bytes.split_at(8);
        assert!(d.push(a).is_empty());
        assert_eq!(d.push(b), vec!["操作日志".to_string()]);
    }

    #[test]
    fn multiple_events_in_one_chunk_and_multiline_data() {
        let mut d = SseDecoder::new();
        let out = d.push(b"data: one\n\ndata: two\ndata: lines\n\n");
        assert_eq!(out, vec!["one".to_string(), "two\nlines".to_string()]);
    }

    #[test]
    fn comments_and_other_fields_are_ignored() {
        let mut d = SseDecoder::new();
        let out = d.push(b": keep-alive\nevent: log\nid: 9\nretry: 3000\ndata:x\n\n\n");
        assert_eq!(out, vec!["x".to_string()]);
    }
}

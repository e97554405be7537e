//! Incremental `text/event-stream` decoder.
//!
//! Bytes are buffered until a full line is available, so multi-byte UTF-8
//! sequences split across network chunks decode correctly. Lines may end in
//! `\n`, `\r\n`, or `\r`.

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    skip_lf: bool,
    event_type: String,
    data: String,
    has_data: bool,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => self.end_line(&mut events),
                b'\r' => {
                    self.skip_lf = true;
                    self.end_line(&mut events);
                }
                _ => self.line.push(byte),
            }
        }
        events
    }

    fn end_line(&mut self, events: &mut Vec<SseEvent>) {
        let raw = std::mem::take(&mut self.line);
        let line = String::from_utf8_lossy(&raw);
        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                events.push(event);
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (&*line, ""),
        };
        match field {
            "event" => self.event_type = value.to_owned(),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
                self.has_data = true;
            }
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = std::mem::take(&mut self.event_type);
        if !self.has_data {
            return None;
        }
        self.has_data = false;

        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }
        Some(SseEvent {
            event: if event_type.is_empty() {
                "message".to_owned()
            } else {
                event_type
            },
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> Vec<SseEvent> {
        let mut decoder = SseDecoder::new();
        chunks.iter().flat_map(|c| decoder.feed(c)).collect()
    }

    #[test]
    fn decodes_named_event() {
        let events = decode_all(&[b"event:log\ndata:hello world\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "log");
        assert_eq!(events[0].data, "hello world");
    }

    #[test]
    fn trailing_newline_in_payload_becomes_extra_data_line() {
        // A payload of "line\n" is framed as two data lines.
        let events = decode_all(&[b"event:log\ndata:line\ndata:\n\n"]);
        assert_eq!(events[0].data, "line\n");
    }

    #[test]
    fn event_split_across_chunks_and_crlf() {
        let events = decode_all(&[b"event: lo", b"g\r\ndata: a", b"bc\r", b"\n\r\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "log");
        assert_eq!(events[0].data, "abc");
    }

    #[test]
    fn utf8_split_across_chunks() {
        let bytes = "data:héllo\n\n".as_bytes();
        let (a, b) = bytes.split_at(7);
        let events = decode_all(&[a, b]);
        assert_eq!(events[0].data, "héllo");
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn comments_and_empty_events_are_skipped() {
        let events = decode_all(&[b": keep-alive\n\nevent:log\n\ndata:x\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn incomplete_event_is_not_dispatched() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event:log\ndata:partial\n").is_empty());
        assert_eq!(decoder.feed(b"\n").len(), 1);
    }

    #[test]
    fn event_id_carries_over_to_later_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 7\ndata:x\n\ndata:y\n\n");
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[1].id.as_deref(), Some("7"));
    }
}

//! Incremental decoder for the `text/event-stream` body of a streamed
//! chat completion.

#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
    Data(String),
    Done,
}

/// Buffers raw body bytes and yields one event per complete `data:` line.
///
/// Network chunks can end mid-line or mid-character, so bytes are only
/// decoded once a full line is available.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.drain(..=pos).collect::<Vec<_>>();
            if let Some(event) = Self::parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub(crate) fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buf);
        Self::parse_line(&String::from_utf8_lossy(&rest))
    }

    fn parse_line(line: &str) -> Option<SseEvent> {
        let line = line.trim_end_matches(['\r', '\n']);

        // blank lines separate events, ':' starts a comment
        if line.is_empty() || line.starts_with(':') {
            return None;
        }

        let payload = line.strip_prefix("data:")?.trim_start();
        if payload == "[DONE]" {
            Some(SseEvent::Done)
        } else {
            Some(SseEvent::Data(payload.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_complete_lines() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("{\"a\":1}".into()), SseEvent::Done]
        );
    }

    #[test]
    fn test_buffers_lines_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: {\"con").is_empty());
        let events = decoder.feed(b"tent\":\"hi\"}\r\n");
        assert_eq!(events, vec![SseEvent::Data("{\"content\":\"hi\"}".into())]);
    }

    #[test]
    fn test_buffers_multibyte_characters_split_across_chunks() {
        let bytes = "data: café\n".as_bytes();
        let (head, tail) = bytes.split_at(bytes.len() - 2);

        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(head).is_empty());
        assert_eq!(decoder.feed(tail), vec![SseEvent::Data("café".into())]);
    }

    #[test]
    fn test_skips_comments_and_other_fields() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b": keep-alive\nevent: message\nid: 7\ndata: x\n");
        assert_eq!(events, vec![SseEvent::Data("x".into())]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), Some(SseEvent::Done));
        assert_eq!(decoder.finish(), None);
    }
}

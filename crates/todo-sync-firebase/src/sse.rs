//! Server-sent events framing for the streaming REST API.
//!
//! The realtime database names every event (`put`, `patch`, `keep-alive`,
//! `cancel`, `auth_revoked`), so unlike a data-only parser this keeps the
//! `event:` field alongside the joined `data:` lines.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tracing::warn;

use crate::error::FirebaseError;

/// Event name used when the server omits the `event:` field.
const DEFAULT_EVENT: &str = "message";

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field.
    pub event: String,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Incremental decoder: feed raw chunks, pull complete events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Decoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk as received from the network.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete event, if the buffer holds one.
    pub fn next_event(&mut self) -> Option<SseEvent> {
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line = self.buffer.split_to(newline + 1);
            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            let Ok(text) = std::str::from_utf8(&line) else {
                warn!("Skipping SSE line with invalid UTF-8");
                continue;
            };
            if let Some(event) = self.feed_line(text) {
                return Some(event);
            }
        }
        None
    }

    /// Flush whatever is left once the stream ended.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            if let Ok(text) = std::str::from_utf8(&rest) {
                let text = text.trim_end_matches(['\r', '\n']);
                if let Some(event) = self.feed_line(text) {
                    return Some(event);
                }
            }
        }
        self.dispatch()
    }

    fn feed_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let event = self
            .event
            .take()
            .unwrap_or_else(|| DEFAULT_EVENT.to_owned());
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data })
    }
}

/// Turn a chunked HTTP body into a stream of events.
///
/// A transport error is yielded once and ends the stream.
pub fn sse_events<S>(byte_stream: S) -> impl Stream<Item = Result<SseEvent, FirebaseError>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    futures::stream::unfold(
        (byte_stream, SseDecoder::new(), false),
        |(mut stream, mut decoder, done)| async move {
            if done {
                return None;
            }
            loop {
                if let Some(event) = decoder.next_event() {
                    return Some((Ok(event), (stream, decoder, false)));
                }
                match stream.next().await {
                    Some(Ok(chunk)) => decoder.push(&chunk),
                    Some(Err(err)) => {
                        warn!("SSE stream read error: {err}");
                        return Some((Err(FirebaseError::Http(err)), (stream, decoder, true)));
                    }
                    None => {
                        let last = decoder.finish();
                        return last.map(|event| (Ok(event), (stream, decoder, true)));
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&str]) -> Vec<SseEvent> {
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        for chunk in chunks {
            decoder.push(chunk.as_bytes());
            while let Some(event) = decoder.next_event() {
                out.push(event);
            }
        }
        out.extend(decoder.finish());
        out
    }

    fn event(name: &str, data: &str) -> SseEvent {
        SseEvent {
            event: name.to_owned(),
            data: data.to_owned(),
        }
    }

    #[test]
    fn decodes_named_events() {
        let events = decode_all(&[
            "event: put\ndata: {\"path\":\"/\",\"data\":null}\n\n",
            "event: keep-alive\ndata: null\n\n",
        ]);
        assert_eq!(
            events,
            vec![
                event("put", "{\"path\":\"/\",\"data\":null}"),
                event("keep-alive", "null"),
            ]
        );
    }

    #[test]
    fn handles_events_split_across_chunks() {
        let events = decode_all(&["eve", "nt: patch\r\nda", "ta: {}\r", "\n\r\n"]);
        assert_eq!(events, vec![event("patch", "{}")]);
    }

    #[test]
    fn joins_multiple_data_lines() {
        let events = decode_all(&["data: a\ndata: b\n\n"]);
        assert_eq!(events, vec![event(DEFAULT_EVENT, "a\nb")]);
    }

    #[test]
    fn skips_comments_and_blank_runs() {
        let events = decode_all(&[": heartbeat\n\n\n", "event: cancel\ndata:nope\n\n"]);
        assert_eq!(events, vec![event("cancel", "nope")]);
    }

    #[test]
    fn flushes_unterminated_event_at_end() {
        let events = decode_all(&["event: put\ndata: 1"]);
        assert_eq!(events, vec![event("put", "1")]);
    }

    #[tokio::test]
    async fn stream_adapter_yields_events_in_order() {
        let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from_static(b"event: put\ndata: 1\n\nevent: pa")),
            Ok(Bytes::from_static(b"tch\ndata: 2\n\n")),
        ];
        let events: Vec<_> = sse_events(futures::stream::iter(chunks)).collect().await;
        let events: Vec<SseEvent> = events
            .into_iter()
            .map(|item| item.unwrap_or_else(|err| panic!("event: {err}")))
            .collect();
        assert_eq!(events, vec![event("put", "1"), event("patch", "2")]);
    }
}

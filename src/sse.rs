//! Server-Sent Events (SSE) processing for upstream streaming responses.
//!
//! This module parses the upstream model API's SSE stream into structured
//! [`StreamEvent`]s, buffering partial events across transport chunk
//! boundaries.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::decode::StreamDecoder;
use crate::{Error, Result, StreamEvent};

/// Process a stream of bytes into a stream of parsed events.
///
/// Takes the byte stream of an upstream HTTP response and yields one
/// [`StreamEvent`] per complete SSE event, handling events split across
/// chunks and error conditions.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer = String::new();
    // Transport chunks may split a multi-byte character; the decoder holds
    // the undecoded tail across chunks.
    let decoder = StreamDecoder::new();

    stream::unfold(
        (stream, buffer, decoder),
        move |(mut stream, mut buffer, mut decoder)| async move {
            loop {
                // First check if we have a complete event in the buffer
                if let Some((event, remaining)) = extract_event(&buffer) {
                    buffer = remaining;
                    return Some((event, (stream, buffer, decoder)));
                }

                match stream.next().await {
                    Some(Ok(bytes)) => match decoder.decode(&bytes) {
                        Ok(text) => buffer.push_str(&text),
                        Err(e) => {
                            return Some((Err(e), (stream, buffer, decoder)));
                        }
                    },
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, decoder)));
                    }
                    None => {
                        // End of stream
                        if let Err(e) = decoder.finish() {
                            return Some((Err(e), (stream, buffer, decoder)));
                        }
                        if !buffer.is_empty() {
                            if let Some((event, _)) = extract_event(&buffer) {
                                return Some((event, (stream, buffer, decoder)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract a complete SSE event from a buffer string.
///
/// Events are delimited by double newlines; each has an `event:` type line
/// followed by a `data:` line.
fn extract_event(buffer: &str) -> Option<(Result<StreamEvent>, String)> {
    let parts: Vec<&str> = buffer.splitn(2, "\n\n").collect();
    if parts.len() != 2 {
        return None;
    }
    let event_text = parts[0];
    let rest = parts[1].to_string();

    let Some((event_type, event_data)) = event_text.split_once('\n') else {
        return Some((
            Err(Error::serialization(
                format!("Malformed SSE event: missing newline separator in '{event_text}'"),
                None,
            )),
            rest,
        ));
    };

    let Some(event_data) = event_data.strip_prefix("data:").map(str::trim) else {
        return Some((
            Err(Error::serialization(
                format!("Malformed SSE event: missing 'data:' prefix in '{event_data}'"),
                None,
            )),
            rest,
        ));
    };

    parse_event_type(event_type, event_data, rest)
}

/// Envelope for `content_block_delta` event payloads.
#[derive(Deserialize)]
struct DeltaEnvelope {
    delta: DeltaPayload,
}

/// The delta payload inside a `content_block_delta` event.
///
/// Only text deltas carry content we relay; any other delta type degrades
/// to an empty fragment.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DeltaPayload {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

/// Parse a specific SSE event type and its data.
fn parse_event_type(
    event_type: &str,
    event_data: &str,
    rest: String,
) -> Option<(Result<StreamEvent>, String)> {
    match event_type {
        "event: ping" => Some((Ok(StreamEvent::Ping), rest)),

        "event: message_start" => Some((Ok(StreamEvent::MessageStart), rest)),

        "event: message_delta" => Some((Ok(StreamEvent::MessageDelta), rest)),

        "event: message_stop" => Some((Ok(StreamEvent::MessageStop), rest)),

        "event: content_block_start" => Some((Ok(StreamEvent::BlockStart), rest)),

        "event: content_block_stop" => Some((Ok(StreamEvent::BlockStop), rest)),

        "event: content_block_delta" => {
            match serde_json::from_str::<DeltaEnvelope>(event_data) {
                Ok(envelope) => {
                    let text = match envelope.delta {
                        DeltaPayload::TextDelta { text } => text,
                        DeltaPayload::Other => String::new(),
                    };
                    Some((Ok(StreamEvent::TextDelta(text)), rest))
                }
                Err(e) => Some((Err(e.into()), rest)),
            }
        }

        "event: error" => Some((
            Err(Error::api(500, event_data.to_string(), None)),
            rest,
        )),

        _ => Some((
            Err(Error::serialization(
                format!("Unknown SSE event type: {event_type}"),
                None,
            )),
            rest,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn once_stream(data: &'static [u8]) -> impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin {
        Box::pin(stream::once(async move { Ok(Bytes::from(data)) }))
    }

    #[tokio::test]
    async fn parse_ping_event() {
        let mut sse_stream = Box::pin(process_sse(once_stream(b"event: ping\ndata: {}\n\n")));
        let event = sse_stream.next().await.unwrap();
        assert!(matches!(event, Ok(StreamEvent::Ping)));
    }

    #[tokio::test]
    async fn parse_text_delta() {
        let data =
            b"event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n";
        let mut sse_stream = Box::pin(process_sse(once_stream(data)));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event, StreamEvent::TextDelta("Hello".to_string()));
    }

    #[tokio::test]
    async fn unknown_delta_type_yields_empty_text() {
        let data =
            b"event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"citations_delta\"}}\n\n";
        let mut sse_stream = Box::pin(process_sse(once_stream(data)));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event, StreamEvent::TextDelta(String::new()));
    }

    #[tokio::test]
    async fn parse_multiple_events() {
        let data = b"event: message_start\ndata: {}\n\nevent: message_stop\ndata: {}\n\n";
        let mut sse_stream = Box::pin(process_sse(once_stream(data)));

        let event1 = sse_stream.next().await.unwrap();
        assert!(matches!(event1, Ok(StreamEvent::MessageStart)));

        let event2 = sse_stream.next().await.unwrap();
        assert!(matches!(event2, Ok(StreamEvent::MessageStop)));
    }

    #[tokio::test]
    async fn handle_malformed_event() {
        let mut sse_stream = Box::pin(process_sse(once_stream(
            b"malformed data without proper format\n\n",
        )));
        let event = sse_stream.next().await.unwrap();
        assert!(event.is_err());
    }

    #[tokio::test]
    async fn handle_split_event() {
        // Simulate an event split across multiple chunks
        let chunk1 = b"event: ping\n";
        let chunk2 = b"data: {}\n\n";

        let stream = Box::pin(stream::iter(vec![
            Ok(Bytes::from(&chunk1[..])),
            Ok(Bytes::from(&chunk2[..])),
        ]));

        let mut sse_stream = Box::pin(process_sse(stream));
        let event = sse_stream.next().await.unwrap();

        assert!(matches!(event, Ok(StreamEvent::Ping)));
    }

    #[tokio::test]
    async fn handle_chunk_split_inside_multibyte_char() {
        // "é" is 0xC3 0xA9; the chunk boundary falls between its two bytes.
        let data: &'static [u8] =
            b"event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"\xc3\xa9\"}}\n\n";
        let split = data.iter().position(|&b| b == 0xc3).unwrap() + 1;

        let stream = Box::pin(stream::iter(vec![
            Ok(Bytes::from(&data[..split])),
            Ok(Bytes::from(&data[split..])),
        ]));

        let mut sse_stream = Box::pin(process_sse(stream));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event, StreamEvent::TextDelta("é".to_string()));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn truncated_multibyte_tail_is_an_encoding_error() {
        let mut sse_stream = Box::pin(process_sse(once_stream(
            b"event: ping\ndata: {}\n\n\xc3",
        )));
        assert!(matches!(sse_stream.next().await, Some(Ok(StreamEvent::Ping))));
        assert!(matches!(
            sse_stream.next().await,
            Some(Err(Error::Encoding { .. }))
        ));
    }

    #[tokio::test]
    async fn handle_unknown_event_type() {
        let mut sse_stream = Box::pin(process_sse(once_stream(
            b"event: unknown_event\ndata: {}\n\n",
        )));
        let event = sse_stream.next().await.unwrap();

        assert!(event.is_err());
        if let Err(e) = event {
            assert!(e.to_string().contains("Unknown SSE event type"));
        }
    }

    #[tokio::test]
    async fn error_event_becomes_api_error() {
        let mut sse_stream = Box::pin(process_sse(once_stream(
            b"event: error\ndata: {\"type\":\"overloaded_error\"}\n\n",
        )));
        let event = sse_stream.next().await.unwrap();
        assert!(matches!(event, Err(Error::Api { .. })));
    }
}

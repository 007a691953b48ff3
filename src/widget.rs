//! Terminal rendition of the chat widget.
//!
//! The widget holds a transcript, streams each assistant reply from the
//! relay, and re-renders the sanitized text as fragments arrive. The
//! displayed text is always `strip_fences` of everything received so far;
//! when stripping a fence shortens the text, the renderer erases back to
//! the shared prefix before printing the new tail. Fence markers never
//! contain a newline once stripped, so the erased span stays on the
//! current line.

use std::io::{self, Stdout, Write};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

use crate::decode::StreamDecoder;
use crate::error::{Error, Result};
use crate::relay::STREAM_FAILURE_NOTICE;
use crate::sanitize::strip_fences;
use crate::types::{ChatRequest, SuggestRequest, SuggestResponse, Turn};

/// Terminal width below which fewer suggestion chips are shown.
const NARROW_WIDTH: u16 = 64;

/// ANSI escape code for cyan text (used for suggestion chips).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Number of suggestion chips to show for a terminal of the given width.
pub fn suggestion_limit(width: u16) -> usize {
    if width < NARROW_WIDTH { 2 } else { 5 }
}

/// Receives widget output.
///
/// `update_assistant` is called with the full sanitized reply each time a
/// fragment arrives, not with the fragment itself. Implementations decide
/// how to reconcile the previous display with the new text.
pub trait Renderer: Send {
    /// Called once before the first `update_assistant` of a reply.
    fn begin_turn(&mut self) {}

    /// Renders the full sanitized assistant text accumulated so far.
    fn update_assistant(&mut self, text: &str);

    /// Called once after the reply finishes streaming.
    fn finish_turn(&mut self) {}

    /// Renders follow-up suggestion chips.
    fn show_suggestions(&mut self, suggestions: &[String]);

    /// Renders an informational line.
    fn print_info(&mut self, info: &str);

    /// Renders an error line.
    fn print_error(&mut self, error: &str);
}

/// Renders to stdout, diffing against what is already on screen.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    chip_limit: usize,
    shown: String,
}

impl PlainTextRenderer {
    /// Creates a renderer with color output enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a renderer with color output set explicitly.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            chip_limit: 5,
            shown: String::new(),
        }
    }

    /// Caps the number of suggestion chips shown.
    pub fn with_chip_limit(mut self, limit: usize) -> Self {
        self.chip_limit = limit;
        self
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn begin_turn(&mut self) {
        self.shown.clear();
    }

    fn update_assistant(&mut self, text: &str) {
        let common = common_prefix_len(&self.shown, text);
        let erase = self.shown[common..].chars().count();
        for _ in 0..erase {
            let _ = write!(self.stdout, "\u{8} \u{8}");
        }
        let _ = write!(self.stdout, "{}", &text[common..]);
        self.flush();
        self.shown.clear();
        self.shown.push_str(text);
    }

    fn finish_turn(&mut self) {
        let _ = writeln!(self.stdout);
        self.flush();
    }

    fn show_suggestions(&mut self, suggestions: &[String]) {
        for (idx, suggestion) in suggestions.iter().take(self.chip_limit).enumerate() {
            if self.use_color {
                let _ = writeln!(
                    self.stdout,
                    "  {ANSI_CYAN}[{}]{ANSI_RESET} {suggestion}",
                    idx + 1
                );
            } else {
                let _ = writeln!(self.stdout, "  [{}] {suggestion}", idx + 1);
            }
        }
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        let _ = writeln!(self.stdout, "{info}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            let _ = writeln!(self.stdout, "{ANSI_RED}{error}{ANSI_RESET}");
        } else {
            let _ = writeln!(self.stdout, "{error}");
        }
        self.flush();
    }
}

/// Length in bytes of the longest common prefix that ends on a char
/// boundary in both strings.
fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            break;
        }
        len += ca.len_utf8();
    }
    len
}

/// Drives a byte stream through decode, sanitize, and render, returning
/// the final sanitized text.
///
/// Each fragment extends the accumulated raw text; the renderer always
/// sees `strip_fences` of the whole accumulation.
pub async fn pump<S>(mut stream: S, renderer: &mut dyn Renderer) -> Result<String>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut decoder = StreamDecoder::new();
    let mut accumulated = String::new();
    let mut display = String::new();
    while let Some(chunk) = stream.next().await {
        let fragment = decoder.decode(&chunk?)?;
        if fragment.is_empty() {
            continue;
        }
        accumulated.push_str(&fragment);
        display = strip_fences(&accumulated);
        renderer.update_assistant(&display);
    }
    decoder.finish()?;
    Ok(display)
}

/// One conversation against a running relay.
pub struct WidgetSession {
    http: reqwest::Client,
    base_url: Url,
    transcript: Vec<Turn>,
}

impl WidgetSession {
    /// Creates a session against the relay at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&base_url)
            .map_err(|err| Error::url(format!("invalid relay URL {base_url:?}"), Some(err)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            transcript: Vec::new(),
        })
    }

    /// The conversation so far.
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| Error::url(format!("invalid endpoint path {path:?}"), Some(err)))
    }

    /// Sends one visitor message, streaming the reply through `renderer`,
    /// and returns follow-up suggestions for the completed exchange.
    pub async fn send(&mut self, message: &str, renderer: &mut dyn Renderer) -> Result<Vec<String>> {
        let url = self.endpoint("api/chat")?;
        let response = self
            .http
            .post(url)
            .json(&ChatRequest::new(message))
            .send()
            .await
            .map_err(|err| Error::connection("chat request failed", Some(Box::new(err))))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(Error::api(status, detail, None));
        }

        // A reader task feeds raw fragments through a channel; the render
        // loop on this side decodes and draws one fragment at a time.
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes>>(32);
        let mut byte_stream = response.bytes_stream();
        tokio::spawn(async move {
            while let Some(chunk) = byte_stream.next().await {
                let item = chunk.map_err(|err| {
                    Error::streaming("reading reply stream", Some(Box::new(err)))
                });
                let stop = item.is_err();
                if tx.send(item).await.is_err() || stop {
                    break;
                }
            }
        });

        renderer.begin_turn();
        let reply = pump(ReceiverStream::new(rx), renderer).await?;
        renderer.finish_turn();

        self.transcript.push(Turn::user(message));
        let mut assistant = Turn::assistant();
        assistant.text = reply.clone();
        self.transcript.push(assistant);

        if reply.ends_with(STREAM_FAILURE_NOTICE) {
            return Ok(Vec::new());
        }
        Ok(self.suggestions(message, &reply).await)
    }

    /// Fetches follow-up suggestions. Failures degrade to an empty list.
    pub async fn suggestions(&self, message: &str, assistant: &str) -> Vec<String> {
        let Ok(url) = self.endpoint("api/suggest") else {
            return Vec::new();
        };
        let response = self
            .http
            .post(url)
            .json(&SuggestRequest::new(message, assistant))
            .send()
            .await;
        match response {
            Ok(response) => response
                .json::<SuggestResponse>()
                .await
                .map(|body| body.suggestions)
                .unwrap_or_default(),
            Err(err) => {
                tracing::debug!("suggestion request failed: {err}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    /// Records every display update for later inspection.
    struct CapturingRenderer {
        updates: Vec<String>,
        suggestions: Vec<String>,
    }

    impl CapturingRenderer {
        fn new() -> Self {
            Self {
                updates: Vec::new(),
                suggestions: Vec::new(),
            }
        }
    }

    impl Renderer for CapturingRenderer {
        fn update_assistant(&mut self, text: &str) {
            self.updates.push(text.to_string());
        }

        fn show_suggestions(&mut self, suggestions: &[String]) {
            self.suggestions = suggestions.to_vec();
        }

        fn print_info(&mut self, _info: &str) {}

        fn print_error(&mut self, _error: &str) {}
    }

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Result<Bytes>> + Unpin {
        let items: Vec<Result<Bytes>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p)))
            .collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn pump_accumulates_and_sanitizes() {
        let mut renderer = CapturingRenderer::new();
        let stream = chunks(&[b"Hello ", b"```rust\n", b"fn main() {}\n", b"```", b" done"]);
        let final_text = pump(stream, &mut renderer).await.unwrap();
        assert_eq!(final_text, "Hello fn main() {}\n done");
        assert_eq!(renderer.updates.last().unwrap(), &final_text);
    }

    #[tokio::test]
    async fn pump_display_is_always_sanitized_accumulation() {
        let parts: Vec<&[u8]> = vec![b"a ", b"``", b"`py\nco", b"de\n``", b"` b"];
        let mut renderer = CapturingRenderer::new();
        let stream = chunks(&parts);
        pump(stream, &mut renderer).await.unwrap();

        let mut accumulated = String::new();
        let mut expected = Vec::new();
        for part in &parts {
            accumulated.push_str(std::str::from_utf8(part).unwrap());
            expected.push(strip_fences(&accumulated));
        }
        assert_eq!(renderer.updates, expected);
    }

    #[tokio::test]
    async fn pump_handles_split_multibyte_chars() {
        let text = "héllo 🌍 végé".as_bytes();
        let parts: Vec<&[u8]> = text.chunks(1).collect();
        let mut renderer = CapturingRenderer::new();
        let final_text = pump(chunks(&parts), &mut renderer).await.unwrap();
        assert_eq!(final_text, "héllo 🌍 végé");
        for update in &renderer.updates {
            assert!(update.is_char_boundary(update.len()));
        }
    }

    #[tokio::test]
    async fn pump_propagates_invalid_utf8() {
        let stream = chunks(&[b"ok ", b"\xff\xfe"]);
        let mut renderer = CapturingRenderer::new();
        let err = pump(stream, &mut renderer).await.unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
    }

    #[tokio::test]
    async fn pump_errors_on_truncated_tail() {
        // First two bytes of a three-byte character, then end of stream.
        let stream = chunks(&[b"ok \xe2\x82"]);
        let mut renderer = CapturingRenderer::new();
        let err = pump(stream, &mut renderer).await.unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
        assert_eq!(renderer.updates.last().unwrap(), "ok ");
    }

    #[test]
    fn chip_limit_tracks_width() {
        assert_eq!(suggestion_limit(40), 2);
        assert_eq!(suggestion_limit(63), 2);
        assert_eq!(suggestion_limit(64), 5);
        assert_eq!(suggestion_limit(120), 5);
    }

    #[test]
    fn common_prefix_respects_char_boundaries() {
        assert_eq!(common_prefix_len("abc", "abd"), 2);
        assert_eq!(common_prefix_len("héllo", "héllp"), 5);
        assert_eq!(common_prefix_len("", "abc"), 0);
        assert_eq!(common_prefix_len("same", "same"), 4);
    }

    #[test]
    fn session_rejects_bad_url() {
        assert!(WidgetSession::new("not a url").is_err());
    }
}

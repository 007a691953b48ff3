use serde::{Deserialize, Serialize};

/// A parsed event from the upstream streaming API.
///
/// This is the reduced event set the relay cares about: only `TextDelta`
/// carries payload; everything else marks stream lifecycle and is forwarded
/// as silence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// The upstream turn has started.
    MessageStart,

    /// A content block has opened.
    BlockStart,

    /// A fragment of assistant text.
    TextDelta(String),

    /// A content block has closed.
    BlockStop,

    /// Metadata about the in-flight turn (stop reason, usage).
    MessageDelta,

    /// The upstream turn is complete.
    MessageStop,

    /// Keep-alive with no content.
    Ping,
}

impl StreamEvent {
    /// Returns the text payload if this is a text delta.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamEvent::TextDelta(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_text_only_for_deltas() {
        assert_eq!(
            StreamEvent::TextDelta("hi".to_string()).as_text(),
            Some("hi")
        );
        assert_eq!(StreamEvent::Ping.as_text(), None);
    }
}

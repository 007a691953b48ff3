use serde::{Deserialize, Serialize};

use crate::types::Role;

/// A single message in an upstream completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageParam {
    /// The role of the message.
    pub role: Role,

    /// The text content of the message.
    pub content: String,
}

impl MessageParam {
    /// Creates a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Parameters for an upstream completion call.
///
/// The relay always sends a fixed system instruction and the user's message
/// as the sole turn; there is no server-side conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    /// The model to use.
    pub model: String,

    /// System instruction setting the assistant's persona.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// The conversation turns for this call.
    pub messages: Vec<MessageParam>,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Whether the response should be streamed over SSE.
    pub stream: bool,
}

impl CompletionParams {
    /// Creates streaming completion parameters for a single user message.
    pub fn streaming(
        model: impl Into<String>,
        system: impl Into<String>,
        message: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            system: Some(system.into()),
            messages: vec![MessageParam::user(message)],
            max_tokens,
            stream: true,
        }
    }

    /// Creates one-shot (non-streaming) completion parameters.
    pub fn one_shot(
        model: impl Into<String>,
        system: impl Into<String>,
        messages: Vec<MessageParam>,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            system: Some(system.into()),
            messages,
            max_tokens,
            stream: false,
        }
    }
}

/// A block of generated text in a non-streaming completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// The generated text.
    pub text: String,
}

/// A non-streaming completion from the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// The generated content blocks.
    #[serde(default)]
    pub content: Vec<TextBlock>,
}

impl Completion {
    /// Joins all content blocks into a single string.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|block| block.text.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn streaming_params_single_turn() {
        let params = CompletionParams::streaming("qb-small", "Be brief.", "hello", 256);
        assert!(params.stream);
        assert_eq!(params.messages.len(), 1);
        assert_eq!(params.messages[0].role, Role::User);
    }

    #[test]
    fn system_omitted_when_none() {
        let mut params = CompletionParams::one_shot("qb-small", "x", Vec::new(), 16);
        params.system = None;
        let value = serde_json::to_value(&params).unwrap();
        assert!(value.get("system").is_none());
    }

    #[test]
    fn completion_text_joins_blocks() {
        let completion: Completion = serde_json::from_value(json!({
            "content": [{"text": "Hello, "}, {"text": "world"}]
        }))
        .unwrap();
        assert_eq!(completion.text(), "Hello, world");
    }
}

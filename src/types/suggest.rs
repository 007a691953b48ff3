use serde::{Deserialize, Serialize};

/// Request body for `POST /api/suggest`.
///
/// Carries the latest user message and the assistant's completed reply so
/// the model can propose follow-up questions grounded in the exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestRequest {
    /// The user's most recent message.
    #[serde(default)]
    pub message: String,

    /// The assistant's completed reply to that message.
    #[serde(default)]
    pub assistant: String,
}

/// Response body for `POST /api/suggest`.
///
/// A suggestion set is ordered, short-lived, and never an error: a failed
/// or malformed generation yields an empty set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestResponse {
    /// Zero to five short follow-up questions.
    pub suggestions: Vec<String>,
}

impl SuggestRequest {
    /// Creates a new suggestion request.
    pub fn new(message: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            assistant: assistant.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_is_valid_json() {
        let resp = SuggestResponse::default();
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"suggestions":[]}"#
        );
    }
}

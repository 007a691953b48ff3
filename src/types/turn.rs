use serde::{Deserialize, Serialize};

/// The speaker of a conversation turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

/// A single conversation turn.
///
/// Turns are ephemeral: the widget holds them in memory for the duration of
/// a session and nothing persists them. An assistant turn's `text` grows
/// fragment by fragment while a response streams; once the stream ends the
/// turn is complete and no longer mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn.
    pub role: Role,

    /// The accumulated text of the turn.
    pub text: String,
}

impl Turn {
    /// Creates a completed user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Creates an empty assistant turn, ready to accumulate streamed text.
    pub fn assistant() -> Self {
        Self {
            role: Role::Assistant,
            text: String::new(),
        }
    }
}

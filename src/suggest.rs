//! Follow-up suggestion generation.
//!
//! After an assistant turn completes, the widget asks for a handful of
//! short follow-up questions a visitor might click next. Suggestions are
//! decorative: any failure along the way, upstream or parsing, yields an
//! empty list rather than an error.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::observability::{SUGGEST_EMPTY, SUGGEST_REQUESTS};
use crate::sanitize::strip_fences;
use crate::types::{CompletionParams, MessageParam};
use crate::upstream::ModelBackend;

/// Instruction for the one-shot suggestion call. The model is asked for a
/// bare JSON array; anything else is discarded by the parser.
pub const SUGGEST_INSTRUCTION: &str = "Given the conversation below, suggest up \
to five short follow-up questions the visitor might ask next about QB Tech \
Solutions. Respond with only a JSON array of strings, no prose and no markdown.";

/// Generates follow-up suggestions for the most recent exchange.
///
/// Never fails: every upstream or parse problem degrades to an empty list.
pub async fn generate(
    backend: &Arc<dyn ModelBackend>,
    config: &RelayConfig,
    message: &str,
    assistant: &str,
) -> Vec<String> {
    SUGGEST_REQUESTS.click();
    let prompt = format!(
        "{SUGGEST_INSTRUCTION}\n\nVisitor: {message}\n\nAssistant: {assistant}"
    );
    let params = CompletionParams::one_shot(
        config.model.clone(),
        config.system_prompt.clone(),
        vec![MessageParam::user(prompt)],
        config.max_tokens,
    );
    let suggestions = match backend.complete(params).await {
        Ok(raw) => parse_suggestions(&raw, config.suggest_max),
        Err(err) => {
            tracing::debug!("suggestion call failed: {err}");
            Vec::new()
        }
    };
    if suggestions.is_empty() {
        SUGGEST_EMPTY.click();
    }
    suggestions
}

/// Extracts up to `max` suggestion strings from a model response.
///
/// The response must parse as a JSON array once code fences are stripped.
/// Non-string elements are dropped, strings are trimmed, and empty entries
/// are discarded.
pub fn parse_suggestions(raw: &str, max: usize) -> Vec<String> {
    let cleaned = strip_fences(raw);
    let Ok(value) = serde_json::from_str::<serde_json::Value>(cleaned.trim()) else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| item.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .take(max)
        .collect()
}

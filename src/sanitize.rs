//! Textual cleanup of streamed assistant output before rendering.
//!
//! The widget renders assistant text as markup, so fenced code-block
//! delimiters would otherwise show up as literal backtick runs. This pass
//! strips the fence markers (with an optional language tag) while keeping
//! the enclosed text.
//!
//! This is not an HTML sanitizer. The upstream model is a trusted
//! collaborator here; a hardened deployment should put a real allow-list
//! sanitizer in front of the rendered markup.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a fence opener or closer: three backticks, an optional language
/// tag, and the newline that follows an opener.
static FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```[A-Za-z0-9_+-]*\n?").expect("fence pattern is valid")
});

/// Strips markdown code-fence markers from `text`, preserving the fenced
/// content.
///
/// The replacement runs to fixpoint: removing a fence can butt leftover
/// backticks together into a new triple, and re-running until nothing
/// matches is what makes the operation idempotent for every input. The
/// accumulated buffer is re-scanned in full on every call, so fence markers
/// split across stream chunks never leak into the rendered output.
pub fn strip_fences(text: &str) -> String {
    let mut out = FENCE.replace_all(text, "").into_owned();
    while FENCE.is_match(&out) {
        out = FENCE.replace_all(&out, "").into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(strip_fences("no fences here"), "no fences here");
    }

    #[test]
    fn fence_with_language_tag_removed() {
        let input = "Before\n```rust\nfn main() {}\n```\nAfter";
        assert_eq!(strip_fences(input), "Before\nfn main() {}\nAfter");
    }

    #[test]
    fn bare_fence_removed() {
        assert_eq!(strip_fences("```\nBODY```"), "BODY");
    }

    #[test]
    fn body_survives_and_no_backticks_remain() {
        let out = strip_fences("```lang\nBODY```");
        assert!(out.contains("BODY"));
        assert!(!out.contains('`'));
    }

    #[test]
    fn stray_triple_backticks_removed() {
        assert_eq!(strip_fences("a``` b ``` c"), "a b  c");
    }

    #[test]
    fn single_and_double_backticks_survive() {
        assert_eq!(strip_fences("use `inline` and ``double``"), "use `inline` and ``double``");
    }

    #[test]
    fn idempotent_on_adversarial_joins() {
        // Removing the fence glues the surrounding backticks into a fresh
        // triple, which the fixpoint loop must also remove.
        let inputs = [
            "a`` ```lang\n`b",
            "`````",
            "``````",
            "``",
            "",
            "```python\nprint()\n``` tail ```",
        ];
        for input in inputs {
            let once = strip_fences(input);
            let twice = strip_fences(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn partial_prefix_keeps_incomplete_marker() {
        // Two backticks could still become inline code, not a fence; only
        // completed triples are stripped.
        assert_eq!(strip_fences("``"), "``");
        assert_eq!(strip_fences("```"), "");
    }
}

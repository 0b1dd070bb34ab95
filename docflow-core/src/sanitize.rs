//! Strips reasoning markup and code-fence wrapping from a finished answer.
//!
//! Applied once, after stream termination, in this order: drop everything
//! up to the last `</think>`, then a leading ``` fence (with optional
//! language tag), then a trailing ``` fence. Each step trims. Unbalanced
//! fences degrade gracefully; the function is idempotent on its output.

const THINK_END: &str = "</think>";
const FENCE: &str = "```";

pub fn strip_answer(text: &str) -> String {
    // Keep only the substring after the last reasoning end-marker.
    let mut out = match text.rfind(THINK_END) {
        Some(idx) => &text[idx + THINK_END.len()..],
        None => text,
    }
    .trim();

    // Leading fence: drop through the end of the fence line so an optional
    // language tag (```json) goes with it.
    if out.starts_with(FENCE) {
        let after = &out[FENCE.len()..];
        out = match after.find('\n') {
            Some(nl) => &after[nl + 1..],
            None => {
                // Single-line fence wrap, e.g. ```json{...}``` — only the
                // marker itself can be dropped.
                after
                    .strip_prefix("json")
                    .unwrap_or(after)
            }
        }
        .trim();
    }

    // Trailing fence.
    if out.ends_with(FENCE) {
        out = out[..out.len() - FENCE.len()].trim_end();
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_unchanged_apart_from_trim() {
        assert_eq!(strip_answer("  hello world \n"), "hello world");
    }

    #[test]
    fn drops_reasoning_before_last_marker() {
        let s = "<think>first</think>mid<think>again</think> final answer ";
        assert_eq!(strip_answer(s), "final answer");
    }

    #[test]
    fn strips_fenced_json_with_language_tag() {
        let s = "<think>reasoning</think> ```json\n{\"title\":\"T\"}\n```";
        assert_eq!(strip_answer(s), "{\"title\":\"T\"}");
    }

    #[test]
    fn strips_fences_without_language_tag() {
        assert_eq!(strip_answer("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn unbalanced_leading_fence_degrades_gracefully() {
        assert_eq!(strip_answer("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn unbalanced_trailing_fence_degrades_gracefully() {
        assert_eq!(strip_answer("{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(strip_answer(""), "");
        assert_eq!(strip_answer("<think>only reasoning</think>"), "");
    }

    #[test]
    fn stripping_is_idempotent() {
        let cases = [
            "<think>r</think>```json\n{\"t\":1}\n```",
            "plain prose",
            "```\nfenced\n```",
            "",
        ];
        for c in cases {
            let once = strip_answer(c);
            assert_eq!(strip_answer(&once), once, "not idempotent for {c:?}");
        }
    }
}

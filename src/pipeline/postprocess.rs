//! Post-processing: deterministic cleanup of OCR text and model output.
//!
//! Two independent jobs live here:
//!
//! * [`clean_page_text`] normalises what Tesseract prints for one page
//!   (line endings, the trailing form feed, invisible Unicode, trailing
//!   spaces). It never touches the words themselves.
//! * [`strip_code_fences`] unwraps a single ```` ```json ```` block from a
//!   model answer. The client only calls it when
//!   [`crate::config::ExtractionConfig::strip_code_fences`] is on.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all page-text rules in order.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Remove form feeds (Tesseract ends every page with `\x0c`)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, …)
/// 4. Trim trailing whitespace per line
/// 5. Drop trailing blank lines
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_form_feeds(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    s.trim_end_matches('\n').to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove form feeds ────────────────────────────────────────────────

fn remove_form_feeds(input: &str) -> String {
    input.replace('\x0c', "")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Model output: outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

/// Return the body of a single outer ```` ``` ```` / ```` ```json ```` block,
/// or `None` when the text is not wrapped that way.
pub fn strip_code_fences(input: &str) -> Option<&str> {
    RE_OUTER_FENCES
        .captures(input.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  Qty   \nTotal  "),
            "  Qty\nTotal"
        );
    }

    #[test]
    fn test_clean_page_text_full_pipeline() {
        let input = "Invoice #123  \r\nTotal: $50.00\r\n\r\n\x0c";
        assert_eq!(clean_page_text(input), "Invoice #123\nTotal: $50.00");
    }

    #[test]
    fn test_clean_page_text_blank() {
        assert_eq!(clean_page_text("\x0c"), "");
    }

    #[test]
    fn test_strip_json_fence() {
        let input = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(input), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_strip_bare_fence_with_whitespace() {
        let input = "  ```\n[1, 2]\n```\n";
        assert_eq!(strip_code_fences(input), Some("[1, 2]"));
    }

    #[test]
    fn test_no_fence_passthrough() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), None);
        assert_eq!(strip_code_fences("Here you go: ```json\n{}\n```"), None);
    }
}

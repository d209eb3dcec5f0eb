//! Address canonicalization and email body cleanup.
//!
//! Mailbox addresses are compared in canonical form everywhere (storage
//! keys, rule matching, dedup keys), so the canonicalization here is the one
//! source of truth. Body cleanup turns provider HTML into compact plain text
//! suitable for a chat embed.

// The patterns below are static and known-valid.
#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

use crate::provider::BodyFormat;

/// Upper bound for the body preview shown in the channel, in characters.
pub const PREVIEW_MAX_CHARS: usize = 1800;

/// Upper bound for the stored full body backing the "show more" view.
pub const FULL_BODY_MAX_CHARS: usize = 4000;

static STYLE_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style.*?</style>").expect("valid regex"));
static SCRIPT_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>").expect("valid regex"));
static BLOCK_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</p>|<br\s*/?>|</div>").expect("valid regex"));
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static ENTITIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z]+);").expect("valid regex"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n\s*\r?\n").expect("valid regex"));

/// Canonical form of a mailbox or sender address: trimmed and lowercased.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// A bounded body preview with an overflow signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPreview {
    /// Preview text, at most the requested bound plus a trailing ellipsis.
    pub text: String,
    /// True when the source text exceeded the bound.
    pub truncated: bool,
}

/// Cleans a message body into compact plain text.
///
/// HTML bodies are stripped: style/script blocks are removed, block-level
/// closers and `<br>` become newlines, the remaining tags are dropped and
/// named entities decoded. Plain-text bodies pass through untouched. In both
/// cases runs of blank lines collapse to a single blank line and the result
/// is trimmed.
#[must_use]
pub fn clean_body(body: &str, format: BodyFormat) -> String {
    let text = match format {
        BodyFormat::Html => strip_html(body),
        BodyFormat::Text => body.to_string(),
    };
    BLANK_RUNS.replace_all(&text, "\n\n").trim().to_string()
}

/// Truncates cleaned text to at most `max_chars` characters.
///
/// Truncation happens on character boundaries and appends a `…` marker; the
/// overflow flag lets callers offer a secondary full view.
#[must_use]
pub fn preview(cleaned: &str, max_chars: usize) -> BodyPreview {
    if cleaned.chars().count() <= max_chars {
        return BodyPreview {
            text: cleaned.to_string(),
            truncated: false,
        };
    }

    let mut text: String = cleaned.chars().take(max_chars).collect();
    text.push('…');
    BodyPreview {
        text,
        truncated: true,
    }
}

fn strip_html(raw: &str) -> String {
    let without_styles = STYLE_BLOCKS.replace_all(raw, "");
    let without_scripts = SCRIPT_BLOCKS.replace_all(&without_styles, "");
    let with_breaks = BLOCK_BREAKS.replace_all(&without_scripts, "\n");
    let without_tags = TAGS.replace_all(&with_breaks, "");
    decode_entities(&without_tags)
}

fn decode_entities(input: &str) -> String {
    ENTITIES
        .replace_all(input, |caps: &regex::Captures<'_>| {
            match &caps[1] {
                "nbsp" => " ",
                "amp" => "&",
                "lt" => "<",
                "gt" => ">",
                "quot" => "\"",
                "apos" => "'",
                // Unknown entities stay verbatim.
                _ => return caps[0].to_string(),
            }
            .to_string()
        })
        .into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("  Ops@Example.COM "), "ops@example.com");
        assert_eq!(normalize_address("plain@host"), "plain@host");
    }

    #[test]
    fn test_clean_body_strips_tags_and_decodes_entities() {
        let html = "<div><p>Hello &amp; welcome</p><p>Q&nbsp;&lt;3&gt;</p></div>";
        assert_eq!(
            clean_body(html, BodyFormat::Html),
            "Hello & welcome\nQ <3>"
        );
    }

    #[test]
    fn test_clean_body_removes_style_and_script_blocks() {
        let html = "<style>p { color: red; }</style><p>Visible</p><script>alert(1)</script>";
        assert_eq!(clean_body(html, BodyFormat::Html), "Visible");
    }

    #[test]
    fn test_clean_body_converts_breaks_to_newlines() {
        let html = "line one<br>line two<br />line three";
        assert_eq!(
            clean_body(html, BodyFormat::Html),
            "line one\nline two\nline three"
        );
    }

    #[test]
    fn test_clean_body_collapses_blank_runs() {
        let text = "a\n\n\n\nb\n   \nc";
        assert_eq!(clean_body(text, BodyFormat::Text), "a\n\nb\n\nc");
    }

    #[test]
    fn test_clean_body_leaves_plain_text_markup_alone() {
        let text = "1 < 2 && 3 > 2";
        assert_eq!(clean_body(text, BodyFormat::Text), "1 < 2 && 3 > 2");
    }

    #[test]
    fn test_unknown_entities_are_kept() {
        let html = "<p>&copy; 2024</p>";
        assert_eq!(clean_body(html, BodyFormat::Html), "&copy; 2024");
    }

    #[test]
    fn test_preview_under_bound_is_untouched() {
        let p = preview("short body", 50);
        assert_eq!(p.text, "short body");
        assert!(!p.truncated);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let p = preview("àéîõü-tail", 5);
        assert_eq!(p.text, "àéîõü…");
        assert!(p.truncated);
    }

    #[test]
    fn test_preview_exact_bound_not_truncated() {
        let p = preview("12345", 5);
        assert_eq!(p.text, "12345");
        assert!(!p.truncated);
    }
}

//! Tolerant JSON parsing for response bodies.
//!
//! Backends behind proxies occasionally hand back truncated documents, HTML
//! error pages or JSON followed by stray bytes. [`parse_tolerant`] runs an
//! ordered list of repair strategies and returns the first value that parses.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const PREVIEW_CHARS: usize = 200;

/// Why a body could not be recovered as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonRepairError {
    #[error("Empty response from server")]
    Empty,
    #[error("Response is HTML, not JSON. Server might be returning an error page.")]
    Html,
    #[error("Invalid JSON response: {0}")]
    Syntax(String),
}

/// One repair attempt, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Parse the text as-is.
    Direct,
    /// Walk back from the syntax-error position to the last `}` that closes
    /// a parseable prefix.
    TruncateAtError,
    /// Parse after trimming surrounding whitespace.
    Trimmed,
    /// Parse the span from the first `{` to the last `}`.
    ObjectSpan,
    /// Parse the span from the first `[` to the last `]`.
    ArraySpan,
    /// Replace control characters and cut after the last `}` or `]`.
    Sanitized,
}

impl Strategy {
    pub const ORDER: [Strategy; 6] = [
        Strategy::Direct,
        Strategy::TruncateAtError,
        Strategy::Trimmed,
        Strategy::ObjectSpan,
        Strategy::ArraySpan,
        Strategy::Sanitized,
    ];

    /// Run this strategy. `direct_error` is the failure of the direct parse.
    pub fn apply(self, text: &str, direct_error: Option<&serde_json::Error>) -> Option<Value> {
        match self {
            Strategy::Direct => serde_json::from_str(text).ok(),
            Strategy::TruncateAtError => {
                let err = direct_error?;
                let position = byte_offset(text, err.line(), err.column())?;
                truncate_before(text, position)
            }
            Strategy::Trimmed => {
                let trimmed = text.trim();
                if trimmed.len() == text.len() {
                    return None;
                }
                serde_json::from_str(trimmed).ok()
            }
            Strategy::ObjectSpan => span(text, '{', '}'),
            Strategy::ArraySpan => span(text, '[', ']'),
            Strategy::Sanitized => {
                let cleaned = sanitize(text);
                let end = cleaned.rfind(['}', ']'])?;
                if end == 0 {
                    return None;
                }
                serde_json::from_str(&cleaned[..=end]).ok()
            }
        }
    }
}

/// Parse `text` as JSON, falling back through [`Strategy::ORDER`].
pub fn parse_tolerant(text: &str) -> Result<Value, JsonRepairError> {
    if text.trim().is_empty() {
        return Err(JsonRepairError::Empty);
    }

    let direct_error = match serde_json::from_str::<Value>(text) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    warn!(
        error = %direct_error,
        len = text.len(),
        head = %preview_head(text),
        tail = %preview_tail(text),
        "Response body is not valid JSON"
    );

    if looks_like_html(text) {
        return Err(JsonRepairError::Html);
    }

    for strategy in Strategy::ORDER.into_iter().skip(1) {
        if let Some(value) = strategy.apply(text, Some(&direct_error)) {
            debug!(?strategy, "Recovered JSON from malformed body");
            return Ok(value);
        }
    }

    Err(JsonRepairError::Syntax(direct_error.to_string()))
}

fn looks_like_html(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("<!doctype html") || lower.contains("<html")
}

/// Convert serde_json's 1-based line and column into a byte offset.
fn byte_offset(text: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let line_start = if line == 1 {
        0
    } else {
        text.match_indices('\n').nth(line - 2).map(|(i, _)| i + 1)?
    };
    Some((line_start + column.saturating_sub(1)).min(text.len()))
}

fn truncate_before(text: &str, position: usize) -> Option<Value> {
    let bytes = text.as_bytes();
    (0..(position + 1).min(bytes.len()))
        .rev()
        .filter(|&i| bytes[i] == b'}')
        .find_map(|i| serde_json::from_str(&text[..=i]).ok())
}

fn span(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn sanitize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .map(|c| match c {
            '\r' => '\n',
            '\n' => '\n',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}

fn preview_head(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

fn preview_tail(text: &str) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(PREVIEW_CHARS)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_parses_directly() {
        assert_eq!(parse_tolerant(r#"{"id":7}"#).unwrap(), json!({"id": 7}));
        assert_eq!(parse_tolerant("[1,2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn trailing_garbage_is_cut_at_error_position() {
        let text = r#"{"id":7,"name":"Ada"}<!-- served by proxy -->"#;
        assert_eq!(
            parse_tolerant(text).unwrap(),
            json!({"id": 7, "name": "Ada"})
        );
    }

    #[test]
    fn truncate_strategy_walks_back_to_closing_brace() {
        let text = r#"{"a":{"b":1}}}extra"#;
        let err = serde_json::from_str::<Value>(text).unwrap_err();
        let value = Strategy::TruncateAtError.apply(text, Some(&err)).unwrap();
        assert_eq!(value, json!({"a": {"b": 1}}));
    }

    #[test]
    fn byte_offset_handles_multiline_input() {
        let text = "{\n  \"a\": 1\n}x";
        assert_eq!(byte_offset(text, 3, 2), Some(12));
        assert_eq!(byte_offset(text, 0, 0), None);
    }

    #[test]
    fn object_is_extracted_from_surrounding_noise() {
        let text = r#"callback({"ok":true});"#;
        assert_eq!(parse_tolerant(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn array_is_extracted_when_no_object_present() {
        let text = r#"while(1);[{"id":1},{"id":2}]"#;
        assert_eq!(
            parse_tolerant(text).unwrap(),
            json!([{"id": 1}, {"id": 2}])
        );
    }

    #[test]
    fn sanitize_replaces_raw_control_characters() {
        let text = "{\"note\":\"left\teye\"}\u{0}";
        assert_eq!(parse_tolerant(text).unwrap(), json!({"note": "left eye"}));
    }

    #[test]
    fn html_is_reported_distinctly() {
        let text = "<!DOCTYPE html><html><body>502 Bad Gateway</body></html>";
        assert_eq!(parse_tolerant(text), Err(JsonRepairError::Html));
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(parse_tolerant(" \n "), Err(JsonRepairError::Empty));
    }

    #[test]
    fn hopeless_input_names_original_syntax_error() {
        let err = parse_tolerant("not json at all").unwrap_err();
        match err {
            JsonRepairError::Syntax(msg) => assert!(msg.contains("expected")),
            other => panic!("expected Syntax, got {other:?}"),
        }
    }

    #[test]
    fn trimmed_strategy_only_applies_when_text_changes() {
        assert_eq!(Strategy::Trimmed.apply("{}", None), None);
        assert_eq!(Strategy::Trimmed.apply("\u{feff}{}", None), None);
    }
}

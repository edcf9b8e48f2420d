//! Defensive parsing of backend output.
//!
//! Backends routinely wrap JSON in prose or markdown fences, HTML-escape
//! content that should not be escaped, or omit required fields. The helpers
//! here recover the usable object when possible and let the adapter downgrade
//! to a text response when not - parse failure alone never raises.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Matches JSON wrapped in a markdown code fence, with or without a language tag.
static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("static regex"));

/// Try to recover a JSON object from possibly messy model output.
///
/// Attempts, in order: direct parse, the first fenced code block, the first
/// balanced brace-delimited substring. Returns `None` when nothing parses.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text.trim()) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    if let Some(captures) = FENCED_JSON.captures(text) {
        match serde_json::from_str(&captures[1]) {
            Ok(value) => return Some(value),
            Err(_) => warn!("found a fenced JSON block but failed to parse it"),
        }
    }

    balanced_object(text).and_then(|candidate| serde_json::from_str(candidate).ok())
}

/// First balanced `{...}` substring, respecting string literals and escapes.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Un-escape entity-mangled text fields in a structured payload.
///
/// Some backends HTML-escape string content when instructed to return JSON
/// containing a document. Applied to the named field when it is a string.
pub fn unescape_field(value: &mut serde_json::Value, field: &str) {
    if let Some(serde_json::Value::String(text)) = value.get_mut(field) {
        if text.contains('&') {
            *text = html_escape::decode_html_entities(text).into_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_parse() {
        let value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_fenced_block_with_language_tag() {
        let text = "Here is your object:\n```json\n{\"plan\": \"ok\"}\n```\nDone.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["plan"], "ok");
    }

    #[test]
    fn test_fenced_block_without_language_tag() {
        let text = "```\n{\"x\": true}\n```";
        assert_eq!(extract_json(text).unwrap()["x"], true);
    }

    #[test]
    fn test_balanced_braces_in_prose() {
        let text = "Sure! The result is {\"n\": {\"inner\": 2}} - let me know.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["n"]["inner"], 2);
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_scanner() {
        let text = r#"prefix {"text": "curly } inside", "ok": 1} suffix"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["ok"], 1);
    }

    #[test]
    fn test_unparseable_returns_none() {
        assert!(extract_json("no json here at all").is_none());
        assert!(extract_json("{truncated").is_none());
    }

    #[test]
    fn test_bare_scalar_is_not_structured_output() {
        // "42" parses as JSON but is not a usable structured payload.
        assert!(extract_json("42").is_none());
    }

    #[test]
    fn test_unescape_field_repairs_entities() {
        let mut value = serde_json::json!({
            "document": "&lt;html&gt;&amp;nbsp;&lt;/html&gt;",
            "title": "plain"
        });
        unescape_field(&mut value, "document");
        assert_eq!(value["document"], "<html>&nbsp;</html>");
        assert_eq!(value["title"], "plain");
    }

    #[test]
    fn test_unescape_field_ignores_missing_or_non_string() {
        let mut value = serde_json::json!({"document": 7});
        unescape_field(&mut value, "document");
        assert_eq!(value["document"], 7);

        let mut value = serde_json::json!({});
        unescape_field(&mut value, "document");
        assert!(value.get("document").is_none());
    }
}

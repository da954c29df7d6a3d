//! Best-effort repair of malformed LLM JSON output
//!
//! Models wrap JSON in Markdown fences, add comments, leave trailing commas,
//! and append prose after the closing brace. [`try_repair_json`] strips all of
//! that and hands back something `serde_json` has a fighting chance with.
//! Repair failure is an ordinary `None`, not an error: every caller has a
//! fallback path.
//!
//! The pass is idempotent: repairing already-repaired output returns it
//! unchanged.

use thiserror::Error;

use crate::models::{validate_content, ContentValidationError, GeneratedContent};

/// Why raw LLM output could not be turned into valid content
#[derive(Debug, Error)]
pub enum SanitizeFailure {
    #[error("no balanced JSON object found in output")]
    NoJsonObject,
    #[error("repaired output is not valid JSON: {0}")]
    Parse(String),
    #[error(transparent)]
    Validation(#[from] ContentValidationError),
}

/// Attempt to extract a parseable JSON object from raw LLM output.
///
/// Steps, in order: trim, strip Markdown code fences, remove `//` and
/// `/* */` comments, collapse whitespace, remove trailing commas, then
/// extract the first balanced `{...}` by brace-depth scan. All passes are
/// string-literal aware so URLs and embedded text survive intact.
///
/// Returns `None` when no balanced object exists.
pub fn try_repair_json(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unfenced = strip_code_fences(trimmed);
    let normalized = normalize(&unfenced);
    extract_balanced_object(&normalized)
}

/// Repair, parse, and validate raw LLM output as [`GeneratedContent`]
pub fn parse_content(raw: &str) -> Result<GeneratedContent, SanitizeFailure> {
    let repaired = try_repair_json(raw).ok_or(SanitizeFailure::NoJsonObject)?;
    let content: GeneratedContent =
        serde_json::from_str(&repaired).map_err(|e| SanitizeFailure::Parse(e.to_string()))?;
    validate_content(&content)?;
    Ok(content)
}

/// Strip a wrapping triple-backtick fence, with or without a language tag.
/// Text after the closing fence is dropped (the brace scan would discard it
/// anyway, but a stray backtick inside prose could confuse later passes).
fn strip_code_fences(s: &str) -> String {
    if let Some(fence_start) = s.find("```") {
        let after_fence = &s[fence_start + 3..];
        // Skip the language tag line ("json", "javascript", ...)
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        let body = match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        };
        body.trim().to_string()
    } else {
        s.to_string()
    }
}

/// Single normalize pass over the text, tracking string-literal state:
/// removes `//` line comments and `/* */` block comments, collapses runs of
/// whitespace outside strings to a single space, and drops commas that
/// directly precede `}` or `]`.
fn normalize(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '/' if i + 1 < chars.len() && chars[i + 1] == '/' => {
                // Line comment: skip to end of line
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                // Block comment: skip past closing */
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            ',' => {
                // Drop the comma if the next significant character closes a
                // scope. Whitespace AND comments are insignificant here: a
                // comment between the comma and the brace is removed by this
                // same pass, so the lookahead has to skip it too.
                let j = next_significant(&chars, i + 1);
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    i += 1;
                } else {
                    out.push(',');
                    i += 1;
                }
            }
            c if c.is_whitespace() => {
                // Collapse whitespace runs to one space
                if !out.ends_with(' ') && !out.is_empty() {
                    out.push(' ');
                }
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out.trim().to_string()
}

/// Index of the next character from `start` that is neither whitespace nor
/// part of a `//` or `/* */` comment
fn next_significant(chars: &[char], start: usize) -> usize {
    let mut j = start;
    loop {
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        if j + 1 < chars.len() && chars[j] == '/' && chars[j + 1] == '/' {
            while j < chars.len() && chars[j] != '\n' {
                j += 1;
            }
        } else if j + 1 < chars.len() && chars[j] == '/' && chars[j + 1] == '*' {
            j += 2;
            while j + 1 < chars.len() && !(chars[j] == '*' && chars[j + 1] == '/') {
                j += 1;
            }
            j = (j + 2).min(chars.len());
        } else {
            return j;
        }
    }
}

/// Find the first `{` and its matching `}` by depth counting, returning the
/// enclosed slice. Trailing explanatory prose after the object is discarded.
fn extract_balanced_object(s: &str) -> Option<String> {
    let chars: Vec<char> = s.chars().collect();
    let start = chars.iter().position(|&c| c == '{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
        } else {
            match c {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(chars[start..=i].iter().collect());
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_passes_through() {
        let repaired = try_repair_json(r#"{"a":1}"#).unwrap();
        assert_eq!(repaired, r#"{"a":1}"#);
    }

    #[test]
    fn test_fence_trailing_comma_and_prose() {
        let raw = "```json\n{\"a\":1,}\n```\nNote: done.";
        let repaired = try_repair_json(raw).unwrap();
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn test_comments_removed_outside_strings() {
        let raw = r#"{
            // service count
            "count": 3, /* inline */
            "url": "https://example.com/docs"
        }"#;
        let repaired = try_repair_json(raw).unwrap();
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["count"], 3);
        // The // inside the URL string must survive
        assert_eq!(value["url"], "https://example.com/docs");
    }

    #[test]
    fn test_trailing_comma_separated_by_comment() {
        let cases = [
            ("{\"a\": 1, /* last field */ }", serde_json::json!({"a": 1})),
            ("{\"a\": 1, // done\n}", serde_json::json!({"a": 1})),
            ("{\"list\": [1, 2, /* end */ ]}", serde_json::json!({"list": [1, 2]})),
        ];
        for (raw, expected) in cases {
            let repaired = try_repair_json(raw).unwrap();
            let value: serde_json::Value = serde_json::from_str(&repaired)
                .unwrap_or_else(|e| panic!("{:?} repaired to invalid JSON {:?}: {}", raw, repaired, e));
            assert_eq!(value, expected);
        }
    }

    #[test]
    fn test_trailing_prose_discarded() {
        let raw = r#"{"a": {"b": 2}} I hope this helps!"#;
        let repaired = try_repair_json(raw).unwrap();
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["a"]["b"], 2);
    }

    #[test]
    fn test_leading_prose_discarded() {
        let raw = "Here is the JSON you asked for: {\"x\": true}";
        let repaired = try_repair_json(raw).unwrap();
        assert!(repaired.starts_with('{'));
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["x"], true);
    }

    #[test]
    fn test_no_object_returns_none() {
        assert!(try_repair_json("no json here at all").is_none());
        assert!(try_repair_json("{\"unclosed\": 1").is_none());
        assert!(try_repair_json("").is_none());
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "```json\n{\"a\":1,}\n```\nNote: done.",
            r#"{"nested": {"list": [1, 2, 3,],}, "s": "a // b"}"#,
            r#"prose before {"k": "v"} prose after"#,
        ];
        for input in inputs {
            let once = try_repair_json(input).unwrap();
            let twice = try_repair_json(&once).unwrap();
            assert_eq!(once, twice, "repair not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_round_trip_with_decorations() {
        let original = serde_json::json!({
            "technology": "Azure Landing Zone",
            "hours": 42.5,
            "tags": ["cloud", "migration"],
            "note": "contains  spaces and a } brace"
        });
        let wrapped = format!(
            "```json\n{},\n```\nLet me know if you need anything else.",
            serde_json::to_string_pretty(&original).unwrap()
        );
        // A trailing comma after the object plus a fence plus prose
        let repaired = try_repair_json(&wrapped).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_escaped_quotes_in_strings() {
        let raw = r#"{"quote": "he said \"hi\" // not a comment"}"#;
        let repaired = try_repair_json(raw).unwrap();
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["quote"], "he said \"hi\" // not a comment");
    }

    #[test]
    fn test_parse_content_rejects_invalid_shape() {
        let err = parse_content(r#"{"technology": "X"}"#).unwrap_err();
        assert!(matches!(err, SanitizeFailure::Parse(_)));
    }
}

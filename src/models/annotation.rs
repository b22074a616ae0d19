//! Line-anchored review annotations produced by the external reviewer.
//!
//! The reviewer's output is untrusted text: it may be wrapped in code
//! fences, may not be JSON at all, or may carry out-of-range values.
//! Parsing is strict and all-or-nothing; any defect yields an empty set so
//! the file view still renders.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Performance,
    Security,
    Readability,
    BestPractice,
}

/// One suggestion anchored to a 1-based line of the reviewed file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileAnnotation {
    pub line_number: u32,
    pub suggestion: String,
    pub comment: String,
    pub severity: Severity,
    pub category: Category,
}

/// Strip a leading/trailing Markdown code fence (```, ```json, ...) so the
/// payload inside can be parsed as JSON.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the fence's info string ("json", "javascript", ...).
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => return trimmed,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Parse the reviewer's raw text into validated annotations.
///
/// Returns `None` on any defect: non-JSON text, wrong shape, unknown
/// severity/category values, or a line number of zero.
pub fn parse_annotations(raw: &str) -> Option<Vec<FileAnnotation>> {
    let cleaned = strip_code_fences(raw);
    let parsed: Vec<FileAnnotation> = serde_json::from_str(cleaned).ok()?;
    if parsed.iter().any(|a| a.line_number == 0) {
        return None;
    }
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"[{
        "lineNumber": 3,
        "suggestion": "const x = 1;",
        "comment": "prefer const",
        "severity": "low",
        "category": "best_practice"
    }]"#;

    #[test]
    fn parses_plain_json_array() {
        let annotations = parse_annotations(VALID).unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].line_number, 3);
        assert_eq!(annotations[0].severity, Severity::Low);
        assert_eq!(annotations[0].category, Category::BestPractice);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{}\n```", VALID);
        let annotations = parse_annotations(&fenced).unwrap();
        assert_eq!(annotations.len(), 1);
    }

    #[test]
    fn parses_fence_without_info_string() {
        let fenced = format!("```\n{}\n```", VALID);
        assert!(parse_annotations(&fenced).is_some());
    }

    #[test]
    fn rejects_non_json_text() {
        assert!(parse_annotations("Here are my thoughts on your code...").is_none());
    }

    #[test]
    fn rejects_unknown_severity() {
        let bad = VALID.replace("\"low\"", "\"catastrophic\"");
        assert!(parse_annotations(&bad).is_none());
    }

    #[test]
    fn rejects_zero_line_number() {
        let bad = VALID.replace("\"lineNumber\": 3", "\"lineNumber\": 0");
        assert!(parse_annotations(&bad).is_none());
    }

    #[test]
    fn rejects_extra_fields() {
        let bad = VALID.replace("\"lineNumber\": 3", "\"lineNumber\": 3, \"exploit\": true");
        assert!(parse_annotations(&bad).is_none());
    }

    #[test]
    fn empty_array_is_valid() {
        assert_eq!(parse_annotations("[]").unwrap(), vec![]);
    }
}

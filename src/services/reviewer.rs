//! External code-review annotator.
//!
//! Sends a file's content to a generative-AI endpoint with a fixed
//! instruction template and parses the reply into validated
//! `FileAnnotation`s. The reviewer never fails a file view: transport
//! errors, non-JSON replies and schema violations all degrade to an empty
//! annotation set.

use crate::models::annotation::{FileAnnotation, parse_annotations};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

#[derive(Clone)]
pub struct CodeReviewer {
    http: Client,
    base_url: String,
    model: String,
    /// No key means the reviewer is disabled; views get no annotations.
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl CodeReviewer {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url,
            model,
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Review one file and return its annotations, or an empty set when
    /// the reviewer is disabled or anything along the way fails.
    pub async fn review(&self, file_name: &str, content: &str) -> Vec<FileAnnotation> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };

        let prompt = build_prompt(content);
        let url = self.endpoint_url();
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        // The key travels in a header, never in the URL: request errors
        // echo the URL into logs.
        let response = match self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!("reviewer request for `{}` failed: {}", file_name, err);
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            warn!(
                "reviewer returned {} for `{}`",
                response.status(),
                file_name
            );
            return Vec::new();
        }

        let parsed: GenerateContentResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("reviewer response for `{}` unreadable: {}", file_name, err);
                return Vec::new();
            }
        };

        let Some(text) = first_text(&parsed) else {
            warn!("reviewer response for `{}` carried no text", file_name);
            return Vec::new();
        };

        match parse_annotations(text) {
            Some(annotations) => annotations,
            None => {
                warn!("reviewer output for `{}` was not valid annotations", file_name);
                Vec::new()
            }
        }
    }
}

fn first_text(response: &GenerateContentResponse) -> Option<&str> {
    response
        .candidates
        .as_deref()?
        .first()?
        .content
        .as_ref()?
        .parts
        .as_deref()?
        .first()?
        .text
        .as_deref()
}

/// Fixed reviewer instruction template. The expected reply is a bare JSON
/// array of annotation objects.
fn build_prompt(content: &str) -> String {
    format!(
        r#"You are a senior code reviewer analyzing a user's code. Provide specific, actionable suggestions in this exact JSON format:

[{{
  "lineNumber": <number>,
  "suggestion": "<improved_code_snippet>",
  "comment": "<technical_justification>",
  "severity": "<low|medium|high>",
  "category": "<performance|security|readability|best_practice>"
}}]

Focus on:
1. Security vulnerabilities
2. Performance optimizations
3. Modern best practices for the file's language
4. Code organization improvements
5. Error handling enhancements

Code to review:
```
{content}
```

Important rules:
- Suggest complete code replacements, not partial edits
- Include imports if suggesting new dependencies
- Mark security issues as high severity
- Keep suggestions concise but technically precise
- Reply with the JSON array only"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_reviewer_returns_no_annotations() {
        let reviewer = CodeReviewer::new(
            "https://example.invalid".into(),
            "test-model".into(),
            None,
        );
        let annotations = reviewer.review("a.txt", "let x = 1;").await;
        assert!(annotations.is_empty());
    }

    #[test]
    fn endpoint_url_never_carries_the_api_key() {
        let reviewer = CodeReviewer::new(
            "https://example.invalid/".into(),
            "test-model".into(),
            Some("sekret-key".into()),
        );
        let url = reviewer.endpoint_url();
        assert_eq!(
            url,
            "https://example.invalid/v1beta/models/test-model:generateContent"
        );
        assert!(!url.contains("sekret-key"));
        assert!(!url.contains("key="));
    }

    #[test]
    fn prompt_embeds_the_file_content() {
        let prompt = build_prompt("fn main() {}");
        assert!(prompt.contains("fn main() {}"));
        assert!(prompt.contains("lineNumber"));
    }

    #[test]
    fn first_text_walks_the_candidate_shape() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"[]"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_text(&parsed), Some("[]"));

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(first_text(&empty), None);
    }
}

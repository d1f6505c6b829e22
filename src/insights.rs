//! Generative-text endpoint client ("AI insight" features).
//!
//! One request, one response: a system instruction plus a user message go
//! out, free text comes back. No streaming, no retry, no caching. The
//! billing page's daily summary is the only wired consumer; the login
//! screen's password hint ships as a local stub (see `auth`).

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::storage;

const GENERATIVE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GENERATIVE_MODEL: &str = "gemini-2.5-flash-preview-05-20";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("Insight API key is not configured")]
    MissingKey,
    #[error("Insight request failed: {0}")]
    Request(String),
    #[error("Insight endpoint returned HTTP {0}")]
    Status(u16),
    #[error("Couldn't generate a summary.")]
    EmptyAnswer,
}

impl From<InsightError> for String {
    fn from(err: InsightError) -> Self {
        err.to_string()
    }
}

/// Request body in the endpoint's `generateContent` shape.
pub fn build_request_body(system_prompt: &str, user_query: &str) -> Value {
    serde_json::json!({
        "contents": [{ "parts": [{ "text": user_query }] }],
        "systemInstruction": { "parts": [{ "text": system_prompt }] },
    })
}

/// Pull the answer text out of a `generateContent` response.
pub fn extract_answer(response: &Value) -> Option<String> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Fire the single request/response call. Fails fast when no key is
/// stored — the deployment this was lifted from shipped without one, and
/// every call would have died with an auth error anyway.
pub async fn generate(system_prompt: &str, user_query: &str) -> Result<String, InsightError> {
    let api_key = storage::insight_api_key()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(InsightError::MissingKey)?;

    let url = format!("{GENERATIVE_ENDPOINT}/{GENERATIVE_MODEL}:generateContent?key={api_key}");
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| InsightError::Request(e.to_string()))?;

    let resp = client
        .post(&url)
        .json(&build_request_body(system_prompt, user_query))
        .send()
        .await
        .map_err(|e| InsightError::Request(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "insight request rejected");
        return Err(InsightError::Status(status.as_u16()));
    }

    let body: Value = resp
        .json()
        .await
        .map_err(|e| InsightError::Request(e.to_string()))?;
    extract_answer(&body).ok_or(InsightError::EmptyAnswer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_system_instruction_and_query() {
        let body = build_request_body("be brief", "summarize this");
        assert_eq!(
            body["contents"][0]["parts"][0]["text"].as_str(),
            Some("summarize this")
        );
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"].as_str(),
            Some("be brief")
        );
    }

    #[test]
    fn extract_answer_reads_first_candidate() {
        let response = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "  A strong dinner rush.  " }] }
            }]
        });
        assert_eq!(
            extract_answer(&response).as_deref(),
            Some("A strong dinner rush.")
        );
    }

    #[test]
    fn extract_answer_rejects_empty_or_missing_text() {
        assert!(extract_answer(&serde_json::json!({})).is_none());
        let blank = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
        });
        assert!(extract_answer(&blank).is_none());
    }
}

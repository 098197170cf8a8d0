//! Gemini text-generation executor.
//!
//! One `generateContent` request per call. HTTP status and transport
//! failures are mapped onto `ExecError` so the retry policy can tell
//! overload apart from everything else.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use toolshed_core::config::ChatSettings;
use toolshed_core::ExecError;

use super::TextGenerator;

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Requests fail with `ExecError::Failed` while this is unset.
    pub api_key: Option<String>,
    /// Model name, e.g. "gemini-2.0-flash".
    pub model: String,
    /// Base endpoint URL, without the `/models/...` suffix.
    pub endpoint: String,
    pub attempt_timeout: Duration,
}

impl From<&ChatSettings> for GeminiSettings {
    fn from(chat: &ChatSettings) -> Self {
        Self {
            api_key: chat.api_key.clone(),
            model: chat.model.clone(),
            endpoint: chat.endpoint.trim_end_matches('/').to_string(),
            attempt_timeout: chat.attempt_timeout(),
        }
    }
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiGenerator {
    pub fn new(settings: GeminiSettings) -> Result<Self, ExecError> {
        let client = reqwest::Client::builder()
            .timeout(settings.attempt_timeout)
            .build()
            .map_err(|e| ExecError::Failed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint, self.settings.model
        )
    }

    fn transport_error(&self, e: reqwest::Error) -> ExecError {
        if e.is_timeout() {
            ExecError::Timeout(self.settings.attempt_timeout)
        } else if e.is_connect() {
            ExecError::Unreachable(e.to_string())
        } else {
            ExecError::Failed(e.to_string())
        }
    }
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ExecError> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            return Err(ExecError::Failed("GEMINI_API_KEY is not set".to_string()));
        };
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ExecError::Failed(format!("unreadable response: {e}")))?;

        extract_text(parsed)
    }
}

/// Map a non-success status to an error kind.
/// Upstream 400 also covers bad keys and unknown models; it is never the
/// caller's input.
fn classify_status(status: reqwest::StatusCode, body: &str) -> ExecError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS | reqwest::StatusCode::SERVICE_UNAVAILABLE => {
            ExecError::Overloaded(detail)
        }
        _ => ExecError::Failed(detail),
    }
}

fn extract_text(parsed: GenerateResponse) -> Result<String, ExecError> {
    let text: String = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(ExecError::Failed("no content in response".to_string()));
    }
    Ok(text)
}

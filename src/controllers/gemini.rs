// Generation client for the Gemini generateContent API.
//
// The backend is an untrusted, non-deterministic oracle: everything above
// this module talks to the `GenerationBackend` trait so the pipeline can be
// exercised with deterministic fakes.
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::controllers::prompt::GenerationRequest;
use crate::error::ApiError;
use crate::secrets::SECRET_MANAGER;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Narrow seam over the generative backend: composed request in, raw text
/// out. One outbound call, no retries; retry policy belongs to the caller.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ApiError>;
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
        }
    }

    pub fn from_secrets() -> Self {
        let key = SECRET_MANAGER.get("GEMINI_API_KEY");
        let model = SECRET_MANAGER.get("GEMINI_MODEL");
        Self::new(
            if key.is_empty() { None } else { Some(key) },
            model,
        )
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ApiError> {
        // Fail fast before any network traffic when the credential is absent.
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ApiError::Configuration("GEMINI_API_KEY"))?;

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_URL, self.model, api_key
        );

        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: "system".to_string(),
                parts: vec![GeminiPart {
                    text: request.system_rules.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: request.user_context.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.sampling.temperature,
                top_p: request.sampling.top_p,
                response_mime_type: "application/json".to_string(),
                response_schema: Some(request.output_schema.clone()),
            },
        };

        debug!(model = %self.model, "sending generation request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Upstream("generation request timed out".to_string())
                } else {
                    ApiError::Upstream(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "backend returned {}: {}",
                status, body_text
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("malformed response envelope: {}", e)))?;

        // Same fallback chain the API documents: first part's text, then the
        // content-level text field.
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| {
                content
                    .parts
                    .into_iter()
                    .find_map(|p| p.text)
                    .or(content.text)
            })
            .filter(|t| !t.trim().is_empty());

        match text {
            Some(text) => {
                debug!(response_len = text.len(), "received generation response");
                Ok(text)
            }
            None => Err(ApiError::EmptyGeneration),
        }
    }
}

// Singleton instance, shared across requests (the client is stateless).
pub static GEMINI_CLIENT: Lazy<GeminiClient> = Lazy::new(GeminiClient::from_secrets);

// Gemini wire types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::prompt;
    use crate::models::playlist::MoodInput;

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_network_call() {
        let client = GeminiClient::new(None, "gemini-2.5-flash");
        let request = prompt::compose(
            &MoodInput {
                text: "quiet evening".to_string(),
                genre_preference: None,
                era: None,
            },
            None,
            None,
        );
        // The key check precedes request construction, so this returns
        // without touching the socket.
        let err = client.generate(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Configuration("GEMINI_API_KEY")));
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let client = GeminiClient::new(Some(String::new()), "gemini-2.5-flash");
        assert!(client.api_key.is_none());
    }

    #[test]
    fn test_candidate_text_extraction_falls_back_to_content_text() {
        let raw = r#"{"candidates":[{"content":{"text":"{\"playlistName\":\"x\"}"}}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| {
                content
                    .parts
                    .into_iter()
                    .find_map(|p| p.text)
                    .or(content.text)
            });
        assert_eq!(text.as_deref(), Some("{\"playlistName\":\"x\"}"));
    }
}

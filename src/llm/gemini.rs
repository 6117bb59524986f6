//! Gemini provider — `models/{model}:generateContent` over the REST API.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::provider::{GenerationProvider, ResponseFormat};

const PROVIDER: &str = "gemini";

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini REST client. The model is chosen per call, so one client serves
/// the whole fallback list.
pub struct GeminiProvider {
    api_key: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<String, LlmError> {
        let mut body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        if format == ResponseFormat::Json {
            body["generationConfig"] = serde_json::json!({
                "responseMimeType": "application/json"
            });
        }

        let resp = self
            .client
            .post(self.api_url(model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(status_error(status, model, &detail));
        }

        let parsed: GenerateContentResponse =
            resp.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.into(),
                reason: format!("undecodable body: {e}"),
            })?;

        let text = parsed.text().ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.into(),
            reason: "response had no text candidates".into(),
        })?;
        debug!(model, chars = text.len(), "Gemini response received");
        Ok(text)
    }
}

/// Map a non-success HTTP status onto the provider error taxonomy.
fn status_error(status: StatusCode, model: &str, detail: &str) -> LlmError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            provider: PROVIDER.into(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthFailed {
            provider: PROVIDER.into(),
        },
        StatusCode::NOT_FOUND => LlmError::ModelNotAvailable {
            provider: PROVIDER.into(),
            model: model.into(),
        },
        _ => LlmError::RequestFailed {
            provider: PROVIDER.into(),
            reason: format!("HTTP {status}: {}", truncate(detail, 300)),
        },
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    /// Serve a fake `generateContent` endpoint; the model id picks the reply.
    async fn start_fake_gemini() -> String {
        async fn handler(
            Path(model_call): Path<String>,
            headers: HeaderMap,
            Json(body): Json<serde_json::Value>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
                return (StatusCode::FORBIDDEN, Json(serde_json::json!({})));
            }
            let model = model_call.trim_end_matches(":generateContent");
            match model {
                "ok-model" => {
                    let mime = body["generationConfig"]["responseMimeType"].clone();
                    (
                        StatusCode::OK,
                        Json(serde_json::json!({
                            "candidates": [{ "content": { "parts": [
                                { "text": "{\"mime\": " },
                                { "text": format!("{mime}}}") }
                            ]}}]
                        })),
                    )
                }
                "busy-model" => (StatusCode::TOO_MANY_REQUESTS, Json(serde_json::json!({}))),
                "empty-model" => (StatusCode::OK, Json(serde_json::json!({ "candidates": [] }))),
                _ => (StatusCode::NOT_FOUND, Json(serde_json::json!({}))),
            }
        }

        let app = Router::new().route("/v1beta/models/{model_call}", post(handler));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{port}/v1beta")
    }

    fn provider(base: &str, key: &str) -> GeminiProvider {
        GeminiProvider::new(SecretString::from(key.to_string()), base)
    }

    #[test]
    fn api_url_trims_trailing_slash() {
        let p = provider("https://example.test/v1beta/", "k");
        assert_eq!(
            p.api_url("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn json_request_sets_mime_type_and_joins_parts() {
        let base = start_fake_gemini().await;
        let p = provider(&base, "test-key");
        let text = p.generate("ok-model", "hi", ResponseFormat::Json).await.unwrap();
        assert_eq!(text, "{\"mime\": \"application/json\"}");
    }

    #[tokio::test]
    async fn text_request_omits_generation_config() {
        let base = start_fake_gemini().await;
        let p = provider(&base, "test-key");
        let text = p.generate("ok-model", "hi", ResponseFormat::Text).await.unwrap();
        assert_eq!(text, "{\"mime\": null}");
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let base = start_fake_gemini().await;
        let p = provider(&base, "test-key");
        assert!(matches!(
            p.generate("busy-model", "hi", ResponseFormat::Json).await,
            Err(LlmError::RateLimited { .. })
        ));
        assert!(matches!(
            p.generate("missing-model", "hi", ResponseFormat::Json).await,
            Err(LlmError::ModelNotAvailable { .. })
        ));
        assert!(matches!(
            p.generate("empty-model", "hi", ResponseFormat::Json).await,
            Err(LlmError::InvalidResponse { .. })
        ));

        let wrong_key = provider(&base, "nope");
        assert!(matches!(
            wrong_key.generate("ok-model", "hi", ResponseFormat::Json).await,
            Err(LlmError::AuthFailed { .. })
        ));
    }
}

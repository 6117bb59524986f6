//! Classification engine — asks generation models for a structured verdict,
//! walking the candidate list until one answers.
//!
//! Flow:
//! 1. No provider configured → `Error` result, no request made
//! 2. Build one prompt with the original and the processed text
//! 3. Try each candidate once; first parsable answer wins
//! 4. Every candidate failed → `Error` result naming all of them
//!
//! A failed candidate never aborts the loop. Each attempt is bounded by
//! `attempt_timeout` and the whole loop by `total_timeout`.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::ClassifyError;
use crate::llm::provider::{GenerationProvider, ResponseFormat};
use crate::pipeline::candidates::ModelCandidates;
use crate::pipeline::types::{Classification, ClassificationResult};

/// Default per-attempt timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default ceiling on the whole fallback loop.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Shown when no API credential was supplied.
pub const NOT_CONFIGURED_MESSAGE: &str = "Error: generation API key is not configured.";

/// Instruction template. `{original_text}` and `{processed_text}` are filled in.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"You are an intelligent email triage assistant.

Analyze the following email.

ORIGINAL TEXT:
"{original_text}"

PROCESSED TEXT (NLP):
"{processed_text}"

Task:
1. Classify the email as 'produtivo' (needs human action, a reply, or is important) or 'improdutivo' (spam, promotions, automated notifications, simple thanks with no follow-up needed).
2. If it is 'produtivo', suggest a direct, professional reply in the language of the email. If it is 'improdutivo', the reply may be null or a short justification.

Return EXACTLY this JSON object:
{
    "classification": "produtivo" | "improdutivo",
    "suggested_response": string | null,
    "reasoning": "short explanation of the classification"
}"#;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub candidates: ModelCandidates,
    pub attempt_timeout: Duration,
    pub total_timeout: Duration,
    pub prompt_template: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candidates: ModelCandidates::with_override(None),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

/// Classifies email text with ordered model fallback.
///
/// Holds no per-request state, so one engine serves concurrent requests.
pub struct ClassificationEngine {
    provider: Option<Arc<dyn GenerationProvider>>,
    config: EngineConfig,
}

impl ClassificationEngine {
    /// `provider` is `None` when no credential is configured.
    pub fn new(provider: Option<Arc<dyn GenerationProvider>>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    pub fn candidates(&self) -> &ModelCandidates {
        &self.config.candidates
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Classify an email. Never fails: problems come back as an `Error` result.
    pub async fn classify(&self, processed_text: &str, original_text: &str) -> ClassificationResult {
        let Some(provider) = self.provider.as_ref() else {
            warn!("Classification skipped: {}", ClassifyError::NotConfigured);
            return ClassificationResult {
                reasoning: ClassifyError::NotConfigured.to_string(),
                ..ClassificationResult::error(NOT_CONFIGURED_MESSAGE, "")
            };
        };

        let prompt = self.build_prompt(original_text, processed_text);
        let deadline = Instant::now() + self.config.total_timeout;
        let models = self.config.candidates.as_slice();

        let mut tried: Vec<&str> = Vec::with_capacity(models.len());
        let mut last_error: Option<ClassifyError> = None;

        for (index, model) in models.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    skipped = models.len() - index,
                    "Fallback time budget spent, skipping remaining models"
                );
                break;
            }

            info!(model = %model, attempt = index + 1, "Trying model");
            let timeout = remaining.min(self.config.attempt_timeout);
            match self.attempt(provider.as_ref(), model, &prompt, timeout).await {
                Ok(result) => {
                    info!(
                        model = %model,
                        classification = %result.classification,
                        "Classification succeeded"
                    );
                    return result;
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "Model failed, falling back");
                    tried.push(model);
                    last_error = Some(e);
                }
            }
        }

        self.exhausted(&tried, last_error)
    }

    /// One attempt against one model.
    async fn attempt(
        &self,
        provider: &dyn GenerationProvider,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<ClassificationResult, ClassifyError> {
        let raw = tokio::time::timeout(timeout, provider.generate(model, prompt, ResponseFormat::Json))
            .await
            .map_err(|_| ClassifyError::Timeout {
                model: model.to_string(),
                timeout,
            })?
            .map_err(|source| ClassifyError::CandidateFailure {
                model: model.to_string(),
                source,
            })?;

        let mut result =
            parse_model_reply(&raw).map_err(|reason| ClassifyError::MalformedResponse {
                model: model.to_string(),
                reason,
            })?;
        result.model_used = Some(model.to_string());
        Ok(result)
    }

    fn exhausted(&self, tried: &[&str], last_error: Option<ClassifyError>) -> ClassificationResult {
        let models = self.config.candidates.as_slice();
        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no model was attempted".to_string());

        let mut tried_list = tried.join(", ");
        let not_attempted: Vec<&str> = models
            .iter()
            .map(String::as_str)
            .filter(|m| !tried.contains(m))
            .collect();
        if !not_attempted.is_empty() {
            tried_list.push_str(&format!("; not attempted: {}", not_attempted.join(", ")));
        }
        if models.is_empty() {
            tried_list = "no candidate models configured".to_string();
        }

        let exhausted = ClassifyError::AllCandidatesExhausted {
            tried: tried_list.clone(),
            last_error: last_error.clone(),
        };
        error!("{exhausted}");

        ClassificationResult::error(
            exhausted.to_string(),
            format!(
                "Connection failure across multiple AI models ({tried_list}). Last error: {last_error}"
            ),
        )
    }

    fn build_prompt(&self, original_text: &str, processed_text: &str) -> String {
        fill_template(
            &self.config.prompt_template,
            &[
                ("{original_text}", original_text),
                ("{processed_text}", processed_text),
            ],
        )
    }
}

/// Substitute placeholders in one left-to-right pass, so text inserted for
/// one placeholder is never rescanned for another.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((at, placeholder, value)) = values
        .iter()
        .filter_map(|(placeholder, value)| rest.find(*placeholder).map(|at| (at, placeholder, value)))
        .min_by_key(|(at, ..)| *at)
    {
        out.push_str(&rest[..at]);
        out.push_str(value);
        rest = &rest[at + placeholder.len()..];
    }
    out.push_str(rest);
    out
}

// ── Response parsing ────────────────────────────────────────────────

/// Structured answer requested from the model.
#[derive(Debug, Deserialize)]
struct ModelReply {
    classification: String,
    #[serde(default)]
    suggested_response: Option<String>,
    #[serde(default)]
    reasoning: String,
}

/// Parse a model answer into a (non-error) classification result.
fn parse_model_reply(raw: &str) -> Result<ClassificationResult, String> {
    let json_str = extract_json_object(raw);
    let reply: ModelReply =
        serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {e}"))?;

    let classification: Classification = reply.classification.parse()?;
    if classification == Classification::Error {
        return Err("model answered with the error sentinel".into());
    }

    Ok(ClassificationResult {
        classification,
        suggested_response: reply.suggested_response.filter(|s| !s.trim().is_empty()),
        reasoning: reply.reasoning,
        model_used: None,
        diagnostic: None,
    })
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    let fenced = fenced_block(trimmed, "```json")
        .or_else(|| fenced_block(trimmed, "```").filter(|inner| inner.starts_with('{')));
    if let Some(inner) = fenced {
        return inner.to_string();
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

/// Trimmed contents between `opener` and the next closing fence.
fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let after = &text[text.find(opener)? + opener.len()..];
    let end = after.find("```")?;
    Some(after[..end].trim())
}

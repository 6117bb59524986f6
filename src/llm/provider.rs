//! Generation provider trait — the text-generation capability consumed by
//! the classification engine.

use async_trait::async_trait;

use crate::error::LlmError;

/// Requested shape of the generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

/// A text-generation backend that can serve several model identifiers.
///
/// One call is one outbound request; retries are the caller's business.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt` using `model`.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<String, LlmError>;
}

//! Text-generation integration.
//!
//! The classification engine only sees the `GenerationProvider` trait. The
//! concrete backend is Gemini's REST API, called through `reqwest`.

pub mod gemini;
pub mod provider;

pub use gemini::GeminiProvider;
pub use provider::{GenerationProvider, ResponseFormat};

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::error::LlmError;

/// Configuration for creating a generation provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
}

/// Create a generation provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn GenerationProvider>, LlmError> {
    if config.api_key.expose_secret().trim().is_empty() {
        return Err(LlmError::AuthFailed {
            provider: "gemini".to_string(),
        });
    }
    tracing::info!("Using Gemini (endpoint: {})", config.base_url);
    Ok(Arc::new(GeminiProvider::new(
        config.api_key.clone(),
        config.base_url.clone(),
    )))
}

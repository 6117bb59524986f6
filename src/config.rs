//! Service configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::channels::email::{DEFAULT_IMAP_HOST, DEFAULT_IMAP_PORT, ImapConfig};
use crate::error::ConfigError;
use crate::llm::LlmConfig;
use crate::llm::gemini::DEFAULT_BASE_URL;
use crate::nlp::LanguageTag;
use crate::pipeline::candidates::ModelCandidates;
use crate::pipeline::classifier::{DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_TOTAL_TIMEOUT, EngineConfig};

/// Largest accepted upload (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Inputs longer than this many chars are truncated before analysis.
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 10_000;

/// Everything the service needs, built once in `main` and never mutated.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `None` leaves the classifier unconfigured.
    pub gemini_api_key: Option<SecretString>,
    /// Preferred model, tried before the built-in list.
    pub gemini_model: Option<String>,
    pub gemini_base_url: String,
    pub attempt_timeout: Duration,
    pub total_timeout: Duration,
    pub language: LanguageTag,
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub max_text_length: usize,
    pub database_path: PathBuf,
    pub imap_host: String,
    pub imap_port: u16,
    /// Mailbox used when a request names none.
    pub email_user: Option<String>,
    pub email_pass: Option<SecretString>,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: None,
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
            language: LanguageTag::Portuguese,
            host: "0.0.0.0".to_string(),
            port: 5001,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            database_path: PathBuf::from("./data/mail-triage.db"),
            imap_host: DEFAULT_IMAP_HOST.to_string(),
            imap_port: DEFAULT_IMAP_PORT,
            email_user: None,
            email_pass: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Build from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let attempt_secs: u64 = parse_or(&get, "LLM_ATTEMPT_TIMEOUT_SECS", defaults.attempt_timeout.as_secs())?;
        let total_secs: u64 = parse_or(&get, "LLM_TOTAL_TIMEOUT_SECS", defaults.total_timeout.as_secs())?;
        require_positive("LLM_ATTEMPT_TIMEOUT_SECS", attempt_secs)?;
        require_positive("LLM_TOTAL_TIMEOUT_SECS", total_secs)?;

        let max_file_size: usize = parse_or(&get, "MAX_FILE_SIZE", defaults.max_file_size)?;
        let max_text_length: usize = parse_or(&get, "MAX_TEXT_LENGTH", defaults.max_text_length)?;
        require_positive("MAX_FILE_SIZE", max_file_size as u64)?;
        require_positive("MAX_TEXT_LENGTH", max_text_length as u64)?;

        let language = get("NLP_LANGUAGE")
            .map(|v| LanguageTag::from_str(&v).unwrap_or_else(|never| match never {}))
            .unwrap_or(defaults.language);

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").map(SecretString::from),
            gemini_model: get("GEMINI_MODEL"),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            attempt_timeout: Duration::from_secs(attempt_secs),
            total_timeout: Duration::from_secs(total_secs),
            language,
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            max_file_size,
            max_text_length,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            imap_host: get("IMAP_HOST").unwrap_or(defaults.imap_host),
            imap_port: parse_or(&get, "IMAP_PORT", defaults.imap_port)?,
            email_user: get("EMAIL_USER"),
            email_pass: get("EMAIL_PASS").map(SecretString::from),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Provider settings, or `None` when no API key is set.
    pub fn llm_config(&self) -> Option<LlmConfig> {
        self.gemini_api_key.as_ref().map(|key| LlmConfig {
            api_key: key.clone(),
            base_url: self.gemini_base_url.clone(),
        })
    }

    /// Engine settings: model override in front of the default ordering.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            candidates: ModelCandidates::with_override(self.gemini_model.as_deref()),
            attempt_timeout: self.attempt_timeout,
            total_timeout: self.total_timeout,
            ..EngineConfig::default()
        }
    }

    /// Mailbox settings for a request, falling back to the configured
    /// defaults for anything the request leaves out.
    pub fn imap_config(
        &self,
        user: Option<&str>,
        password: Option<&str>,
        host: Option<&str>,
    ) -> ImapConfig {
        let user = user
            .map(str::to_string)
            .or_else(|| self.email_user.clone())
            .unwrap_or_default();
        let password = password
            .map(str::to_string)
            .or_else(|| self.email_pass.as_ref().map(|p| p.expose_secret().to_string()))
            .unwrap_or_default();
        let host = host.unwrap_or(&self.imap_host);
        ImapConfig::new(host, user, password).with_port(self.imap_port)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

fn require_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

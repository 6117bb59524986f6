//! Error types for mail-triage.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Mail source errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Connection to {host} failed: {reason}")]
    ConnectFailed { host: String, reason: String },

    #[error("Authentication failed for {user}")]
    AuthFailed { user: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Generation provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Model {model} not available on provider {provider}")]
    ModelNotAvailable { provider: String, model: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Document extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Classification errors.
///
/// Only `CandidateFailure` and `MalformedResponse` are produced per attempt;
/// the engine folds every variant into an `error` classification result.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Generation capability not configured")]
    NotConfigured,

    #[error("Model {model} failed: {source}")]
    CandidateFailure {
        model: String,
        #[source]
        source: LlmError,
    },

    #[error("Model {model} timed out after {timeout:?}")]
    Timeout { model: String, timeout: Duration },

    #[error("Model {model} returned a malformed response: {reason}")]
    MalformedResponse { model: String, reason: String },

    #[error("All candidates exhausted ({tried}). Last error: {last_error}")]
    AllCandidatesExhausted { tried: String, last_error: String },
}

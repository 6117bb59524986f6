//! Shared types for the analysis pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Inbound email ───────────────────────────────────────────────────

/// An email as supplied by a mail source or typed in by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEmail {
    /// Source-native identifier (IMAP sequence number), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub subject: String,
    pub sender: String,
    /// Body in its original language, already capped by the source.
    pub body: String,
    /// `Date` header as sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl RawEmail {
    pub fn new(
        subject: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            subject: subject.into(),
            sender: sender.into(),
            body: body.into(),
            date: None,
        }
    }
}

// ── Preprocessing output ────────────────────────────────────────────

/// The three preprocessing stages of a body, each derived from the one
/// before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedText {
    pub cleaned: String,
    pub filtered: String,
    pub stemmed: String,
}

impl ProcessedText {
    /// The stemmed text split on whitespace.
    pub fn stem_tokens(&self) -> Vec<String> {
        self.stemmed.split_whitespace().map(str::to_string).collect()
    }
}

// ── Classification ──────────────────────────────────────────────────

/// Classification label.
///
/// Serialized in the Portuguese vocabulary the frontend and the model
/// prompt use. `Error` is a pipeline sentinel, not a content label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "produtivo")]
    Productive,
    #[serde(rename = "improdutivo")]
    Unproductive,
    #[serde(rename = "erro")]
    Error,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Productive => "produtivo",
            Self::Unproductive => "improdutivo",
            Self::Error => "erro",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    /// Accepts both the Portuguese and English spellings, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "produtivo" | "productive" => Ok(Self::Productive),
            "improdutivo" | "unproductive" => Ok(Self::Unproductive),
            "erro" | "error" => Ok(Self::Error),
            other => Err(format!("unknown classification label: '{other}'")),
        }
    }
}

/// Outcome of the classification step.
///
/// `classification == Error` exactly when no candidate produced a usable
/// answer. In that case `suggested_response` holds the same diagnostic
/// narrative as `diagnostic`, not a reply draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub suggested_response: Option<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ClassificationResult {
    /// An `Error` result carrying `diagnostic` in both diagnostic fields.
    pub fn error(diagnostic: impl Into<String>, reasoning: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        Self {
            classification: Classification::Error,
            suggested_response: Some(diagnostic.clone()),
            reasoning: reasoning.into(),
            model_used: None,
            diagnostic: Some(diagnostic),
        }
    }

    pub fn is_error(&self) -> bool {
        self.classification == Classification::Error
    }
}

// ── Pipeline output ─────────────────────────────────────────────────

/// Full output of one `analyze` call. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub original_text: String,
    pub cleaned_text: String,
    pub filtered_text: String,
    pub stemmed_text: String,
    pub stem_tokens: Vec<String>,
    pub classification: ClassificationResult,
}

impl AnalysisRecord {
    pub fn new(
        original_text: impl Into<String>,
        processed: ProcessedText,
        classification: ClassificationResult,
    ) -> Self {
        let stem_tokens = processed.stem_tokens();
        Self {
            original_text: original_text.into(),
            cleaned_text: processed.cleaned,
            filtered_text: processed.filtered,
            stemmed_text: processed.stemmed,
            stem_tokens,
            classification,
        }
    }
}

/// Who and what an analysis is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisMetadata {
    pub subject: String,
    pub sender: String,
    pub owner: String,
}

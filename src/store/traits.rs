//! `AnalysisStore` trait — async persistence for finished analyses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DatabaseError;
use crate::pipeline::types::{AnalysisMetadata, AnalysisRecord, Classification};

/// A persisted analysis, as returned by history queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredAnalysis {
    pub id: String,
    /// Mailbox the analysis was run for.
    #[serde(rename = "analyzed_by")]
    pub owner: String,
    pub subject: String,
    pub sender: String,
    pub original_text: String,
    pub classification: Classification,
    pub suggested_response: Option<String>,
    pub reasoning: String,
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    pub cleaned_text: String,
    pub filtered_text: String,
    pub stemmed_text: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic store for analysis history.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persist one analysis. Returns the new record's ID.
    async fn save(
        &self,
        record: &AnalysisRecord,
        metadata: &AnalysisMetadata,
    ) -> Result<String, DatabaseError>;

    /// Analyses for `owner`, newest first, at most `limit`.
    async fn list(&self, owner: &str, limit: usize) -> Result<Vec<StoredAnalysis>, DatabaseError>;

    /// Delete one analysis. `NotFound` when no row matched.
    async fn delete(&self, id: &str) -> Result<(), DatabaseError>;
}

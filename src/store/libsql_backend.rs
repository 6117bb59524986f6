//! libSQL backend — async `AnalysisStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::pipeline::types::{AnalysisMetadata, AnalysisRecord, Classification};
use crate::store::migrations;
use crate::store::traits::{AnalysisStore, StoredAnalysis};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Map a libsql Row to a StoredAnalysis.
fn row_to_analysis(row: &libsql::Row) -> Result<StoredAnalysis, libsql::Error> {
    let label: String = row.get(5)?;
    let created_str: String = row.get(13)?;

    // Labels are written by `save`; anything else means a hand-edited row.
    let classification = label.parse().unwrap_or_else(|e: String| {
        warn!(label = %label, "Unreadable stored classification: {e}");
        Classification::Error
    });

    Ok(StoredAnalysis {
        id: row.get(0)?,
        owner: row.get(1)?,
        subject: row.get(2)?,
        sender: row.get(3)?,
        original_text: row.get(4)?,
        classification,
        suggested_response: row.get(6).ok(),
        reasoning: row.get(7)?,
        model_used: row.get(8).ok(),
        diagnostic: row.get(9).ok(),
        cleaned_text: row.get(10)?,
        filtered_text: row.get(11)?,
        stemmed_text: row.get(12)?,
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const ANALYSIS_COLUMNS: &str = "id, owner, subject, sender, original_text, classification, suggested_response, reasoning, model_used, diagnostic, cleaned_text, filtered_text, stemmed_text, created_at";

#[async_trait]
impl AnalysisStore for LibSqlBackend {
    async fn save(
        &self,
        record: &AnalysisRecord,
        metadata: &AnalysisMetadata,
    ) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let result = &record.classification;
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                &format!(
                    "INSERT INTO analyses ({ANALYSIS_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                params![
                    id.clone(),
                    metadata.owner.clone(),
                    metadata.subject.clone(),
                    metadata.sender.clone(),
                    record.original_text.clone(),
                    result.classification.as_str(),
                    opt_text(result.suggested_response.as_deref()),
                    result.reasoning.clone(),
                    opt_text(result.model_used.as_deref()),
                    opt_text(result.diagnostic.as_deref()),
                    record.cleaned_text.clone(),
                    record.filtered_text.clone(),
                    record.stemmed_text.clone(),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_analysis: {e}")))?;

        debug!(id = %id, owner = %metadata.owner, "Analysis saved");
        Ok(id)
    }

    async fn list(&self, owner: &str, limit: usize) -> Result<Vec<StoredAnalysis>, DatabaseError> {
        // rowid breaks ties between saves within the same timestamp
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE owner = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
                ),
                params![owner, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_analyses: {e}")))?;

        let mut analyses = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_analyses row: {e}")))?
        {
            match row_to_analysis(&row) {
                Ok(analysis) => analyses.push(analysis),
                Err(e) => {
                    warn!("Skipping analysis row: {e}");
                }
            }
        }
        Ok(analyses)
    }

    async fn delete(&self, id: &str) -> Result<(), DatabaseError> {
        let count = self
            .conn()
            .execute("DELETE FROM analyses WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_analysis: {e}")))?;

        if count == 0 {
            return Err(DatabaseError::NotFound {
                entity: "analysis".into(),
                id: id.to_string(),
            });
        }
        debug!(id = %id, "Analysis deleted");
        Ok(())
    }
}

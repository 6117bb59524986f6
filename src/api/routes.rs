//! REST endpoints.

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use super::AppState;
use crate::channels::email_types::cap_chars;
use crate::error::DatabaseError;
use crate::extract::extractor_for;
use crate::pipeline::types::{AnalysisMetadata, AnalysisRecord, ClassificationResult, RawEmail};

/// Default number of emails fetched per request.
const DEFAULT_FETCH_LIMIT: usize = 10;

/// Default number of history entries returned.
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the Axum router with every endpoint, permissive CORS and request
/// tracing.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/api/process", post(process_email))
        .route(
            "/api/process-file",
            post(process_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/fetch-emails", get(fetch_emails))
        .route("/api/history", get(get_history))
        .route("/api/history/{id}", delete(delete_history_item))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

// ── Health ──────────────────────────────────────────────────────────────

async fn home() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Mail Triage - NLP API" }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ── Analysis ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProcessRequest {
    text: Option<String>,
    subject: Option<String>,
    sender: Option<String>,
    email_user: Option<String>,
}

/// Every pipeline stage plus the classification, under the names the
/// frontend reads.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub original_text: String,
    pub cleaned_text: String,
    pub text_no_stopwords: String,
    pub stemmed_text: String,
    pub stems: Vec<String>,
    pub gemini_analysis: ClassificationResult,
}

impl From<AnalysisRecord> for ProcessResponse {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            original_text: record.original_text,
            cleaned_text: record.cleaned_text,
            text_no_stopwords: record.filtered_text,
            stemmed_text: record.stemmed_text,
            stems: record.stem_tokens,
            gemini_analysis: record.classification,
        }
    }
}

/// POST /api/process
///
/// Analyzes the text and stores the result for the owning mailbox. A failed
/// save is logged; the analysis is still returned.
async fn process_email(
    State(state): State<AppState>,
    body: Result<Json<ProcessRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(e) => {
            debug!("Rejected process request body: {e}");
            return error_response(StatusCode::BAD_REQUEST, "No text provided");
        }
    };
    let Some(text) = request.text else {
        return error_response(StatusCode::BAD_REQUEST, "No text provided");
    };
    let Some(owner) = request
        .email_user
        .filter(|u| !u.trim().is_empty())
        .or_else(|| state.config.email_user.clone())
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "User not identified. Configure your email.",
        );
    };

    let text = if text.chars().count() > state.config.max_text_length {
        warn!(
            max_chars = state.config.max_text_length,
            "Input text truncated before analysis"
        );
        cap_chars(&text, state.config.max_text_length)
    } else {
        text
    };

    let record = state.pipeline.analyze(&text, &state.config.language).await;

    let metadata = AnalysisMetadata {
        subject: request.subject.unwrap_or_else(|| "Manual Input".to_string()),
        sender: request.sender.unwrap_or_else(|| "User".to_string()),
        owner,
    };
    match state.store.save(&record, &metadata).await {
        Ok(id) => debug!(id = %id, "Analysis stored"),
        Err(e) => error!(owner = %metadata.owner, "Failed to store analysis: {e}"),
    }

    Json(ProcessResponse::from(record)).into_response()
}

// ── Documents ───────────────────────────────────────────────────────────

/// POST /api/process-file
///
/// Extracts text from an uploaded document (multipart field `file`).
async fn process_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };

    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => return error_response(StatusCode::BAD_REQUEST, "No file provided"),
            Err(e) => return error_response(e.status(), e.body_text()),
        }
    };

    let filename = field.file_name().unwrap_or_default().to_string();
    if filename.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No file selected");
    }
    if extractor_for(&state.extractors, &filename).is_err() {
        return error_response(StatusCode::BAD_REQUEST, "Unsupported file format");
    }

    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(e.status(), e.body_text()),
    };
    if bytes.len() > state.config.max_file_size {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "File too large");
    }

    let extractors = state.extractors.clone();
    let name = filename.clone();
    let extracted = tokio::task::spawn_blocking(move || {
        extractor_for(&extractors, &name).and_then(|extractor| extractor.extract_text(&bytes))
    })
    .await;

    match extracted {
        Ok(Ok(text)) => {
            info!(file = %filename, chars = text.chars().count(), "Document text extracted");
            Json(serde_json::json!({ "text": text })).into_response()
        }
        Ok(Err(e)) => {
            warn!(file = %filename, "Document extraction failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("Extraction task panicked: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Extraction failed")
        }
    }
}

// ── Mailbox ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FetchQuery {
    email_user: Option<String>,
    email_pass: Option<String>,
    imap_host: Option<String>,
    limit: Option<usize>,
}

/// One fetched email as the frontend lists it.
#[derive(Debug, Serialize)]
pub struct EmailSummary {
    pub id: Option<String>,
    pub subject: String,
    pub sender: String,
    pub text: String,
    pub date: Option<String>,
}

impl From<RawEmail> for EmailSummary {
    fn from(email: RawEmail) -> Self {
        Self {
            id: email.id,
            subject: email.subject,
            sender: email.sender,
            text: email.body,
            date: email.date,
        }
    }
}

/// GET /api/fetch-emails
///
/// Reads the newest emails of the mailbox named in the query.
async fn fetch_emails(State(state): State<AppState>, Query(query): Query<FetchQuery>) -> Response {
    let user = query.email_user.filter(|u| !u.trim().is_empty());
    let pass = query.email_pass.filter(|p| !p.is_empty());
    let (Some(user), Some(pass)) = (user, pass) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Email settings not found. Configure your email and app password.",
        );
    };

    let host = query.imap_host.filter(|h| !h.trim().is_empty());
    let imap = state
        .config
        .imap_config(Some(user.as_str()), Some(pass.as_str()), host.as_deref());
    let source = state.mail_sources.open(imap);

    match source
        .fetch_latest(query.limit.unwrap_or(DEFAULT_FETCH_LIMIT))
        .await
    {
        Ok(emails) => {
            let summaries: Vec<EmailSummary> = emails.into_iter().map(EmailSummary::from).collect();
            Json(summaries).into_response()
        }
        Err(e) => {
            warn!(user = %user, "Email fetch failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ── History ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    email_user: Option<String>,
    limit: Option<usize>,
}

/// GET /api/history
///
/// Stored analyses for the mailbox, newest first. No mailbox, no history.
async fn get_history(State(state): State<AppState>, Query(query): Query<HistoryQuery>) -> Response {
    let Some(owner) = query
        .email_user
        .filter(|u| !u.trim().is_empty())
        .or_else(|| state.config.email_user.clone())
    else {
        return Json(serde_json::json!([])).into_response();
    };

    match state
        .store
        .list(&owner, query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await
    {
        Ok(analyses) => Json(analyses).into_response(),
        Err(e) => {
            error!(owner = %owner, "Failed to load history: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// DELETE /api/history/{id}
async fn delete_history_item(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.delete(&id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Item deleted successfully" })),
        )
            .into_response(),
        Err(DatabaseError::NotFound { .. }) => {
            error_response(StatusCode::NOT_FOUND, "Item not found")
        }
        Err(e) => {
            error!(id = %id, "Failed to delete analysis: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete item")
        }
    }
}

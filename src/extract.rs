//! Document text extraction for uploaded files.

use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::error::ExtractError;

/// Turns an uploaded document into plain text.
pub trait DocumentExtractor: Send + Sync {
    /// Whether a file with this name is handled.
    fn supports(&self, filename: &str) -> bool;

    /// Extract the document's text. Blocking; callers on the runtime
    /// should go through `spawn_blocking`.
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// PDF extraction via `pdf-extract`. Pages are separated by newlines.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn supports(&self, filename: &str) -> bool {
        filename.to_ascii_lowercase().ends_with(".pdf")
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::Pdf("empty document".into()));
        }

        // pdf-extract panics on some malformed inputs.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));

        let text = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(ExtractError::Pdf(e.to_string())),
            Err(_) => return Err(ExtractError::Pdf("malformed PDF".into())),
        };

        debug!(bytes = bytes.len(), chars = text.chars().count(), "PDF text extracted");
        Ok(text)
    }
}

/// Pick the extractor for `filename`, if any.
pub fn extractor_for<'a>(
    extractors: &'a [Box<dyn DocumentExtractor>],
    filename: &str,
) -> Result<&'a dyn DocumentExtractor, ExtractError> {
    extractors
        .iter()
        .find(|e| e.supports(filename))
        .map(|e| e.as_ref())
        .ok_or_else(|| ExtractError::UnsupportedFormat(filename.to_string()))
}

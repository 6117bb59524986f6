//! HTTP API — thin axum glue around the analysis pipeline, the analysis
//! store, document extraction and mail sources.

pub mod routes;

pub use routes::router;

use std::sync::Arc;

use crate::channels::{ImapSourceFactory, MailSourceFactory};
use crate::config::ServiceConfig;
use crate::extract::{DocumentExtractor, PdfExtractor};
use crate::pipeline::AnalysisPipeline;
use crate::store::AnalysisStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub store: Arc<dyn AnalysisStore>,
    pub extractors: Arc<Vec<Box<dyn DocumentExtractor>>>,
    pub mail_sources: Arc<dyn MailSourceFactory>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// PDF extraction and IMAP mail sources.
    pub fn new(
        pipeline: Arc<AnalysisPipeline>,
        store: Arc<dyn AnalysisStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            pipeline,
            store,
            extractors: Arc::new(vec![Box::new(PdfExtractor)]),
            mail_sources: Arc::new(ImapSourceFactory),
            config: Arc::new(config),
        }
    }

    pub fn with_mail_sources(mut self, mail_sources: Arc<dyn MailSourceFactory>) -> Self {
        self.mail_sources = mail_sources;
        self
    }
}

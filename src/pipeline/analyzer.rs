//! Analysis pipeline — normalize → filter → stem → classify.
//!
//! Preprocessing is total, so `analyze` always returns a full record. A
//! failed classification shows up inside the record, never as an `Err`.

use tracing::{debug, info};

use crate::nlp::{LanguageTag, Stemmer, TextNormalizer, TokenFilter};
use crate::pipeline::classifier::ClassificationEngine;
use crate::pipeline::types::{AnalysisRecord, ClassificationResult, ProcessedText};

/// Which optional preprocessing stages to run.
#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    pub remove_stopwords: bool,
    pub apply_stemming: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            remove_stopwords: true,
            apply_stemming: true,
        }
    }
}

/// Composes the preprocessing stages with the classification engine.
///
/// Every component is read-only after construction; share the pipeline
/// behind an `Arc` across requests.
pub struct AnalysisPipeline {
    normalizer: TextNormalizer,
    filter: TokenFilter,
    stemmer: Stemmer,
    engine: ClassificationEngine,
}

impl AnalysisPipeline {
    pub fn new(
        normalizer: TextNormalizer,
        filter: TokenFilter,
        stemmer: Stemmer,
        engine: ClassificationEngine,
    ) -> Self {
        Self {
            normalizer,
            filter,
            stemmer,
            engine,
        }
    }

    /// Default preprocessing stages around `engine`.
    pub fn with_engine(engine: ClassificationEngine) -> Self {
        Self::new(
            TextNormalizer::new(),
            TokenFilter::new(),
            Stemmer::new(),
            engine,
        )
    }

    /// Run all three preprocessing stages, each on the previous one's output.
    pub fn process_text(&self, raw_text: &str, language: &LanguageTag) -> ProcessedText {
        let cleaned = self.normalizer.normalize(raw_text);
        let filtered = self.filter.filter_stopwords(&cleaned, language);
        let stemmed = self.stemmer.stem(&filtered, language);
        ProcessedText {
            cleaned,
            filtered,
            stemmed,
        }
    }

    /// Normalize, then optionally filter and stem, returning only the final text.
    pub fn preprocess(&self, text: &str, language: &LanguageTag, options: PreprocessOptions) -> String {
        let mut out = self.normalizer.normalize(text);
        if options.remove_stopwords {
            out = self.filter.filter_stopwords(&out, language);
        }
        if options.apply_stemming {
            out = self.stemmer.stem(&out, language);
        }
        out
    }

    /// Classify already-processed text against its original.
    pub async fn classify(&self, processed_text: &str, original_text: &str) -> ClassificationResult {
        self.engine.classify(processed_text, original_text).await
    }

    /// Full pipeline over one email body.
    ///
    /// The classifier sees the stemmed text and the untouched original, never
    /// the intermediate stages on their own.
    pub async fn analyze(&self, raw_text: &str, language: &LanguageTag) -> AnalysisRecord {
        let processed = self.process_text(raw_text, language);
        debug!(
            language = %language,
            cleaned_chars = processed.cleaned.len(),
            stemmed_chars = processed.stemmed.len(),
            "Preprocessing complete"
        );

        let result = self.engine.classify(&processed.stemmed, raw_text).await;
        info!(
            classification = %result.classification,
            model = result.model_used.as_deref().unwrap_or("none"),
            "Analysis complete"
        );

        AnalysisRecord::new(raw_text, processed, result)
    }
}

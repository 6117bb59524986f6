//! Email analysis pipeline.
//!
//! Every analyzed email flows through:
//! 1. `TextNormalizer::normalize()` — lowercase, strip accents/URLs/addresses
//! 2. `TokenFilter::filter_stopwords()` — drop stop-words
//! 3. `Stemmer::stem()` — reduce tokens to roots
//! 4. `ClassificationEngine::classify()` — model verdict with fallback
//!
//! Mail sources, document extraction and persistence sit around the
//! pipeline, never inside it.

pub mod analyzer;
pub mod candidates;
pub mod classifier;
pub mod types;

pub use analyzer::{AnalysisPipeline, PreprocessOptions};
pub use candidates::ModelCandidates;
pub use classifier::{ClassificationEngine, EngineConfig};
pub use types::{
    AnalysisMetadata, AnalysisRecord, Classification, ClassificationResult, ProcessedText,
    RawEmail,
};

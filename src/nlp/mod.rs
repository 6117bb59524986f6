//! Deterministic text preprocessing: normalize → filter stop-words → stem.
//!
//! Each stage is a total function over strings. Later stages only ever see
//! the output of the stage before them.

pub mod language;
pub mod normalizer;
pub mod stemmer;
pub mod stopwords;
pub mod tokenize;

pub use language::LanguageTag;
pub use normalizer::TextNormalizer;
pub use stemmer::{SnowballStemmer, StemAlgorithm, Stemmer};
pub use stopwords::TokenFilter;
pub use tokenize::tokenize;

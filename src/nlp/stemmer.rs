//! Stemmer — the third preprocessing stage.

use std::borrow::Cow;
use std::collections::HashMap;

use rust_stemmers::Algorithm;

use crate::nlp::language::LanguageTag;
use crate::nlp::tokenize::tokenize;

/// A per-language stemming algorithm.
///
/// Implementations must be total: unknown words and punctuation come back
/// unchanged rather than failing.
pub trait StemAlgorithm: Send + Sync {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str>;
}

/// Snowball stemmer from `rust-stemmers`.
pub struct SnowballStemmer(rust_stemmers::Stemmer);

impl SnowballStemmer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self(rust_stemmers::Stemmer::create(algorithm))
    }
}

impl StemAlgorithm for SnowballStemmer {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str> {
        self.0.stem(token)
    }
}

/// Reduces tokens to their root form, one algorithm per language.
///
/// Languages without an algorithm pass tokens through unchanged.
pub struct Stemmer {
    algorithms: HashMap<LanguageTag, Box<dyn StemAlgorithm>>,
}

impl Default for Stemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Stemmer {
    /// Snowball algorithms for Portuguese, English and Spanish.
    pub fn new() -> Self {
        Self::empty()
            .with_algorithm(
                LanguageTag::Portuguese,
                Box::new(SnowballStemmer::new(Algorithm::Portuguese)),
            )
            .with_algorithm(
                LanguageTag::English,
                Box::new(SnowballStemmer::new(Algorithm::English)),
            )
            .with_algorithm(
                LanguageTag::Spanish,
                Box::new(SnowballStemmer::new(Algorithm::Spanish)),
            )
    }

    pub fn empty() -> Self {
        Self {
            algorithms: HashMap::new(),
        }
    }

    /// Plug in (or replace) the algorithm for `language`.
    pub fn with_algorithm(mut self, language: LanguageTag, algorithm: Box<dyn StemAlgorithm>) -> Self {
        self.algorithms.insert(language, algorithm);
        self
    }

    /// Stem every token of `text` and rejoin with single spaces.
    pub fn stem(&self, text: &str, language: &LanguageTag) -> String {
        let tokens = tokenize(text);
        match self.algorithms.get(language) {
            Some(algorithm) => tokens
                .into_iter()
                .map(|token| algorithm.stem(token))
                .collect::<Vec<_>>()
                .join(" "),
            None => tokens.join(" "),
        }
    }
}

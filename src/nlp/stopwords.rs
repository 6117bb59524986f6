//! Stop-word filter — the second preprocessing stage.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::nlp::language::LanguageTag;
use crate::nlp::normalizer::strip_diacritics;
use crate::nlp::tokenize::tokenize;

const PORTUGUESE: &str = include_str!("data/portuguese.txt");
const ENGLISH: &str = include_str!("data/english.txt");
const SPANISH: &str = include_str!("data/spanish.txt");

/// Used when no list is configured for the requested language.
const FALLBACK_STOPWORDS: &[&str] = &[
    "a", "o", "e", "do", "da", "em", "um", "uma", "com", "no", "na", "por", "os", "as", "dos",
    "das", "ou", "para", "é", "são", "foi", "era", "eram", "este", "esta", "estes", "estas", "de",
    "que",
];

/// Removes high-frequency, low-information tokens.
///
/// Stop-word sets are built once in the constructor and only read afterwards,
/// so a single filter can be shared across concurrent requests.
pub struct TokenFilter {
    sets: HashMap<LanguageTag, HashSet<String>>,
    fallback: HashSet<String>,
}

impl Default for TokenFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenFilter {
    /// Filter with the embedded Portuguese, English and Spanish lists.
    pub fn new() -> Self {
        Self::empty()
            .with_stopwords(LanguageTag::Portuguese, PORTUGUESE.lines())
            .with_stopwords(LanguageTag::English, ENGLISH.lines())
            .with_stopwords(LanguageTag::Spanish, SPANISH.lines())
    }

    /// Filter with no language lists; every language uses the fallback set.
    pub fn empty() -> Self {
        Self {
            sets: HashMap::new(),
            fallback: build_set(FALLBACK_STOPWORDS.iter().copied()),
        }
    }

    /// Configure (or replace) the stop-word list for `language`.
    pub fn with_stopwords<'a>(
        mut self,
        language: LanguageTag,
        words: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.sets.insert(language, build_set(words));
        self
    }

    /// Whether a dedicated list exists for `language`.
    pub fn has_language(&self, language: &LanguageTag) -> bool {
        self.sets.contains_key(language)
    }

    /// The stop-word set used for `language`.
    pub fn stopwords(&self, language: &LanguageTag) -> &HashSet<String> {
        match self.sets.get(language) {
            Some(set) => set,
            None => {
                debug!(language = %language, "No stop-word list, using fallback set");
                &self.fallback
            }
        }
    }

    /// Drop stop-words from `text`, keeping the remaining tokens in order.
    ///
    /// Punctuation tokens are ordinary tokens here: they survive unless listed,
    /// and are rejoined with single spaces like any word.
    pub fn filter_stopwords(&self, text: &str, language: &LanguageTag) -> String {
        let stopwords = self.stopwords(language);
        tokenize(text)
            .into_iter()
            .filter(|token| !stopwords.contains(&token.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Lowercase every word and also register its accent-free spelling, since
/// the filter runs on normalized text.
fn build_set<'a>(words: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    let mut set = HashSet::new();
    for word in words {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            continue;
        }
        set.insert(strip_diacritics(&word));
        set.insert(word);
    }
    set
}

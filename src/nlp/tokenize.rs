//! Word-boundary tokenizer shared by the stop-word filter and the stemmer.

use unicode_segmentation::UnicodeSegmentation;

/// Split `text` on Unicode word boundaries (UAX #29).
///
/// Whitespace runs are dropped; punctuation comes out as its own token, so
/// `"ola, mundo."` yields `["ola", ",", "mundo", "."]`.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_word_bounds()
        .filter(|segment| !segment.chars().all(char::is_whitespace))
        .collect()
}

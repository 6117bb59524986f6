//! Text normalization — the first preprocessing stage.
//!
//! Steps run in a fixed order:
//! 1. lowercase
//! 2. strip diacritics (NFKD, drop combining marks), then lowercase again
//!    since compatibility decomposition can yield capitals (`ℌ` → `H`)
//! 3. remove `http://` / `https://` URLs
//! 4. remove email-address-shaped tokens
//! 5. replace anything but letters, digits, whitespace and `.,!?;:` with a space
//! 6. collapse whitespace and trim
//!
//! URL and email removal must see the text before step 5, which would
//! otherwise break `://` and `@` apart into harmless-looking words.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Punctuation that survives normalization.
const KEPT_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Lowercases and strips noise (accents, URLs, addresses, symbols) from text.
///
/// Pure and total: every input maps to a (possibly empty) string, and
/// already-normalized text is a fixed point.
pub struct TextNormalizer {
    url_regex: Regex,
    email_regex: Regex,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            url_regex: Regex::new(r"https?://\S+").expect("Invalid URL regex"),
            email_regex: Regex::new(r"\S+@\S+").expect("Invalid email regex"),
        }
    }

    /// Run all six normalization steps over `text`.
    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let unaccented = strip_diacritics(&lowered).to_lowercase();
        let no_urls = self.url_regex.replace_all(&unaccented, "");
        let no_emails = self.email_regex.replace_all(&no_urls, "");
        let symbols_blanked = blank_symbols(&no_emails);
        collapse_whitespace(&symbols_blanked)
    }
}

/// Decompose to base characters and drop the combining marks.
pub(crate) fn strip_diacritics(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

fn blank_symbols(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || KEPT_PUNCTUATION.contains(&c) {
                c
            } else {
                ' '
            }
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

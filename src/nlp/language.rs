//! Language tags accepted by the preprocessing stages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language of the text being preprocessed.
///
/// Parsing never fails: unrecognised names become `Other` so the stop-word
/// filter and stemmer can fall back instead of rejecting the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTag {
    #[default]
    Portuguese,
    English,
    Spanish,
    #[serde(untagged)]
    Other(String),
}

impl LanguageTag {
    /// Full lowercase language name (`"portuguese"`, `"english"`, ...).
    pub fn name(&self) -> &str {
        match self {
            Self::Portuguese => "portuguese",
            Self::English => "english",
            Self::Spanish => "spanish",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for LanguageTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Ok(match lower.as_str() {
            "portuguese" | "pt" | "pt-br" | "pt_br" => Self::Portuguese,
            "english" | "en" => Self::English,
            "spanish" | "es" => Self::Spanish,
            _ => Self::Other(lower),
        })
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Ordered list of generation models to try.

/// Default fallback order, most capable first.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-3-pro-preview",
    "gemini-3-flash-preview",
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-1.5-pro",
    "gemini-1.5-flash",
];

/// Model identifiers in preference order, without duplicates.
///
/// Built once per engine; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelCandidates(Vec<String>);

impl ModelCandidates {
    /// Override first (if any), then the default order with the override's
    /// duplicate dropped.
    pub fn build(override_model: Option<&str>, defaults: &[&str]) -> Self {
        let mut models: Vec<String> = Vec::with_capacity(defaults.len() + 1);
        let override_model = override_model.map(str::trim).filter(|m| !m.is_empty());
        for model in override_model.into_iter().chain(defaults.iter().copied()) {
            if !models.iter().any(|m| m == model) {
                models.push(model.to_string());
            }
        }
        Self(models)
    }

    /// The built-in ordering with an optional override in front.
    pub fn with_override(override_model: Option<&str>) -> Self {
        Self::build(override_model, DEFAULT_MODELS)
    }

    /// Use exactly these models, in order (duplicates dropped).
    pub fn from_list<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for model in models {
            let model = model.into();
            if !out.contains(&model) {
                out.push(model);
            }
        }
        Self(out)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

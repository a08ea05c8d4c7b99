use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A selectable language. Two languages are equal when their codes match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Language {
    pub value: String,
    pub label: String,
}

impl Language {
    pub fn new<V: Into<String>, L: Into<String>>(value: V, label: L) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Looks `code` up in the supported set.
    pub fn from_code(code: &str) -> Result<Self, ConfigError> {
        supported_languages()
            .into_iter()
            .find(|l| l.value == code)
            .ok_or_else(|| ConfigError::UnknownLanguage(code.to_owned()))
    }

    pub fn code(&self) -> &str {
        &self.value
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Language {}

impl Hash for Language {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

const LANGUAGES: [(&str, &str); 2] = [("es", "Español"), ("en", "English")];

pub fn supported_languages() -> Vec<Language> {
    LANGUAGES
        .iter()
        .map(|(value, label)| Language::new(*value, *label))
        .collect()
}

/// One recorded translation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationEntry {
    pub id: String,
    pub original_text: String,
    pub translated_text: String,
    pub source_lang: Language,
    pub target_lang: Language,
    /// Epoch millis.
    pub timestamp: u64,
}

impl TranslationEntry {
    pub fn matches(&self, text: &str, source_code: &str, target_code: &str) -> bool {
        self.original_text == text
            && self.source_lang.value == source_code
            && self.target_lang.value == target_code
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

mod mymemory;

use futures::future::BoxFuture;

pub use mymemory::{build_request_url, parse_response, MyMemoryTranslator};

/// Shown in place of a translation whenever a call fails, whatever the cause.
pub const TRANSLATION_ERROR_MESSAGE: &str = "Error de traducción. Por favor, intente nuevamente.";

#[derive(thiserror::Error, Debug)]
pub enum TranslateError {
    #[error("provider rejected translation: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub trait Translator: Send + Sync {
    /// Issues exactly one request for `text` from `source` to `target` (language codes).
    fn translate(
        &self,
        text: String,
        source: String,
        target: String,
    ) -> BoxFuture<'_, Result<String, TranslateError>>;
}

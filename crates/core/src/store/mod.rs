mod file;
mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use file::FileStore;
pub use memory::MemoryStore;

pub const HISTORY_KEY: &str = "translationHistory";
pub const THEME_KEY: &str = "theme";

const LOG_TARGET: &str = "store";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no data directory available")]
    NoDataDir,
}

/// String-keyed persistent storage. Values are opaque serialized strings.
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Reads `key` as JSON, falling back to `default` when it is missing or unusable.
pub fn get_or<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, default: T) -> T {
    let raw = match store.get_raw(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return default,
        Err(e) => {
            tracing::warn!(target: LOG_TARGET, key, error = %e, "failed to read stored value");
            return default;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(target: LOG_TARGET, key, error = %e, "stored value is malformed, using default");
            default
        }
    }
}

pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.set_raw(key, raw)
}

use crate::store::{KeyValueStore, StoreError, LOG_TARGET};
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const FILE_NAME: &str = "storage.json";

/// Key-value store kept as a single JSON object on disk.
///
/// Every value is stored as its serialized string, so callers own the encoding
/// of their types. The whole file is rewritten on each `set_raw`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(FILE_NAME);
        tracing::debug!(target: LOG_TARGET, path = %path.display(), "opened file store");
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Opens the store under the platform data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        let dirs = ProjectDirs::from("net", "live-translator", "live-translator")
            .ok_or(StoreError::NoDataDir)?;
        Self::open(dirs.data_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(data) if data.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut values = match self.read_all() {
            Ok(values) => values,
            Err(StoreError::Serde(e)) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "storage file is corrupt, starting over");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_owned(), value);

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

use crate::model::TranslationEntry;
use crate::store::{self, KeyValueStore, StoreError, HISTORY_KEY};
use std::sync::Arc;

pub const HISTORY_CAP: usize = 10;

const LOG_TARGET: &str = "history";

/// Newest-first list of past translations, capped at [`HISTORY_CAP`].
///
/// Every mutation writes the whole list back to the store.
pub struct History {
    entries: Vec<TranslationEntry>,
    store: Arc<dyn KeyValueStore>,
}

impl History {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let mut entries: Vec<TranslationEntry> = store::get_or(store.as_ref(), HISTORY_KEY, Vec::new());
        if entries.len() > HISTORY_CAP {
            tracing::warn!(
                target: LOG_TARGET,
                stored = entries.len(),
                cap = HISTORY_CAP,
                "stored history exceeds cap, truncating"
            );
            entries.truncate(HISTORY_CAP);
        }
        tracing::debug!(target: LOG_TARGET, len = entries.len(), "history loaded");
        Self { entries, store }
    }

    pub fn entries(&self) -> &[TranslationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TranslationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, text: &str, source_code: &str, target_code: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.matches(text, source_code, target_code))
    }

    pub fn insert(&mut self, entry: TranslationEntry) -> Result<(), StoreError> {
        tracing::debug!(target: LOG_TARGET, id = %entry.id, "recording translation");
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAP);
        self.persist()
    }

    /// Returns whether an entry was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<(), StoreError> {
        store::set_json(self.store.as_ref(), HISTORY_KEY, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Language;
    use crate::store::MemoryStore;

    fn entry(id: &str, text: &str) -> TranslationEntry {
        TranslationEntry {
            id: id.into(),
            original_text: text.into(),
            translated_text: format!("{text}-en"),
            source_lang: Language::new("es", "Español"),
            target_lang: Language::new("en", "English"),
            timestamp: 0,
        }
    }

    fn stored(store: &MemoryStore) -> Vec<TranslationEntry> {
        store::get_or(store, HISTORY_KEY, Vec::new())
    }

    #[test]
    fn insert_prepends_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut history = History::load(store.clone());
        assert!(history.is_empty());

        history.insert(entry("1", "uno")).expect("persist");
        history.insert(entry("2", "dos")).expect("persist");

        let ids: Vec<_> = history.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["2", "1"]);
        assert_eq!(stored(&store), history.entries());
    }

    #[test]
    fn eleventh_insert_evicts_oldest() {
        let store = Arc::new(MemoryStore::new());
        let mut history = History::load(store.clone());
        for i in 0..=HISTORY_CAP {
            history.insert(entry(&i.to_string(), &format!("t{i}"))).expect("persist");
        }
        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history.entries()[0].id, "10");
        assert!(history.get("0").is_none());
        assert_eq!(stored(&store).len(), HISTORY_CAP);
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let store = Arc::new(MemoryStore::new());
        let mut history = History::load(store.clone());
        for id in ["a", "b", "c"] {
            history.insert(entry(id, id)).expect("persist");
        }
        assert!(history.remove("b").expect("persist"));
        let ids: Vec<_> = history.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["c", "a"]);
        assert_eq!(stored(&store).len(), 2);

        assert!(!history.remove("missing").expect("no-op"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn contains_checks_text_and_language_pair() {
        let store = Arc::new(MemoryStore::new());
        let mut history = History::load(store);
        history.insert(entry("1", "hola")).expect("persist");
        assert!(history.contains("hola", "es", "en"));
        assert!(!history.contains("hola", "en", "es"));
        assert!(!history.contains("adios", "es", "en"));
    }

    #[test]
    fn load_truncates_oversized_history() {
        let store = Arc::new(MemoryStore::new());
        let seeded: Vec<_> = (0..15).map(|i| entry(&i.to_string(), "x")).collect();
        store::set_json(&*store, HISTORY_KEY, &seeded).expect("seed");

        let history = History::load(store);
        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history.entries()[0].id, "0");
    }

    #[test]
    fn load_ignores_malformed_history() {
        let store = Arc::new(MemoryStore::new());
        store.set_raw(HISTORY_KEY, "{\"oops\":1}".into()).expect("seed");
        let history = History::load(store);
        assert!(history.is_empty());
    }
}

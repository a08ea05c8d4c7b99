use crate::config::TimingConfig;
use crate::coordinator::timer::DebounceTimer;
use crate::history::History;
use crate::model::{Language, Theme, TranslationEntry};
use crate::store::{self, KeyValueStore, THEME_KEY};
use crate::translate::{TranslateError, TRANSLATION_ERROR_MESSAGE};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

const LOG_TARGET: &str = "coordinator";

/// User intents emitted by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    InputChanged(String),
    SourceChanged(Language),
    TargetChanged(Language),
    SwapLanguages,
    SelectHistory(String),
    DeleteHistory(String),
    ToggleTheme,
}

/// A translation call the driver must issue. `seq` ties the response back to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslateRequest {
    pub seq: u64,
    pub text: String,
    pub source: Language,
    pub target: Language,
}

/// Everything the presentation layer renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub input_text: String,
    pub source: Language,
    pub target: Language,
    pub translation: String,
    pub loading: bool,
    pub is_typing: bool,
    pub theme: Theme,
    pub history: Vec<TranslationEntry>,
}

/// The fields whose change re-arms the settle timer.
#[derive(PartialEq, Eq)]
struct SettleKey {
    input_text: String,
    source: String,
    target: String,
    is_typing: bool,
}

/// Debounce/typing state machine. Time is passed in; nothing here sleeps.
pub struct Session {
    input_text: String,
    source: Language,
    target: Language,
    translation: String,
    is_typing: bool,
    theme: Theme,
    history: History,
    store: Arc<dyn KeyValueStore>,
    settle: DebounceTimer,
    typing: DebounceTimer,
    last_seq: u64,
    in_flight: Option<u64>,
}

impl Session {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        source: Language,
        target: Language,
        timing: TimingConfig,
    ) -> Self {
        let history = History::load(store.clone());
        let theme = store::get_or(store.as_ref(), THEME_KEY, Theme::default());
        Self {
            input_text: String::new(),
            source,
            target,
            translation: String::new(),
            is_typing: false,
            theme,
            history,
            store,
            settle: DebounceTimer::new(timing.settle()),
            typing: DebounceTimer::new(timing.typing()),
            last_seq: 0,
            in_flight: None,
        }
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn source(&self) -> &Language {
        &self.source
    }

    pub fn target(&self) -> &Language {
        &self.target
    }

    pub fn translation(&self) -> &str {
        &self.translation
    }

    pub fn loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            input_text: self.input_text.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            translation: self.translation.clone(),
            loading: self.loading(),
            is_typing: self.is_typing,
            theme: self.theme,
            history: self.history.entries().to_vec(),
        }
    }

    /// Earliest pending timer deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.settle.deadline(), self.typing.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn handle(&mut self, intent: Intent, now: Instant) {
        let before = self.settle_key();

        match intent {
            Intent::InputChanged(text) => {
                self.input_text = text;
                self.is_typing = true;
                self.typing.schedule(now);
            }
            Intent::SourceChanged(lang) => self.source = lang,
            Intent::TargetChanged(lang) => self.target = lang,
            Intent::SwapLanguages => std::mem::swap(&mut self.source, &mut self.target),
            Intent::SelectHistory(id) => match self.history.get(&id).cloned() {
                Some(entry) => {
                    self.input_text = entry.original_text;
                    self.source = entry.source_lang;
                    self.target = entry.target_lang;
                    self.translation = entry.translated_text;
                }
                None => tracing::debug!(target: LOG_TARGET, %id, "selected unknown history entry"),
            },
            Intent::DeleteHistory(id) => {
                if let Err(e) = self.history.remove(&id) {
                    tracing::warn!(target: LOG_TARGET, error = %e, "failed to persist history");
                }
            }
            Intent::ToggleTheme => {
                self.theme = self.theme.toggled();
                if let Err(e) = store::set_json(self.store.as_ref(), THEME_KEY, &self.theme) {
                    tracing::warn!(target: LOG_TARGET, error = %e, "failed to persist theme");
                }
            }
        }

        if self.settle_key() != before {
            self.settle.schedule(now);
        }
    }

    /// Fires every timer due by `now`, earliest first, and returns the calls to issue.
    pub fn poll(&mut self, now: Instant) -> Vec<TranslateRequest> {
        let mut requests = Vec::new();
        loop {
            let typing_at = self.typing.deadline().filter(|d| *d <= now);
            let settle_at = self.settle.deadline().filter(|d| *d <= now);
            match (typing_at, settle_at) {
                (Some(at), settle) if settle.is_none_or(|s| at <= s) => {
                    self.typing.cancel();
                    self.on_typing_stopped(at);
                }
                (_, Some(_)) => {
                    self.settle.cancel();
                    requests.extend(self.on_settle());
                }
                _ => break,
            }
        }
        requests
    }

    /// Applies the outcome of `request`. Returns false when a newer call superseded it.
    pub fn complete(
        &mut self,
        request: TranslateRequest,
        result: Result<String, TranslateError>,
    ) -> bool {
        if self.in_flight != Some(request.seq) {
            tracing::debug!(target: LOG_TARGET, seq = request.seq, "dropping stale translation");
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(translated) => {
                self.translation = translated.clone();
                if !self.is_typing {
                    self.record(request, translated);
                }
            }
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, seq = request.seq, error = %e, "translation failed");
                self.translation = TRANSLATION_ERROR_MESSAGE.to_owned();
            }
        }
        true
    }

    /// Disarms both timers and forgets the in-flight call.
    pub fn shutdown(&mut self) {
        self.settle.cancel();
        self.typing.cancel();
        self.in_flight = None;
    }

    fn settle_key(&self) -> SettleKey {
        SettleKey {
            input_text: self.input_text.clone(),
            source: self.source.value.clone(),
            target: self.target.value.clone(),
            is_typing: self.is_typing,
        }
    }

    fn on_typing_stopped(&mut self, at: Instant) {
        if self.is_typing {
            self.is_typing = false;
            self.settle.schedule(at);
        }
    }

    fn on_settle(&mut self) -> Option<TranslateRequest> {
        if self.input_text.trim().is_empty() {
            self.translation.clear();
            if let Some(seq) = self.in_flight.take() {
                tracing::debug!(target: LOG_TARGET, seq, "input cleared, abandoning call");
            }
            return None;
        }

        self.last_seq += 1;
        self.in_flight = Some(self.last_seq);
        tracing::debug!(target: LOG_TARGET, seq = self.last_seq, "input settled");
        Some(TranslateRequest {
            seq: self.last_seq,
            text: self.input_text.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
        })
    }

    fn record(&mut self, request: TranslateRequest, translated: String) {
        if request.text.trim().is_empty()
            || self
                .history
                .contains(&request.text, &request.source.value, &request.target.value)
        {
            return;
        }

        let timestamp = now_millis();
        let entry = TranslationEntry {
            id: self.unique_id(timestamp),
            original_text: request.text,
            translated_text: translated,
            source_lang: request.source,
            target_lang: request.target,
            timestamp,
        };
        if let Err(e) = self.history.insert(entry) {
            tracing::warn!(target: LOG_TARGET, error = %e, "failed to persist history");
        }
    }

    fn unique_id(&self, millis: u64) -> String {
        let mut candidate = millis;
        while self.history.get(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        candidate.to_string()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

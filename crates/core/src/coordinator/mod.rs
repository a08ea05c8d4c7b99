mod session;
mod timer;

use crate::model::Language;
use crate::translate::{TranslateError, Translator};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

pub use session::{Intent, Session, Snapshot, TranslateRequest};
pub use timer::DebounceTimer;

const LOG_TARGET: &str = "coordinator";

#[derive(thiserror::Error, Debug)]
pub enum CoordinatorError {
    #[error("coordinator is not running")]
    Closed,
}

enum Command {
    Intent(Intent),
    Shutdown,
}

type Completion = (TranslateRequest, Result<String, TranslateError>);

/// Front door to a running coordinator task.
///
/// Dropping every handle stops the task the same way [`CoordinatorHandle::shutdown`] does.
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    pub fn send(&self, intent: Intent) -> Result<(), CoordinatorError> {
        self.commands
            .send(Command::Intent(intent))
            .map_err(|_| CoordinatorError::Closed)
    }

    pub fn input_changed(&self, text: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(Intent::InputChanged(text.into()))
    }

    pub fn source_changed(&self, lang: Language) -> Result<(), CoordinatorError> {
        self.send(Intent::SourceChanged(lang))
    }

    pub fn target_changed(&self, lang: Language) -> Result<(), CoordinatorError> {
        self.send(Intent::TargetChanged(lang))
    }

    pub fn swap_languages(&self) -> Result<(), CoordinatorError> {
        self.send(Intent::SwapLanguages)
    }

    pub fn select_history(&self, id: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(Intent::SelectHistory(id.into()))
    }

    pub fn delete_history(&self, id: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(Intent::DeleteHistory(id.into()))
    }

    pub fn toggle_theme(&self) -> Result<(), CoordinatorError> {
        self.send(Intent::ToggleTheme)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.clone()
    }

    /// Stops the task, cancelling both timers and any in-flight call.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::error!(target: LOG_TARGET, error = %e, "coordinator task panicked");
        }
    }
}

/// Runs `session` on its own task, issuing translate calls through `translator`.
pub fn spawn<T>(session: Session, translator: T) -> CoordinatorHandle
where
    T: Translator + Clone + 'static,
{
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(session.snapshot());
    let task = tokio::spawn(run(session, translator, commands_rx, state_tx));
    CoordinatorHandle {
        commands: commands_tx,
        state: state_rx,
        task,
    }
}

async fn run<T>(
    mut session: Session,
    translator: T,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<Snapshot>,
) where
    T: Translator + Clone + 'static,
{
    let mut calls: JoinSet<Completion> = JoinSet::new();
    tracing::debug!(target: LOG_TARGET, "coordinator started");

    loop {
        let deadline = session.next_deadline();
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Intent(intent)) => session.handle(intent, Instant::now()),
                Some(Command::Shutdown) | None => break,
            },
            _ = sleep_until(deadline) => {
                for request in session.poll(Instant::now()) {
                    let translator = translator.clone();
                    calls.spawn(async move {
                        let result = translator
                            .translate(
                                request.text.clone(),
                                request.source.value.clone(),
                                request.target.value.clone(),
                            )
                            .await;
                        (request, result)
                    });
                }
            }
            Some(joined) = calls.join_next() => match joined {
                Ok((request, result)) => {
                    session.complete(request, result);
                }
                Err(e) => tracing::warn!(target: LOG_TARGET, error = %e, "translate task failed"),
            },
        }

        let snapshot = session.snapshot();
        state.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    session.shutdown();
    calls.abort_all();
    tracing::debug!(target: LOG_TARGET, "coordinator stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::store::MemoryStore;
    use crate::translate::TRANSLATION_ERROR_MESSAGE;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingTranslator {
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingTranslator {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Translator for RecordingTranslator {
        fn translate(
            &self,
            text: String,
            _source: String,
            _target: String,
        ) -> BoxFuture<'_, Result<String, TranslateError>> {
            async move {
                self.calls.lock().unwrap().push(text.clone());
                // Shorter inputs answer slower so older calls can land last.
                let delay = if text.len() < 2 { 1000 } else { 10 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if self.fail {
                    Err(TranslateError::Provider("boom".into()))
                } else {
                    Ok(format!("T:{text}"))
                }
            }
            .boxed()
        }
    }

    fn start(translator: RecordingTranslator) -> CoordinatorHandle {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(
            store,
            Language::from_code("es").unwrap(),
            Language::from_code("en").unwrap(),
            TimingConfig::default(),
        );
        spawn(session, translator)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_produces_one_call_then_history_after_typing_stops() {
        let translator = RecordingTranslator::default();
        let handle = start(translator.clone());

        for text in ["ho", "hol", "hola"] {
            handle.input_changed(text).unwrap();
            sleep_ms(100).await;
        }
        sleep_ms(300).await;

        assert_eq!(translator.calls(), ["hola"]);
        let snap = handle.snapshot();
        assert_eq!(snap.translation, "T:hola");
        assert!(snap.is_typing);
        assert!(snap.history.is_empty());

        sleep_ms(2000).await;
        let snap = handle.snapshot();
        assert!(!snap.is_typing);
        assert!(!snap.loading);
        assert_eq!(snap.history.len(), 1);
        assert_eq!(snap.history[0].original_text, "hola");
        assert_eq!(snap.history[0].translated_text, "T:hola");

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failure_surfaces_fixed_message() {
        let translator = RecordingTranslator {
            fail: true,
            ..Default::default()
        };
        let handle = start(translator);

        handle.input_changed("hola").unwrap();
        sleep_ms(2500).await;

        let snap = handle.snapshot();
        assert_eq!(snap.translation, TRANSLATION_ERROR_MESSAGE);
        assert!(!snap.loading);
        assert!(snap.history.is_empty());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_older_call_does_not_clobber_newer_result() {
        let translator = RecordingTranslator::default();
        let handle = start(translator.clone());

        handle.input_changed("a").unwrap();
        sleep_ms(350).await;
        handle.input_changed("ab").unwrap();
        sleep_ms(1050).await;

        assert_eq!(translator.calls(), ["a", "ab"]);
        assert_eq!(handle.snapshot().translation, "T:ab");
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_timers() {
        let translator = RecordingTranslator::default();
        let handle = start(translator.clone());

        handle.input_changed("hola").unwrap();
        sleep_ms(100).await;
        handle.shutdown().await;
        sleep_ms(5000).await;

        assert!(translator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_swapped_languages() {
        let handle = start(RecordingTranslator::default());
        let mut updates = handle.subscribe();

        handle.swap_languages().unwrap();
        updates.changed().await.unwrap();
        let snap = updates.borrow_and_update().clone();
        assert_eq!(snap.source.value, "en");
        assert_eq!(snap.target.value, "es");
        handle.shutdown().await;
    }
}

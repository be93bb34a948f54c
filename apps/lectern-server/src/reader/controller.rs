//! Reading controller and the read-aloud loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SpeechConfig;
use crate::document::{Document, DocumentSummary, Page};
use crate::retry::{retry_with_backoff, BackoffSchedule};
use crate::session::{SessionRecord, SessionSnapshot, SessionStore};
use crate::speech::{EngineError, SpeechOutcome, SpeechSettings, Voice, VoiceEngine};

use super::error::ReaderError;
use super::recovery::RecoveryPolicy;
use super::state::{NoticeLevel, PlaybackSnapshot, PlaybackState, ReaderStatus, SettingsUpdate};

/// Handle of a running read loop; resolves when the loop exits
pub type ReadLoop = JoinHandle<()>;

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Attempts made when starting the speech engine
    pub init_attempts: u32,
    pub init_backoff: BackoffSchedule,
    /// Engine failures tolerated inside `recovery_window`
    pub max_recoveries: usize,
    pub recovery_window: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            init_attempts: 3,
            init_backoff: BackoffSchedule::default(),
            max_recoveries: 3,
            recovery_window: Duration::from_secs(60),
        }
    }
}

impl From<&SpeechConfig> for ControllerOptions {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            init_attempts: config.init_attempts,
            init_backoff: config.init_backoff,
            max_recoveries: config.max_recoveries,
            recovery_window: config.recovery_window,
        }
    }
}

/// What the loop does next, decided under the state lock
enum Step {
    Speak {
        page: usize,
        text: String,
        settings: SpeechSettings,
    },
    Skipped,
    Finished,
    Stale,
}

/// Drives playback of the loaded document
///
/// Cheap to clone; all clones share one state. Every transition happens
/// under a single mutex that is never held across an await.
#[derive(Clone)]
pub struct ReadingController {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Arc<dyn VoiceEngine>,
    engine_ready: AtomicBool,
    session: SessionStore,
    /// Session found on disk at startup
    last_session: Option<SessionSnapshot>,
    options: ControllerOptions,
    state: Mutex<PlaybackState>,
    recovery: Mutex<RecoveryPolicy>,
}

impl ReadingController {
    pub fn new(
        engine: Arc<dyn VoiceEngine>,
        session: SessionStore,
        options: ControllerOptions,
        last_session: Option<SessionSnapshot>,
    ) -> Self {
        let (page, settings) = last_session
            .map(|s| (s.current_page, s.settings()))
            .unwrap_or((1, SpeechSettings::default()));

        Self {
            inner: Arc::new(Inner {
                engine,
                engine_ready: AtomicBool::new(false),
                session,
                last_session,
                recovery: Mutex::new(RecoveryPolicy::new(
                    options.max_recoveries,
                    options.recovery_window,
                )),
                options,
                state: Mutex::new(PlaybackState::new(page, settings)),
            }),
        }
    }

    /// Build a controller from whatever session is on disk
    pub async fn restore(
        engine: Arc<dyn VoiceEngine>,
        session: SessionStore,
        options: ControllerOptions,
    ) -> Self {
        let last_session = session.load().await.map(|r| r.current);
        if let Some(previous) = &last_session {
            tracing::info!(
                path = %session.path().display(),
                page = previous.current_page,
                speed = previous.speed,
                "Restored previous session"
            );
        }
        Self::new(engine, session, options, last_session)
    }

    /// Start the speech engine, retrying with backoff
    pub async fn init_engine(&self) -> Result<Vec<Voice>, ReaderError> {
        let engine = self.inner.engine.clone();
        let result = retry_with_backoff(
            "speech engine init",
            self.inner.options.init_attempts,
            &self.inner.options.init_backoff,
            |_| {
                let engine = engine.clone();
                async move { engine.init().await }
            },
        )
        .await;

        match result {
            Ok(voices) => {
                self.inner.engine_ready.store(true, Ordering::SeqCst);
                Ok(voices)
            }
            Err(e) => {
                self.inner.engine_ready.store(false, Ordering::SeqCst);
                self.inner
                    .state
                    .lock()
                    .notices
                    .push(NoticeLevel::Error, e.to_string());
                Err(e.into())
            }
        }
    }

    async fn ensure_engine(&self) -> Result<(), ReaderError> {
        if self.inner.engine_ready.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.init_engine().await.map(|_| ())
    }

    /// Replace the loaded document
    ///
    /// Stops playback. The current page is kept when the new document has
    /// it, otherwise reading starts over at page 1.
    pub async fn load(&self, document: Document, warnings: Vec<String>) -> DocumentSummary {
        let summary = document.summary();
        {
            let mut state = self.inner.state.lock();
            state.halt();

            let total = document.total_pages();
            if state.current_page == 0 || state.current_page > total {
                state.current_page = 1;
            }

            let name = document
                .title
                .clone()
                .unwrap_or_else(|| "document".to_string());
            state.document = Some(document);
            state.notices.push(
                NoticeLevel::Success,
                format!("Loaded {} ({} pages)", name, total),
            );
            for warning in warnings {
                state.notices.push(NoticeLevel::Warning, warning);
            }
        }

        tracing::info!(
            id = %summary.id,
            total_pages = summary.total_pages,
            readable_pages = summary.readable_pages,
            "Document loaded"
        );
        self.persist().await;
        summary
    }

    /// Jump to `page`; returns false (and changes nothing) when out of range
    pub async fn go_to_page(&self, page: usize) -> bool {
        {
            let mut state = self.inner.state.lock();
            let total = state.total_pages();
            if page == 0 || page > total {
                tracing::debug!(page, total, "Ignoring out-of-range page");
                return false;
            }
            state.halt();
            state.current_page = page;
        }
        self.persist().await;
        true
    }

    pub async fn next_page(&self) -> bool {
        let target = self.inner.state.lock().current_page + 1;
        self.go_to_page(target).await
    }

    pub async fn previous_page(&self) -> bool {
        let target = self.inner.state.lock().current_page.saturating_sub(1);
        self.go_to_page(target).await
    }

    /// Start reading from the current page
    ///
    /// Returns `None` when already playing. Once the end of the document
    /// has been reached, playing again starts over from page 1.
    pub async fn play(&self) -> Result<Option<ReadLoop>, ReaderError> {
        {
            let state = self.inner.state.lock();
            if state.playing {
                return Ok(None);
            }
            if state.document.is_none() {
                return Err(ReaderError::NoDocument);
            }
        }

        self.ensure_engine().await?;

        let (generation, page) = {
            let mut state = self.inner.state.lock();
            if state.playing {
                return Ok(None);
            }
            let total = state.total_pages();
            if total == 0 {
                return Err(ReaderError::NoDocument);
            }
            if state.current_page > total {
                state.current_page = 1;
            }
            state.playing = true;
            state.status = ReaderStatus::Playing;
            state.generation += 1;
            let page = state.current_page;
            state
                .notices
                .push(NoticeLevel::Info, format!("Reading from page {}", page));
            (state.generation, page)
        };

        tracing::info!(page, "Playback started");
        let controller = self.clone();
        Ok(Some(tokio::spawn(async move {
            controller.run(generation).await
        })))
    }

    /// Stop reading and cut off the current utterance
    pub async fn pause(&self) -> bool {
        let paused = {
            let mut state = self.inner.state.lock();
            if state.halt() {
                let page = state.current_page;
                state
                    .notices
                    .push(NoticeLevel::Info, format!("Paused on page {}", page));
                true
            } else {
                false
            }
        };

        if paused {
            tracing::info!("Playback paused");
            self.persist().await;
        }
        paused
    }

    /// Change speech settings; the page being spoken keeps its old values
    pub async fn update_settings(&self, update: SettingsUpdate) -> SpeechSettings {
        let settings = {
            let mut state = self.inner.state.lock();
            state.settings = update.apply(state.settings);
            state.settings
        };
        tracing::debug!(
            speed = settings.speed,
            volume = settings.volume,
            voice_idx = settings.voice_idx,
            "Speech settings updated"
        );
        self.persist().await;
        settings
    }

    pub fn settings(&self) -> SpeechSettings {
        self.inner.state.lock().settings
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn document(&self) -> Option<DocumentSummary> {
        self.inner.state.lock().document.as_ref().map(Document::summary)
    }

    /// A page of the loaded document
    pub fn page(&self, number: usize) -> Option<Page> {
        self.inner
            .state
            .lock()
            .document
            .as_ref()
            .and_then(|doc| doc.page(number))
            .cloned()
    }

    pub fn voices(&self) -> Vec<Voice> {
        self.inner.engine.voices()
    }

    pub fn engine_name(&self) -> &str {
        self.inner.engine.name()
    }

    /// Record a user-visible notice
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.inner.state.lock().notices.push(level, message);
    }

    /// Stop playback and write the session one last time
    pub async fn shutdown(&self) {
        self.pause().await;
        self.persist().await;
    }

    async fn run(self, generation: u64) {
        loop {
            match self.next_step(generation) {
                Step::Stale => return,
                Step::Finished => {
                    self.persist().await;
                    return;
                }
                Step::Skipped => self.persist().await,
                Step::Speak {
                    page,
                    text,
                    settings,
                } => {
                    if !self.speak_page(generation, page, &text, &settings).await {
                        return;
                    }
                }
            }
        }
    }

    fn next_step(&self, generation: u64) -> Step {
        let mut state = self.inner.state.lock();
        if !state.is_current(generation) {
            return Step::Stale;
        }

        let page = state.current_page;
        if page > state.total_pages() {
            state.playing = false;
            state.status = ReaderStatus::Idle;
            state
                .notices
                .push(NoticeLevel::Success, "Finished reading the document");
            tracing::info!("Reached end of document");
            return Step::Finished;
        }

        let text = state
            .document
            .as_ref()
            .and_then(|doc| doc.page(page))
            .and_then(|p| p.text.speakable())
            .map(str::to_string);

        match text {
            Some(text) => Step::Speak {
                page,
                text,
                settings: state.settings,
            },
            None => {
                tracing::debug!(page, "Skipping page without readable text");
                state.notices.push(
                    NoticeLevel::Warning,
                    format!("Skipping page {}: no readable text", page),
                );
                state.current_page = page + 1;
                Step::Skipped
            }
        }
    }

    /// Speak one page; returns whether the loop should continue
    async fn speak_page(
        &self,
        generation: u64,
        page: usize,
        text: &str,
        settings: &SpeechSettings,
    ) -> bool {
        let utterance = match self.inner.engine.speak(text, settings).await {
            Ok(utterance) => utterance,
            Err(e) => return self.recover(generation, page, e).await,
        };

        {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                // Paused while the synthesizer was starting
                utterance.canceller().cancel();
                return false;
            }
            state.canceller = Some(utterance.canceller());
        }

        tracing::debug!(page, chars = text.len(), "Speaking page");
        match utterance.finish().await {
            Ok(SpeechOutcome::Completed) => {
                {
                    let mut state = self.inner.state.lock();
                    if !state.is_current(generation) {
                        return false;
                    }
                    state.canceller = None;
                    state.current_page = page + 1;
                }
                self.persist().await;
                true
            }
            Ok(SpeechOutcome::Cancelled) => false,
            Err(e) => self.recover(generation, page, e).await,
        }
    }

    /// Reinitialize the engine after a failure, if the policy allows
    async fn recover(&self, generation: u64, page: usize, error: EngineError) -> bool {
        let (allowed, failures) = {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                return false;
            }
            state.canceller = None;
            state.status = ReaderStatus::Recovering;
            let mut recovery = self.inner.recovery.lock();
            let allowed = recovery.record_failure(Instant::now());
            let failures = recovery.recent_failures();
            (allowed, failures)
        };

        tracing::warn!(page, error = %error, allowed, failures, "Speech engine failed");
        if !allowed {
            self.abandon(
                generation,
                format!(
                    "Speech engine failed repeatedly, playback stopped: {}",
                    error
                ),
            )
            .await;
            return false;
        }

        self.inner.engine_ready.store(false, Ordering::SeqCst);
        match self.inner.engine.init().await {
            Ok(_) => {
                self.inner.engine_ready.store(true, Ordering::SeqCst);
                let mut state = self.inner.state.lock();
                if !state.is_current(generation) {
                    return false;
                }
                state.status = ReaderStatus::Playing;
                state.notices.push(
                    NoticeLevel::Warning,
                    format!("Speech engine restarted, retrying page {}", page),
                );
                true
            }
            Err(e) => {
                self.abandon(
                    generation,
                    format!("Could not restart the speech engine: {}", e),
                )
                .await;
                false
            }
        }
    }

    async fn abandon(&self, generation: u64, message: String) {
        {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                return;
            }
            state.halt();
            state.notices.push(NoticeLevel::Error, message.clone());
        }
        tracing::error!(%message, "Playback stopped");
        self.persist().await;
    }

    async fn persist(&self) {
        let result = self
            .inner
            .session
            .save_latest(|| {
                let state = self.inner.state.lock();
                SessionRecord {
                    current: SessionSnapshot::new(state.current_page, state.settings),
                    last_session: self.inner.last_session,
                }
            })
            .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to save session");
        }
    }
}

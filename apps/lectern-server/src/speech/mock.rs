//! Scripted engine for tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::engine::{Utterance, VoiceEngine};
use super::types::{EngineError, SpeechSettings, Voice};

/// What the next utterance does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Complete,
    Fail,
    /// Never finishes on its own; only cancel ends it
    Hold,
    /// Completes once `release` is notified
    Wait,
}

#[derive(Default)]
pub struct ScriptedEngine {
    /// Steps consumed by successive `speak` calls; empty means `Complete`
    steps: Mutex<VecDeque<Step>>,
    /// Number of upcoming `init` calls that fail
    failing_inits: AtomicUsize,
    pub init_calls: AtomicUsize,
    pub spoken: Mutex<Vec<(String, SpeechSettings)>>,
    /// Signalled whenever an utterance starts
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: Vec<Step>) -> Self {
        let engine = Self::default();
        *engine.steps.lock() = steps.into();
        engine
    }

    pub fn fail_next_inits(&self, count: usize) {
        self.failing_inits.store(count, Ordering::SeqCst);
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn init_count(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn init(&self) -> Result<Vec<Voice>, EngineError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_inits.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_inits.store(failing - 1, Ordering::SeqCst);
            return Err(EngineError::Init("scripted init failure".to_string()));
        }
        Ok(self.voices())
    }

    fn voices(&self) -> Vec<Voice> {
        vec![Voice {
            id: "test".to_string(),
            name: "Test Voice".to_string(),
            language: Some("en".to_string()),
        }]
    }

    async fn speak(&self, text: &str, settings: &SpeechSettings) -> Result<Utterance, EngineError> {
        self.spoken.lock().push((text.to_string(), *settings));
        let step = self.steps.lock().pop_front().unwrap_or(Step::Complete);
        self.started.notify_one();

        Ok(match step {
            Step::Complete => Utterance::spawn(async { Ok(()) }),
            Step::Fail => Utterance::spawn(async {
                Err(EngineError::Synthesis("scripted failure".to_string()))
            }),
            Step::Hold => Utterance::spawn(std::future::pending()),
            Step::Wait => {
                let release = self.release.clone();
                Utterance::spawn(async move {
                    release.notified().await;
                    Ok(())
                })
            }
        })
    }
}

//! Silent backend for headless machines
//!
//! Logs what would be spoken. An optional per-utterance delay lets the UI
//! show pages advancing at a readable pace.

use std::time::Duration;

use async_trait::async_trait;

use super::engine::{Utterance, VoiceEngine};
use super::types::{EngineError, SpeechSettings, Voice};

pub struct SilentEngine {
    delay: Duration,
}

impl SilentEngine {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    fn voice() -> Voice {
        Voice {
            id: "silent".to_string(),
            name: "Silent".to_string(),
            language: None,
        }
    }
}

impl Default for SilentEngine {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl VoiceEngine for SilentEngine {
    fn name(&self) -> &str {
        "silent"
    }

    async fn init(&self) -> Result<Vec<Voice>, EngineError> {
        Ok(vec![Self::voice()])
    }

    fn voices(&self) -> Vec<Voice> {
        vec![Self::voice()]
    }

    async fn speak(&self, text: &str, settings: &SpeechSettings) -> Result<Utterance, EngineError> {
        tracing::debug!(
            chars = text.len(),
            speed = settings.speed,
            volume = settings.volume,
            "Silent utterance"
        );
        let delay = self.delay;
        Ok(Utterance::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        }))
    }
}

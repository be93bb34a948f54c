//! Speech types

use serde::{Deserialize, Serialize};

/// Slowest accepted speech rate, words per minute
pub const MIN_SPEED: u32 = 50;
/// Fastest accepted speech rate, words per minute
pub const MAX_SPEED: u32 = 400;
pub const DEFAULT_SPEED: u32 = 175;

/// Which synthesizer drives the voice engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// `espeak-ng` (Linux, Windows)
    Espeak,
    /// macOS `say`
    Say,
    /// No audio; utterances are logged and complete immediately
    Silent,
}

/// An installed voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    /// Identifier passed to the synthesizer
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Language/locale (e.g., "en_US")
    pub language: Option<String>,
}

/// Rate, volume and voice for an utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSettings {
    /// Words per minute, within `MIN_SPEED..=MAX_SPEED`
    pub speed: u32,
    /// 0.0 to 1.0
    pub volume: f32,
    /// Index into the engine's voice list
    pub voice_idx: usize,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            volume: 1.0,
            voice_idx: 0,
        }
    }
}

impl SpeechSettings {
    /// Bring every field into its accepted range
    pub fn clamped(self) -> Self {
        let volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self {
            speed: self.speed.clamp(MIN_SPEED, MAX_SPEED),
            volume,
            voice_idx: self.voice_idx,
        }
    }
}

/// How an utterance ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    Completed,
    Cancelled,
}

/// Speech engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to initialize text-to-speech engine: {0}")]
    Init(String),

    #[error("Text-to-speech engine is not initialized")]
    NotInitialized,

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
}

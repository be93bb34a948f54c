use serde::{Deserialize, Serialize};

use crate::speech::{SpeechSettings, DEFAULT_SPEED};

fn default_page() -> usize {
    1
}

fn default_speed() -> u32 {
    DEFAULT_SPEED
}

fn default_volume() -> f32 {
    1.0
}

/// Reading position and voice settings at one moment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default = "default_page")]
    pub current_page: usize,
    #[serde(default = "default_speed")]
    pub speed: u32,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub voice_idx: usize,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            current_page: default_page(),
            speed: default_speed(),
            volume: default_volume(),
            voice_idx: 0,
        }
    }
}

impl SessionSnapshot {
    pub fn new(current_page: usize, settings: SpeechSettings) -> Self {
        Self {
            current_page: current_page.max(1),
            speed: settings.speed,
            volume: settings.volume,
            voice_idx: settings.voice_idx,
        }
    }

    /// Stored settings, brought back into range
    pub fn settings(&self) -> SpeechSettings {
        SpeechSettings {
            speed: self.speed,
            volume: self.volume,
            voice_idx: self.voice_idx,
        }
        .clamped()
    }
}

/// The session file
///
/// ```json
/// {"current_page": 3, "speed": 175, "volume": 1.0, "voice_idx": 0,
///  "last_session": {"current_page": 1, "speed": 175, "volume": 1.0, "voice_idx": 0}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(flatten)]
    pub current: SessionSnapshot,
    /// What was on disk when this run started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_session: Option<SessionSnapshot>,
}

//! Playback state and user-visible notices

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentSummary};
use crate::speech::{SpeechSettings, UtteranceCanceller};

/// Notices kept for the status log
const NOTICE_LOG_CAPACITY: usize = 20;

/// Where the reading loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReaderStatus {
    Idle,
    Playing,
    /// Reinitializing the speech engine after a failure
    Recovering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient status message for the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Most recent notices, newest last
#[derive(Debug, Default)]
pub struct NoticeLog {
    entries: VecDeque<Notice>,
}

impl NoticeLog {
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        if self.entries.len() == NOTICE_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(Notice::new(level, message));
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.entries.back()
    }

    pub fn recent(&self) -> Vec<Notice> {
        self.entries.iter().cloned().collect()
    }
}

/// Everything the controller guards with its mutex
#[derive(Debug)]
pub(crate) struct PlaybackState {
    pub document: Option<Document>,
    /// 1-based; `total_pages + 1` once the end of the document is reached
    pub current_page: usize,
    pub playing: bool,
    pub status: ReaderStatus,
    pub settings: SpeechSettings,
    /// Bumped whenever a running loop must stop acting
    pub generation: u64,
    pub canceller: Option<UtteranceCanceller>,
    pub notices: NoticeLog,
}

impl PlaybackState {
    pub fn new(current_page: usize, settings: SpeechSettings) -> Self {
        Self {
            document: None,
            current_page: current_page.max(1),
            playing: false,
            status: ReaderStatus::Idle,
            settings,
            generation: 0,
            canceller: None,
            notices: NoticeLog::default(),
        }
    }

    pub fn total_pages(&self) -> usize {
        self.document.as_ref().map_or(0, Document::total_pages)
    }

    /// Stop the current run, if any: invalidate its loop and cut off speech
    pub fn halt(&mut self) -> bool {
        let was_playing = self.playing;
        self.playing = false;
        self.status = ReaderStatus::Idle;
        self.generation += 1;
        if let Some(canceller) = self.canceller.take() {
            canceller.cancel();
        }
        was_playing
    }

    /// Whether a loop started at `generation` may still act
    pub fn is_current(&self, generation: u64) -> bool {
        self.playing && self.generation == generation
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let total_pages = self.total_pages();
        let progress = if total_pages == 0 {
            0.0
        } else {
            (self.current_page.min(total_pages) as f32 / total_pages as f32).min(1.0)
        };

        PlaybackSnapshot {
            status: self.status,
            playing: self.playing,
            current_page: self.current_page,
            total_pages,
            progress,
            settings: self.settings,
            document: self.document.as_ref().map(Document::summary),
            notice: self.notices.latest().cloned(),
            recent_notices: self.notices.recent(),
        }
    }
}

/// Read-only view returned to the UI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub status: ReaderStatus,
    pub playing: bool,
    pub current_page: usize,
    pub total_pages: usize,
    /// Fraction of the document reached, 0.0 to 1.0
    pub progress: f32,
    pub settings: SpeechSettings,
    pub document: Option<DocumentSummary>,
    pub notice: Option<Notice>,
    pub recent_notices: Vec<Notice>,
}

/// Partial settings change; absent fields stay as they are
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub speed: Option<u32>,
    pub volume: Option<f32>,
    pub voice_idx: Option<usize>,
}

impl SettingsUpdate {
    pub fn apply(self, settings: SpeechSettings) -> SpeechSettings {
        SpeechSettings {
            speed: self.speed.unwrap_or(settings.speed),
            volume: self.volume.unwrap_or(settings.volume),
            voice_idx: self.voice_idx.unwrap_or(settings.voice_idx),
        }
        .clamped()
    }
}

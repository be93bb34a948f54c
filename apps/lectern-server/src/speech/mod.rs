//! Speech Module
//!
//! Voice engines that read page text aloud. Every utterance is
//! cancellable from another task, which is what makes pause prompt
//! while a long page is being spoken.

mod command;
mod engine;
mod silent;
mod types;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

pub use command::CommandEngine;
pub use engine::{Utterance, UtteranceCanceller, VoiceEngine};
pub use silent::SilentEngine;
pub use types::{
    EngineError, SpeechBackend, SpeechOutcome, SpeechSettings, Voice, DEFAULT_SPEED, MAX_SPEED,
    MIN_SPEED,
};

use crate::config::SpeechConfig;

/// Build the configured engine (not yet initialized)
pub fn create_engine(config: &SpeechConfig) -> Arc<dyn VoiceEngine> {
    match config.backend {
        SpeechBackend::Silent => Arc::new(SilentEngine::default()),
        backend => Arc::new(CommandEngine::new(backend, config.program.clone())),
    }
}

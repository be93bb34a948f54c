use thiserror::Error;

use crate::speech::EngineError;

/// Why playback could not start
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("No document is loaded")]
    NoDocument,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

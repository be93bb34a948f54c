//! Reading controller
//!
//! The page-sequenced read-aloud loop. States:
//!
//! ```text
//! Idle -> Playing -> PageComplete -> Playing
//!                 -> EndOfDocument -> Idle
//!                 -> EngineError -> Recovering -> Playing | Idle
//! Playing -> Idle (pause, go to page, new document)
//! ```

mod controller;
mod error;
mod recovery;
mod state;

pub use controller::{ControllerOptions, ReadLoop, ReadingController};
pub use error::ReaderError;
pub use recovery::RecoveryPolicy;
pub use state::{Notice, NoticeLevel, PlaybackSnapshot, ReaderStatus, SettingsUpdate};

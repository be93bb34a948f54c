//! Session persistence
//!
//! Last reading position and voice settings, kept in a small JSON file.
//! A missing or malformed file means "no prior session".

mod store;
mod types;

pub use store::{SessionError, SessionStore};
pub use types::{SessionRecord, SessionSnapshot};

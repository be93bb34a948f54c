//! Upload cache
//!
//! Uploaded PDFs are stored content-addressed (`<sha256>.pdf`) in a cache
//! directory and evicted by age, then by total size, oldest first.

mod eviction;
mod upload;

pub use eviction::{plan_eviction, CacheEntry, EvictionPlan};
pub use upload::{compute_hash, CacheError, CleanupReport, StoredUpload, UploadCache};

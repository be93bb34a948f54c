//! Eviction planning
//!
//! Pure function over a directory listing so the policy can be tested
//! without touching file timestamps.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// One file in the cache directory
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EvictionPlan {
    /// Older than the age limit
    pub expired: Vec<PathBuf>,
    /// Removed to bring the cache under the size ceiling
    pub oversize: Vec<PathBuf>,
    /// Bytes left once the plan is carried out
    pub remaining_bytes: u64,
}

impl EvictionPlan {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.oversize.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.expired.iter().chain(self.oversize.iter())
    }
}

/// Decide which files to delete
///
/// Files older than `max_age` go first. If the rest still exceed
/// `max_bytes`, the oldest are removed until the total fits. Files in
/// `protected` are never removed, even when that leaves the cache over its
/// ceiling.
pub fn plan_eviction(
    mut entries: Vec<CacheEntry>,
    now: SystemTime,
    max_age: Duration,
    max_bytes: u64,
    protected: &[PathBuf],
) -> EvictionPlan {
    entries.sort_by_key(|e| e.modified);
    let is_protected = |entry: &CacheEntry| protected.contains(&entry.path);

    let mut plan = EvictionPlan::default();
    let mut kept = Vec::with_capacity(entries.len());

    for entry in entries {
        // A timestamp in the future counts as fresh
        let age = now.duration_since(entry.modified).unwrap_or(Duration::ZERO);
        if age > max_age && !is_protected(&entry) {
            plan.expired.push(entry.path);
        } else {
            kept.push(entry);
        }
    }

    let mut total: u64 = kept.iter().map(|e| e.size).sum();
    for entry in &kept {
        if total <= max_bytes {
            break;
        }
        if is_protected(entry) {
            continue;
        }
        total -= entry.size;
        plan.oversize.push(entry.path.clone());
    }

    plan.remaining_bytes = total;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn entry(name: &str, size: u64, age: Duration, now: SystemTime) -> CacheEntry {
        CacheEntry {
            path: PathBuf::from(name),
            size,
            modified: now - age,
        }
    }

    #[test]
    fn test_expired_files_are_removed_first() {
        let now = SystemTime::now();
        let entries = vec![
            entry("fresh.pdf", 10, DAY, now),
            entry("stale.pdf", 10, 8 * DAY, now),
        ];

        let plan = plan_eviction(entries, now, 7 * DAY, 1_000, &[]);
        assert_eq!(plan.expired, vec![PathBuf::from("stale.pdf")]);
        assert!(plan.oversize.is_empty());
        assert_eq!(plan.remaining_bytes, 10);
    }

    #[test]
    fn test_size_ceiling_evicts_oldest_first() {
        let now = SystemTime::now();
        let entries = vec![
            entry("newest.pdf", 40, DAY, now),
            entry("oldest.pdf", 40, 3 * DAY, now),
            entry("middle.pdf", 40, 2 * DAY, now),
        ];

        let plan = plan_eviction(entries, now, 7 * DAY, 80, &[]);
        assert!(plan.expired.is_empty());
        assert_eq!(plan.oversize, vec![PathBuf::from("oldest.pdf")]);
        assert_eq!(plan.remaining_bytes, 80);
    }

    #[test]
    fn test_protected_file_survives_age_and_size() {
        let now = SystemTime::now();
        let entries = vec![
            entry("current.pdf", 100, 30 * DAY, now),
            entry("other.pdf", 50, 2 * DAY, now),
        ];

        let plan = plan_eviction(
            entries,
            now,
            7 * DAY,
            60,
            &[PathBuf::from("current.pdf")],
        );
        assert!(plan.expired.is_empty());
        assert_eq!(plan.oversize, vec![PathBuf::from("other.pdf")]);
        // Still over the ceiling; the protected file stays anyway
        assert_eq!(plan.remaining_bytes, 100);
    }

    #[test]
    fn test_nothing_to_do() {
        let now = SystemTime::now();
        let plan = plan_eviction(vec![entry("a.pdf", 1, DAY, now)], now, 7 * DAY, 10, &[]);
        assert!(plan.is_empty());
    }
}

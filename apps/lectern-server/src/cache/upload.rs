//! Content-addressed store for uploaded PDFs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::CacheConfig;

use super::eviction::{plan_eviction, CacheEntry};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache task failed: {0}")]
    Task(String),
}

/// Compute SHA-256 hash of data
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// An upload written to (or found in) the cache
#[derive(Debug)]
pub struct StoredUpload {
    /// SHA-256 of the file contents
    pub id: String,
    pub path: PathBuf,
    /// The same bytes were already cached
    pub reused: bool,
    /// Keeps the file out of cleanup while it is being loaded
    pub hold: UploadHold,
}

/// Shields one cached file from cleanup until dropped
pub struct UploadHold {
    cache: Arc<UploadCacheInner>,
    path: PathBuf,
}

impl std::fmt::Debug for UploadHold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadHold").field("path", &self.path).finish()
    }
}

impl Drop for UploadHold {
    fn drop(&mut self) {
        let mut held = self.cache.held.lock();
        if let Some(index) = held.iter().position(|p| p == &self.path) {
            held.swap_remove(index);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub expired: usize,
    pub evicted: usize,
    pub freed_bytes: u64,
    pub remaining_bytes: u64,
}

#[derive(Clone)]
pub struct UploadCache {
    inner: Arc<UploadCacheInner>,
}

struct UploadCacheInner {
    dir: PathBuf,
    max_age: Duration,
    max_bytes: u64,
    cleanup_interval: Duration,
    last_cleanup: Mutex<Option<Instant>>,
    /// File of the loaded document; never evicted
    protected: RwLock<Option<PathBuf>>,
    /// Uploads still being loaded, one entry per live hold
    held: Mutex<Vec<PathBuf>>,
}

impl UploadCache {
    pub fn new(
        dir: impl Into<PathBuf>,
        max_age: Duration,
        max_bytes: u64,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(UploadCacheInner {
                dir: dir.into(),
                max_age,
                max_bytes,
                cleanup_interval,
                last_cleanup: Mutex::new(None),
                protected: RwLock::new(None),
                held: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.dir.clone(),
            Duration::from_secs(config.max_age_days * 24 * 60 * 60),
            config.max_size_mb * 1024 * 1024,
            config.cleanup_interval,
        )
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.inner.dir.join(format!("{}.pdf", id))
    }

    fn hold(&self, path: &Path) -> UploadHold {
        self.inner.held.lock().push(path.to_path_buf());
        UploadHold {
            cache: self.inner.clone(),
            path: path.to_path_buf(),
        }
    }

    /// Write `bytes` to the cache, reusing an identical earlier upload
    ///
    /// The file is exempt from cleanup for as long as the returned
    /// [`StoredUpload::hold`] is alive.
    pub async fn store(&self, bytes: &[u8]) -> Result<StoredUpload, CacheError> {
        let id = compute_hash(bytes);
        let path = self.path_for(&id);
        let hold = self.hold(&path);
        fs::create_dir_all(&self.inner.dir).await?;

        if fs::try_exists(&path).await? {
            // Refresh the timestamp so age-based cleanup treats it as new
            touch(&path).await?;
            tracing::debug!(id = %id, "Reusing cached upload");
            return Ok(StoredUpload {
                id,
                path,
                reused: true,
                hold,
            });
        }

        let tmp = self
            .inner
            .dir
            .join(format!(".{}.{}.part", id, uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::info!(id = %id, size = bytes.len(), path = %path.display(), "Cached upload");
        Ok(StoredUpload {
            id,
            path,
            reused: false,
            hold,
        })
    }

    /// Mark the file backing the loaded document
    pub fn protect(&self, path: Option<PathBuf>) {
        *self.inner.protected.write() = path;
    }

    /// Remove expired files, then the oldest ones until under the size ceiling
    pub async fn cleanup(&self) -> Result<CleanupReport, CacheError> {
        *self.inner.last_cleanup.lock() = Some(Instant::now());

        let entries = self.list_entries().await?;
        let mut protected: Vec<PathBuf> = self.inner.held.lock().clone();
        protected.extend(self.inner.protected.read().clone());
        let sizes: std::collections::HashMap<PathBuf, u64> =
            entries.iter().map(|e| (e.path.clone(), e.size)).collect();

        let plan = plan_eviction(
            entries,
            SystemTime::now(),
            self.inner.max_age,
            self.inner.max_bytes,
            &protected,
        );

        let mut report = CleanupReport {
            expired: plan.expired.len(),
            evicted: plan.oversize.len(),
            freed_bytes: 0,
            remaining_bytes: plan.remaining_bytes,
        };

        for path in plan.paths() {
            match fs::remove_file(path).await {
                Ok(()) => {
                    report.freed_bytes += sizes.get(path).copied().unwrap_or(0);
                    tracing::debug!(path = %path.display(), "Removed cached file");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove cached file");
                }
            }
        }

        if report.expired + report.evicted > 0 {
            tracing::info!(
                expired = report.expired,
                evicted = report.evicted,
                freed_bytes = report.freed_bytes,
                "Cache cleanup completed"
            );
        }
        Ok(report)
    }

    /// Run cleanup unless one ran within the cleanup interval
    pub async fn cleanup_if_due(&self) -> Option<CleanupReport> {
        let due = match *self.inner.last_cleanup.lock() {
            Some(last) => last.elapsed() >= self.inner.cleanup_interval,
            None => true,
        };
        if !due {
            return None;
        }

        match self.cleanup().await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "Cache cleanup failed");
                None
            }
        }
    }

    /// Periodic cleanup for the life of the server
    pub fn spawn_cleanup_task(&self) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cache.inner.cleanup_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = cache.cleanup().await {
                    tracing::warn!(error = %e, "Scheduled cache cleanup failed");
                }
            }
        })
    }

    async fn list_entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let mut entries = Vec::new();
        let mut dir = match fs::read_dir(&self.inner.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        while let Some(item) = dir.next_entry().await? {
            let metadata = match item.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(path = %item.path().display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            entries.push(CacheEntry {
                path: item.path(),
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(entries)
    }
}

async fn touch(path: &Path) -> Result<(), CacheError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::File::options()
            .write(true)
            .open(&path)?
            .set_modified(SystemTime::now())
    })
    .await
    .map_err(|e| CacheError::Task(e.to_string()))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn cache_in(dir: &TempDir, max_bytes: u64) -> UploadCache {
        UploadCache::new(dir.path(), 7 * DAY, max_bytes, Duration::from_secs(3600))
    }

    /// Store and release the hold right away
    async fn put(cache: &UploadCache, bytes: &[u8]) -> PathBuf {
        cache.store(bytes).await.unwrap().path
    }

    fn age_file(path: &Path, age: Duration) {
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        assert_eq!(
            compute_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_store_is_content_addressed() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, u64::MAX);

        let first = cache.store(b"%PDF-1.4 one").await.unwrap();
        assert!(!first.reused);
        assert_eq!(first.path, dir.path().join(format!("{}.pdf", first.id)));
        assert_eq!(std::fs::read(&first.path).unwrap(), b"%PDF-1.4 one");

        let again = cache.store(b"%PDF-1.4 one").await.unwrap();
        assert!(again.reused);
        assert_eq!(again.path, first.path);

        let other = cache.store(b"%PDF-1.4 two").await.unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn test_reupload_refreshes_age() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, u64::MAX);

        let path = put(&cache, b"%PDF old").await;
        age_file(&path, 30 * DAY);
        put(&cache, b"%PDF old").await;

        let report = cache.cleanup().await.unwrap();
        assert_eq!(report.expired, 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_then_oldest() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 20);

        let stale = put(&cache, &[1u8; 10]).await;
        let old = put(&cache, &[2u8; 10]).await;
        let mid = put(&cache, &[3u8; 10]).await;
        let new = put(&cache, &[4u8; 10]).await;
        age_file(&stale, 8 * DAY);
        age_file(&old, 3 * DAY);
        age_file(&mid, 2 * DAY);
        age_file(&new, DAY);

        let report = cache.cleanup().await.unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.evicted, 1);
        assert_eq!(report.freed_bytes, 20);
        assert_eq!(report.remaining_bytes, 20);

        assert!(!stale.exists());
        assert!(!old.exists());
        assert!(mid.exists());
        assert!(new.exists());
    }

    #[tokio::test]
    async fn test_cleanup_spares_protected_file() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 5);

        let current = put(&cache, &[9u8; 10]).await;
        age_file(&current, 30 * DAY);
        cache.protect(Some(current.clone()));

        let report = cache.cleanup().await.unwrap();
        assert_eq!(report.expired + report.evicted, 0);
        assert!(current.exists());

        cache.protect(None);
        cache.cleanup().await.unwrap();
        assert!(!current.exists());
    }

    #[tokio::test]
    async fn test_upload_being_loaded_survives_cleanup() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 15);

        let current = put(&cache, &[1u8; 10]).await;
        age_file(&current, DAY);
        cache.protect(Some(current.clone()));

        // Current document plus the incoming one exceed the ceiling
        let incoming = cache.store(&[2u8; 10]).await.unwrap();
        let report = cache.cleanup().await.unwrap();
        assert_eq!(report.evicted, 0);
        assert!(incoming.path.exists());
        assert!(current.exists());

        // A failed load drops the hold; the file is fair game again
        let path = incoming.path.clone();
        drop(incoming);
        let report = cache.cleanup().await.unwrap();
        assert_eq!(report.evicted, 1);
        assert!(!path.exists());
        assert!(current.exists());
    }

    #[tokio::test]
    async fn test_holds_on_the_same_file_are_counted() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 0);

        let first = cache.store(b"%PDF same").await.unwrap();
        let second = cache.store(b"%PDF same").await.unwrap();
        assert!(second.reused);

        drop(first);
        cache.cleanup().await.unwrap();
        assert!(second.path.exists());

        let path = second.path.clone();
        drop(second);
        cache.cleanup().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_if_due_runs_once_per_interval() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, u64::MAX);

        assert!(cache.cleanup_if_due().await.is_some());
        assert!(cache.cleanup_if_due().await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_of_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = UploadCache::new(
            dir.path().join("never-created"),
            DAY,
            0,
            Duration::from_secs(60),
        );
        assert_eq!(cache.cleanup().await.unwrap(), CleanupReport::default());
    }
}

//! JSON file store for the session record

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

use super::types::SessionRecord;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed session file: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct SessionStore {
    path: PathBuf,
    /// Serializes writers so the file always holds the latest save
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record, `None` when there is no file
    pub async fn read(&self) -> Result<Option<SessionRecord>, SessionError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Read the record; an unreadable file counts as no session
    pub async fn load(&self) -> Option<SessionRecord> {
        match self.read().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                None
            }
        }
    }

    /// Write the record atomically (temp file, then rename)
    pub async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        self.save_latest(|| record.clone()).await
    }

    /// Like [`SessionStore::save`], but builds the record only once this
    /// writer holds the lock, so concurrent saves land in order
    pub async fn save_latest<F>(&self, build: F) -> Result<(), SessionError>
    where
        F: FnOnce() -> SessionRecord,
    {
        let _guard = self.write_lock.lock().await;
        let record = build();
        let json = serde_json::to_vec_pretty(&record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, &json).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(
            path = %self.path.display(),
            page = record.current.current_page,
            "Saved session"
        );
        Ok(())
    }
}

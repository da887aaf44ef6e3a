//! Persistence for version records.
//!
//! The detector never touches the filesystem directly: it talks to a
//! [`VersionStore`]. [`MemoryVersionStore`] is the default;
//! [`FileVersionStore`] keeps one JSON file per base-address digest so the
//! detected version survives across processes.

use crate::CachedVersionRecord;
use lectern_error::{LecternResult, StorageError, StorageErrorKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Persistence capability for version records.
#[async_trait::async_trait]
pub trait VersionStore: Send + Sync {
    /// Load the record stored under `key`.
    async fn load(&self, key: &str) -> LecternResult<Option<CachedVersionRecord>>;

    /// Store a record under `key`, replacing any previous one.
    async fn save(&self, key: &str, record: &CachedVersionRecord) -> LecternResult<()>;

    /// Delete the record under `key`; absent keys are not an error.
    async fn remove(&self, key: &str) -> LecternResult<()>;
}

/// Process-local version store.
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    records: RwLock<HashMap<String, CachedVersionRecord>>,
}

impl MemoryVersionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl VersionStore for MemoryVersionStore {
    async fn load(&self, key: &str) -> LecternResult<Option<CachedVersionRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, record: &CachedVersionRecord) -> LecternResult<()> {
        self.records
            .write()
            .await
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> LecternResult<()> {
        self.records.write().await.remove(key);
        Ok(())
    }
}

/// Filesystem version store.
///
/// Layout: `{base_path}/{key}.json`, written through a temp file and renamed
/// into place.
#[derive(Debug, Clone)]
pub struct FileVersionStore {
    base_path: PathBuf,
}

impl FileVersionStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> LecternResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::debug!(path = %base_path.display(), "Opened version store");
        Ok(Self { base_path })
    }

    /// Store rooted at the user cache directory (`<cache>/lectern/version`).
    ///
    /// # Errors
    ///
    /// Returns error if the platform has no cache directory or it cannot be created.
    pub fn in_user_cache() -> LecternResult<Self> {
        let dir = Self::default_dir().ok_or_else(|| {
            StorageError::new(StorageErrorKind::Unavailable(
                "no user cache directory on this platform".to_string(),
            ))
        })?;
        Self::new(dir)
    }

    /// Default directory under the user cache directory.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("lectern").join("version"))
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.json"))
    }
}

#[async_trait::async_trait]
impl VersionStore for FileVersionStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self, key: &str) -> LecternResult<Option<CachedVersionRecord>> {
        let path = self.path_for(key);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(&path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", path.display(), e)))
        })?;
        let record = serde_json::from_str(&json).map_err(|e| {
            StorageError::new(StorageErrorKind::Corrupt(format!("{}: {}", path.display(), e)))
        })?;
        Ok(Some(record))
    }

    #[tracing::instrument(skip(self, record))]
    async fn save(&self, key: &str, record: &CachedVersionRecord) -> LecternResult<()> {
        let path = self.path_for(key);
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::new(StorageErrorKind::Corrupt(e.to_string())))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, json).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::debug!(path = %path.display(), "Saved version record");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, key: &str) -> LecternResult<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::new(StorageErrorKind::FileRemove(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }
}

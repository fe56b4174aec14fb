//! JSON-file snapshot cache.

use crate::{CacheClock, CacheEntry, CacheKey, MetricsCache, SystemClock};
use async_trait::async_trait;
use reach_core::{MetricsSnapshot, Platform};
use reach_error::{CacheError, CacheErrorKind, ReachResult};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// One JSON document per key on local disk.
///
/// Layout: `{base_path}/{platform}/{hash[0:2]}/{hash}.json`, where `hash`
/// is the SHA-256 of the canonical identifier. Writes go to a uniquely
/// named temp file and are renamed into place, so a reader never sees a
/// half-written entry and concurrent writers simply race to the last rename.
#[derive(Debug, Clone)]
pub struct FileSystemMetricsCache {
    base_path: PathBuf,
    clock: Arc<dyn CacheClock>,
}

impl FileSystemMetricsCache {
    /// Create a cache rooted at `base_path`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> ReachResult<Self> {
        Self::with_clock(base_path, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn with_clock(base_path: impl Into<PathBuf>, clock: Arc<dyn CacheClock>) -> ReachResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Opened filesystem metrics cache");
        Ok(Self { base_path, clock })
    }

    fn compute_hash(canonical: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let hash = Self::compute_hash(key.canonical());
        self.base_path
            .join(key.platform().as_str())
            .join(&hash[0..2])
            .join(format!("{}.json", hash))
    }
}

#[async_trait]
impl MetricsCache for FileSystemMetricsCache {
    #[tracing::instrument(skip(self), fields(platform = %platform))]
    async fn get(
        &self,
        platform: Platform,
        canonical: &str,
        max_age: Duration,
    ) -> ReachResult<Option<CacheEntry>> {
        let key = CacheKey::new(platform, canonical);
        let path = self.entry_path(&key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Cache miss");
                return Ok(None);
            }
            Err(e) => {
                return Err(CacheError::new(CacheErrorKind::Read(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into());
            }
        };

        let entry: CacheEntry = serde_json::from_slice(&bytes).map_err(|e| {
            CacheError::new(CacheErrorKind::Serialize(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;

        if entry.key() != &key {
            tracing::warn!(stored = %entry.key(), "Cache file holds a different key");
            return Ok(None);
        }

        let now = self.clock.now();
        if !entry.is_fresh_at(now, max_age) {
            tracing::debug!(age = ?entry.age_at(now), ?max_age, "Cache entry stale");
            return Ok(None);
        }

        tracing::debug!(age = ?entry.age_at(now), "Cache hit");
        Ok(Some(entry))
    }

    #[tracing::instrument(skip(self, snapshot), fields(platform = %platform))]
    async fn put(
        &self,
        platform: Platform,
        canonical: &str,
        snapshot: MetricsSnapshot,
    ) -> ReachResult<()> {
        let key = CacheKey::new(platform, canonical);
        let path = self.entry_path(&key);
        let entry = CacheEntry::new(key, snapshot, self.clock.now());

        let json = serde_json::to_vec_pretty(&entry)
            .map_err(|e| CacheError::new(CacheErrorKind::Serialize(e.to_string())))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&temp_path, &json).await.map_err(|e| {
            CacheError::new(CacheErrorKind::Write(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::new(CacheErrorKind::Write(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
            .into());
        }

        tracing::debug!(path = %path.display(), size = json.len(), "Stored snapshot");
        Ok(())
    }
}

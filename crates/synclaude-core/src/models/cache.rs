//! File-backed model cache with a time-to-live
//!
//! The snapshot is a single JSON file:
//! `{ "models": [...], "timestamp": "<RFC 3339>", "count": n }`.
//! Every failure here is soft: a bad or missing cache reads as "no cache" so
//! the caller falls through to a fresh fetch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};

use super::record::{parse_model_entry, ModelRecord};

/// On-disk snapshot layout.
#[derive(Debug, Serialize, Deserialize)]
struct CacheSnapshot {
    models: Vec<Value>,
    timestamp: DateTime<Utc>,
    count: usize,
}

/// Read-only diagnostics about the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub exists: bool,
    pub path: PathBuf,
    pub modified_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    pub record_count: usize,
    pub is_valid: bool,
}

pub struct ModelCache {
    path: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ModelCache {
    /// Create a cache at `path` whose snapshots stay valid for `ttl_hours`.
    pub fn new(path: impl Into<PathBuf>, ttl_hours: u32) -> Self {
        Self::with_clock(path, Duration::hours(i64::from(ttl_hours)), Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            ttl,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn read_snapshot(&self) -> Option<CacheSnapshot> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) => {
                debug!("Model cache not readable at {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Model cache at {} is corrupted: {}", self.path.display(), e);
                None
            }
        }
    }

    fn is_fresh(&self, saved_at: DateTime<Utc>) -> bool {
        self.clock.now() - saved_at <= self.ttl
    }

    /// True iff a readable snapshot exists and is no older than the TTL.
    pub async fn is_valid(&self) -> bool {
        match self.read_snapshot().await {
            Some(snapshot) => self.is_fresh(snapshot.timestamp),
            None => false,
        }
    }

    /// Records from a valid snapshot; empty if the snapshot is missing,
    /// expired, corrupted, or has any entry that does not parse.
    pub async fn load(&self) -> Vec<ModelRecord> {
        let Some(snapshot) = self.read_snapshot().await else {
            return Vec::new();
        };
        if !self.is_fresh(snapshot.timestamp) {
            debug!("Model cache at {} is stale", self.path.display());
            return Vec::new();
        }

        let mut records = Vec::with_capacity(snapshot.models.len());
        for (index, entry) in snapshot.models.iter().enumerate() {
            match parse_model_entry(entry) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        "Model cache entry {} does not match the record schema ({}); ignoring cache",
                        index, e
                    );
                    return Vec::new();
                }
            }
        }
        debug!("Loaded {} models from cache", records.len());
        records
    }

    /// Write a fresh snapshot. Returns `false` on any I/O or encoding failure.
    ///
    /// Writes to a temporary file first, then renames over the snapshot so a
    /// reader never sees a half-written file.
    pub async fn save(&self, records: &[ModelRecord]) -> bool {
        match self.write_snapshot(records).await {
            Ok(()) => {
                debug!("Saved {} models to {}", records.len(), self.path.display());
                true
            }
            Err(e) => {
                warn!("Failed to write model cache {}: {}", self.path.display(), e);
                false
            }
        }
    }

    async fn write_snapshot(&self, records: &[ModelRecord]) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }

        let models = records
            .iter()
            .map(|r| serde_json::to_value(r.to_raw()))
            .collect::<Result<Vec<_>, _>>()?;
        let snapshot = CacheSnapshot {
            count: models.len(),
            models,
            timestamp: self.clock.now(),
        };
        let data = serde_json::to_string_pretty(&snapshot)?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await
    }

    /// Delete the snapshot. Deleting a missing snapshot counts as success.
    pub async fn clear(&self) -> bool {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to clear model cache {}: {}", self.path.display(), e);
                false
            }
        }
    }

    pub async fn info(&self) -> CacheInfo {
        let missing = CacheInfo {
            exists: false,
            path: self.path.clone(),
            modified_at: None,
            size_bytes: 0,
            record_count: 0,
            is_valid: false,
        };

        let Ok(metadata) = tokio::fs::metadata(&self.path).await else {
            return missing;
        };
        let snapshot = self.read_snapshot().await;

        CacheInfo {
            exists: true,
            path: self.path.clone(),
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            size_bytes: metadata.len(),
            record_count: snapshot.as_ref().map(|s| s.count).unwrap_or(0),
            is_valid: snapshot.is_some_and(|s| self.is_fresh(s.timestamp)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn records() -> Vec<ModelRecord> {
        vec![
            ModelRecord::new("hf:a/one").unwrap(),
            ModelRecord::new("hf:b/two").unwrap().with_context_length(128_000),
        ]
    }

    fn cache_in(dir: &Path, clock: Arc<ManualClock>) -> ModelCache {
        ModelCache::with_clock(dir.join("models_cache.json"), Duration::hours(24), clock)
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache_in(dir.path(), clock);

        assert!(cache.save(&records()).await);
        assert!(cache.is_valid().await);
        assert_eq!(cache.load().await, records());
        assert!(!dir.path().join("models_cache.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let cache = cache_in(dir.path(), clock.clone());
        assert!(cache.save(&records()).await);

        clock.set(start + Duration::hours(24) - Duration::seconds(1));
        assert!(cache.is_valid().await);
        assert_eq!(cache.load().await.len(), 2);

        clock.set(start + Duration::hours(24) + Duration::seconds(1));
        assert!(!cache.is_valid().await);
        assert!(cache.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_corrupted_cache() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache_in(dir.path(), clock);

        assert!(!cache.is_valid().await);
        assert!(cache.load().await.is_empty());

        std::fs::write(cache.path(), "{ not json").unwrap();
        assert!(!cache.is_valid().await);
        assert!(cache.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_schema_mismatch_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache_in(dir.path(), clock.clone());

        let snapshot = serde_json::json!({
            "models": [{"id": "hf:ok/model"}, {"name": "missing id"}],
            "timestamp": clock.now(),
            "count": 2
        });
        std::fs::write(cache.path(), snapshot.to_string()).unwrap();

        assert!(cache.is_valid().await);
        assert!(cache.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache_in(dir.path(), clock);

        assert!(cache.save(&records()).await);
        assert!(cache.clear().await);
        assert!(!cache.path().exists());
        assert!(cache.clear().await);
    }

    #[tokio::test]
    async fn test_save_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        // Parent "directory" is a regular file, so create_dir_all fails
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ModelCache::with_clock(blocker.join("cache.json"), Duration::hours(1), clock);

        assert!(!cache.save(&records()).await);
    }

    #[tokio::test]
    async fn test_info() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache_in(dir.path(), clock);

        let info = cache.info().await;
        assert!(!info.exists);
        assert_eq!(info.record_count, 0);
        assert!(!info.is_valid);

        assert!(cache.save(&records()).await);
        let info = cache.info().await;
        assert!(info.exists);
        assert_eq!(info.record_count, 2);
        assert!(info.size_bytes > 0);
        assert!(info.modified_at.is_some());
        assert!(info.is_valid);
        assert_eq!(info.path, cache.path());
    }
}

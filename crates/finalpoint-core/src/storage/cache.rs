//! Named cache buckets of request/response pairs.
//!
//! A bucket is created on first `open` or `put` and lives until `delete`.
//! Entries are stamped with the time they were stored; nothing here ever
//! expires an entry on its own.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::StorageError;
use crate::http::Response;

/// Bucket file extension for on-disk storage
const BUCKET_EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

}

/// Render how long ago `at` was, rounded to the nearest sensible unit.
pub fn age_display(at: DateTime<Utc>) -> String {
    let minutes = (Utc::now() - at).num_minutes();
    if minutes < 1 {
        // Also covers clock skew (negative ages)
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Listing entry for a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSummary {
    pub name: String,
    pub entries: usize,
    pub newest: Option<DateTime<Utc>>,
}

impl BucketSummary {
    fn from_entries(name: &str, entries: &Bucket) -> Self {
        Self {
            name: name.to_string(),
            entries: entries.len(),
            newest: entries.values().map(|e| e.cached_at).max(),
        }
    }

    pub fn age_display(&self) -> String {
        self.newest
            .map(age_display)
            .unwrap_or_else(|| "never".to_string())
    }
}

type Bucket = BTreeMap<String, CachedData<Response>>;

#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the bucket if it does not exist.
    async fn open(&self, name: &str) -> Result<(), StorageError>;

    /// Names of all existing buckets.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Remove a bucket. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;

    async fn match_request(&self, name: &str, key: &str)
        -> Result<Option<Response>, StorageError>;

    /// Store `response` under `key`, creating the bucket if needed.
    async fn put(&self, name: &str, key: &str, response: Response) -> Result<(), StorageError>;

    async fn summaries(&self) -> Result<Vec<BucketSummary>, StorageError>;
}

// ============================================================================
// In-memory storage
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<BTreeMap<String, Bucket>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<(), StorageError> {
        self.buckets
            .write()
            .await
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.buckets.write().await.remove(name).is_some())
    }

    async fn match_request(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<Response>, StorageError> {
        Ok(self
            .buckets
            .read()
            .await
            .get(name)
            .and_then(|bucket| bucket.get(key))
            .map(|entry| entry.data.clone()))
    }

    async fn put(&self, name: &str, key: &str, response: Response) -> Result<(), StorageError> {
        self.buckets
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), CachedData::new(response));
        Ok(())
    }

    async fn summaries(&self) -> Result<Vec<BucketSummary>, StorageError> {
        Ok(self
            .buckets
            .read()
            .await
            .iter()
            .map(|(name, bucket)| BucketSummary::from_entries(name, bucket))
            .collect())
    }
}

// ============================================================================
// On-disk storage
// ============================================================================

/// One JSON file per bucket under `cache_dir`.
///
/// All operations are serialized through a single lock so concurrent
/// read-modify-write cycles on the same bucket cannot lose entries. File
/// I/O goes through `tokio::fs`, so waiting on the disk never blocks a
/// runtime worker.
pub struct DiskCacheStorage {
    cache_dir: PathBuf,
    lock: Mutex<()>,
}

impl DiskCacheStorage {
    pub fn new(cache_dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            lock: Mutex::new(()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn bucket_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self
            .cache_dir
            .join(format!("{}.{}", name, BUCKET_EXTENSION)))
    }

    async fn load(&self, name: &str) -> Result<Option<Bucket>, StorageError> {
        let path = self.bucket_path(name)?;
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn save(&self, name: &str, bucket: &Bucket) -> Result<(), StorageError> {
        let path = self.bucket_path(name)?;
        let contents = serde_json::to_string_pretty(bucket)?;
        fs::write(path, contents).await?;
        Ok(())
    }

    async fn bucket_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BUCKET_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        if self.load(name).await?.is_none() {
            self.save(name, &Bucket::new()).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let _guard = self.lock.lock().await;
        self.bucket_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        match fs::remove_file(self.bucket_path(name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn match_request(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<Response>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load(name)
            .await?
            .and_then(|mut bucket| bucket.remove(key))
            .map(|entry| entry.data))
    }

    async fn put(&self, name: &str, key: &str, response: Response) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut bucket = self.load(name).await?.unwrap_or_default();
        bucket.insert(key.to_string(), CachedData::new(response));
        self.save(name, &bucket).await
    }

    async fn summaries(&self) -> Result<Vec<BucketSummary>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut summaries = Vec::new();
        for name in self.bucket_names().await? {
            match self.load(&name).await {
                Ok(Some(bucket)) => summaries.push(BucketSummary::from_entries(&name, &bucket)),
                Ok(None) => {}
                Err(e) => {
                    debug!(bucket = %name, error = %e, "Skipping unreadable bucket");
                }
            }
        }
        Ok(summaries)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseType;
    use chrono::Duration;

    fn page(body: &str) -> Response {
        Response::new("https://finalpoint.app/", 200, ResponseType::Basic).with_body(body)
    }

    #[test]
    fn test_age_display() {
        assert_eq!(age_display(Utc::now()), "just now");
        assert_eq!(age_display(Utc::now() + Duration::minutes(5)), "just now");
        assert_eq!(age_display(Utc::now() - Duration::minutes(5)), "5m ago");
        assert_eq!(age_display(Utc::now() - Duration::minutes(95)), "2h ago");
        assert_eq!(age_display(Utc::now() - Duration::hours(30)), "1d ago");
        assert_eq!(age_display(Utc::now() - Duration::hours(40)), "2d ago");
    }

    #[tokio::test]
    async fn test_memory_put_match_delete() {
        let storage = MemoryCacheStorage::new();
        storage.put("v1", "https://finalpoint.app/", page("shell")).await.unwrap();

        let hit = storage.match_request("v1", "https://finalpoint.app/").await.unwrap();
        assert_eq!(hit.map(|r| r.body), Some(b"shell".to_vec()));
        assert!(storage.match_request("v2", "https://finalpoint.app/").await.unwrap().is_none());

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_open_creates_empty_bucket() {
        let storage = MemoryCacheStorage::new();
        storage.open("v1").await.unwrap();
        storage.open("v1").await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["v1".to_string()]);
        let summaries = storage.summaries().await.unwrap();
        assert_eq!(summaries[0].entries, 0);
        assert_eq!(summaries[0].age_display(), "never");
    }

    #[tokio::test]
    async fn test_disk_roundtrip_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let storage = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
            storage.open("finalpoint-v1").await.unwrap();
            storage
                .put("finalpoint-v1", "https://finalpoint.app/", page("shell"))
                .await
                .unwrap();
        }

        let storage = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["finalpoint-v1".to_string()]);
        let hit = storage
            .match_request("finalpoint-v1", "https://finalpoint.app/")
            .await
            .unwrap()
            .expect("entry persisted");
        assert_eq!(hit.body, b"shell".to_vec());

        let summaries = storage.summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].entries, 1);
        assert_eq!(summaries[0].age_display(), "just now");
    }

    #[tokio::test]
    async fn test_disk_delete_and_missing_bucket() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        assert!(storage.match_request("old", "k").await.unwrap().is_none());
        storage.open("old").await.unwrap();
        assert!(storage.delete("old").await.unwrap());
        assert!(!storage.delete("old").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_disk_concurrent_puts_keep_every_entry() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = std::sync::Arc::new(DiskCacheStorage::new(dir.path().to_path_buf()).unwrap());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    let key = format!("https://finalpoint.app/leagues/{}", i);
                    storage.put("finalpoint-v1", &key, page("league")).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let summaries = storage.summaries().await.unwrap();
        assert_eq!(summaries[0].entries, 16);
    }

    #[tokio::test]
    async fn test_disk_rejects_path_like_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        assert!(matches!(
            storage.open("../escape").await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(storage.open("").await, Err(StorageError::InvalidName(_))));
    }
}

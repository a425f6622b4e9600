//! Single-slot expiring cache of the last successful fetch.
//!
//! The payload and the time it was stored live under two fixed keys of a
//! [`KeyValueStore`]. [`ExpiringCache::read`] reports the entry's age and
//! leaves the freshness decision to the caller.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use std::{
    collections::HashMap,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;
use tracing::debug;

use crate::{clock::Clock, model::RawCityReading, wire};

pub const CACHE_KEY: &str = "airQualityData";
pub const CACHE_TIMESTAMP_KEY: &str = "airQualityDataTimestamp";

/// Maximum age at which cached readings are served without refetching.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(#[from] io::Error),

    #[error("cache entry is corrupt: {0}")]
    Corrupt(String),
}

/// Durable key/value surface backing the cache.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the platform cache directory.
    pub fn in_cache_dir() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("dev", "respira", "respira")
            .ok_or_else(|| anyhow!("Could not determine platform cache directory"))?;

        Ok(Self::new(dirs.cache_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// A cache hit, fresh or not.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedReadings {
    pub payload: Vec<RawCityReading>,
    pub stored_at: DateTime<Utc>,
    pub age: Duration,
}

impl CachedReadings {
    pub fn is_fresh(&self, window: Duration) -> bool {
        self.age < window
    }
}

#[derive(Debug, Clone)]
pub struct ExpiringCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ExpiringCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Read the stored entry, if any. Freshness is not judged here.
    pub fn read(&self) -> Result<Option<CachedReadings>, CacheError> {
        let Some(body) = self.store.get(CACHE_KEY)? else {
            return Ok(None);
        };

        let stamp = self
            .store
            .get(CACHE_TIMESTAMP_KEY)?
            .ok_or_else(|| CacheError::Corrupt("payload present without timestamp".into()))?;

        let millis: i64 = stamp
            .trim()
            .parse()
            .map_err(|_| CacheError::Corrupt(format!("invalid timestamp {stamp:?}")))?;
        let stored_at = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| CacheError::Corrupt(format!("timestamp {millis} out of range")))?;

        let payload =
            wire::decode_readings(&body).map_err(|e| CacheError::Corrupt(e.to_string()))?;

        // An entry stamped in the future (clock moved back) counts as brand new.
        let age = (self.clock.now() - stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        debug!(
            readings = payload.len(),
            age_ms = age.as_millis() as u64,
            "cache entry read"
        );

        Ok(Some(CachedReadings {
            payload,
            stored_at,
            age,
        }))
    }

    /// Replace the entry with `payload`, stamped with the current time.
    pub fn write(&self, payload: &[RawCityReading]) -> Result<(), CacheError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| CacheError::Corrupt(format!("payload not serializable: {e}")))?;
        let now = self.clock.now();

        self.store.set(CACHE_KEY, &body)?;
        self.store.set(CACHE_TIMESTAMP_KEY, &now.timestamp_millis().to_string())?;

        debug!(readings = payload.len(), "cache entry written");
        Ok(())
    }
}

use crate::core::currency::{Currency, RateDate, RateMap};
use crate::core::error::StoreError;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::debug;

/// Identifies one cached rate map, serialized as `{BASE}_{date}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub base: Currency,
    pub date: RateDate,
}

impl CacheKey {
    pub fn new(base: Currency, date: RateDate) -> Self {
        Self { base, date }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.base, self.date)
    }
}

impl FromStr for CacheKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, date) = s
            .split_once('_')
            .ok_or_else(|| format!("invalid cache key: {s}"))?;
        Ok(CacheKey {
            base: base.parse().map_err(|e| format!("{e}"))?,
            date: date
                .parse()
                .map_err(|e| format!("invalid date in cache key {s}: {e}"))?,
        })
    }
}

impl Serialize for CacheKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CacheKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(de::Error::custom)
    }
}

/// Every rate map fetched so far. Entries are never replaced or evicted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateCache {
    entries: BTreeMap<CacheKey, RateMap>,
}

impl RateCache {
    pub fn get(&self, key: &CacheKey) -> Option<&RateMap> {
        let value = self.entries.get(key);
        if value.is_some() {
            debug!("Cache HIT for key: {}", key);
        } else {
            debug!("Cache MISS for key: {}", key);
        }
        value
    }

    /// Inserts `rates` unless `key` is already cached. Returns whether it was inserted.
    pub fn insert(&mut self, key: CacheKey, rates: RateMap) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, rates);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// JSON file holding the whole [`RateCache`], read and written wholesale.
pub struct CacheStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cache file. A missing file is an empty cache.
    pub fn load(&self) -> Result<RateCache, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No rate cache at {}, starting empty", self.path.display());
                return Ok(RateCache::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the cache file with `cache`.
    ///
    /// Writes to a sibling temp file and renames it over the old one, so an
    /// interrupted write leaves the previous cache intact.
    pub fn save(&self, cache: &RateCache) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let bytes = serde_json::to_vec(cache).map_err(StoreError::Encode)?;
        let tmp_path = self.path.with_extension("json.tmp");
        let result = fs::write(&tmp_path, bytes).and_then(|_| fs::rename(&tmp_path, &self.path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result.map_err(io_err)?;

        debug!(entries = cache.len(), "Saved rate cache to {}", self.path.display());
        Ok(())
    }

    /// Adds one entry and persists the cache.
    ///
    /// The file is re-read under a lock right before the write so entries
    /// stored since the caller's last `load` are kept.
    pub async fn put(&self, key: CacheKey, rates: RateMap) -> Result<RateCache, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut cache = self.load()?;
        if cache.insert(key, rates) {
            debug!("Cache PUT for key: {}", key);
            self.save(&cache)?;
        }
        Ok(cache)
    }
}

//! Two-tier content-addressed cache for readerforge pipeline artifacts.
//!
//! The memory tier is a strict LRU over recent entries; the disk tier fans
//! entries out under `<cache_dir>/<first two hex digits>/<full key>.json`.
//! A `get` never fails on disk corruption: a checksum mismatch is logged,
//! the entry is evicted, and the call is reported as a miss, exactly as a
//! `set` failure on disk never invalidates what is already in memory.

mod disk;
mod key;
mod lru;
mod stats;

use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use camino::Utf8PathBuf;
use readerforge_types::ContentHash;
use serde::{de::DeserializeOwned, Serialize};

pub use key::CacheKey;
pub use stats::CacheStats;

use disk::DiskTier;
use lru::LruCache;

/// A single stored value plus the bookkeeping needed for TTL-at-read and
/// corruption detection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    pub value_hash: ContentHash,
    pub stored_at: chrono::DateTime<chrono::Utc>,
    pub ttl_secs: u64,
}

impl<V> CacheEntry<V> {
    pub(crate) fn is_expired(&self, now: SystemTime) -> bool {
        let stored_at: SystemTime = self.stored_at.into();
        match stored_at.elapsed() {
            Ok(_) => now
                .duration_since(stored_at)
                .map(|age| age > Duration::from_secs(self.ttl_secs))
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Outcome of a `warm` batch call: each entry either succeeded or carries
/// its own failure, isolated from the rest of the batch.
pub struct WarmOutcome {
    pub key: CacheKey,
    pub error: Option<String>,
}

const DEFAULT_MIN_TTL: Duration = Duration::from_secs(60);
const DEFAULT_MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Disk cleanup only sweeps every Nth `get` miss-scan, matching the
/// teacher's periodic-but-not-every-call cache housekeeping rhythm.
const DISK_SWEEP_EVERY: u64 = 32;

/// A two-tier content-addressed cache over values of type `V`.
pub struct ContentStore<V> {
    memory: Mutex<LruCache<String, CacheEntry<V>>>,
    disk: DiskTier,
    stats: Mutex<CacheStats>,
    min_ttl: Duration,
    max_ttl: Duration,
    sweep_counter: Mutex<u64>,
}

impl<V> ContentStore<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    #[must_use]
    pub fn new(cache_dir: impl Into<Utf8PathBuf>, memory_capacity: usize) -> Self {
        Self {
            memory: Mutex::new(LruCache::new(memory_capacity)),
            disk: DiskTier::new(cache_dir.into()),
            stats: Mutex::new(CacheStats::default()),
            min_ttl: DEFAULT_MIN_TTL,
            max_ttl: DEFAULT_MAX_TTL,
            sweep_counter: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn with_ttl_bounds(mut self, min_ttl: Duration, max_ttl: Duration) -> Self {
        self.min_ttl = min_ttl;
        self.max_ttl = max_ttl;
        self
    }

    /// Look up `key`. Checks memory first, then disk; a disk hit is
    /// promoted back into memory. Corruption or an expired entry is
    /// reported as a plain miss, never an error.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = SystemTime::now();
        let raw = key.as_str();

        if let Some(entry) = self.memory.lock().unwrap().get(raw) {
            if entry.is_expired(now) {
                self.memory.lock().unwrap().remove(raw);
            } else {
                self.stats.lock().unwrap().record_hit();
                return Some(entry.value.clone());
            }
        }

        self.maybe_sweep();

        match self.disk.read::<V>(key) {
            Ok(Some(entry)) if !entry.is_expired(now) => {
                self.memory
                    .lock()
                    .unwrap()
                    .insert(raw.to_string(), entry.clone());
                self.stats.lock().unwrap().record_hit();
                Some(entry.value)
            }
            Ok(Some(_)) => {
                // Expired on disk: evict and report a miss.
                let _ = self.disk.delete(key);
                self.stats.lock().unwrap().record_miss();
                None
            }
            Ok(None) => {
                self.stats.lock().unwrap().record_miss();
                None
            }
            Err(reason) => {
                tracing::warn!(key = raw, %reason, "cache entry corrupted, evicting");
                let _ = self.disk.delete(key);
                self.stats.lock().unwrap().record_invalidation();
                None
            }
        }
    }

    /// Store `value` under `key`. `ttl` is clamped to `[min_ttl, max_ttl]`.
    /// A disk write failure is logged but never unwinds the memory write
    /// that already happened.
    pub fn set(&self, key: &CacheKey, value: V, ttl: Duration) -> ContentHash {
        let ttl = ttl.clamp(self.min_ttl, self.max_ttl);
        let value_hash = readerforge_canon::hash_canonical_json(&value)
            .unwrap_or_else(|_| ContentHash::from_hex(&"0".repeat(64)));
        let entry = CacheEntry {
            value,
            value_hash: value_hash.clone(),
            stored_at: chrono::Utc::now(),
            ttl_secs: ttl.as_secs(),
        };

        self.memory
            .lock()
            .unwrap()
            .insert(key.as_str().to_string(), entry.clone());
        self.stats.lock().unwrap().record_write();

        if let Err(reason) = self.disk.write(key, &entry) {
            tracing::warn!(key = key.as_str(), %reason, "cache disk write failed");
        }

        value_hash
    }

    pub fn delete(&self, key: &CacheKey) {
        self.memory.lock().unwrap().remove(key.as_str());
        let _ = self.disk.delete(key);
        self.stats.lock().unwrap().record_invalidation();
    }

    pub fn clear(&self) {
        self.memory.lock().unwrap().clear();
        let _ = self.disk.clear();
        *self.stats.lock().unwrap() = CacheStats::default();
    }

    /// Load a batch of `(key, value, ttl)` entries, isolating per-entry
    /// failures instead of aborting the whole batch.
    pub fn warm(&self, batch: Vec<(CacheKey, V, Duration)>) -> Vec<WarmOutcome> {
        batch
            .into_iter()
            .map(|(key, value, ttl)| {
                self.set(&key, value, ttl);
                WarmOutcome { key, error: None }
            })
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().unwrap().clone()
    }

    fn maybe_sweep(&self) {
        let mut counter = self.sweep_counter.lock().unwrap();
        *counter += 1;
        if *counter % DISK_SWEEP_EVERY == 0 {
            self.memory.lock().unwrap().evict_expired(SystemTime::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        body: String,
    }

    fn key(s: &str) -> CacheKey {
        CacheKey::new("plan", s)
    }

    #[test]
    fn set_then_get_round_trips_through_memory() {
        let dir = tempdir().unwrap();
        let store: ContentStore<Payload> =
            ContentStore::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(), 8);
        let k = key("alpha");
        store.set(
            &k,
            Payload {
                body: "hello".into(),
            },
            Duration::from_secs(300),
        );
        assert_eq!(
            store.get(&k),
            Some(Payload {
                body: "hello".into()
            })
        );
        assert_eq!(store.stats().hits, 1);
    }

    #[test]
    fn disk_hit_promotes_into_memory_after_eviction() {
        let dir = tempdir().unwrap();
        let store: ContentStore<Payload> =
            ContentStore::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(), 1);
        let a = key("a");
        let b = key("b");
        store.set(
            &a,
            Payload { body: "a".into() },
            Duration::from_secs(300),
        );
        // Capacity 1: inserting b evicts a from memory, but a survives on disk.
        store.set(
            &b,
            Payload { body: "b".into() },
            Duration::from_secs(300),
        );
        assert_eq!(store.get(&a), Some(Payload { body: "a".into() }));
    }

    #[test]
    fn expired_entry_is_reported_as_a_miss() {
        let dir = tempdir().unwrap();
        let store: ContentStore<Payload> = ContentStore::new(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
            8,
        )
        .with_ttl_bounds(Duration::from_secs(0), Duration::from_secs(0));
        let k = key("expired");
        store.set(&k, Payload { body: "x".into() }, Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(store.get(&k), None);
    }

    #[test]
    fn corrupted_disk_entry_is_evicted_and_reported_as_a_miss() {
        let dir = tempdir().unwrap();
        let cache_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let store: ContentStore<Payload> = ContentStore::new(cache_dir.clone(), 0);
        let k = key("broken");
        store.set(
            &k,
            Payload {
                body: "fine".into(),
            },
            Duration::from_secs(300),
        );
        let path = disk::entry_path(&cache_dir, &k);
        std::fs::write(&path, b"not json").unwrap();
        assert_eq!(store.get(&k), None);
        assert_eq!(store.stats().invalidations, 1);
    }

    #[test]
    fn delete_removes_from_both_tiers() {
        let dir = tempdir().unwrap();
        let store: ContentStore<Payload> =
            ContentStore::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(), 8);
        let k = key("gone");
        store.set(&k, Payload { body: "y".into() }, Duration::from_secs(300));
        store.delete(&k);
        assert_eq!(store.get(&k), None);
    }
}

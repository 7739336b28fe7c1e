//! Disk tier: one JSON file per entry under `<cache_dir>/<fanout>/<key>.json`,
//! written through the atomic publisher so a reader never observes a
//! half-written file.

use camino::Utf8PathBuf;
use serde::{de::DeserializeOwned, Serialize};

use crate::{CacheEntry, CacheKey};

pub struct DiskTier {
    root: Utf8PathBuf,
}

/// Turn a cache key into its on-disk path. Exposed at `pub(crate)` for the
/// crate's own tests, which corrupt a file directly to exercise the
/// checksum-mismatch path.
pub(crate) fn entry_path(root: &Utf8PathBuf, key: &CacheKey) -> Utf8PathBuf {
    root.join(key.fanout_prefix())
        .join(format!("{}.json", sanitize(key.as_str())))
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl DiskTier {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn read<V: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<CacheEntry<V>>, String> {
        let path = entry_path(&self.root, key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.to_string()),
        };
        let entry: CacheEntry<V> =
            serde_json::from_slice(&bytes).map_err(|err| format!("malformed cache entry: {err}"))?;
        let recomputed = readerforge_canon::hash_canonical_json(&entry.value)
            .map_err(|err| format!("could not rehash cache entry: {err}"))?;
        if recomputed != entry.value_hash {
            return Err("checksum mismatch".to_string());
        }
        Ok(Some(entry))
    }

    pub fn write<V: Serialize>(&self, key: &CacheKey, entry: &CacheEntry<V>) -> Result<(), String> {
        let path = entry_path(&self.root, key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(entry).map_err(|err| err.to_string())?;
        std::fs::write(&tmp, &bytes).map_err(|err| err.to_string())?;
        std::fs::rename(&tmp, &path).map_err(|err| err.to_string())
    }

    pub fn delete(&self, key: &CacheKey) -> Result<(), String> {
        let path = entry_path(&self.root, key);
        match std::fs::remove_file(&path) {
            Ok(()) | Err(_) => Ok(()),
        }
    }

    pub fn clear(&self) -> Result<(), String> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root).map_err(|err| err.to_string())?;
        }
        Ok(())
    }
}

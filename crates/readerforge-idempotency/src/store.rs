use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use camino::Utf8PathBuf;
use chrono::Utc;
use readerforge_types::CorrelationId;
use serde_json::Value;

use crate::record::{IdempotencyRecord, RecordState};

#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError {
    #[error("failed to persist idempotency record {key}: {reason}")]
    Persist { key: String, reason: String },

    #[error("failed to read idempotency record {key}: {reason}")]
    Read { key: String, reason: String },
}

/// Tracks in-flight and completed requests by fingerprint, so a retried or
/// duplicated submission short-circuits to the prior result instead of
/// re-running the pipeline.
pub struct IdempotencyStore {
    cache_dir: Utf8PathBuf,
    memory: Mutex<HashMap<String, IdempotencyRecord>>,
    default_ttl_secs: u64,
}

impl IdempotencyStore {
    #[must_use]
    pub fn new(cache_dir: impl Into<Utf8PathBuf>, default_ttl_secs: u64) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            memory: Mutex::new(HashMap::new()),
            default_ttl_secs,
        }
    }

    fn record_path(&self, key: &str) -> Utf8PathBuf {
        let fanout = key.get(0..2).unwrap_or("00");
        self.cache_dir
            .join("idempotency")
            .join(fanout)
            .join(format!("{key}.json"))
    }

    /// Return the existing record for `key` if present and not expired,
    /// checking memory first and falling back to disk.
    pub fn check_duplicate(&self, key: &str) -> Result<Option<IdempotencyRecord>, IdempotencyError> {
        if let Some(record) = self.memory.lock().unwrap().get(key).cloned() {
            if !record.is_expired(Utc::now()) {
                return Ok(Some(record));
            }
        }

        let path = self.record_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => {
                let record: IdempotencyRecord =
                    serde_json::from_slice(&bytes).map_err(|err| IdempotencyError::Read {
                        key: key.to_string(),
                        reason: err.to_string(),
                    })?;
                if record.is_expired(Utc::now()) {
                    Ok(None)
                } else {
                    self.memory
                        .lock()
                        .unwrap()
                        .insert(key.to_string(), record.clone());
                    Ok(Some(record))
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(IdempotencyError::Read {
                key: key.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    /// Reserve `key` in state `registered`. A second registration for the
    /// same still-live key returns the existing record unchanged.
    pub fn register_request(
        &self,
        key: &str,
        correlation_id: CorrelationId,
        metadata: BTreeMap<String, String>,
    ) -> Result<IdempotencyRecord, IdempotencyError> {
        if let Some(existing) = self.check_duplicate(key)? {
            return Ok(existing);
        }

        let record = IdempotencyRecord {
            key: key.to_string(),
            correlation_id,
            metadata,
            state: RecordState::Registered,
            result: None,
            error: None,
            registered_at: Utc::now(),
            completed_at: None,
            ttl_secs: self.default_ttl_secs,
        };
        self.persist(&record)?;
        Ok(record)
    }

    /// Transition `key` to `completed` (or `failed` if `error` is set).
    /// Idempotent: completing an already-completed or already-failed
    /// record returns the existing record rather than overwriting it.
    pub fn complete_request(
        &self,
        key: &str,
        result: Option<Value>,
        error: Option<String>,
    ) -> Result<IdempotencyRecord, IdempotencyError> {
        let mut memory = self.memory.lock().unwrap();
        let Some(mut record) = memory.get(key).cloned() else {
            return Err(IdempotencyError::Read {
                key: key.to_string(),
                reason: "no registered record for this key".to_string(),
            });
        };

        if record.state != RecordState::Registered {
            return Ok(record);
        }

        record.state = if error.is_some() {
            RecordState::Failed
        } else {
            RecordState::Completed
        };
        record.result = result;
        record.error = error;
        record.completed_at = Some(Utc::now());

        memory.insert(key.to_string(), record.clone());
        drop(memory);
        self.persist(&record)?;
        Ok(record)
    }

    fn persist(&self, record: &IdempotencyRecord) -> Result<(), IdempotencyError> {
        self.memory
            .lock()
            .unwrap()
            .insert(record.key.clone(), record.clone());

        let path = self.record_path(&record.key);
        let bytes = serde_json::to_vec_pretty(record).map_err(|err| IdempotencyError::Persist {
            key: record.key.clone(),
            reason: err.to_string(),
        })?;
        readerforge_publish::publish(&path, &bytes, &record.correlation_id.0, false).map_err(
            |err| IdempotencyError::Persist {
                key: record.key.clone(),
                reason: err.to_string(),
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, IdempotencyStore) {
        let dir = tempdir().unwrap();
        let cache_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, IdempotencyStore::new(cache_dir, 300))
    }

    #[test]
    fn registering_twice_returns_the_same_record() {
        let (_guard, store) = store();
        let corr = CorrelationId("corr-1".to_string());
        let first = store
            .register_request("fp-1", corr.clone(), BTreeMap::new())
            .unwrap();
        let second = store
            .register_request("fp-1", corr, BTreeMap::new())
            .unwrap();
        assert_eq!(first.registered_at, second.registered_at);
    }

    #[test]
    fn completion_short_circuits_on_second_call() {
        let (_guard, store) = store();
        let corr = CorrelationId("corr-2".to_string());
        store
            .register_request("fp-2", corr, BTreeMap::new())
            .unwrap();
        let first = store
            .complete_request("fp-2", Some(serde_json::json!({"ok": true})), None)
            .unwrap();
        let second = store.complete_request("fp-2", None, Some("ignored".to_string())).unwrap();
        assert_eq!(first.completed_at, second.completed_at);
        assert_eq!(second.state, RecordState::Completed);
    }

    #[test]
    fn check_duplicate_finds_a_record_persisted_to_disk_only() {
        let (_guard, store) = store();
        let corr = CorrelationId("corr-3".to_string());
        store
            .register_request("fp-3", corr, BTreeMap::new())
            .unwrap();
        store.memory.lock().unwrap().clear();
        let found = store.check_duplicate("fp-3").unwrap();
        assert!(found.is_some());
    }
}

//! Exclusive advisory locks over a logical resource `(operation, resource_id)`.
//!
//! Generalizes a "one lock file per spec id" design to one lock file per
//! `(operation, resource_id)` pair, so distinct operations on the same
//! resource (or the same operation on distinct resources) never contend.
//! Locking is advisory: it coordinates cooperating readerforge processes,
//! not a security boundary.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use camino::Utf8PathBuf;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};

const DEFAULT_STALE_THRESHOLD_SECS: u64 = 3600;
const MAX_ACQUIRE_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub operation: String,
    pub resource_id: String,
    pub created_at: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error(
        "concurrent execution detected for {operation}/{resource_id} (pid {pid}, created {created_ago} ago)"
    )]
    ConcurrentExecution {
        operation: String,
        resource_id: String,
        pid: u32,
        created_ago: String,
    },

    #[error(
        "stale lock detected for {operation}/{resource_id} (pid {pid}, age {age_secs}s); pass force to override"
    )]
    StaleLock {
        operation: String,
        resource_id: String,
        pid: u32,
        age_secs: u64,
    },

    #[error("lock file is corrupted or invalid: {reason}")]
    CorruptedLock { reason: String },

    #[error("failed to acquire lock: {reason}")]
    AcquisitionFailed { reason: String },

    #[error("failed to release lock: {reason}")]
    ReleaseFailed { reason: String },

    #[error("I/O error during lock operation: {0}")]
    Io(#[from] io::Error),
}

fn lock_path(lock_dir: &Utf8PathBuf, operation: &str, resource_id: &str) -> PathBuf {
    lock_dir
        .as_std_path()
        .join(format!("{operation}__{resource_id}.lock"))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

fn format_duration_since(timestamp: u64) -> String {
    let age = now_secs().saturating_sub(timestamp);
    match age {
        0..=59 => format!("{age}s"),
        60..=3599 => format!("{}m", age / 60),
        _ => format!("{}h", age / 3600),
    }
}

/// An acquired lock over `(operation, resource_id)`. Released on drop.
pub struct Lock {
    lock_path: PathBuf,
    _fd_lock: Option<Box<RwLock<fs::File>>>,
    lock_info: LockInfo,
}

impl Lock {
    /// Acquire a lease, with a TTL (`ttl_seconds`, defaulting to one hour)
    /// used only to decide whether an existing lock is stale enough to
    /// override. A held lock whose owner is still alive always wins
    /// unless `force` is set — this implementation has no cross-process
    /// PID liveness probe, so an unexpired lock is always treated as
    /// live.
    pub fn acquire(
        lock_dir: &Utf8PathBuf,
        operation: &str,
        resource_id: &str,
        force: bool,
        ttl_seconds: Option<u64>,
    ) -> Result<Self, LockError> {
        fs::create_dir_all(lock_dir.as_std_path())?;
        let path = lock_path(lock_dir, operation, resource_id);
        let ttl = ttl_seconds.unwrap_or(DEFAULT_STALE_THRESHOLD_SECS);
        Self::acquire_with_retry(operation, resource_id, &path, force, ttl, MAX_ACQUIRE_RETRIES)
    }

    fn acquire_with_retry(
        operation: &str,
        resource_id: &str,
        path: &Path,
        force: bool,
        ttl_seconds: u64,
        max_retries: u32,
    ) -> Result<Self, LockError> {
        for attempt in 0..max_retries {
            let info = LockInfo {
                pid: process::id(),
                operation: operation.to_string(),
                resource_id: resource_id.to_string(),
                created_at: now_secs(),
            };

            match fs::OpenOptions::new().create_new(true).write(true).open(path) {
                Ok(file) => return Self::finalize(path.to_path_buf(), file, info),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    Self::check_existing(path, operation, resource_id, force, ttl_seconds)?;
                    Self::try_remove_stale(path)?;
                    match fs::OpenOptions::new().create_new(true).write(true).open(path) {
                        Ok(file) => return Self::finalize(path.to_path_buf(), file, info),
                        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                            if attempt + 1 < max_retries {
                                let backoff = 10u64.saturating_mul(2u64.saturating_pow(attempt));
                                std::thread::sleep(std::time::Duration::from_millis(
                                    backoff.min(100),
                                ));
                                continue;
                            }
                            return Err(LockError::AcquisitionFailed {
                                reason: format!(
                                    "another process acquired {operation}/{resource_id} immediately after stale removal"
                                ),
                            });
                        }
                        Err(err) => {
                            return Err(LockError::AcquisitionFailed {
                                reason: format!("failed to recreate lock file: {err}"),
                            });
                        }
                    }
                }
                Err(err) => {
                    return Err(LockError::AcquisitionFailed {
                        reason: format!("failed to create lock file: {err}"),
                    });
                }
            }
        }
        Err(LockError::AcquisitionFailed {
            reason: format!(
                "max retries ({max_retries}) exceeded acquiring {operation}/{resource_id}"
            ),
        })
    }

    fn finalize(path: PathBuf, file: fs::File, info: LockInfo) -> Result<Self, LockError> {
        let json = serde_json::to_string_pretty(&info).map_err(|err| LockError::AcquisitionFailed {
            reason: format!("failed to serialize lock info: {err}"),
        })?;

        let mut rw_lock = Box::new(RwLock::new(file));
        {
            let mut guard = rw_lock
                .try_write()
                .map_err(|_| LockError::ConcurrentExecution {
                    operation: info.operation.clone(),
                    resource_id: info.resource_id.clone(),
                    pid: 0,
                    created_ago: "unknown".to_string(),
                })?;
            guard
                .write_all(json.as_bytes())
                .map_err(|err| LockError::AcquisitionFailed {
                    reason: format!("failed to write lock info: {err}"),
                })?;
            guard.flush().map_err(|err| LockError::AcquisitionFailed {
                reason: format!("failed to flush lock file: {err}"),
            })?;
            guard.sync_all().map_err(|err| LockError::AcquisitionFailed {
                reason: format!("failed to sync lock file: {err}"),
            })?;
        }

        Ok(Self {
            lock_path: path,
            _fd_lock: Some(rw_lock),
            lock_info: info,
        })
    }

    fn try_remove_stale(path: &Path) -> Result<(), LockError> {
        let stale_path = path.with_extension(format!("stale.{}.{}", now_secs(), process::id()));
        match fs::rename(path, &stale_path) {
            Ok(()) => {
                let _ = fs::remove_file(&stale_path);
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(LockError::AcquisitionFailed {
                reason: format!("failed to rename stale lock: {err}"),
            }),
        }
    }

    fn check_existing(
        path: &Path,
        operation: &str,
        resource_id: &str,
        force: bool,
        ttl_seconds: u64,
    ) -> Result<(), LockError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(LockError::CorruptedLock {
                    reason: format!("failed to read existing lock: {err}"),
                })
            }
        };

        if content.is_empty() {
            return Err(LockError::CorruptedLock {
                reason: "lock file is empty; another process may still be initializing it"
                    .to_string(),
            });
        }

        let existing: LockInfo = serde_json::from_str(&content).map_err(|err| LockError::CorruptedLock {
            reason: format!("failed to parse existing lock: {err}"),
        })?;

        let age = now_secs().saturating_sub(existing.created_at);
        if age > ttl_seconds {
            if force {
                Ok(())
            } else {
                Err(LockError::StaleLock {
                    operation: operation.to_string(),
                    resource_id: resource_id.to_string(),
                    pid: existing.pid,
                    age_secs: age,
                })
            }
        } else if force {
            Ok(())
        } else {
            Err(LockError::ConcurrentExecution {
                operation: operation.to_string(),
                resource_id: resource_id.to_string(),
                pid: existing.pid,
                created_ago: format_duration_since(existing.created_at),
            })
        }
    }

    #[must_use]
    pub fn exists(lock_dir: &Utf8PathBuf, operation: &str, resource_id: &str) -> bool {
        lock_path(lock_dir, operation, resource_id).exists()
    }

    pub fn get_lock_info(
        lock_dir: &Utf8PathBuf,
        operation: &str,
        resource_id: &str,
    ) -> Result<Option<LockInfo>, LockError> {
        let path = lock_path(lock_dir, operation, resource_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|err| LockError::CorruptedLock {
            reason: format!("failed to read lock file: {err}"),
        })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| LockError::CorruptedLock {
                reason: format!("failed to parse lock file: {err}"),
            })
    }

    #[must_use]
    pub const fn lock_info(&self) -> &LockInfo {
        &self.lock_info
    }
}

impl std::fmt::Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock")
            .field("lock_path", &self.lock_path)
            .field("lock_info", &self.lock_info)
            .finish_non_exhaustive()
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        self._fd_lock.take();
        if self.lock_path.exists() {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn distinct_resources_acquire_independently() {
        let (_guard, lock_dir) = dir();
        let a = Lock::acquire(&lock_dir, "submit", "motion-001", false, None).unwrap();
        let b = Lock::acquire(&lock_dir, "submit", "motion-002", false, None).unwrap();
        drop(a);
        drop(b);
    }

    #[test]
    fn same_resource_rejects_concurrent_acquisition() {
        let (_guard, lock_dir) = dir();
        let _held = Lock::acquire(&lock_dir, "submit", "motion-001", false, None).unwrap();
        let err = Lock::acquire(&lock_dir, "submit", "motion-001", false, None).unwrap_err();
        assert!(matches!(err, LockError::ConcurrentExecution { .. }));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let (_guard, lock_dir) = dir();
        {
            let _held = Lock::acquire(&lock_dir, "submit", "motion-001", false, None).unwrap();
        }
        assert!(!Lock::exists(&lock_dir, "submit", "motion-001"));
    }

    #[test]
    fn stale_lock_can_be_overridden_with_force() {
        let (_guard, lock_dir) = dir();
        let held = Lock::acquire(&lock_dir, "submit", "motion-001", false, Some(0)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        std::mem::forget(held); // simulate a crashed owner: lock file survives
        let retried = Lock::acquire(&lock_dir, "submit", "motion-001", true, Some(0));
        assert!(retried.is_ok());
    }
}

pub mod utils {
    use super::{Lock, LockError};
    use camino::Utf8PathBuf;

    /// Whether a destructive cleanup of `resource_id` should be allowed.
    pub fn can_clean(
        lock_dir: &Utf8PathBuf,
        operation: &str,
        resource_id: &str,
        force: bool,
        ttl_seconds: Option<u64>,
    ) -> Result<(), LockError> {
        let ttl = ttl_seconds.unwrap_or(super::DEFAULT_STALE_THRESHOLD_SECS);
        if let Some(info) = Lock::get_lock_info(lock_dir, operation, resource_id)? {
            let age = super::now_secs().saturating_sub(info.created_at);
            if age <= ttl && !force {
                return Err(LockError::StaleLock {
                    operation: operation.to_string(),
                    resource_id: resource_id.to_string(),
                    pid: info.pid,
                    age_secs: age,
                });
            }
        }
        Ok(())
    }
}

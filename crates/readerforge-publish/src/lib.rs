//! Atomic publisher: write-to-temp, optional fsync, rename-to-final. On any
//! failure the temp file is unlinked before the error propagates, so a
//! caller never sees a half-written final path.

use camino::{Utf8Path, Utf8PathBuf};
use readerforge_types::ContentHash;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write temp file {path}: {source}")]
    WriteTemp {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("failed to fsync temp file {path}: {source}")]
    Fsync {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PublishResult {
    pub file_path: Utf8PathBuf,
    pub bytes: usize,
    pub content_hash: ContentHash,
}

/// Publish `payload` to `final_path`, tagging the temp file with
/// `request_id` so concurrent publishers to the same final path never
/// collide on the temp name.
pub fn publish(
    final_path: &Utf8Path,
    payload: &[u8],
    request_id: &str,
    fsync: bool,
) -> Result<PublishResult, PublishError> {
    if let Some(parent) = final_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| PublishError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp_path = final_path.with_extension(format!(
        "{}.tmp.{request_id}",
        final_path.extension().unwrap_or("bin")
    ));

    if let Err(err) = write_and_sync(&tmp_path, payload, fsync) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err);
    }

    if let Err(err) = std::fs::rename(&tmp_path, final_path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(PublishError::Rename {
            from: tmp_path,
            to: final_path.to_path_buf(),
            source: err,
        });
    }

    Ok(PublishResult {
        file_path: final_path.to_path_buf(),
        bytes: payload.len(),
        content_hash: readerforge_canon::hash_bytes(payload),
    })
}

fn write_and_sync(tmp_path: &Utf8Path, payload: &[u8], fsync: bool) -> Result<(), PublishError> {
    let file = std::fs::File::create(tmp_path).map_err(|source| PublishError::WriteTemp {
        path: tmp_path.to_path_buf(),
        source,
    })?;
    {
        use std::io::Write;
        let mut writer = std::io::BufWriter::new(&file);
        writer
            .write_all(payload)
            .map_err(|source| PublishError::WriteTemp {
                path: tmp_path.to_path_buf(),
                source,
            })?;
        writer.flush().map_err(|source| PublishError::WriteTemp {
            path: tmp_path.to_path_buf(),
            source,
        })?;
    }
    if fsync {
        file.sync_all().map_err(|source| PublishError::Fsync {
            path: tmp_path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn publish_writes_the_final_file_and_returns_its_hash() {
        let dir = tempdir().unwrap();
        let final_path = Utf8PathBuf::from_path_buf(dir.path().join("out.json")).unwrap();
        let result = publish(&final_path, b"{\"a\":1}", "req-1", true).unwrap();
        assert_eq!(result.bytes, 8);
        assert!(final_path.exists());
        assert_eq!(
            std::fs::read(&final_path).unwrap(),
            b"{\"a\":1}".to_vec()
        );
    }

    #[test]
    fn publish_never_leaves_a_temp_file_behind_on_success() {
        let dir = tempdir().unwrap();
        let final_path = Utf8PathBuf::from_path_buf(dir.path().join("out.json")).unwrap();
        publish(&final_path, b"data", "req-2", false).unwrap();
        let leftover: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftover.is_empty());
    }

    #[test]
    fn rename_failure_unlinks_the_temp_file() {
        let dir = tempdir().unwrap();
        // A final path whose parent does not exist and cannot be created
        // as a directory (it's a file) forces the rename step to fail.
        let blocked_parent = dir.path().join("not_a_dir");
        std::fs::write(&blocked_parent, b"occupied").unwrap();
        let final_path =
            Utf8PathBuf::from_path_buf(blocked_parent.join("out.json")).unwrap();
        let result = publish(&final_path, b"data", "req-3", false);
        assert!(result.is_err());
    }
}

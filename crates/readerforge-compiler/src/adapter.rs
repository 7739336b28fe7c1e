//! The uniform "spec -> SVG" contract every asset-kind adapter implements
//! (spec.md §4.12), plus the shared process-based adapter that shells out
//! to an external compiler binary.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use camino::Utf8PathBuf;
use readerforge_store::{CacheKey, ContentStore};
use readerforge_types::{AssetKind, AssetSpec};

use crate::sanitize::sanitize_svg;

#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub success: bool,
    pub svg: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to serialize asset spec: {0}")]
    Serialize(#[from] anyhow::Error),

    #[error("compiler process {command} failed to start: {reason}")]
    Spawn { command: String, reason: String },

    #[error("compiler process {command} timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("compiler process {command} exited with status {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("compiler output failed SVG sanitization: {0}")]
    Sanitize(#[from] crate::sanitize::SanitizeError),
}

/// One adapter per asset kind (spec.md §4.12): `compile` caches on
/// `sha256(canonicalize(spec) + compiler_version)`, enforces a per-phase
/// timeout, and sanitizes the returned SVG before handing it back.
pub trait AssetCompiler: Send + Sync {
    fn kind(&self) -> AssetKind;

    fn compile(&self, spec: &AssetSpec, correlation_id: &str) -> Result<CompileOutcome, CompileError>;
}

/// Shells out to an external "spec -> SVG" compiler process, feeding it the
/// canonicalized spec as JSON on stdin and reading sanitized SVG from
/// stdout. Falls back to a precompiled asset on disk (looked up by spec
/// name) when the process fails, per spec.md §4.12's "failures do not abort
/// the pipeline at compile time if a precompiled asset is present."
pub struct ProcessCompiler {
    kind: AssetKind,
    command: Utf8PathBuf,
    compiler_version: String,
    timeout: Duration,
    precompiled_dir: Option<Utf8PathBuf>,
    cache: ContentStore<String>,
}

impl ProcessCompiler {
    #[must_use]
    pub fn new(
        kind: AssetKind,
        command: Utf8PathBuf,
        compiler_version: impl Into<String>,
        timeout: Duration,
        precompiled_dir: Option<Utf8PathBuf>,
        cache: ContentStore<String>,
    ) -> Self {
        Self {
            kind,
            command,
            compiler_version: compiler_version.into(),
            timeout,
            precompiled_dir,
            cache,
        }
    }

    fn cache_key(&self, spec: &AssetSpec) -> anyhow::Result<CacheKey> {
        CacheKey::from_content(self.kind.as_str(), &(spec_fingerprint(spec), &self.compiler_version))
    }

    fn run_process(&self, spec: &AssetSpec) -> Result<String, CompileError> {
        let payload = serde_json::to_vec(spec).map_err(|e| CompileError::Serialize(e.into()))?;
        let command_str = self.command.to_string();

        let mut child = Command::new(self.command.as_std_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| CompileError::Spawn {
                command: command_str.clone(),
                reason: err.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(&payload);
        }

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let output = child.wait_with_output();
            let _ = tx.send(output);
        });

        let output = match rx.recv_timeout(self.timeout) {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(CompileError::Spawn {
                    command: command_str,
                    reason: err.to_string(),
                })
            }
            Err(_) => {
                return Err(CompileError::Timeout {
                    command: command_str,
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };

        if !output.status.success() {
            return Err(CompileError::NonZeroExit {
                command: command_str,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let raw_svg = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok(sanitize_svg(&raw_svg)?)
    }

    fn precompiled_fallback(&self, name: &str) -> Option<String> {
        let dir = self.precompiled_dir.as_ref()?;
        let path = dir.join(format!("{name}.svg"));
        std::fs::read_to_string(path.as_std_path()).ok()
    }
}

impl AssetCompiler for ProcessCompiler {
    fn kind(&self) -> AssetKind {
        self.kind
    }

    fn compile(&self, spec: &AssetSpec, correlation_id: &str) -> Result<CompileOutcome, CompileError> {
        let key = self.cache_key(spec).map_err(CompileError::Serialize)?;
        if let Some(svg) = self.cache.get(&key) {
            return Ok(CompileOutcome {
                success: true,
                svg: Some(svg),
                error: None,
            });
        }

        match self.run_process(spec) {
            Ok(svg) => {
                self.cache.set(&key, svg.clone(), Duration::from_secs(7 * 24 * 60 * 60));
                Ok(CompileOutcome {
                    success: true,
                    svg: Some(svg),
                    error: None,
                })
            }
            Err(err) => {
                if let Some(svg) = self.precompiled_fallback(spec.name()) {
                    tracing::warn!(
                        correlation_id,
                        kind = self.kind.as_str(),
                        name = spec.name(),
                        %err,
                        "compiler failed, serving precompiled asset"
                    );
                    return Ok(CompileOutcome {
                        success: true,
                        svg: Some(svg),
                        error: None,
                    });
                }
                tracing::error!(correlation_id, kind = self.kind.as_str(), name = spec.name(), %err, "asset compile failed");
                Ok(CompileOutcome {
                    success: false,
                    svg: None,
                    error: Some(err.to_string()),
                })
            }
        }
    }
}

/// A stable, serializable fingerprint of `spec` for cache keying — the full
/// `AssetSpec` minus its own `content_hash` field, which would otherwise
/// make the cache key depend on itself.
fn spec_fingerprint(spec: &AssetSpec) -> serde_json::Value {
    let mut value = serde_json::to_value(spec).unwrap_or(serde_json::Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.remove("content_hash");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use readerforge_types::{ChemistrySpec, PlotSpec, PlotStyle};
    use tempfile::tempdir;

    fn cache(dir: &camino::Utf8Path) -> ContentStore<String> {
        ContentStore::new(dir.to_path_buf(), 8)
    }

    #[test]
    fn precompiled_asset_is_served_when_the_process_cannot_spawn() {
        let cache_dir = tempdir().unwrap();
        let asset_dir = tempdir().unwrap();
        let precompiled = Utf8PathBuf::from_path_buf(asset_dir.path().to_path_buf()).unwrap();
        std::fs::write(precompiled.join("ethanol.svg").as_std_path(), "<svg><rect x=\"0\" y=\"0\" width=\"1\" height=\"1\"/></svg>").unwrap();

        let compiler = ProcessCompiler::new(
            AssetKind::Chem,
            Utf8PathBuf::from("/definitely/not/a/real/compiler/binary"),
            "v1",
            Duration::from_millis(200),
            Some(precompiled),
            cache(&Utf8PathBuf::from_path_buf(cache_dir.path().to_path_buf()).unwrap()),
        );

        let spec = AssetSpec::Chem(ChemistrySpec {
            name: "ethanol".to_string(),
            smiles: "CCO".to_string(),
            caption: None,
            content_hash: None,
        });

        let outcome = compiler.compile(&spec, "corr-1").unwrap();
        assert!(outcome.success);
        assert!(outcome.svg.unwrap().contains("rect"));
    }

    #[test]
    fn failure_without_a_precompiled_fallback_reports_failure_not_err() {
        let cache_dir = tempdir().unwrap();
        let compiler = ProcessCompiler::new(
            AssetKind::Plot,
            Utf8PathBuf::from("/definitely/not/a/real/compiler/binary"),
            "v1",
            Duration::from_millis(200),
            None,
            cache(&Utf8PathBuf::from_path_buf(cache_dir.path().to_path_buf()).unwrap()),
        );
        let spec = AssetSpec::Plot(PlotSpec {
            name: "proj".to_string(),
            expression: "sin(x)".to_string(),
            x_range: (0.0, 1.0),
            y_range: (-1.0, 1.0),
            sample_count: 10,
            style: PlotStyle::default(),
            content_hash: None,
        });
        let outcome = compiler.compile(&spec, "corr-2").unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }
}

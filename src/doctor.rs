//! `readerforge doctor`: a read-only health probe over cache/lock dir
//! writability and LLM backend reachability. Never touches pipeline state.

use camino::Utf8Path;
use serde::Serialize;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    #[must_use]
    pub fn healthy(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }
}

fn check_dir_writable(name: &str, dir: &Utf8Path) -> CheckResult {
    match std::fs::create_dir_all(dir) {
        Ok(()) => {
            let probe = dir.join(".doctor-probe");
            match std::fs::write(probe.as_std_path(), b"ok") {
                Ok(()) => {
                    let _ = std::fs::remove_file(probe.as_std_path());
                    CheckResult {
                        name: name.to_string(),
                        status: CheckStatus::Ok,
                        detail: format!("{dir} is writable"),
                    }
                }
                Err(err) => CheckResult {
                    name: name.to_string(),
                    status: CheckStatus::Fail,
                    detail: format!("{dir} is not writable: {err}"),
                },
            }
        }
        Err(err) => CheckResult {
            name: name.to_string(),
            status: CheckStatus::Fail,
            detail: format!("could not create {dir}: {err}"),
        },
    }
}

fn check_llm_backend(config: &Config) -> CheckResult {
    match &config.llm_endpoint {
        None => CheckResult {
            name: "llm_backend".to_string(),
            status: CheckStatus::Warn,
            detail: "no llm_endpoint configured; the stub backend will be used".to_string(),
        },
        Some(endpoint) => {
            let client = reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(5))
                .build();
            match client.and_then(|c| c.head(endpoint).send()) {
                Ok(response) if response.status().is_success() || response.status().is_redirection() => CheckResult {
                    name: "llm_backend".to_string(),
                    status: CheckStatus::Ok,
                    detail: format!("{endpoint} reachable ({})", response.status()),
                },
                Ok(response) => CheckResult {
                    name: "llm_backend".to_string(),
                    status: CheckStatus::Warn,
                    detail: format!("{endpoint} responded with {}", response.status()),
                },
                Err(err) => CheckResult {
                    name: "llm_backend".to_string(),
                    status: CheckStatus::Fail,
                    detail: format!("{endpoint} unreachable: {err}"),
                },
            }
        }
    }
}

#[must_use]
pub fn run(config: &Config) -> DoctorReport {
    DoctorReport {
        checks: vec![
            check_dir_writable("cache_dir", &config.cache_dir),
            check_dir_writable("lock_dir", &config.lock_dir),
            check_dir_writable("output_dir", &config.output_dir),
            check_llm_backend(config),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_temp_dirs_report_ok() {
        let dir = tempfile::tempdir().unwrap();
        let base = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let mut config = Config::default();
        config.cache_dir = base.join("cache");
        config.lock_dir = base.join("locks");
        config.output_dir = base.join("output");
        config.llm_endpoint = None;

        let report = run(&config);
        assert!(report.healthy());
        assert_eq!(report.checks[0].status, CheckStatus::Ok);
    }

    #[test]
    fn missing_llm_endpoint_warns_rather_than_fails() {
        let dir = tempfile::tempdir().unwrap();
        let base = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let mut config = Config::default();
        config.cache_dir = base.join("cache");
        config.lock_dir = base.join("locks");
        config.output_dir = base.join("output");

        let report = run(&config);
        assert!(report.healthy());
        assert_eq!(report.checks.last().unwrap().status, CheckStatus::Warn);
    }
}

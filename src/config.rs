//! Hierarchical configuration: built-in defaults, overridden by a
//! discovered `.readerforge/config.toml`, overridden in turn by CLI flags.
//! Discovery walks upward from the current directory (or `READERFORGE_HOME`
//! when set) the same way the teacher's config discovery walks up looking
//! for `.xchecker/config.toml`, stopping at a VCS root if nothing is found.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use serde::Deserialize;

/// Where a resolved field's value actually came from, for `readerforge doctor`
/// and debug output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    ConfigFile(PathBuf),
    Cli,
    Env,
}

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    #[serde(default)]
    output_dir: Option<String>,
    #[serde(default)]
    cache_dir: Option<String>,
    #[serde(default)]
    lock_dir: Option<String>,
    #[serde(default)]
    temp_dir: Option<String>,
    #[serde(default)]
    section_concurrency: Option<usize>,
    #[serde(default)]
    global_concurrency: Option<usize>,
    #[serde(default)]
    lock_ttl_secs: Option<u64>,
    #[serde(default)]
    idempotency_ttl_secs: Option<u64>,
    #[serde(default)]
    llm_endpoint: Option<String>,
    #[serde(default)]
    llm_api_key: Option<String>,
}

/// Fully resolved runtime configuration. CLI flags, when present, always
/// win; a discovered config file wins over built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    pub lock_dir: Utf8PathBuf,
    pub temp_dir: Utf8PathBuf,
    pub section_concurrency: usize,
    pub global_concurrency: usize,
    pub lock_ttl_secs: u64,
    pub idempotency_ttl_secs: u64,
    pub llm_endpoint: Option<String>,
    pub llm_api_key: Option<String>,
    pub sources: HashMap<String, ConfigSource>,
}

/// CLI-supplied overrides. `None` fields defer to the config file or
/// built-in defaults.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<String>,
    pub cache_dir: Option<String>,
    pub section_concurrency: Option<usize>,
    pub llm_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let home = default_home();
        let mut sources = HashMap::new();
        for field in [
            "output_dir",
            "cache_dir",
            "lock_dir",
            "temp_dir",
            "section_concurrency",
            "global_concurrency",
            "lock_ttl_secs",
            "idempotency_ttl_secs",
        ] {
            sources.insert(field.to_string(), ConfigSource::Defaults);
        }
        Self {
            output_dir: home.join("output"),
            cache_dir: home.join("cache"),
            lock_dir: home.join("locks"),
            temp_dir: home.join("tmp"),
            section_concurrency: 4,
            global_concurrency: 8,
            lock_ttl_secs: 900,
            idempotency_ttl_secs: 86_400,
            llm_endpoint: None,
            llm_api_key: None,
            sources,
        }
    }
}

fn default_home() -> Utf8PathBuf {
    if let Ok(home) = std::env::var("READERFORGE_HOME") {
        return Utf8PathBuf::from(home);
    }
    Utf8PathBuf::from(".readerforge")
}

impl Config {
    /// Discover and load configuration starting from the current directory.
    pub fn discover(overrides: &CliOverrides) -> anyhow::Result<Self> {
        let start_dir = std::env::current_dir()?;
        Self::discover_from(&start_dir, overrides)
    }

    /// Path-driven variant so tests can avoid depending on process-global
    /// current-directory state.
    pub fn discover_from(start_dir: &Path, overrides: &CliOverrides) -> anyhow::Result<Self> {
        let mut config = Self::default();

        let config_path = match &overrides.config_path {
            Some(explicit) => Some(explicit.clone()),
            None => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)?;
            let source = ConfigSource::ConfigFile(path.clone());
            config.apply_file(file_config, source);
        }

        config.apply_env();
        config.apply_overrides(overrides);

        Ok(config)
    }

    fn apply_file(&mut self, file: TomlConfig, source: ConfigSource) {
        macro_rules! take {
            ($field:ident) => {
                if let Some(value) = file.$field {
                    self.$field = value.into();
                    self.sources.insert(stringify!($field).to_string(), source.clone());
                }
            };
        }
        if let Some(value) = file.output_dir {
            self.output_dir = Utf8PathBuf::from(value);
            self.sources.insert("output_dir".to_string(), source.clone());
        }
        if let Some(value) = file.cache_dir {
            self.cache_dir = Utf8PathBuf::from(value);
            self.sources.insert("cache_dir".to_string(), source.clone());
        }
        if let Some(value) = file.lock_dir {
            self.lock_dir = Utf8PathBuf::from(value);
            self.sources.insert("lock_dir".to_string(), source.clone());
        }
        if let Some(value) = file.temp_dir {
            self.temp_dir = Utf8PathBuf::from(value);
            self.sources.insert("temp_dir".to_string(), source.clone());
        }
        take!(section_concurrency);
        take!(global_concurrency);
        take!(lock_ttl_secs);
        take!(idempotency_ttl_secs);
        if let Some(value) = file.llm_endpoint {
            self.llm_endpoint = Some(value);
            self.sources.insert("llm_endpoint".to_string(), source.clone());
        }
        if let Some(value) = file.llm_api_key {
            self.llm_api_key = Some(value);
            self.sources.insert("llm_api_key".to_string(), source);
        }
    }

    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("READERFORGE_LLM_ENDPOINT") {
            self.llm_endpoint = Some(endpoint);
            self.sources.insert("llm_endpoint".to_string(), ConfigSource::Env);
        }
        if let Ok(key) = std::env::var("READERFORGE_LLM_API_KEY") {
            self.llm_api_key = Some(key);
            self.sources.insert("llm_api_key".to_string(), ConfigSource::Env);
        }
    }

    fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(value) = &overrides.output_dir {
            self.output_dir = Utf8PathBuf::from(value.clone());
            self.sources.insert("output_dir".to_string(), ConfigSource::Cli);
        }
        if let Some(value) = &overrides.cache_dir {
            self.cache_dir = Utf8PathBuf::from(value.clone());
            self.sources.insert("cache_dir".to_string(), ConfigSource::Cli);
        }
        if let Some(value) = overrides.section_concurrency {
            self.section_concurrency = value;
            self.sources.insert("section_concurrency".to_string(), ConfigSource::Cli);
        }
        if let Some(value) = &overrides.llm_endpoint {
            self.llm_endpoint = Some(value.clone());
            self.sources.insert("llm_endpoint".to_string(), ConfigSource::Cli);
        }
    }

    fn discover_config_file_from(start_dir: &Path) -> anyhow::Result<Option<PathBuf>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let candidate = current.join(".readerforge").join("config.toml");
            if candidate.exists() {
                return Ok(Some(candidate));
            }

            if current.parent().is_none() {
                break;
            }

            if current.join(".git").exists() {
                break;
            }

            current = current.parent().unwrap().to_path_buf();
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> anyhow::Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

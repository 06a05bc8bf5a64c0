use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::transform::{SourcePathStyle, TransformOptions, Variant, DEFAULT_TAGS};

/// File looked up in the working directory by [`Config::load`].
pub const CONFIG_FILE: &str = "bridgetape.toml";

pub const ENV_MODE: &str = "BRIDGETAPE_MODE";
pub const ENV_TRACE: &str = "BRIDGETAPE_TRACE";
pub const ENV_CACHE: &str = "BRIDGETAPE_CACHE";

/// Cache artifact used when nothing else is configured.
pub const DEFAULT_CACHE_FILE: &str = "behaviors.json";

/// Suffix appended to a test file's stem to name its trace stream.
pub const TRACE_SUFFIX: &str = ".trace.log";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid mode {0:?} (expected off, record, or replay)")]
    InvalidMode(String),
}

/// What a test session does with instrumented code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Hooks are not installed; traced code runs unobserved.
    #[default]
    Off,
    /// Traced code appends records to the trace stream.
    Record,
    /// Mocked code answers from the behavior cache.
    Replay,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "off" => Ok(Mode::Off),
            "record" => Ok(Mode::Record),
            "replay" => Ok(Mode::Replay),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Transformation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    /// Path of the crate exposing `runtime` in instrumented code
    pub runtime_path: String,
    /// Doc tags that mark a declaration for instrumentation
    pub tags: Vec<String>,
    /// How generated calls name their source file
    pub source_path: SourcePathStyle,
    /// Path suffixes that are never instrumented
    pub skip_suffixes: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        let options = TransformOptions::default();
        Self {
            runtime_path: options.runtime_path,
            tags: DEFAULT_TAGS.iter().map(|tag| tag.to_string()).collect(),
            source_path: options.source_path,
            skip_suffixes: options.skip_suffixes,
        }
    }
}

/// Record/replay configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    /// Session mode
    pub mode: Mode,
    /// Explicit trace stream; derived from the test file when unset
    pub trace_path: Option<PathBuf>,
    /// Behavior cache artifact
    pub cache_path: Option<PathBuf>,
    pub transform: TransformConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlTransformConfig {
    pub runtime_path: Option<String>,
    pub tags: Option<Vec<String>>,
    pub source_path: Option<SourcePathStyle>,
    pub skip_suffixes: Option<Vec<String>>,
}

/// TOML file representation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub mode: Option<String>,
    pub trace_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub transform: Option<TomlTransformConfig>,
}

impl Config {
    /// Load `bridgetape.toml` from the working directory when present, then
    /// apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Self::default()
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load a specific file without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let toml_config: TomlConfig = toml::from_str(contents)?;
        let mut config = Config::default();

        if let Some(mode) = toml_config.mode {
            config.mode = mode.parse()?;
        }
        config.trace_path = toml_config.trace_path;
        config.cache_path = toml_config.cache_path;

        if let Some(transform) = toml_config.transform {
            if let Some(runtime_path) = transform.runtime_path {
                config.transform.runtime_path = runtime_path;
            }
            if let Some(tags) = transform.tags {
                config.transform.tags = tags;
            }
            if let Some(source_path) = transform.source_path {
                config.transform.source_path = source_path;
            }
            if let Some(skip_suffixes) = transform.skip_suffixes {
                config.transform.skip_suffixes = skip_suffixes;
            }
        }

        Ok(config)
    }

    /// Apply `BRIDGETAPE_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_MODE) {
            self.mode = mode.parse()?;
        }
        if let Some(trace) = lookup(ENV_TRACE).filter(|v| !v.trim().is_empty()) {
            self.trace_path = Some(PathBuf::from(trace));
        }
        if let Some(cache) = lookup(ENV_CACHE).filter(|v| !v.trim().is_empty()) {
            self.cache_path = Some(PathBuf::from(cache));
        }
        Ok(())
    }

    /// Trace stream for a test file: the configured path, else
    /// `<dir>/<stem>.trace.log` next to the test, else `bridgetape.trace.log`.
    pub fn trace_path_for(&self, test_file: Option<&Path>) -> PathBuf {
        if let Some(path) = &self.trace_path {
            return path.clone();
        }
        match test_file {
            Some(file) => {
                let stem = file
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "bridgetape".to_string());
                file.with_file_name(format!("{stem}{TRACE_SUFFIX}"))
            }
            None => PathBuf::from(format!("bridgetape{TRACE_SUFFIX}")),
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE))
    }

    pub fn transform_options(&self, variant: Variant) -> TransformOptions {
        TransformOptions {
            variant,
            runtime_path: self.transform.runtime_path.clone(),
            tags: self.transform.tags.clone(),
            source_path: self.transform.source_path,
            skip_suffixes: self.transform.skip_suffixes.clone(),
        }
    }
}

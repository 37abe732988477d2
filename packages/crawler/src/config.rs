//! Crawl configuration.
//!
//! Values are layered, lowest precedence first: built-in defaults, an
//! optional TOML file, `SCRATCH_TOP_*` environment variables, then whatever
//! the caller (usually the CLI) overrides directly on [`CrawlConfig`].
//! [`CrawlConfig::validate`] turns the result into typed [`EngineSettings`].

use std::num::{NonZeroU64, NonZeroUsize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::admission::DEFAULT_CONCURRENCY_LIMIT;

/// Maximum number of IDs crawled per chunk.
pub const DEFAULT_CHUNK_SIZE: u64 = 100_000;

/// Maximum number of records kept at every ranking stage.
pub const DEFAULT_TOP_N: usize = 1_000_000;

/// Per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Directory holding chunk artifacts.
pub const DEFAULT_CHUNK_DIR: &str = "chunks";

/// Final leaderboard file.
pub const DEFAULT_OUTPUT: &str = "top_scratch_projects.csv";

pub const ENV_CHUNK_SIZE: &str = "SCRATCH_TOP_CHUNK_SIZE";
pub const ENV_TOP_N: &str = "SCRATCH_TOP_TOP_N";
pub const ENV_CONCURRENCY: &str = "SCRATCH_TOP_CONCURRENCY";
pub const ENV_TIMEOUT_SECS: &str = "SCRATCH_TOP_TIMEOUT_SECS";
pub const ENV_URL_TEMPLATE: &str = "SCRATCH_TOP_URL_TEMPLATE";
pub const ENV_CHUNK_DIR: &str = "SCRATCH_TOP_CHUNK_DIR";
pub const ENV_OUTPUT: &str = "SCRATCH_TOP_OUTPUT";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment variable holds a value that does not parse.
    #[error("environment variable {name}={value:?} is not a valid number")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// A setting is out of range.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Name of the offending setting.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// User-facing crawl settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlConfig {
    /// Maximum IDs per chunk.
    pub chunk_size: u64,
    /// Maximum records kept per chunk and in the final leaderboard.
    pub top_n: usize,
    /// Maximum concurrent in-flight fetches.
    pub concurrency_limit: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Project URL with an `{id}` placeholder.
    pub url_template: String,
    /// Directory for chunk artifacts.
    pub chunk_dir: PathBuf,
    /// Path of the final leaderboard CSV.
    pub output: PathBuf,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_n: DEFAULT_TOP_N,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            url_template: scratch_top_fetcher::http::DEFAULT_URL_TEMPLATE.to_owned(),
            chunk_dir: PathBuf::from(DEFAULT_CHUNK_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

/// Validated settings in the types the engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub chunk_size: NonZeroU64,
    pub top_n: usize,
    pub concurrency: NonZeroUsize,
    pub request_timeout: Duration,
}

impl CrawlConfig {
    /// Loads defaults, then `path` (if given), then environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment variable is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Parses a TOML config file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `SCRATCH_TOP_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a numeric variable does not
    /// parse.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a numeric variable does not
    /// parse.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = parse_env(&lookup, ENV_CHUNK_SIZE)? {
            self.chunk_size = value;
        }
        if let Some(value) = parse_env(&lookup, ENV_TOP_N)? {
            self.top_n = value;
        }
        if let Some(value) = parse_env(&lookup, ENV_CONCURRENCY)? {
            self.concurrency_limit = value;
        }
        if let Some(value) = parse_env(&lookup, ENV_TIMEOUT_SECS)? {
            self.request_timeout_secs = value;
        }
        if let Some(value) = lookup(ENV_URL_TEMPLATE) {
            self.url_template = value;
        }
        if let Some(value) = lookup(ENV_CHUNK_DIR) {
            self.chunk_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_OUTPUT) {
            self.output = PathBuf::from(value);
        }
        Ok(())
    }

    /// Checks every setting and converts to [`EngineSettings`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero chunk size, top-N,
    /// concurrency, or timeout, or a URL template without `{id}`.
    pub fn validate(&self) -> Result<EngineSettings, ConfigError> {
        let chunk_size = NonZeroU64::new(self.chunk_size).ok_or_else(|| ConfigError::Invalid {
            field: "chunk_size",
            message: "must be at least 1".to_owned(),
        })?;

        if self.top_n == 0 {
            return Err(ConfigError::Invalid {
                field: "top_n",
                message: "must be at least 1".to_owned(),
            });
        }

        let concurrency =
            NonZeroUsize::new(self.concurrency_limit).ok_or_else(|| ConfigError::Invalid {
                field: "concurrency_limit",
                message: "must be at least 1".to_owned(),
            })?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                message: "must be at least 1".to_owned(),
            });
        }

        if !self.url_template.contains("{id}") {
            return Err(ConfigError::Invalid {
                field: "url_template",
                message: format!("'{}' has no {{id}} placeholder", self.url_template),
            });
        }

        Ok(EngineSettings {
            chunk_size,
            top_n: self.top_n,
            concurrency,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = CrawlConfig::default().validate().unwrap();
        assert_eq!(settings.chunk_size.get(), 100_000);
        assert_eq!(settings.top_n, 1_000_000);
        assert_eq!(settings.concurrency.get(), 125);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = CrawlConfig::from_toml_str(
            r#"
            chunk_size = 5000
            concurrency_limit = 40
            chunk_dir = "/tmp/scratch-chunks"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunk_size, 5_000);
        assert_eq!(config.concurrency_limit, 40);
        assert_eq!(config.chunk_dir, PathBuf::from("/tmp/scratch-chunks"));
        assert_eq!(config.top_n, DEFAULT_TOP_N);
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        assert!(matches!(
            CrawlConfig::from_toml_str("chunksize = 10"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = CrawlConfig::from_toml_str("top_n = 10").unwrap();
        config
            .apply_env_from(env(&[
                (ENV_TOP_N, "25"),
                (ENV_TIMEOUT_SECS, " 3 "),
                (ENV_URL_TEMPLATE, "http://localhost:8080/p/{id}"),
            ]))
            .unwrap();

        assert_eq!(config.top_n, 25);
        assert_eq!(config.request_timeout_secs, 3);
        assert_eq!(config.url_template, "http://localhost:8080/p/{id}");
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn malformed_env_is_an_error() {
        let err = CrawlConfig::default()
            .apply_env_from(env(&[(ENV_CONCURRENCY, "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { name: ENV_CONCURRENCY, .. }
        ));
    }

    #[test]
    fn rejects_zero_values() {
        for field in ["chunk_size", "top_n", "concurrency_limit", "request_timeout_secs"] {
            let config = CrawlConfig::from_toml_str(&format!("{field} = 0")).unwrap();
            match config.validate() {
                Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, field),
                other => panic!("{field}: expected invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let config = CrawlConfig {
            url_template: "https://api.scratch.mit.edu/projects/".to_owned(),
            ..CrawlConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "url_template", .. })
        ));
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.toml");
        std::fs::write(&path, "output = \"board.csv\"\n").unwrap();

        let config = CrawlConfig::from_file(&path).unwrap();
        assert_eq!(config.output, PathBuf::from("board.csv"));

        assert!(matches!(
            CrawlConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn missing_file_error_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = CrawlConfig::load(Some(&path)).unwrap_err();

        let message = err.to_string();
        assert!(
            message.starts_with(&format!("failed to read config file {}: ", path.display())),
            "{message}"
        );
    }
}

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::DEFAULT_RETRY_LIMIT;
use crate::impls::memory_store::DEFAULT_STREAM_BATCH_SIZE;

/// Top-level queue configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub worker: WorkerConfig,
    pub dispatch: DispatchConfig,
    pub store: StoreConfig,
}

/// Periodic trigger: how often a pass runs and how long it may take.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub interval_ms: u64,
    /// Deadline of one pass. `0` disables it.
    pub pass_timeout_ms: u64,
}

/// Dispatcher: attempt concurrency, claim length, retry default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub max_in_flight: usize,
    /// How long a claimed record stays invisible to other passes.
    pub lease_ms: u64,
    /// Retry budget for records without `retry_limit`.
    pub default_retry_limit: u32,
}

/// Store adapter tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Records fetched per page of a due-set stream.
    pub stream_batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            pass_timeout_ms: 60_000,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 64,
            lease_ms: 300_000,
            default_retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stream_batch_size: DEFAULT_STREAM_BATCH_SIZE,
        }
    }
}

impl WorkerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn pass_timeout(&self) -> Option<Duration> {
        (self.pass_timeout_ms > 0).then(|| Duration::from_millis(self.pass_timeout_ms))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl QueueConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("worker.interval_ms", self.worker.interval_ms == 0),
            ("dispatch.max_in_flight", self.dispatch.max_in_flight == 0),
            ("dispatch.lease_ms", self.dispatch.lease_ms == 0),
            ("store.stream_batch_size", self.store.stream_batch_size == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((key, _)) => Err(ConfigError::Invalid(format!("{key} must be greater than 0"))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = QueueConfig::default();
        assert_eq!(config.worker.interval_ms, 60_000);
        assert_eq!(config.worker.pass_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.dispatch.max_in_flight, 64);
        assert_eq!(config.dispatch.lease_ms, 300_000);
        assert_eq!(config.dispatch.default_retry_limit, 5);
        assert_eq!(config.store.stream_batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_parsing_with_overrides() {
        let toml_str = r#"
            [worker]
            interval_ms = 1000
            pass_timeout_ms = 0

            [dispatch]
            max_in_flight = 4
            default_retry_limit = 3
        "#;
        let config = QueueConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.worker.interval(), Duration::from_secs(1));
        assert_eq!(config.worker.pass_timeout(), None);
        assert_eq!(config.dispatch.max_in_flight, 4);
        assert_eq!(config.dispatch.default_retry_limit, 3);
        // untouched keys keep defaults
        assert_eq!(config.dispatch.lease_ms, 300_000);
        assert_eq!(config.store.stream_batch_size, 100);
    }

    #[test]
    fn toml_parsing_empty_uses_defaults() {
        let config = QueueConfig::from_toml_str("").unwrap();
        assert_eq!(config, QueueConfig::default());
    }

    #[test]
    fn zero_values_are_rejected() {
        let err = QueueConfig::from_toml_str("[dispatch]\nmax_in_flight = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("max_in_flight")));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = QueueConfig::from_toml_str("[worker").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = QueueConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

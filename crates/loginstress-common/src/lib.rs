use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Browser-like user agent sent with every login submission.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:130.0) Gecko/20100101 Firefox/130.0";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub run: RunConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunConfig {
    pub credentials_file: PathBuf,
    /// Upper bound on simultaneously in-flight login attempts.
    pub concurrency: usize,
    /// Per-request timeout. `0` leaves the transport default in place.
    pub request_timeout_ms: u64,
    /// How long in-flight attempts may keep running once a stop is requested.
    pub drain_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("credentials.txt"),
            concurrency: 10,
            request_timeout_ms: 30_000,
            drain_timeout_ms: 2_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RunConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of the compact text format.
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9102,
        }
    }
}

impl Config {
    /// Parses and validates a YAML document. Missing sections take defaults.
    pub fn from_yaml_str(data: &str) -> Result<Self, ConfigError> {
        let config: Config = if data.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(data)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let data = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml_str(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "run.concurrency must be at least 1".to_string(),
            ));
        }
        if self.run.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "run.user_agent must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

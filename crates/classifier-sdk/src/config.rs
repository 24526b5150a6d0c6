use std::time::Duration;

use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::executor::RetryPolicy;

pub const ENV_PREFIX: &str = "CLASSIFIER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid api base url {url:?}: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Runtime settings of the client engine.
///
/// Every field can be set from the environment as `CLASSIFIER_<FIELD>`, e.g.
/// `CLASSIFIER_API_BASE_URL` or `CLASSIFIER_DEBOUNCE_MS`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
    /// Zero disables periodic history refresh.
    #[serde(default)]
    pub history_refresh_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            max_words: default_max_words(),
            max_input_chars: default_max_input_chars(),
            request_timeout_ms: default_request_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base_ms(),
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
            health_interval_secs: default_health_interval_secs(),
            history_refresh_secs: 0,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_builder(config::Config::builder())
    }

    /// Layers `CLASSIFIER_*` environment variables over `builder`.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let loaded: ClientConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        loaded.normalize().validate()
    }

    fn normalize(mut self) -> Self {
        let trimmed = self.api_base_url.trim();
        self.api_base_url = if trimmed.is_empty() {
            default_api_base_url()
        } else {
            trimmed.to_string()
        };
        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        self.base_url()?;
        if self.max_words == 0 {
            return Err(ConfigError::Invalid {
                field: "max_words",
                reason: "must be at least 1",
            });
        }
        if self.max_input_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "max_input_chars",
                reason: "must be at least 1",
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_attempts",
                reason: "must be at least 1",
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be positive",
            });
        }
        // The backend silently resets limits above 100 to its default.
        if !(1..=100).contains(&self.page_size) {
            return Err(ConfigError::Invalid {
                field: "page_size",
                reason: "must be between 1 and 100",
            });
        }
        Ok(self)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_base_url).map_err(|source| ConfigError::BaseUrl {
            url: self.api_base_url.clone(),
            source,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_base_ms),
            attempt_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    pub fn history_refresh_interval(&self) -> Option<Duration> {
        (self.history_refresh_secs > 0).then(|| Duration::from_secs(self.history_refresh_secs))
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_max_words() -> usize {
    512
}

fn default_max_input_chars() -> usize {
    20_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_page_size() -> u32 {
    10
}

fn default_health_interval_secs() -> u64 {
    30
}

//! Configuration System
//!
//! Layered configuration for the telemetry producer: built-in defaults, the
//! user's global config file, workspace config files and `NBTELEMETRY__*`
//! environment variables, in increasing precedence.

use crate::error::TelemetryError;
use crate::logging::LoggingConfig;
use crate::telemetry::events::EventKind;
use serde::{Deserialize, Serialize};
use tracing::warn;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NbTelemetryConfig {
    /// Telemetry service connection
    #[serde(default)]
    pub service: ServiceSettings,

    /// Producer tuning
    #[serde(default)]
    pub producers: ProducerSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the telemetry service lives and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Base URL; `/config`, `/version`, `/environ` and `/export` hang off it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-request timeout. Unset means the client's default (none).
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

pub(crate) fn default_base_url() -> String {
    "http://localhost:8888/telemetry-producer".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerSettings {
    /// Quiet period before a scroll burst is published
    #[serde(default = "default_scroll_debounce_ms")]
    pub scroll_debounce_ms: u64,

    /// Event names whose producers are not started
    #[serde(default)]
    pub disabled: Vec<String>,
}

fn default_scroll_debounce_ms() -> u64 {
    1500
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            scroll_debounce_ms: default_scroll_debounce_ms(),
            disabled: Vec::new(),
        }
    }
}

impl ProducerSettings {
    /// Parsed `disabled` entries. Unknown names are skipped with a warning.
    pub fn disabled_kinds(&self) -> Vec<EventKind> {
        self.disabled
            .iter()
            .filter_map(|name| match name.parse::<EventKind>() {
                Ok(kind) => Some(kind),
                Err(err) => {
                    warn!(error = %err, "ignoring unknown producer in disabled list");
                    None
                }
            })
            .collect()
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Service(String),
    Producers(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Service(msg) => write!(f, "Service: {}", msg),
            ValidationError::Producers(msg) => write!(f, "Producers: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl NbTelemetryConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let url = self.service.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::Service(format!(
                "base_url must be an http(s) URL, got '{}'",
                url
            )));
        }
        if self.service.connect_timeout_ms == 0 {
            errors.push(ValidationError::Service(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.service.request_timeout_ms == Some(0) {
            errors.push(ValidationError::Service(
                "request_timeout_ms must be greater than zero when set".to_string(),
            ));
        }

        if self.producers.scroll_debounce_ms == 0 {
            errors.push(ValidationError::Producers(
                "scroll_debounce_ms must be greater than zero".to_string(),
            ));
        }
        for name in &self.producers.disabled {
            if name.parse::<EventKind>().is_err() {
                errors.push(ValidationError::Producers(format!(
                    "unknown event '{}' in disabled list",
                    name
                )));
            }
        }

        if let Err(msg) = self.logging.validate() {
            errors.push(ValidationError::Logging(msg));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all errors into one [`TelemetryError::ConfigError`].
    pub fn validated(self) -> Result<Self, TelemetryError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            TelemetryError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        Ok(self)
    }
}

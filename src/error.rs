//! Error types for the notebook telemetry pipeline.

use thiserror::Error;

/// Errors raised by producers, the coordinator, transports and configuration.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A producer or publish was wired to a session that has been disposed.
    #[error("Session is detached: {0}")]
    DetachedSession(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Telemetry service responded with status {status}: {body}")]
    TransportStatus { status: u16, body: String },

    #[error("Failed to decode service response: {0}")]
    Decode(String),

    #[error("Invalid cell reference: {0}")]
    InvalidCell(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Replay script error at line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for TelemetryError {
    fn from(err: config::ConfigError) -> Self {
        TelemetryError::ConfigError(err.to_string())
    }
}

impl TelemetryError {
    /// Transport-class failures are logged at the publish boundary and never retried.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TelemetryError::Transport(_)
                | TelemetryError::TransportStatus { .. }
                | TelemetryError::Decode(_)
        )
    }
}

//! Telemetry Service Transport
//!
//! Abstraction over the HTTP service that serves exporter configuration and
//! accepts exported events. The coordinator only talks to [`Transport`]; the
//! reqwest-backed [`HttpTransport`] is the production implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TelemetryError;
use crate::telemetry::coordinator::ExportRequest;
use crate::telemetry::exporters::ServiceConfig;

pub mod http;
pub mod recording;

pub use http::HttpTransport;
pub use recording::RecordingTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET /config`
    async fn fetch_config(&self) -> Result<ServiceConfig, TelemetryError>;

    /// `GET /version`
    async fn fetch_version(&self) -> Result<String, TelemetryError>;

    /// `GET /environ`
    async fn fetch_environ(&self) -> Result<Value, TelemetryError>;

    /// `POST /export`. Returns the service acknowledgement, JSON or text.
    async fn export(&self, request: &ExportRequest) -> Result<Value, TelemetryError>;
}

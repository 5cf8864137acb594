//! reqwest client for the telemetry service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use crate::config::ServiceSettings;
use crate::error::TelemetryError;
use crate::telemetry::coordinator::ExportRequest;
use crate::telemetry::exporters::ServiceConfig;
use crate::transport::Transport;

fn map_http_error(error: reqwest::Error) -> TelemetryError {
    if let Some(status) = error.status() {
        TelemetryError::TransportStatus {
            status: status.as_u16(),
            body: error.to_string(),
        }
    } else if error.is_timeout() {
        TelemetryError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        TelemetryError::Transport(format!("Connection error: {}", error))
    } else if error.is_decode() {
        TelemetryError::Decode(error.to_string())
    } else {
        TelemetryError::Transport(format!("HTTP error: {}", error))
    }
}

/// Turn a non-2xx response into [`TelemetryError::TransportStatus`] carrying its body.
async fn ensure_success(response: Response) -> Result<Response, TelemetryError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(TelemetryError::TransportStatus { status, body })
}

/// JSON when the body parses as JSON, otherwise the raw text as a string value.
fn parse_body(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(settings: &ServiceSettings) -> Result<Self, TelemetryError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms));
        if let Some(timeout_ms) = settings.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder.build().map_err(|e| {
            TelemetryError::Transport(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_text(&self, path: &str) -> Result<String, TelemetryError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(map_http_error)?;
        ensure_success(response)
            .await?
            .text()
            .await
            .map_err(map_http_error)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_config(&self) -> Result<ServiceConfig, TelemetryError> {
        let text = self.get_text("config").await?;
        serde_json::from_str(&text)
            .map_err(|e| TelemetryError::Decode(format!("Failed to parse config: {}", e)))
    }

    async fn fetch_version(&self) -> Result<String, TelemetryError> {
        let text = self.get_text("version").await?;
        Ok(match parse_body(text) {
            Value::String(version) => version,
            other => other.to_string(),
        })
    }

    async fn fetch_environ(&self) -> Result<Value, TelemetryError> {
        let text = self.get_text("environ").await?;
        serde_json::from_str(&text)
            .map_err(|e| TelemetryError::Decode(format!("Failed to parse environ: {}", e)))
    }

    async fn export(&self, request: &ExportRequest) -> Result<Value, TelemetryError> {
        let response = self
            .client
            .post(self.endpoint("export"))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?;
        let text = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(map_http_error)?;
        Ok(parse_body(text))
    }
}

//! In-process transport that serves a fixed config and records export bodies.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::TelemetryError;
use crate::telemetry::coordinator::ExportRequest;
use crate::telemetry::exporters::ServiceConfig;
use crate::transport::Transport;

pub struct RecordingTransport {
    config: ServiceConfig,
    environ: Value,
    version: String,
    failing_targets: Mutex<HashSet<String>>,
    requests: Mutex<Vec<Value>>,
    config_fetches: AtomicUsize,
}

impl RecordingTransport {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            environ: json!({ "JUPYTERHUB_USER": "local" }),
            version: env!("CARGO_PKG_VERSION").to_string(),
            failing_targets: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
            config_fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_environ(mut self, environ: Value) -> Self {
        self.environ = environ;
        self
    }

    /// Exports to exporters of this type fail with a 503.
    pub fn fail_exports_to(&self, target: impl Into<String>) {
        self.failing_targets.lock().insert(target.into());
    }

    /// Serialized export bodies, in the order the exports were made.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }

    /// Export bodies for one event name.
    pub fn requests_for(&self, event_name: &str) -> Vec<Value> {
        self.requests
            .lock()
            .iter()
            .filter(|body| body["eventDetail"]["eventName"] == event_name)
            .cloned()
            .collect()
    }

    pub fn config_fetches(&self) -> usize {
        self.config_fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn fetch_config(&self) -> Result<ServiceConfig, TelemetryError> {
        self.config_fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self.config.clone())
    }

    async fn fetch_version(&self) -> Result<String, TelemetryError> {
        Ok(self.version.clone())
    }

    async fn fetch_environ(&self) -> Result<Value, TelemetryError> {
        Ok(self.environ.clone())
    }

    async fn export(&self, request: &ExportRequest) -> Result<Value, TelemetryError> {
        let body = serde_json::to_value(request)?;
        self.requests.lock().push(body);
        if self.failing_targets.lock().contains(&request.exporter.target) {
            return Err(TelemetryError::TransportStatus {
                status: 503,
                body: "exporter unavailable".to_string(),
            });
        }
        Ok(json!({ "exported": request.exporter.target }))
    }
}

//! Shared test utilities for integration tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use nbtelemetry::config::ProducerSettings;
use nbtelemetry::telemetry::events::EventKind;
use nbtelemetry::telemetry::exporters::{Activation, ExporterConfig, ServiceConfig};
use nbtelemetry::telemetry::pipeline::{Attachment, Pipeline};
use nbtelemetry::telemetry::session::memory::{DocumentSeed, MemorySession};
use nbtelemetry::transport::RecordingTransport;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `test` with XDG_CONFIG_HOME pointed at a fresh temp dir and every
/// `NBTELEMETRY*` variable cleared, restoring the environment afterwards.
pub fn with_isolated_env<F, R>(test: F) -> R
where
    F: FnOnce(&TempDir) -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(String, String)> = std::env::vars()
        .filter(|(key, _)| key.starts_with("NBTELEMETRY") || key == "XDG_CONFIG_HOME")
        .collect();
    for (key, _) in &saved {
        std::env::remove_var(key);
    }

    let temp_dir = TempDir::new().unwrap();
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path().join("xdg"));
    let result = test(&temp_dir);

    let leftover: Vec<String> = std::env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with("NBTELEMETRY") || key == "XDG_CONFIG_HOME")
        .collect();
    for key in leftover {
        std::env::remove_var(key);
    }
    for (key, value) in saved {
        std::env::set_var(key, value);
    }
    result
}

/// Every event kind active, with the given whole-document flag.
pub fn every_event(log_whole_document: bool) -> Vec<Activation> {
    EventKind::ALL
        .iter()
        .map(|kind| Activation::new(*kind, log_whole_document))
        .collect()
}

pub fn service_with(exporters: Vec<ExporterConfig>, active: Vec<Activation>) -> ServiceConfig {
    ServiceConfig {
        active_events: Some(active),
        exporters,
    }
}

pub struct Running {
    pub session: Arc<MemorySession>,
    pub transport: Arc<RecordingTransport>,
    pub attachment: Attachment,
}

impl Running {
    /// Let producer loops catch up, then wait for every dispatched publish.
    pub async fn finish(&mut self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.attachment.drain(Duration::from_secs(5)).await;
    }
}

/// Attach the standard producer set to a fresh session.
pub async fn start(seed: DocumentSeed, config: ServiceConfig) -> Running {
    let transport = Arc::new(RecordingTransport::new(config));
    let pipeline = Pipeline::new(transport.clone(), ProducerSettings::default());
    let session = Arc::new(MemorySession::new(seed));
    let attachment = pipeline.attach(session.clone()).await.unwrap();
    Running {
        session,
        transport,
        attachment,
    }
}

//! nbtelemetry: Notebook Telemetry Pipeline
//!
//! Independent event producers observe a live notebook session and forward
//! structured events to the exporters configured by the telemetry service.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod telemetry;
pub mod transport;

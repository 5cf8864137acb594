//! Integration tests for the notebook telemetry pipeline

mod config_loading;
mod exporter_resolution;
mod pipeline_flow;
mod test_utils;

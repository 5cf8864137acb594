//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::TelemetryError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &TelemetryError) -> String {
    match e {
        TelemetryError::Transport(_) | TelemetryError::TransportStatus { .. } => {
            format!("{}\nIs the telemetry service reachable? See --service-url.", e)
        }
        _ => e.to_string(),
    }
}

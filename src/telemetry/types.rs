//! Shared telemetry helpers: timestamps and session id generation.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Current time as milliseconds since Unix epoch. Event timestamps use this clock.
pub fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Generate a process-unique kernel session id for sessions that were not given one.
pub fn new_session_id() -> String {
    let ts = now_millis();
    let pid = std::process::id();
    let seq = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("nb-{ts}-{pid}-{seq}")
}

//! Replay of scripted notebook activity against an in-memory session.
//!
//! A script is JSON lines, one action per line, tagged by `op`:
//!
//! ```text
//! {"op": "ready"}
//! {"op": "insert_cell", "index": 1, "source": "print(1)"}
//! {"op": "edit_cell", "id": "cell-1", "from": 0, "to": 0, "insert": "x = "}
//! {"op": "scroll", "top": 640}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::TelemetryError;
use crate::telemetry::events::{KernelError, TextChange};
use crate::telemetry::pipeline::Pipeline;
use crate::telemetry::routing::bus::PublishReport;
use crate::telemetry::session::memory::{DocumentSeed, MemorySession};
use crate::telemetry::session::{ClipboardAction, SaveState};

/// Time given to producer loops to pick up the last signals before draining.
const QUIET_PERIOD: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    InsertCell {
        index: usize,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        source: String,
    },
    RemoveCell {
        index: usize,
    },
    EditCell {
        id: String,
        from: usize,
        to: usize,
        #[serde(default)]
        insert: String,
    },
    Activate {
        index: usize,
    },
    Execute {
        id: String,
        #[serde(default = "default_success")]
        success: bool,
        #[serde(default)]
        error: Option<KernelError>,
    },
    Clipboard {
        action: ClipboardAction,
        #[serde(default)]
        selection: String,
    },
    Visibility {
        hidden: bool,
    },
    Save {
        #[serde(default = "default_save_state")]
        state: SaveState,
    },
    Scroll {
        top: f64,
    },
    Ready,
    Wait {
        ms: u64,
    },
}

fn default_success() -> bool {
    true
}

fn default_save_state() -> SaveState {
    SaveState::Completed
}

/// Parse a JSON-lines script. Errors carry the 1-based line number.
pub fn parse_script(text: &str) -> Result<Vec<ReplayStep>, TelemetryError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(number, line)| {
            serde_json::from_str(line.trim()).map_err(|e| TelemetryError::Script {
                line: number + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Apply one step to the session.
pub async fn apply_step(session: &MemorySession, step: &ReplayStep) -> Result<(), TelemetryError> {
    debug!(?step, "replaying step");
    match step {
        ReplayStep::InsertCell { index, id, source } => {
            session.insert_cell(*index, id.clone(), source.as_str())?;
        }
        ReplayStep::RemoveCell { index } => {
            session.remove_cell(*index)?;
        }
        ReplayStep::EditCell {
            id,
            from,
            to,
            insert,
        } => {
            session.edit_cell(
                id,
                TextChange {
                    from: *from,
                    to: *to,
                    insert: insert.clone(),
                },
            )?;
        }
        ReplayStep::Activate { index } => {
            session.activate(*index)?;
        }
        ReplayStep::Execute { id, success, error } => {
            session.execute(id, *success, error.clone())?;
        }
        ReplayStep::Clipboard { action, selection } => {
            session.clipboard(*action, selection.as_str());
        }
        ReplayStep::Visibility { hidden } => session.set_hidden(*hidden),
        ReplayStep::Save { state } => session.save(*state),
        ReplayStep::Scroll { top } => session.scroll_to(*top),
        ReplayStep::Ready => session.mark_ready(),
        ReplayStep::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
    }
    Ok(())
}

#[derive(Debug)]
pub struct ReplaySummary {
    pub document_path: String,
    pub steps: usize,
    pub reports: Vec<PublishReport>,
}

impl ReplaySummary {
    pub fn delivered(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_delivered())
            .count()
    }
}

/// Attach `pipeline` to a fresh session built from `seed`, play `steps`,
/// then wait up to `settle` for the resulting publishes.
pub async fn run_replay(
    pipeline: &Pipeline,
    seed: DocumentSeed,
    steps: &[ReplayStep],
    scroll_window: Duration,
    settle: Duration,
) -> Result<ReplaySummary, TelemetryError> {
    let document_path = seed.path.clone();
    let session = Arc::new(MemorySession::new(seed));
    let mut attachment = pipeline.attach(session.clone()).await?;

    let mut scrolled = false;
    for (number, step) in steps.iter().enumerate() {
        scrolled |= matches!(step, ReplayStep::Scroll { .. });
        apply_step(&session, step)
            .await
            .map_err(|e| TelemetryError::Script {
                line: number + 1,
                message: e.to_string(),
            })?;
    }

    let mut quiet = QUIET_PERIOD;
    if scrolled {
        quiet += scroll_window;
    }
    tokio::time::sleep(quiet).await;

    let reports = attachment.drain(settle).await;
    session.dispose();
    Ok(ReplaySummary {
        document_path,
        steps: steps.len(),
        reports,
    })
}

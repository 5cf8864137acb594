//! CLI presentation: text and json formatters per command.

use std::collections::BTreeMap;

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;

use crate::cli::replay::ReplaySummary;
use crate::telemetry::exporters::ExporterConfig;
use crate::telemetry::routing::bus::PublishOutcome;

fn format_section_heading(title: &str) -> String {
    format!("{}\n{}", title, "-".repeat(title.len()))
}

pub fn format_exporters_text(exporters: &[ExporterConfig]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Active exporters"));
    if exporters.is_empty() {
        out.push_str("No exporter is active; no events will be exported.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Exporter", "Type", "Event", "Whole notebook"]);
    for exporter in exporters {
        for activation in exporter.activations.iter().flatten() {
            table.add_row(vec![
                exporter.label(),
                exporter.target.clone(),
                activation.name.clone(),
                if activation.log_whole_document { "yes" } else { "no" }.to_string(),
            ]);
        }
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_exporters_json(exporters: &[ExporterConfig]) -> String {
    serde_json::to_string_pretty(&json!({ "exporters": exporters }))
        .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

#[derive(Default)]
struct OutcomeCounts {
    delivered: usize,
    failed: usize,
    skipped: usize,
}

fn tally(summary: &ReplaySummary) -> BTreeMap<(String, String), OutcomeCounts> {
    let mut rows: BTreeMap<(String, String), OutcomeCounts> = BTreeMap::new();
    for report in &summary.reports {
        let counts = rows
            .entry((report.event.to_string(), report.exporter.clone()))
            .or_default();
        match report.outcome {
            PublishOutcome::Delivered(_) => counts.delivered += 1,
            PublishOutcome::Failed(_) => counts.failed += 1,
            PublishOutcome::Skipped(_) => counts.skipped += 1,
        }
    }
    rows
}

pub fn format_replay_summary_text(summary: &ReplaySummary) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Replay"));
    out.push_str(&format!("  Document: {}\n", summary.document_path));
    out.push_str(&format!("  Steps: {}\n", summary.steps));
    out.push_str(&format!(
        "  Publishes: {} ({} delivered)\n\n",
        summary.reports.len(),
        summary.delivered()
    ));
    if summary.reports.is_empty() {
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Event", "Exporter", "Delivered", "Failed", "Skipped"]);
    for ((event, exporter), counts) in tally(summary) {
        table.add_row(vec![
            event,
            exporter,
            counts.delivered.to_string(),
            counts.failed.to_string(),
            counts.skipped.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_replay_summary_json(summary: &ReplaySummary) -> String {
    let rows: Vec<_> = tally(summary)
        .into_iter()
        .map(|((event, exporter), counts)| {
            json!({
                "event": event,
                "exporter": exporter,
                "delivered": counts.delivered,
                "failed": counts.failed,
                "skipped": counts.skipped,
            })
        })
        .collect();
    let value = json!({
        "document": summary.document_path,
        "steps": summary.steps,
        "publishes": summary.reports.len(),
        "results": rows,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

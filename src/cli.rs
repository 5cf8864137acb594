//! CLI domain: parse, route, output, presentation and script replay.

mod output;
mod parse;
mod presentation;
mod replay;
mod route;

pub use output::map_error;
pub use parse::{command_name, Cli, Commands};
pub use presentation::{
    format_exporters_json, format_exporters_text, format_replay_summary_json,
    format_replay_summary_text,
};
pub use replay::{apply_step, parse_script, run_replay, ReplayStep, ReplaySummary};
pub use route::RunContext;

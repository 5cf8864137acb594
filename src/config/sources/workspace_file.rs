//! Workspace config files under `<workspace>/config/`.
//!
//! `NBTELEMETRY_ENV` names the deployment environment whose overlay file is
//! layered on top of `config.toml`: `NBTELEMETRY_ENV=staging` reads
//! `config/staging.toml`. Unset means `development`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};

pub const ENVIRONMENT_VAR: &str = "NBTELEMETRY_ENV";
const DEFAULT_ENVIRONMENT: &str = "development";

/// Overlay file for the environment selected by `NBTELEMETRY_ENV`.
pub fn environment_file(workspace_root: &Path) -> PathBuf {
    let environment =
        std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());
    workspace_root
        .join("config")
        .join(format!("{environment}.toml"))
}

/// Layer `config/config.toml`, then the environment overlay. Missing files are skipped.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let layers = [
        workspace_root.join("config").join("config.toml"),
        environment_file(workspace_root),
    ];
    Ok(layers
        .into_iter()
        .filter(|path| path.exists())
        .fold(builder, |builder, path| {
            builder.add_source(File::from(path).required(false))
        }))
}

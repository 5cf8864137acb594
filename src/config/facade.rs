//! Configuration loader facade: one entry point over the layered sources.

use super::merge::merge_policy;
use super::sources::{env_vars, global_file, workspace_file};
use super::NbTelemetryConfig;
use crate::error::TelemetryError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for `workspace_root`.
    ///
    /// Precedence, lowest first: defaults, global file, `config/config.toml`,
    /// `config/{NBTELEMETRY_ENV}.toml`, `NBTELEMETRY__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<NbTelemetryConfig, TelemetryError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = env_vars::add_to_builder(builder)?;

        let config: NbTelemetryConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace = %workspace_root.display(),
            base_url = %config.service.base_url,
            "configuration loaded"
        );
        config.validated()
    }

    /// Load a single explicit file on top of the defaults. Environment
    /// variables still apply.
    pub fn load_from_file(path: &Path) -> Result<NbTelemetryConfig, TelemetryError> {
        if !path.exists() {
            return Err(TelemetryError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        let builder = env_vars::add_to_builder(builder)?;
        let config: NbTelemetryConfig = builder.build()?.try_deserialize()?;
        config.validated()
    }

    pub fn default() -> NbTelemetryConfig {
        NbTelemetryConfig::default()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}

//! Merge rules: built-in defaults underneath every other source.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("service.base_url", crate::config::default_base_url())?
        .set_default("service.connect_timeout_ms", 10_000)?
        .set_default("producers.scroll_debounce_ms", 1500)
}

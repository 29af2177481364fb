use anyhow::{Context, Result};
use serde::Deserialize;
use waveportal_connector::config::ConnectorConfig;
use waveportal_logger::LogConfig;

/// The top-level configuration for the `waveportal` binary.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CliConfig {
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Loads the configuration from a TOML file, layered with `WAVEPORTAL__*`
/// environment variables (e.g. `WAVEPORTAL__LOG__LEVEL=debug`).
pub fn load_config(path: &str) -> Result<CliConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("WAVEPORTAL").separator("__"));

    let settings: CliConfig = builder
        .build()
        .context(format!("Failed to build configuration from '{}'", path))?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    Ok(settings)
}

/// Loads `path` when given, otherwise falls back to the defaults.
pub fn load_or_default(path: Option<&str>) -> Result<CliConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(CliConfig::default()),
    }
}

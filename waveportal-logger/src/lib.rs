//! Tracing subscriber setup shared by the wave portal binaries.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs::File, path::Path, sync::Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Plain,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    File,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct LogConfig {
    /// A level such as `info`, or a full filter directive such as
    /// `waveportal_connector=debug,warn`.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub output: LogOutput,
    /// Required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
        }
    }
}

/// Parses the configured level into a filter, falling back to `info` when it is blank.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    let level = level.trim();
    let directive = if level.is_empty() { "info" } else { level };
    EnvFilter::try_new(directive).with_context(|| format!("Invalid log level '{directive}'"))
}

fn open_log_file(file_path: &str) -> Result<File> {
    let path = Path::new(file_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create log file {file_path}"))
}

/// Installs the global tracing subscriber described by `config`.
pub fn init(config: &LogConfig) -> Result<()> {
    let subscriber = Registry::default().with(build_filter(&config.level)?);

    match config.output {
        LogOutput::File => {
            let file_path = config
                .file_path
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Log output is 'file' but 'file-path' is not specified"))?;
            let file_writer = Mutex::new(open_log_file(file_path)?);
            let layer = fmt::layer().with_writer(file_writer).with_ansi(false);

            match config.format {
                LogFormat::Json => subscriber.with(layer.json()).try_init()?,
                LogFormat::Plain => subscriber.with(layer).try_init()?,
            }
        }
        LogOutput::Stdout => {
            let layer = fmt::layer().with_writer(std::io::stdout);
            match config.format {
                LogFormat::Json => subscriber.with(layer.json()).try_init()?,
                LogFormat::Plain => subscriber.with(layer.pretty()).try_init()?,
            }
        }
    };

    Ok(())
}

//! Configuration loading and tracing setup.
//!
//! Keeps environment handling and logging setup out of the main control flow.

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use scanwatch_core::{Config, DisplayMode};

use super::Args;

pub(super) fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config.as_ref() {
        Some(path) => Config::load_from_path(path).context("read config from path")?,
        None => Config::load_default().context("read default config")?,
    };
    // The command line wins over both the file and the environment.
    if let Some(origin) = args.origin.as_deref().map(str::trim) {
        if !origin.is_empty() {
            config.connection.origin = origin.to_string();
        }
    }
    Ok(config)
}

/// The display mode after CLI flags are applied.
pub(super) fn display_mode(args: &Args, config: &Config) -> DisplayMode {
    if args.plain {
        DisplayMode::Plain
    } else {
        config.display.mode
    }
}

pub(super) fn init_tracing(config: &Config, mode: DisplayMode) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            config
                .general
                .log_level
                .clone()
                .unwrap_or_else(|| "info".to_string()),
        )
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (mode, config.general.log_file.as_ref()) {
        (DisplayMode::Plain, _) => builder.with_writer(io::stderr).init(),
        // The terminal belongs to the UI; log to a file or not at all.
        (DisplayMode::Tui, Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        (DisplayMode::Tui, None) => builder.with_writer(io::sink).init(),
    }
    Ok(())
}

//! Configuration types and defaults for scanwatch.
//!
//! Keeps schema definitions in one place for easier auditing.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from config.toml.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub connection: ConnectionConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: Option<String>,
    /// Log destination while the terminal UI owns the screen.
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Origin the scan view is served from; decides ws vs wss and the host.
    pub origin: String,
    /// Scan to follow when none is given on the command line.
    pub scan_id: Option<String>,
    pub connect_timeout_ms: u64,
}

impl ConnectionConfig {
    pub const DEFAULT_ORIGIN: &'static str = "http://localhost:8000";
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
    pub const MIN_CONNECT_TIMEOUT_MS: u64 = 100;

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            origin: Self::DEFAULT_ORIGIN.to_string(),
            scan_id: None,
            connect_timeout_ms: Self::DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Tui,
    Plain,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub mode: DisplayMode,
    /// Show the "N% completed" readout next to the bar.
    pub progress_text: bool,
    pub max_log_lines: usize,
    /// Step ids the view has targets for. Unset means any step gets one.
    pub steps: Option<Vec<String>>,
}

impl DisplayConfig {
    pub const DEFAULT_MAX_LOG_LINES: usize = 1000;
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Tui,
            progress_text: true,
            max_log_lines: Self::DEFAULT_MAX_LOG_LINES,
            steps: None,
        }
    }
}

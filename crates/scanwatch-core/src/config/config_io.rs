//! Configuration loading and path resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{EndpointError, PageContext};

use super::config_runtime::{apply_origin_override, normalize_connection, normalize_display};
use super::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFailed(String),
    #[error("failed to parse config: {0}")]
    ParseFailed(String),
    #[error("missing $HOME, unable to resolve config directory")]
    MissingHome,
}

impl Config {
    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|err| ConfigError::ReadFailed(err.to_string()))?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration from the default XDG config location, if present.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_config_path()?;
        if !path.exists() {
            let mut config = Self::default();
            config.apply_runtime_defaults();
            return Ok(config);
        }
        Self::load_from_path(&path)
    }

    /// Parse configuration text and apply runtime defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Config =
            toml::from_str(contents).map_err(|err| ConfigError::ParseFailed(err.to_string()))?;
        config.apply_runtime_defaults();
        Ok(config)
    }

    fn apply_runtime_defaults(&mut self) {
        apply_origin_override(&mut self.connection);
        normalize_connection(&mut self.connection);
        normalize_display(&mut self.display);
    }

    /// Page the client attaches to. An explicit scan id wins over the
    /// configured one; with neither, the page has no anchor.
    pub fn page_context(&self, scan_id: Option<&str>) -> Result<PageContext, EndpointError> {
        let scan_id = scan_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .or(self.connection.scan_id.as_deref());
        PageContext::parse(&self.connection.origin, scan_id)
    }

    /// Return the default config directory based on XDG or $HOME.
    pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            // Prefer the XDG base directory when it is explicitly configured.
            return Ok(PathBuf::from(xdg).join("scanwatch"));
        }
        let home = env::var("HOME").map_err(|_| ConfigError::MissingHome)?;
        Ok(PathBuf::from(home).join(".config").join("scanwatch"))
    }

    /// Return the default config file path.
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectionConfig, DisplayMode};

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config.display.mode, DisplayMode::Tui);
        assert!(config.display.progress_text);
        assert_eq!(config.display.steps, None);
        assert_eq!(
            config.connection.connect_timeout_ms,
            ConnectionConfig::DEFAULT_CONNECT_TIMEOUT_MS
        );
    }

    #[test]
    fn parses_all_sections() {
        let config = Config::from_toml_str(
            r#"
            [general]
            log_level = "debug"
            log_file = "/tmp/scanwatch.log"

            [connection]
            scan_id = "abc"
            connect_timeout_ms = 2500

            [display]
            mode = "plain"
            progress_text = false
            max_log_lines = 50
            steps = ["scan", "report"]
            "#,
        )
        .expect("parse");
        assert_eq!(config.general.log_level.as_deref(), Some("debug"));
        assert_eq!(
            config.general.log_file,
            Some(PathBuf::from("/tmp/scanwatch.log"))
        );
        assert_eq!(config.connection.scan_id.as_deref(), Some("abc"));
        assert_eq!(config.connection.connect_timeout_ms, 2500);
        assert_eq!(config.display.mode, DisplayMode::Plain);
        assert!(!config.display.progress_text);
        assert_eq!(config.display.max_log_lines, 50);
        assert_eq!(
            config.display.steps,
            Some(vec!["scan".to_string(), "report".to_string()])
        );
    }

    #[test]
    fn rejects_unknown_display_mode() {
        let err = Config::from_toml_str("[display]\nmode = \"gui\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }

    #[test]
    fn explicit_scan_id_wins() {
        let mut config = Config::default();
        config.connection.origin = "https://scan.example".to_string();
        config.connection.scan_id = Some("from-config".to_string());

        let page = config.page_context(Some("from-cli")).expect("page");
        assert_eq!(page.anchor.expect("anchor").scan_id(), "from-cli");

        let page = config.page_context(Some("  ")).expect("page");
        assert_eq!(page.anchor.expect("anchor").scan_id(), "from-config");

        config.connection.scan_id = None;
        assert!(config.page_context(None).expect("page").anchor.is_none());
    }
}

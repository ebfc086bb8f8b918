//! Runtime adjustments for loaded configuration.
//!
//! Applies environment overrides and clamps values the client cannot use.

use std::env;

use super::{ConnectionConfig, DisplayConfig};

/// Environment variable that replaces `connection.origin`.
pub const ORIGIN_ENV: &str = "SCANWATCH_ORIGIN";

pub(super) fn apply_origin_override(connection: &mut ConnectionConfig) {
    if let Some(origin) = origin_override_from(env::var(ORIGIN_ENV).ok().as_deref()) {
        connection.origin = origin;
    }
}

fn origin_override_from(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
}

pub(super) fn normalize_connection(connection: &mut ConnectionConfig) {
    connection.origin = connection.origin.trim().to_string();
    if connection.origin.is_empty() {
        connection.origin = ConnectionConfig::DEFAULT_ORIGIN.to_string();
    }
    // A blank scan id in the file behaves like no anchor at all.
    connection.scan_id = connection
        .scan_id
        .take()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    connection.connect_timeout_ms = connection
        .connect_timeout_ms
        .max(ConnectionConfig::MIN_CONNECT_TIMEOUT_MS);
}

pub(super) fn normalize_display(display: &mut DisplayConfig) {
    display.max_log_lines = display.max_log_lines.max(1);
    if let Some(steps) = display.steps.as_mut() {
        let mut seen = Vec::with_capacity(steps.len());
        for step in steps.drain(..) {
            let step = step.trim().to_string();
            if !step.is_empty() && !seen.contains(&step) {
                seen.push(step);
            }
        }
        *steps = seen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_override_ignores_blank_values() {
        assert_eq!(origin_override_from(None), None);
        assert_eq!(origin_override_from(Some("  ")), None);
        assert_eq!(
            origin_override_from(Some(" https://scan.example ")),
            Some("https://scan.example".to_string())
        );
    }

    #[test]
    fn connection_values_are_clamped() {
        let mut connection = ConnectionConfig {
            origin: "  ".to_string(),
            scan_id: Some("   ".to_string()),
            connect_timeout_ms: 0,
        };
        normalize_connection(&mut connection);
        assert_eq!(connection.origin, ConnectionConfig::DEFAULT_ORIGIN);
        assert_eq!(connection.scan_id, None);
        assert_eq!(
            connection.connect_timeout_ms,
            ConnectionConfig::MIN_CONNECT_TIMEOUT_MS
        );
    }

    #[test]
    fn declared_steps_are_trimmed_and_deduplicated() {
        let mut display = DisplayConfig {
            max_log_lines: 0,
            steps: Some(vec![
                " scan".to_string(),
                "report".to_string(),
                "scan".to_string(),
                "".to_string(),
            ]),
            ..DisplayConfig::default()
        };
        normalize_display(&mut display);
        assert_eq!(display.max_log_lines, 1);
        assert_eq!(
            display.steps,
            Some(vec!["scan".to_string(), "report".to_string()])
        );
    }
}

//! Log-sanitizing helpers shared by the client and the binary.

use std::env;

/// Environment variable that widens payload snippets in logs.
pub const DIAGNOSTIC_ENV: &str = "SCANWATCH_DIAGNOSTIC";

const DEFAULT_LOG_LIMIT: usize = 160;
const DIAGNOSTIC_LOG_LIMIT: usize = 512;

/// Returns true when diagnostics are explicitly enabled via environment.
pub fn diagnostic_mode() -> bool {
    diagnostic_mode_from(env::var(DIAGNOSTIC_ENV).ok().as_deref())
}

fn diagnostic_mode_from(value: Option<&str>) -> bool {
    matches!(
        value
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Returns the effective log snippet limit for the current mode.
pub fn log_limit() -> usize {
    log_limit_for(diagnostic_mode())
}

fn log_limit_for(diagnostic: bool) -> usize {
    if diagnostic {
        DIAGNOSTIC_LOG_LIMIT
    } else {
        DEFAULT_LOG_LIMIT
    }
}

/// Sanitizes a log string by stripping newlines and capping length.
pub fn sanitize_log_value(value: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    // Frames can be large; only copy what survives the cap.
    let mut cleaned = String::with_capacity(max_len.min(value.len()));
    let mut truncated = false;
    for (count, ch) in value.chars().enumerate() {
        if count >= max_len {
            truncated = true;
            break;
        }
        cleaned.push(if ch == '\n' || ch == '\r' { ' ' } else { ch });
    }
    let trimmed = cleaned.trim();
    if truncated {
        format!("{trimmed}...")
    } else {
        trimmed.to_string()
    }
}

/// Produces a safe log snippet honoring diagnostic mode limits.
pub fn log_snippet(value: &str) -> String {
    sanitize_log_value(value, log_limit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_log_value_strips_newlines_and_caps() {
        assert_eq!(sanitize_log_value("ab\ncd\rEF", 5), "ab cd...");
        assert_eq!(sanitize_log_value("ok", 5), "ok");
        assert_eq!(sanitize_log_value("exact", 5), "exact");
        assert_eq!(sanitize_log_value("anything", 0), "");
    }

    #[test]
    fn diagnostic_mode_parses_expected_values() {
        assert!(diagnostic_mode_from(Some("1")));
        assert!(diagnostic_mode_from(Some("true")));
        assert!(diagnostic_mode_from(Some("YES")));
        assert!(diagnostic_mode_from(Some(" on ")));
        assert!(!diagnostic_mode_from(Some("0")));
        assert!(!diagnostic_mode_from(Some("false")));
        assert!(!diagnostic_mode_from(None));
    }

    #[test]
    fn log_limit_respects_mode() {
        assert_eq!(log_limit_for(false), DEFAULT_LOG_LIMIT);
        assert_eq!(log_limit_for(true), DIAGNOSTIC_LOG_LIMIT);
    }
}

//! Progress update wire model and frame parsing.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Discriminator value that marks the terminal frame of a scan.
pub const COMPLETE_TYPE: &str = "complete";

/// Reasons a frame could not be turned into a [`ProgressUpdate`].
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),
    #[error("frame is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
    #[error("frame has an invalid field: {0}")]
    InvalidField(serde_json::Error),
}

/// Progress percentage carried by a frame.
///
/// Displays the way the scan page printed numbers: integral values without a
/// fractional part, everything else in shortest round-trip form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percent(f64);

impl Percent {
    /// Wraps a finite value; NaN and infinities are rejected.
    pub fn new(value: f64) -> Option<Self> {
        value.is_finite().then_some(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Text written to the progress-bar width target, e.g. `42%`.
    pub fn width(self) -> String {
        format!("{self}%")
    }

    /// Text written to the optional progress readout, e.g. `42% completed`.
    pub fn completed_label(self) -> String {
        format!("{self}% completed")
    }

    /// Fraction in `0.0..=1.0` for gauges; out-of-range values are clamped.
    pub fn ratio(self) -> f64 {
        (self.0 / 100.0).clamp(0.0, 1.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_number(self.0))
    }
}

/// Format a number the way the scan page printed it: integral values
/// without a fractional part, everything else in shortest round-trip form.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Covers -0.0 as well.
        "0".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Whether a frame is an ordinary update or the terminal signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageKind {
    #[default]
    Update,
    Complete,
}

/// Final scan outcome reported by the server alongside progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub grade: Option<String>,
    pub risk_score: Option<f64>,
}

/// One parsed frame. Every field is optional; absent means "leave as is".
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProgressUpdate {
    #[serde(deserialize_with = "deserialize_percent")]
    pub progress: Option<Percent>,
    #[serde(deserialize_with = "deserialize_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "deserialize_steps")]
    pub steps: Option<IndexMap<String, String>>,
    #[serde(deserialize_with = "deserialize_text")]
    pub log: Option<String>,
    #[serde(rename = "type", deserialize_with = "deserialize_kind")]
    pub kind: MessageKind,
    /// Current step label sent by the scan runner.
    #[serde(deserialize_with = "deserialize_text")]
    pub step: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub grade: Option<String>,
    #[serde(deserialize_with = "deserialize_number")]
    pub risk_score: Option<f64>,
}

impl ProgressUpdate {
    /// Parse a text frame.
    pub fn parse(payload: &str) -> Result<Self, UpdateError> {
        let value: Value = serde_json::from_str(payload).map_err(UpdateError::InvalidJson)?;
        if !value.is_object() {
            return Err(UpdateError::NotAnObject(json_kind(&value)));
        }
        serde_json::from_value(value).map_err(UpdateError::InvalidField)
    }

    /// Parse a binary frame holding UTF-8 JSON.
    pub fn parse_bytes(payload: &[u8]) -> Result<Self, UpdateError> {
        let text = std::str::from_utf8(payload).map_err(|_| UpdateError::InvalidUtf8)?;
        Self::parse(text)
    }

    pub fn is_complete(&self) -> bool {
        self.kind == MessageKind::Complete
    }

    /// Status text to apply; empty strings leave the status untouched.
    pub fn status_text(&self) -> Option<&str> {
        non_empty(self.status.as_deref())
    }

    /// Log line to append; empty strings append nothing.
    pub fn log_line(&self) -> Option<&str> {
        non_empty(self.log.as_deref())
    }

    pub fn current_step(&self) -> Option<&str> {
        non_empty(self.step.as_deref())
    }

    pub fn result(&self) -> Option<ScanResult> {
        if self.grade.is_none() && self.risk_score.is_none() {
            return None;
        }
        Some(ScanResult {
            grade: self.grade.clone(),
            risk_score: self.risk_score,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lenient_number(value: Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => number
            .as_f64()
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or_else(|| format!("number {number} is out of range")),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or_else(|| format!("{text:?} is not a number")),
        other => Err(format!("expected a number, found {}", json_kind(&other))),
    }
}

fn deserialize_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    lenient_number(value).map_err(de::Error::custom)
}

fn deserialize_percent<'de, D>(deserializer: D) -> Result<Option<Percent>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_number(deserializer)?;
    Ok(value.and_then(Percent::new))
}

fn deserialize_steps<'de, D>(deserializer: D) -> Result<Option<IndexMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<IndexMap<String, Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let mut steps = IndexMap::with_capacity(raw.len());
    for (id, value) in raw {
        // A null label clears the target, matching how the page assigned it.
        let text = scalar_text(value)
            .map_err(|kind| {
                de::Error::custom(format!("step {id:?} has a {kind} value, expected text"))
            })?
            .unwrap_or_default();
        steps.insert(id, text);
    }
    Ok(Some(steps))
}

/// Text for a scalar JSON value; `null` is absent, nested values are rejected
/// with their JSON kind.
fn scalar_text(value: Value) -> Result<Option<String>, &'static str> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Number(number) => Ok(Some(match number.as_f64() {
            Some(value) if number.is_f64() => format_number(value),
            _ => number.to_string(),
        })),
        other => Err(json_kind(&other)),
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_text(value)
        .map_err(|kind| de::Error::custom(format!("expected text, found {kind}")))
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<MessageKind, D::Error>
where
    D: Deserializer<'de>,
{
    // Any discriminator other than the literal "complete" is ignored.
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(kind) if kind == COMPLETE_TYPE => MessageKind::Complete,
        _ => MessageKind::Update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_changes_nothing() {
        let update = ProgressUpdate::parse("{}").expect("parse");
        assert_eq!(update, ProgressUpdate::default());
        assert!(!update.is_complete());
    }

    #[test]
    fn zero_progress_is_present() {
        let update = ProgressUpdate::parse(r#"{"progress": 0}"#).expect("parse");
        let progress = update.progress.expect("progress present");
        assert_eq!(progress.width(), "0%");
        assert_eq!(progress.completed_label(), "0% completed");
    }

    #[test]
    fn null_fields_are_absent() {
        let update = ProgressUpdate::parse(
            r#"{"progress": null, "status": null, "steps": null, "grade": null, "risk_score": null}"#,
        )
        .expect("parse");
        assert_eq!(update, ProgressUpdate::default());
        assert!(update.result().is_none());
    }

    #[test]
    fn percent_formats_like_the_page() {
        assert_eq!(Percent::new(42.0).unwrap().width(), "42%");
        assert_eq!(Percent::new(42.5).unwrap().width(), "42.5%");
        assert_eq!(Percent::new(-0.0).unwrap().width(), "0%");
        assert_eq!(Percent::new(100.0).unwrap().to_string(), "100");
        assert!(Percent::new(f64::NAN).is_none());
    }

    #[test]
    fn percent_ratio_is_clamped() {
        assert_eq!(Percent::new(150.0).unwrap().ratio(), 1.0);
        assert_eq!(Percent::new(-5.0).unwrap().ratio(), 0.0);
        assert_eq!(Percent::new(25.0).unwrap().ratio(), 0.25);
    }

    #[test]
    fn numeric_string_progress_is_accepted() {
        let update = ProgressUpdate::parse(r#"{"progress": " 37 "}"#).expect("parse");
        assert_eq!(update.progress.map(Percent::value), Some(37.0));
    }

    #[test]
    fn non_numeric_progress_is_rejected() {
        let err = ProgressUpdate::parse(r#"{"progress": "soon"}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidField(_)));
        let err = ProgressUpdate::parse(r#"{"progress": [1]}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidField(_)));
    }

    #[test]
    fn steps_keep_order_and_stringify_scalars() {
        let update = ProgressUpdate::parse(
            r#"{"steps": {"scan": "running", "ports": 3, "tls": true, "report": null}}"#,
        )
        .expect("parse");
        let steps = update.steps.expect("steps");
        let entries: Vec<_> = steps
            .iter()
            .map(|(id, value)| (id.as_str(), value.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![("scan", "running"), ("ports", "3"), ("tls", "true"), ("report", "")]
        );
    }

    #[test]
    fn integral_float_step_values_drop_the_fraction() {
        let update =
            ProgressUpdate::parse(r#"{"steps": {"ports": 3.0, "ratio": 0.25, "big": 12}}"#)
                .expect("parse");
        let steps = update.steps.expect("steps");
        assert_eq!(steps["ports"], "3");
        assert_eq!(steps["ratio"], "0.25");
        assert_eq!(steps["big"], "12");
    }

    #[test]
    fn scalar_text_fields_are_stringified() {
        let update = ProgressUpdate::parse(
            r#"{"status": 7, "log": 4.0, "step": true, "grade": 1}"#,
        )
        .expect("parse");
        assert_eq!(update.status_text(), Some("7"));
        assert_eq!(update.log_line(), Some("4"));
        assert_eq!(update.current_step(), Some("true"));
        assert_eq!(update.grade.as_deref(), Some("1"));
    }

    #[test]
    fn nested_text_fields_are_rejected() {
        let err = ProgressUpdate::parse(r#"{"status": {"text": "x"}}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidField(_)));
        let err = ProgressUpdate::parse(r#"{"log": ["a", "b"]}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidField(_)));
    }

    #[test]
    fn format_number_matches_page_output() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(12.75), "12.75");
    }

    #[test]
    fn nested_step_values_are_rejected() {
        let err = ProgressUpdate::parse(r#"{"steps": {"scan": {"state": "x"}}}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidField(_)));
    }

    #[test]
    fn only_literal_complete_is_terminal() {
        assert!(ProgressUpdate::parse(r#"{"type": "complete"}"#)
            .unwrap()
            .is_complete());
        assert!(!ProgressUpdate::parse(r#"{"type": "Complete"}"#)
            .unwrap()
            .is_complete());
        assert!(!ProgressUpdate::parse(r#"{"type": 1}"#).unwrap().is_complete());
        assert!(!ProgressUpdate::parse(r#"{"type": "notification"}"#)
            .unwrap()
            .is_complete());
    }

    #[test]
    fn empty_status_and_log_are_skipped() {
        let update = ProgressUpdate::parse(r#"{"status": "", "log": "", "step": ""}"#).unwrap();
        assert_eq!(update.status_text(), None);
        assert_eq!(update.log_line(), None);
        assert_eq!(update.current_step(), None);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let update =
            ProgressUpdate::parse(r#"{"force_reload": true, "extra": {"a": 1}, "status": "ok"}"#)
                .unwrap();
        assert_eq!(update.status_text(), Some("ok"));
    }

    #[test]
    fn completion_frame_carries_result() {
        let update = ProgressUpdate::parse(
            r#"{"type": "complete", "force_reload": true, "progress": 100, "grade": "B", "risk_score": 41.5}"#,
        )
        .unwrap();
        assert!(update.is_complete());
        assert_eq!(
            update.result(),
            Some(ScanResult {
                grade: Some("B".to_string()),
                risk_score: Some(41.5),
            })
        );
    }

    #[test]
    fn rejects_non_object_frames() {
        assert!(matches!(
            ProgressUpdate::parse("[1, 2]").unwrap_err(),
            UpdateError::NotAnObject("array")
        ));
        assert!(matches!(
            ProgressUpdate::parse("null").unwrap_err(),
            UpdateError::NotAnObject("null")
        ));
        assert!(matches!(
            ProgressUpdate::parse("{not json").unwrap_err(),
            UpdateError::InvalidJson(_)
        ));
    }

    #[test]
    fn binary_frames_must_be_utf8() {
        assert!(matches!(
            ProgressUpdate::parse_bytes(&[0xff, 0xfe]).unwrap_err(),
            UpdateError::InvalidUtf8
        ));
        let update = ProgressUpdate::parse_bytes(br#"{"log": "hi"}"#).unwrap();
        assert_eq!(update.log_line(), Some("hi"));
    }
}

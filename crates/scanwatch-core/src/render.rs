//! Render-sink contract and the in-memory render state.
//!
//! The sink stands in for the scan page: a set of addressable targets the
//! client writes text into. `RenderState` is the canonical implementation and
//! is what the terminal views draw from.

use indexmap::IndexMap;
use tracing::debug;

use crate::{DisplayConfig, Percent, ScanResult};

/// Prefix used to address per-step targets.
pub const STEP_TARGET_PREFIX: &str = "step-";

/// Target id for a step, e.g. `scan` -> `step-scan`.
pub fn step_target_id(step: &str) -> String {
    format!("{STEP_TARGET_PREFIX}{step}")
}

/// Capabilities the progress client needs from whatever displays a scan.
pub trait RenderSink {
    /// Set the progress-bar width and, where present, the textual readout.
    fn set_progress(&mut self, progress: Percent);

    fn set_status(&mut self, status: &str);

    /// Whether a target with this id exists.
    fn has_element(&self, target: &str) -> bool;

    /// Set the text of an existing step target.
    fn set_step(&mut self, target: &str, value: &str);

    /// Append one line to the log target and scroll it to the newest entry.
    fn append_log(&mut self, line: &str);

    fn set_current_step(&mut self, _step: &str) {}

    fn set_result(&mut self, _result: &ScanResult) {}
}

/// Which step targets exist on the rendered view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StepTargets {
    /// A target is created the first time a step id is seen.
    #[default]
    Dynamic,
    /// Only these step ids have targets; updates for others are skipped.
    Declared(Vec<String>),
}

impl StepTargets {
    pub fn from_config(steps: Option<&[String]>) -> Self {
        match steps {
            Some(steps) => Self::Declared(steps.to_vec()),
            None => Self::Dynamic,
        }
    }
}

/// Static shape of the render target set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderLayout {
    /// Whether the "N% completed" readout exists.
    pub progress_text: bool,
    pub steps: StepTargets,
    /// Log lines kept before the oldest are dropped.
    pub max_log_lines: usize,
}

impl Default for RenderLayout {
    fn default() -> Self {
        Self {
            progress_text: true,
            steps: StepTargets::Dynamic,
            max_log_lines: DisplayConfig::DEFAULT_MAX_LOG_LINES,
        }
    }
}

impl From<&DisplayConfig> for RenderLayout {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            progress_text: config.progress_text,
            steps: StepTargets::from_config(config.steps.as_deref()),
            max_log_lines: config.max_log_lines.max(1),
        }
    }
}

/// In-memory render targets for one scan view.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    layout: RenderLayout,
    progress: Option<Percent>,
    progress_width: Option<String>,
    progress_text: Option<String>,
    status: Option<String>,
    // Keyed by target id in declaration or first-seen order.
    steps: IndexMap<String, String>,
    current_step: Option<String>,
    result: Option<ScanResult>,
    log: Vec<String>,
    // Index of the entry pinned to the bottom of the log view.
    log_scroll: Option<usize>,
    dropped_log_lines: u64,
}

impl Default for RenderState {
    fn default() -> Self {
        Self::new(RenderLayout::default())
    }
}

impl RenderState {
    pub fn new(layout: RenderLayout) -> Self {
        let steps = match &layout.steps {
            StepTargets::Declared(ids) => ids
                .iter()
                .map(|id| (step_target_id(id), String::new()))
                .collect(),
            StepTargets::Dynamic => IndexMap::new(),
        };
        Self {
            layout,
            progress: None,
            progress_width: None,
            progress_text: None,
            status: None,
            steps,
            current_step: None,
            result: None,
            log: Vec::new(),
            log_scroll: None,
            dropped_log_lines: 0,
        }
    }

    pub fn progress(&self) -> Option<Percent> {
        self.progress
    }

    /// Current progress-bar width text, e.g. `42%`.
    pub fn progress_width(&self) -> Option<&str> {
        self.progress_width.as_deref()
    }

    pub fn progress_text(&self) -> Option<&str> {
        self.progress_text.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Text of a step target addressed by its full id (`step-<id>`).
    pub fn step(&self, target: &str) -> Option<&str> {
        self.steps.get(target).map(String::as_str)
    }

    /// Step targets as `(step id, text)` pairs in display order.
    pub fn steps(&self) -> impl Iterator<Item = (&str, &str)> {
        self.steps.iter().map(|(target, text)| {
            let id = target.strip_prefix(STEP_TARGET_PREFIX).unwrap_or(target);
            (id, text.as_str())
        })
    }

    pub fn current_step(&self) -> Option<&str> {
        self.current_step.as_deref()
    }

    pub fn result(&self) -> Option<&ScanResult> {
        self.result.as_ref()
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn log_scroll(&self) -> Option<usize> {
        self.log_scroll
    }

    /// Lines trimmed from the front of the log to honor the line cap.
    pub fn dropped_log_lines(&self) -> u64 {
        self.dropped_log_lines
    }
}

impl RenderSink for RenderState {
    fn set_progress(&mut self, progress: Percent) {
        self.progress = Some(progress);
        self.progress_width = Some(progress.width());
        if self.layout.progress_text {
            self.progress_text = Some(progress.completed_label());
        }
    }

    fn set_status(&mut self, status: &str) {
        self.status = Some(status.to_string());
    }

    fn has_element(&self, target: &str) -> bool {
        if self.steps.contains_key(target) {
            return true;
        }
        match self.layout.steps {
            StepTargets::Dynamic => target
                .strip_prefix(STEP_TARGET_PREFIX)
                .is_some_and(|id| !id.is_empty()),
            StepTargets::Declared(_) => false,
        }
    }

    fn set_step(&mut self, target: &str, value: &str) {
        if let Some(text) = self.steps.get_mut(target) {
            value.clone_into(text);
            return;
        }
        if self.has_element(target) {
            self.steps.insert(target.to_string(), value.to_string());
        } else {
            debug!(target, "no render target for step");
        }
    }

    fn append_log(&mut self, line: &str) {
        self.log.push(line.to_string());

        // Bound memory by trimming the oldest entries.
        if self.log.len() > self.layout.max_log_lines {
            let excess = self.log.len() - self.layout.max_log_lines;
            self.log.drain(0..excess);
            self.dropped_log_lines += excess as u64;
        }

        self.log_scroll = self.log.len().checked_sub(1);
    }

    fn set_current_step(&mut self, step: &str) {
        self.current_step = Some(step.to_string());
    }

    fn set_result(&mut self, result: &ScanResult) {
        let merged = self.result.get_or_insert_with(ScanResult::default);
        if let Some(grade) = &result.grade {
            merged.grade = Some(grade.clone());
        }
        if let Some(score) = result.risk_score {
            merged.risk_score = Some(score);
        }
    }
}

//! Line-oriented render sink for pipes and non-interactive terminals.

use std::io::Write;

use chrono::Local;
use tracing::debug;

use scanwatch_core::{Percent, RenderLayout, RenderSink, RenderState, ScanResult};

/// Mirrors every applied change as one output line, on top of a `RenderState`.
pub struct PlainSink<W: Write> {
    state: RenderState,
    out: W,
    timestamps: bool,
}

impl<W: Write> PlainSink<W> {
    pub fn new(layout: RenderLayout, out: W) -> Self {
        Self {
            state: RenderState::new(layout),
            out,
            timestamps: true,
        }
    }

    #[cfg(test)]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, label: &str, text: &str) {
        let result = if self.timestamps {
            let now = Local::now().format("%H:%M:%S");
            writeln!(self.out, "{now} {label:<9} {text}")
        } else {
            writeln!(self.out, "{label:<9} {text}")
        };
        if let Err(err) = result.and_then(|_| self.out.flush()) {
            debug!(?err, "plain output write failed");
        }
    }
}

impl<W: Write> RenderSink for PlainSink<W> {
    fn set_progress(&mut self, progress: Percent) {
        self.state.set_progress(progress);
        let text = match self.state.progress_text() {
            Some(text) => text.to_string(),
            None => progress.width(),
        };
        self.emit("progress", &text);
    }

    fn set_status(&mut self, status: &str) {
        self.state.set_status(status);
        self.emit("status", status);
    }

    fn has_element(&self, target: &str) -> bool {
        self.state.has_element(target)
    }

    fn set_step(&mut self, target: &str, value: &str) {
        self.state.set_step(target, value);
        let name = target
            .strip_prefix(scanwatch_core::STEP_TARGET_PREFIX)
            .unwrap_or(target);
        self.emit("step", &format!("{name}: {value}"));
    }

    fn append_log(&mut self, line: &str) {
        self.state.append_log(line);
        self.emit("log", line);
    }

    fn set_current_step(&mut self, step: &str) {
        self.state.set_current_step(step);
        self.emit("stage", step);
    }

    fn set_result(&mut self, result: &ScanResult) {
        self.state.set_result(result);
        let mut parts = Vec::new();
        if let Some(grade) = &result.grade {
            parts.push(format!("grade {grade}"));
        }
        if let Some(score) = result.risk_score {
            parts.push(format!("risk score {score}"));
        }
        if !parts.is_empty() {
            self.emit("result", &parts.join(", "));
        }
    }
}

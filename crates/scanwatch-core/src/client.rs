//! Progress client: applies scan frames to a render sink.
//!
//! The client performs no I/O. A transport adapter feeds it frames in arrival
//! order and closes the connection when told to. Two states exist, `Open` and
//! `Closed`; `Closed` is terminal and later frames are ignored.

use std::fmt;

use tracing::{debug, info, warn};
use url::Url;

use crate::util::log_snippet;
use crate::{
    scan_endpoint, step_target_id, EndpointError, PageContext, ProgressUpdate, RenderSink,
    UpdateError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Result of handing one frame to the client.
#[derive(Debug)]
pub enum FrameOutcome {
    /// The update was applied; keep reading.
    Applied,
    /// The update was applied and signalled completion; close the connection.
    Complete,
    /// The frame could not be parsed; nothing changed, keep reading.
    Malformed(UpdateError),
    /// The client is closed; the frame was dropped.
    Ignored,
}

/// Close details reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: Option<u16>,
    pub reason: String,
}

/// How the stream ended, from the client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    AfterCompletion,
    Unexpected,
}

/// Apply one update to a sink.
///
/// Only targets for fields present in the update are written. Step updates
/// without a matching target are skipped.
pub fn apply_update<S: RenderSink + ?Sized>(sink: &mut S, update: &ProgressUpdate) {
    if let Some(progress) = update.progress {
        sink.set_progress(progress);
    }
    if let Some(status) = update.status_text() {
        sink.set_status(status);
    }
    if let Some(steps) = &update.steps {
        for (step, value) in steps {
            let target = step_target_id(step);
            if sink.has_element(&target) {
                sink.set_step(&target, value);
            } else {
                debug!(step = %step, "skipping step without render target");
            }
        }
    }
    if let Some(line) = update.log_line() {
        sink.append_log(line);
    }
    if let Some(step) = update.current_step() {
        sink.set_current_step(step);
    }
    if let Some(result) = update.result() {
        sink.set_result(&result);
    }
}

/// Client bound to one scan and one render sink.
pub struct ProgressClient<S> {
    sink: S,
    scan_id: String,
    endpoint: Url,
    state: ConnectionState,
    completed: bool,
    applied: u64,
    malformed: u64,
}

impl<S: RenderSink> ProgressClient<S> {
    /// Attach to a page. Returns `Ok(None)` without touching the sink when
    /// the page has no scan anchor; nothing should be connected then.
    pub fn attach(page: &PageContext, sink: S) -> Result<Option<Self>, EndpointError> {
        let Some(anchor) = page.anchor.as_ref() else {
            debug!("no scan anchor on page; progress client not attached");
            return Ok(None);
        };
        let endpoint = scan_endpoint(&page.origin, anchor.scan_id())?;
        debug!(endpoint = %endpoint, "progress client attached");
        Ok(Some(Self {
            sink,
            scan_id: anchor.scan_id().to_string(),
            endpoint,
            state: ConnectionState::Open,
            completed: false,
            applied: 0,
            malformed: 0,
        }))
    }

    /// Handle a text frame.
    pub fn on_frame(&mut self, payload: &str) -> FrameOutcome {
        if self.state == ConnectionState::Closed {
            debug!(scan_id = %self.scan_id, "dropping frame received after close");
            return FrameOutcome::Ignored;
        }
        self.handle_parsed(ProgressUpdate::parse(payload), payload)
    }

    /// Handle a binary frame holding UTF-8 JSON.
    pub fn on_binary(&mut self, payload: &[u8]) -> FrameOutcome {
        if self.state == ConnectionState::Closed {
            debug!(scan_id = %self.scan_id, "dropping frame received after close");
            return FrameOutcome::Ignored;
        }
        let raw = String::from_utf8_lossy(payload);
        self.handle_parsed(ProgressUpdate::parse_bytes(payload), &raw)
    }

    fn handle_parsed(
        &mut self,
        parsed: Result<ProgressUpdate, UpdateError>,
        raw: &str,
    ) -> FrameOutcome {
        let update = match parsed {
            Ok(update) => update,
            Err(err) => {
                self.malformed += 1;
                warn!(
                    scan_id = %self.scan_id,
                    error = %err,
                    payload = %log_snippet(raw),
                    "ignoring malformed frame"
                );
                return FrameOutcome::Malformed(err);
            }
        };

        apply_update(&mut self.sink, &update);
        self.applied += 1;

        if update.is_complete() {
            self.state = ConnectionState::Closed;
            self.completed = true;
            info!(scan_id = %self.scan_id, "scan reported completion");
            FrameOutcome::Complete
        } else {
            FrameOutcome::Applied
        }
    }

    /// Record a transport close and classify it.
    pub fn on_close(&mut self, info: Option<&CloseInfo>) -> CloseKind {
        self.state = ConnectionState::Closed;
        if self.completed {
            info!(scan_id = %self.scan_id, "scan stream closed after completion");
            return CloseKind::AfterCompletion;
        }
        let code = info.and_then(|info| info.code);
        let reason = info.map(|info| info.reason.as_str()).unwrap_or_default();
        warn!(
            scan_id = %self.scan_id,
            code = ?code,
            reason = %log_snippet(reason),
            "scan stream closed unexpectedly"
        );
        CloseKind::Unexpected
    }

    /// Record a transport failure. No reconnection is attempted.
    pub fn on_transport_error(&mut self, error: &dyn fmt::Display) -> CloseKind {
        self.state = ConnectionState::Closed;
        if self.completed {
            debug!(scan_id = %self.scan_id, error = %error, "transport error after completion");
            return CloseKind::AfterCompletion;
        }
        warn!(scan_id = %self.scan_id, error = %error, "scan stream failed");
        CloseKind::Unexpected
    }

    /// Close an open client because its view is going away. Returns whether
    /// the connection still needs releasing.
    pub fn teardown(&mut self) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        self.state = ConnectionState::Closed;
        info!(scan_id = %self.scan_id, "closing scan stream on teardown");
        true
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Whether a completion frame has been seen.
    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Frames applied so far.
    pub fn applied_frames(&self) -> u64 {
        self.applied
    }

    pub fn malformed_frames(&self) -> u64 {
        self.malformed
    }
}

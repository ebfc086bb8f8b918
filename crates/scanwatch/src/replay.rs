//! Replays captured frames from a JSON-lines file instead of the network.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::transport::{Frame, FrameChannel, TransportError};

/// One frame per non-blank line, optionally paced by a fixed delay.
pub struct ReplayChannel {
    frames: VecDeque<String>,
    delay: Duration,
    closed: bool,
}

impl ReplayChannel {
    pub fn open(path: &Path, delay: Duration) -> Result<Self, TransportError> {
        let contents = fs::read_to_string(path).map_err(|source| TransportError::ReplayRead {
            path: path.display().to_string(),
            source,
        })?;
        let channel = Self::from_lines(&contents, delay);
        debug!(path = %path.display(), frames = channel.remaining(), "replay loaded");
        Ok(channel)
    }

    pub fn from_lines(contents: &str, delay: Duration) -> Self {
        let frames = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            frames,
            delay,
            closed: false,
        }
    }

    /// Frames not yet delivered.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameChannel for ReplayChannel {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        if self.closed || self.frames.is_empty() {
            return None;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.frames.pop_front().map(|line| Ok(Frame::Text(line)))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}

//! Drives one progress client from one frame channel.
//!
//! Reading is the only cancellable step: `recv` may be raced against input or
//! signals, while `handle` always runs to completion so a frame is never
//! half-applied and a requested close is always sent.

use std::future::Future;

use tracing::{info, warn};

use scanwatch_core::{CloseKind, FrameOutcome, ProgressClient, RenderSink};

use crate::transport::{Frame, FrameChannel, TransportError};

/// How a watch session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The scan reported completion.
    Completed,
    /// The stream closed before completion.
    ClosedByPeer,
    /// The transport failed before completion.
    Failed,
    /// The user or a signal ended the session.
    Interrupted,
}

impl SessionEnd {
    pub fn label(self) -> &'static str {
        match self {
            SessionEnd::Completed => "completed",
            SessionEnd::ClosedByPeer => "closed before completion",
            SessionEnd::Failed => "connection failed",
            SessionEnd::Interrupted => "interrupted",
        }
    }

    /// Whether the process should exit successfully.
    pub fn is_success(self) -> bool {
        matches!(self, SessionEnd::Completed | SessionEnd::Interrupted)
    }
}

pub type Incoming = Option<Result<Frame, TransportError>>;

pub struct Session<S, C> {
    client: ProgressClient<S>,
    channel: C,
    end: Option<SessionEnd>,
}

impl<S: RenderSink, C: FrameChannel> Session<S, C> {
    pub fn new(client: ProgressClient<S>, channel: C) -> Self {
        Self {
            client,
            channel,
            end: None,
        }
    }

    #[cfg(test)]
    pub fn client(&self) -> &ProgressClient<S> {
        &self.client
    }

    pub fn sink(&self) -> &S {
        self.client.sink()
    }

    pub fn end(&self) -> Option<SessionEnd> {
        self.end
    }

    /// Wait for the next frame. Safe to cancel.
    pub async fn recv(&mut self) -> Incoming {
        self.channel.next_frame().await
    }

    /// Apply one read result. Returns the session end once the stream is over.
    pub async fn handle(&mut self, incoming: Incoming) -> Option<SessionEnd> {
        // A finished session ignores anything still in flight.
        if let Some(end) = self.end {
            return Some(end);
        }
        let end = match incoming {
            Some(Ok(Frame::Text(text))) => {
                let outcome = self.client.on_frame(&text);
                self.after_outcome(outcome).await
            }
            Some(Ok(Frame::Binary(data))) => {
                let outcome = self.client.on_binary(&data);
                self.after_outcome(outcome).await
            }
            // The peer closed; classify it against whether completion was seen.
            Some(Ok(Frame::Close(info))) => {
                Some(close_end(self.client.on_close(info.as_ref())))
            }
            Some(Err(err)) => match self.client.on_transport_error(&err) {
                CloseKind::AfterCompletion => Some(SessionEnd::Completed),
                CloseKind::Unexpected => Some(SessionEnd::Failed),
            },
            // End of stream without a close frame counts as a bare close.
            None => Some(close_end(self.client.on_close(None))),
        };
        if let Some(end) = end {
            self.finish(end);
        }
        end
    }

    async fn after_outcome(&mut self, outcome: FrameOutcome) -> Option<SessionEnd> {
        match outcome {
            FrameOutcome::Applied | FrameOutcome::Malformed(_) => None,
            FrameOutcome::Complete => {
                // The client is closed; release the connection right away.
                self.release().await;
                Some(SessionEnd::Completed)
            }
            // Only reachable if the client closed without the session noticing.
            FrameOutcome::Ignored => Some(SessionEnd::Interrupted),
        }
    }

    /// End the session on behalf of the user or a signal.
    pub async fn interrupt(&mut self) -> SessionEnd {
        if let Some(end) = self.end {
            return end;
        }
        // Only an open client still holds a connection worth closing.
        if self.client.teardown() {
            self.release().await;
        }
        self.finish(SessionEnd::Interrupted);
        SessionEnd::Interrupted
    }

    /// Read and apply frames until the stream ends or `stop` resolves.
    pub async fn run_until<F: Future>(&mut self, stop: F) -> SessionEnd {
        tokio::pin!(stop);
        loop {
            tokio::select! {
                // Check the stop future first so a pending stop wins over a
                // ready frame.
                biased;
                _ = &mut stop => return self.interrupt().await,
                incoming = self.recv() => {
                    if let Some(end) = self.handle(incoming).await {
                        return end;
                    }
                }
            }
        }
    }

    async fn release(&mut self) {
        if let Err(err) = self.channel.close().await {
            warn!(error = %err, "failed to close scan stream");
        }
    }

    fn finish(&mut self, end: SessionEnd) {
        self.end = Some(end);
        info!(
            scan_id = %self.client.scan_id(),
            end = end.label(),
            applied = self.client.applied_frames(),
            malformed = self.client.malformed_frames(),
            "watch session finished"
        );
    }
}

fn close_end(kind: CloseKind) -> SessionEnd {
    match kind {
        CloseKind::AfterCompletion => SessionEnd::Completed,
        CloseKind::Unexpected => SessionEnd::ClosedByPeer,
    }
}

//! Interactive watch loop: frames, terminal input and signals on one task.

use std::thread;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use tokio::sync::mpsc;
use tracing::debug;

use scanwatch_core::RenderState;

use crate::app::{App, InputAction};
use crate::session::{Session, SessionEnd};
use crate::shutdown_signal::shutdown_signal;
use crate::terminal::TerminalGuard;
use crate::transport::FrameChannel;
use crate::ui;

pub async fn run<C: FrameChannel>(
    mut session: Session<RenderState, C>,
    mut app: App,
) -> Result<SessionEnd> {
    let mut guard = TerminalGuard::new().context("initialize terminal")?;
    let result = run_loop(&mut guard, &mut session, &mut app).await;

    // Restore before returning loop errors.
    guard.restore().context("restore terminal")?;

    let end = result?;
    Ok(end)
}

async fn run_loop<C: FrameChannel>(
    guard: &mut TerminalGuard,
    session: &mut Session<RenderState, C>,
    app: &mut App,
) -> Result<SessionEnd> {
    // Terminal input is blocking, so it is read on its own thread.
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Event>();
    spawn_input_thread(input_tx);

    // Pinned once so every loop iteration polls the same signal listener.
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    // Draw the empty view before the first frame arrives.
    redraw(guard, app, session)?;

    loop {
        // Stop reading once the stream is over; the final view stays up.
        let streaming = session.end().is_none();
        tokio::select! {
            _ = &mut shutdown => {
                return Ok(session.interrupt().await);
            }
            input = input_rx.recv() => {
                let Some(input) = input else {
                    debug!("terminal input closed");
                    return Ok(session.interrupt().await);
                };
                if app.handle_event(&input) == InputAction::Quit {
                    return Ok(session.interrupt().await);
                }
            }
            incoming = session.recv(), if streaming => {
                if let Some(end) = session.handle(incoming).await {
                    app.finish(end);
                }
            }
        }

        // Repaint after every event, then honor --exit-on-close.
        redraw(guard, app, session)?;
        if app.should_exit() {
            if let Some(end) = session.end() {
                return Ok(end);
            }
        }
    }
}

fn redraw<C: FrameChannel>(
    guard: &mut TerminalGuard,
    app: &App,
    session: &Session<RenderState, C>,
) -> Result<()> {
    guard
        .terminal_mut()
        .draw(|frame| ui::draw(frame, app, session.sink()))
        .context("draw frame")?;
    Ok(())
}

fn spawn_input_thread(input_tx: mpsc::UnboundedSender<Event>) {
    // Forward blocking terminal events; exit once the loop drops the receiver.
    thread::spawn(move || {
        while let Ok(event) = event::read() {
            if input_tx.send(event).is_err() {
                break;
            }
        }
    });
}

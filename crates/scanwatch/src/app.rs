//! View state for the terminal watch screen.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::session::SessionEnd;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    // Frames are still arriving.
    Streaming,
    // The stream is over; the final view stays up until dismissed.
    Finished(SessionEnd),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputAction {
    None,
    Quit,
}

pub struct App {
    pub scan_id: String,
    pub endpoint: String,
    pub source: &'static str,
    pub phase: Phase,
    pub exit_on_close: bool,
}

impl App {
    pub fn new(scan_id: &str, endpoint: &str, source: &'static str, exit_on_close: bool) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            endpoint: endpoint.to_string(),
            source,
            phase: Phase::Streaming,
            exit_on_close,
        }
    }

    pub fn finish(&mut self, end: SessionEnd) {
        self.phase = Phase::Finished(end);
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    /// Whether the view should close by itself.
    pub fn should_exit(&self) -> bool {
        self.exit_on_close && self.is_finished()
    }

    pub fn handle_event(&self, event: &Event) -> InputAction {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            _ => InputAction::None,
        }
    }

    fn handle_key(&self, key: &KeyEvent) -> InputAction {
        // Raw mode swallows SIGINT, so Ctrl+C arrives as a key.
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return InputAction::Quit;
        }
        if self.is_finished() {
            return InputAction::Quit;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => InputAction::Quit,
            _ => InputAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn app() -> App {
        App::new("42", "ws://localhost:8000/ws/scan/42/", "websocket", false)
    }

    #[test]
    fn quit_keys_while_streaming() {
        let app = app();
        assert_eq!(app.handle_event(&key(KeyCode::Char('q'), KeyModifiers::NONE)), InputAction::Quit);
        assert_eq!(app.handle_event(&key(KeyCode::Esc, KeyModifiers::NONE)), InputAction::Quit);
        assert_eq!(
            app.handle_event(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            InputAction::Quit
        );
        assert_eq!(app.handle_event(&key(KeyCode::Char('x'), KeyModifiers::NONE)), InputAction::None);
    }

    #[test]
    fn any_key_dismisses_finished_view() {
        let mut app = app();
        app.finish(SessionEnd::Completed);
        assert!(!app.should_exit());
        assert_eq!(app.handle_event(&key(KeyCode::Enter, KeyModifiers::NONE)), InputAction::Quit);
    }

    #[test]
    fn key_release_is_ignored() {
        let app = app();
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(app.handle_event(&release), InputAction::None);
        assert_eq!(app.handle_event(&Event::Resize(80, 24)), InputAction::None);
    }

    #[test]
    fn exit_on_close_only_after_finish() {
        let mut app = App::new("42", "ws://x/ws/scan/42/", "websocket", true);
        assert!(!app.should_exit());
        app.finish(SessionEnd::ClosedByPeer);
        assert!(app.should_exit());
    }
}

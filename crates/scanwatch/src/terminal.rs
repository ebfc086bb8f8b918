//! Raw-mode terminal ownership for the watch view.

use std::io;

use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

pub type WatchTerminal = Terminal<CrosstermBackend<io::Stdout>>;

pub struct TerminalGuard {
    // Own the ratatui Terminal and restore terminal state on drop.
    terminal: WatchTerminal,
    // Set once restore has run so Drop does not repeat it.
    restored: bool,
}

impl TerminalGuard {
    pub fn new() -> io::Result<Self> {
        // Enable raw mode so keypresses are delivered directly.
        enable_raw_mode()?;

        let mut stdout = io::stdout();

        // Switch to the alternate screen buffer to preserve shell scrollback.
        // Undo raw mode if that fails so the shell is left usable.
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        // The watch view has no text input, so the cursor stays hidden.
        terminal.hide_cursor()?;

        Ok(Self {
            terminal,
            restored: false,
        })
    }

    pub fn terminal_mut(&mut self) -> &mut WatchTerminal {
        &mut self.terminal
    }

    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        // Restore terminal state back to normal.
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;

        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best-effort cleanup, never panic in Drop.
        let _ = self.restore();
    }
}

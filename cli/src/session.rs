//! Terminal session guard.

use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    io::{Stdout, stdout},
    panic,
};

/// RAII wrapper for terminal state with guaranteed cleanup on drop.
///
/// Owns raw mode, the alternate screen and bracketed paste. The same state is
/// restored on drop, while an external program has the terminal
/// ([`TerminalSession::suspend`]), and from the panic hook.
pub struct TerminalSession {
    pub terminal: Terminal<CrosstermBackend<Stdout>>,
    suspended: bool,
}

impl TerminalSession {
    pub fn new() -> Result<Self> {
        install_panic_hook();
        enter()?;
        let terminal = match Terminal::new(CrosstermBackend::new(stdout())) {
            Ok(terminal) => terminal,
            Err(err) => {
                restore();
                return Err(err.into());
            }
        };
        Ok(Self {
            terminal,
            suspended: false,
        })
    }

    /// Gives the terminal back to the shell so another program can use it.
    pub fn suspend(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste,
            Show
        )?;
        self.suspended = true;
        Ok(())
    }

    /// Takes the terminal back after [`TerminalSession::suspend`] and forces
    /// a full redraw.
    pub fn resume(&mut self) -> Result<()> {
        enter()?;
        self.suspended = false;
        self.terminal.clear()?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if !self.suspended {
            restore();
        }
        let _ = self.terminal.show_cursor();
    }
}

fn enter() -> Result<()> {
    enable_raw_mode()?;
    if let Err(err) = execute!(stdout(), EnterAlternateScreen, EnableBracketedPaste) {
        restore();
        return Err(err.into());
    }
    Ok(())
}

fn restore() {
    let _ = disable_raw_mode();
    let _ = execute!(stdout(), LeaveAlternateScreen, DisableBracketedPaste, Show);
}

/// Restores the terminal before the default hook prints the panic message,
/// so the message is not lost on the alternate screen.
fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        restore();
        previous(info);
    }));
}

//! Terminal setup and restoration for the console TUI.
//!
//! [`Tui`] puts the terminal into raw mode on the alternate screen and puts
//! it back when dropped. [`install_panic_hook`] covers the case where a
//! panic unwinds past the [`Tui`] before its [`Drop`] runs.
//!
//! # Example
//!
//! ```ignore
//! use eventdesk_console::tui::terminal::{install_panic_hook, Tui};
//!
//! install_panic_hook();
//! let mut tui = Tui::new()?;
//! tui.draw(|frame| {
//!     // render widgets into `frame`
//! })?;
//! tui.restore()?;
//! ```

use std::io::{self, Stdout};
use std::panic;

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::error::TuiError;

/// Best-effort terminal restoration. Errors are ignored since the terminal
/// may already be in a bad state.
fn reset_terminal() {
    let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

/// Installs a panic hook that restores the terminal before the panic
/// message is printed.
///
/// Call once at startup, before creating a [`Tui`]. The previously
/// installed hook still runs afterwards, so default panic output is kept.
pub fn install_panic_hook() {
    let previous_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        reset_terminal();
        previous_hook(panic_info);
    }));
}

/// Ratatui terminal that restores the shell on drop.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    restored: bool,
}

impl Tui {
    /// Enables raw mode, enters the alternate screen and hides the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`TuiError::TerminalInit`] if any step fails. Steps already
    /// taken are undone before returning.
    pub fn new() -> Result<Self, TuiError> {
        enable_raw_mode().map_err(TuiError::TerminalInit)?;

        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(TuiError::TerminalInit(e));
        }

        let terminal = Terminal::new(CrosstermBackend::new(stdout)).map_err(|e| {
            reset_terminal();
            TuiError::TerminalInit(e)
        })?;

        Ok(Self {
            terminal,
            restored: false,
        })
    }

    /// Draws one frame.
    ///
    /// # Arguments
    ///
    /// * `f` - Closure that renders widgets into the frame
    ///
    /// # Errors
    ///
    /// Returns [`TuiError::Render`] if writing to the terminal fails.
    pub fn draw<F>(&mut self, f: F) -> Result<(), TuiError>
    where
        F: FnOnce(&mut ratatui::Frame),
    {
        self.terminal.draw(f).map_err(TuiError::Render)?;
        Ok(())
    }

    /// Restores the terminal. Later calls and the [`Drop`] impl are no-ops.
    ///
    /// # Errors
    ///
    /// Unlike [`Drop`], restoration errors are returned to the caller.
    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        execute!(io::stdout(), Show, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if !self.restored {
            reset_terminal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Creating a Tui needs a real terminal, so these tests cover the API
    // surface only.

    #[test]
    fn tui_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Tui>();
    }

    #[test]
    fn panic_hook_can_be_installed_twice() {
        install_panic_hook();
        install_panic_hook();
    }
}

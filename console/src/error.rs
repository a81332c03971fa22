//! Error types for EventDesk Console.

use thiserror::Error;

use eventdesk_notify::ConfigError;

/// Errors that can occur while running the console.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Terminal I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TUI-related error.
    #[error("TUI error: {0}")]
    Tui(#[from] TuiError),
}

/// Errors that can occur during TUI operation.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Terminal initialization failed.
    #[error("failed to initialize terminal: {0}")]
    TerminalInit(#[source] std::io::Error),

    /// Terminal rendering failed.
    #[error("render error: {0}")]
    Render(#[source] std::io::Error),

    /// Input handling task failed.
    #[error("event error: {0}")]
    Event(String),
}

/// Result type alias for console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;

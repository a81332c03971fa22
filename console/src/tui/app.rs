//! Application state and input handling for the console TUI.
//!
//! - [`AppState`]: quit flag, status line, theme and symbols
//! - [`Action`]: what a key press asks the app to do
//! - [`TuiEvent`]: events that drive the render loop
//! - [`EventHandler`]: async loop that multiplexes ticks and terminal input
//!
//! Key presses are mapped to an [`Action`] by [`action_for_key`] and applied
//! to the notification [`Services`] by [`AppState::apply`]. Toast state
//! itself lives in the mounted container, not here.
//!
//! # Example
//!
//! ```ignore
//! use tokio::sync::{mpsc, oneshot};
//! use eventdesk_console::tui::app::{AppState, EventHandler, TuiEvent};
//!
//! let (event_tx, mut event_rx) = mpsc::channel(100);
//! let (shutdown_tx, shutdown_rx) = oneshot::channel();
//! tokio::spawn(EventHandler::new(event_tx, shutdown_rx).run());
//!
//! let mut state = AppState::new();
//! while let Some(event) = event_rx.recv().await {
//!     if let TuiEvent::Key(key) = event {
//!         state.handle_key(key, &services);
//!     }
//!     if state.should_quit() {
//!         let _ = shutdown_tx.send(());
//!         break;
//!     }
//! }
//! ```

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::style::{Color, Modifier, Style};
use tokio::sync::{mpsc, oneshot};

use eventdesk_notify::types::{EventKind, ToastKind};

use crate::services::{sample_event, Services};

// =============================================================================
// Theme and Symbols
// =============================================================================

/// Styles used by the console widgets.
#[derive(Debug, Clone)]
pub struct Theme {
    pub toast_info: Style,
    pub toast_success: Style,
    pub toast_warning: Style,
    pub toast_error: Style,

    /// Style for the remaining-time countdown.
    pub countdown: Style,

    pub border: Style,
    pub title: Style,
    pub text_primary: Style,
    pub text_muted: Style,

    /// Style for key names in the help bar.
    pub key_hint: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            toast_info: Style::default().fg(Color::Blue),
            toast_success: Style::default().fg(Color::Green),
            toast_warning: Style::default().fg(Color::Yellow),
            toast_error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),

            countdown: Style::default().fg(Color::DarkGray),

            border: Style::default().fg(Color::DarkGray),
            title: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            text_primary: Style::default(),
            text_muted: Style::default().fg(Color::DarkGray),

            key_hint: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        }
    }
}

impl Theme {
    /// Modifier-only theme for terminals with `NO_COLOR` set.
    #[must_use]
    pub fn monochrome() -> Self {
        Self {
            toast_info: Style::default(),
            toast_success: Style::default().add_modifier(Modifier::BOLD),
            toast_warning: Style::default().add_modifier(Modifier::ITALIC),
            toast_error: Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),

            countdown: Style::default().add_modifier(Modifier::DIM),

            border: Style::default(),
            title: Style::default().add_modifier(Modifier::BOLD),
            text_primary: Style::default(),
            text_muted: Style::default().add_modifier(Modifier::DIM),

            key_hint: Style::default().add_modifier(Modifier::BOLD),
        }
    }

    /// Returns [`Theme::monochrome`] when `NO_COLOR` is set.
    #[must_use]
    pub fn from_env() -> Self {
        if std::env::var("NO_COLOR").is_ok() {
            Self::monochrome()
        } else {
            Self::default()
        }
    }

    /// Style for a toast of the given kind.
    #[must_use]
    pub fn toast(&self, kind: ToastKind) -> Style {
        match kind {
            ToastKind::Info => self.toast_info,
            ToastKind::Success => self.toast_success,
            ToastKind::Warning => self.toast_warning,
            ToastKind::Error => self.toast_error,
        }
    }
}

/// Per-kind toast icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbols {
    pub info: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
}

pub const UNICODE_SYMBOLS: Symbols = Symbols {
    info: "ℹ",
    success: "✓",
    warning: "⚠",
    error: "✗",
};

pub const ASCII_SYMBOLS: Symbols = Symbols {
    info: "[i]",
    success: "[+]",
    warning: "[!]",
    error: "[x]",
};

impl Symbols {
    /// Picks ASCII icons on the Linux console and VT100 terminals.
    #[must_use]
    pub fn detect() -> Self {
        if std::env::var("TERM")
            .map(|t| t.contains("linux") || t.contains("vt100"))
            .unwrap_or(false)
        {
            ASCII_SYMBOLS
        } else {
            UNICODE_SYMBOLS
        }
    }

    #[must_use]
    pub fn for_kind(&self, kind: ToastKind) -> &'static str {
        match kind {
            ToastKind::Info => self.info,
            ToastKind::Success => self.success,
            ToastKind::Warning => self.warning,
            ToastKind::Error => self.error,
        }
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self::detect()
    }
}

// =============================================================================
// Actions
// =============================================================================

/// What a key press asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Raise a toast of this kind through the dispatcher.
    Raise(ToastKind),
    /// Emit a sample event of this kind on the bus.
    Emit(EventKind),
    /// Dismiss the most recent toast.
    DismissNewest,
    /// Dismiss every toast.
    Clear,
    Quit,
}

/// Maps a key press to an action. Unbound keys and key releases map to `None`.
#[must_use]
pub fn action_for_key(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('i') => Some(Action::Raise(ToastKind::Info)),
        KeyCode::Char('s') => Some(Action::Raise(ToastKind::Success)),
        KeyCode::Char('w') => Some(Action::Raise(ToastKind::Warning)),
        KeyCode::Char('e') => Some(Action::Raise(ToastKind::Error)),
        KeyCode::Char('a') => Some(Action::Emit(EventKind::InvitationAccepted)),
        KeyCode::Char('r') => Some(Action::Emit(EventKind::DashboardRefresh)),
        KeyCode::Char('d') => Some(Action::DismissNewest),
        KeyCode::Char('c') => Some(Action::Clear),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

// =============================================================================
// Application State
// =============================================================================

/// State of the console screen.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    should_quit: bool,

    /// Number of toasts raised from the keyboard, used to label them.
    raised: u64,

    /// One-line summary of the last action.
    pub status: Option<String>,

    pub theme: Theme,
    pub symbols: Symbols,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Maps `key` and applies the resulting action, if any.
    pub fn handle_key(&mut self, key: KeyEvent, services: &Services) {
        if let Some(action) = action_for_key(key) {
            self.apply(action, services);
        }
    }

    /// Applies `action` to the notification services.
    pub fn apply(&mut self, action: Action, services: &Services) {
        match action {
            Action::Raise(kind) => {
                self.raised += 1;
                let message = format!("{} toast #{}", capitalize(kind.as_str()), self.raised);
                services.dispatcher.show_toast(message, kind);
                self.status = Some(format!("raised {kind} toast"));
            }
            Action::Emit(kind) => {
                let report = services.bus.emit(sample_event(kind));
                self.status = Some(format!(
                    "emitted {kind}: {} delivered, {} failed",
                    report.delivered, report.failed
                ));
            }
            Action::DismissNewest => {
                let container = services.container();
                let newest = container.visible().pop();
                self.status = Some(match newest {
                    Some(record) if container.dismiss(&record.id) => {
                        format!("dismissed {}", record.id)
                    }
                    _ => "nothing to dismiss".to_string(),
                });
            }
            Action::Clear => {
                services.container().clear();
                self.status = Some("cleared".to_string());
            }
            Action::Quit => self.quit(),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Event Loop
// =============================================================================

/// Events that drive the render loop.
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Periodic tick, used to refresh countdowns.
    Tick,

    Key(KeyEvent),

    /// New terminal size as (columns, rows).
    Resize(u16, u16),
}

/// Default tick rate, fast enough for a smooth countdown.
pub const DEFAULT_TICK_RATE_MS: u64 = 250;

const DEFAULT_POLL_TIMEOUT_MS: u64 = 10;

/// Produces ticks and terminal input until shut down.
///
/// Terminal polling runs on the blocking pool so the runtime stays free for
/// the toast listener and expiry timers.
#[derive(Debug)]
pub struct EventHandler {
    /// Where ticks and terminal events are sent.
    event_tx: mpsc::Sender<TuiEvent>,
    /// Fires when the screen is closing.
    shutdown_rx: oneshot::Receiver<()>,
    tick_rate: Duration,
}

impl EventHandler {
    /// Creates a handler ticking every [`DEFAULT_TICK_RATE_MS`] milliseconds.
    ///
    /// # Arguments
    ///
    /// * `event_tx` - Sender for the [`TuiEvent`]s consumed by the render loop
    /// * `shutdown_rx` - Oneshot receiver that stops the handler when it fires
    ///
    /// # Example
    ///
    /// ```ignore
    /// use tokio::sync::{mpsc, oneshot};
    /// use eventdesk_console::tui::app::EventHandler;
    ///
    /// let (event_tx, event_rx) = mpsc::channel(100);
    /// let (shutdown_tx, shutdown_rx) = oneshot::channel();
    ///
    /// let handler = EventHandler::new(event_tx, shutdown_rx);
    /// ```
    pub fn new(event_tx: mpsc::Sender<TuiEvent>, shutdown_rx: oneshot::Receiver<()>) -> Self {
        Self::with_tick_rate(
            event_tx,
            shutdown_rx,
            Duration::from_millis(DEFAULT_TICK_RATE_MS),
        )
    }

    /// Creates a handler with a custom tick rate.
    ///
    /// A faster tick makes toast countdowns smoother at the cost of more
    /// redraws.
    ///
    /// # Arguments
    ///
    /// * `event_tx` - Sender for the [`TuiEvent`]s consumed by the render loop
    /// * `shutdown_rx` - Oneshot receiver that stops the handler when it fires
    /// * `tick_rate` - Interval between [`TuiEvent::Tick`] events
    ///
    /// # Example
    ///
    /// ```ignore
    /// use std::time::Duration;
    /// use tokio::sync::{mpsc, oneshot};
    /// use eventdesk_console::tui::app::EventHandler;
    ///
    /// let (event_tx, event_rx) = mpsc::channel(100);
    /// let (shutdown_tx, shutdown_rx) = oneshot::channel();
    ///
    /// // Tick ten times a second
    /// let handler = EventHandler::with_tick_rate(event_tx, shutdown_rx, Duration::from_millis(100));
    /// ```
    pub fn with_tick_rate(
        event_tx: mpsc::Sender<TuiEvent>,
        shutdown_rx: oneshot::Receiver<()>,
        tick_rate: Duration,
    ) -> Self {
        Self {
            event_tx,
            shutdown_rx,
            tick_rate,
        }
    }

    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }

    /// Runs until the shutdown signal fires or the receiver is dropped.
    ///
    /// Sends a [`TuiEvent::Tick`] every tick and forwards key presses and
    /// resizes as they arrive. Consumes the handler, so spawn it on its own
    /// task.
    ///
    /// # Errors
    ///
    /// Returns an error if the blocking poll task panics.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use tokio::sync::{mpsc, oneshot};
    /// use eventdesk_console::tui::app::EventHandler;
    ///
    /// let (event_tx, mut event_rx) = mpsc::channel(100);
    /// let (shutdown_tx, shutdown_rx) = oneshot::channel();
    /// let input = tokio::spawn(EventHandler::new(event_tx, shutdown_rx).run());
    ///
    /// let first = event_rx.recv().await;
    /// let _ = shutdown_tx.send(());
    /// input.await??;
    /// ```
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut tick_interval = tokio::time::interval(self.tick_rate);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tick_interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = &mut self.shutdown_rx => {
                    tracing::debug!("EventHandler received shutdown signal");
                    break;
                }

                _ = tick_interval.tick() => {
                    if self.event_tx.send(TuiEvent::Tick).await.is_err() {
                        tracing::debug!("Event receiver dropped, exiting event loop");
                        break;
                    }
                }

                result = async {
                    tokio::time::sleep(Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS)).await;
                    tokio::task::spawn_blocking(|| {
                        Self::poll_terminal_event(Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS))
                    }).await
                } => {
                    match result {
                        Ok(Some(event)) => {
                            if self.event_tx.send(event).await.is_err() {
                                tracing::debug!("Event receiver dropped, exiting event loop");
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(join_error) => {
                            tracing::error!("Terminal poll task panicked: {}", join_error);
                            return Err(std::io::Error::other("terminal polling task panicked"));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Blocking poll. Failures (no terminal in tests or CI) read as no event.
    fn poll_terminal_event(timeout: Duration) -> Option<TuiEvent> {
        match event::poll(timeout) {
            Ok(true) => match event::read() {
                Ok(crossterm_event) => Self::convert_crossterm_event(crossterm_event),
                Err(e) => {
                    tracing::trace!("Failed to read terminal event: {}", e);
                    None
                }
            },
            Ok(false) => None,
            Err(e) => {
                tracing::trace!("Failed to poll terminal: {}", e);
                None
            }
        }
    }

    fn convert_crossterm_event(event: CrosstermEvent) -> Option<TuiEvent> {
        match event {
            CrosstermEvent::Key(key_event) => Some(TuiEvent::Key(key_event)),
            CrosstermEvent::Resize(cols, rows) => Some(TuiEvent::Resize(cols, rows)),
            CrosstermEvent::Mouse(_)
            | CrosstermEvent::FocusGained
            | CrosstermEvent::FocusLost
            | CrosstermEvent::Paste(_) => None,
        }
    }
}

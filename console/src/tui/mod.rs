//! Interactive terminal front-end.
//!
//! - [`app`]: state, key bindings and the input event loop
//! - [`ui`]: frame layout
//! - [`terminal`]: raw mode setup and restoration
//! - [`widgets`]: toast stack and help bar
//!
//! [`run`] redraws on every tick, key press and toast list change, so
//! countdowns advance and expired toasts disappear without input.

pub mod app;
pub mod terminal;
pub mod ui;
pub mod widgets;

pub use app::{action_for_key, Action, AppState, EventHandler, Theme, TuiEvent};
pub use terminal::{install_panic_hook, Tui};

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Result, TuiError};
use crate::services::Services;

/// Runs the interactive screen until the user quits.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up or drawn to, or if the
/// input handler stops unexpectedly.
pub async fn run(services: &Services) -> Result<()> {
    install_panic_hook();
    let mut tui = Tui::new()?;

    let mut state = AppState::new();
    state.theme = Theme::from_env();

    let (event_tx, mut event_rx) = mpsc::channel(100);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let input = tokio::spawn(EventHandler::new(event_tx, shutdown_rx).run());

    let container = services.container();
    let policy = container.policy();
    let mut changes = container.subscribe_changes();

    let result = loop {
        let toasts = container.visible();
        if let Err(e) = tui.draw(|frame| ui::render(frame, &state, &toasts, policy, Utc::now())) {
            break Err(e.into());
        }

        tokio::select! {
            event = event_rx.recv() => match event {
                Some(TuiEvent::Key(key)) => state.handle_key(key, services),
                Some(TuiEvent::Tick | TuiEvent::Resize(..)) => {}
                None => break Err(TuiError::Event("input handler stopped".to_string()).into()),
            },
            Ok(()) = changes.changed() => {}
        }

        if state.should_quit() {
            debug!("Quit requested");
            break Ok(());
        }
    };

    let _ = shutdown_tx.send(());
    match input.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Input handler failed"),
        Err(e) => warn!(error = %e, "Input handler task panicked"),
    }

    tui.restore()?;
    result
}

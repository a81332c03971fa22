//! Screen layout for the console TUI.
//!
//! ```text
//! EventDesk Console  2/5 visible  5000ms     ┌ info ──────────┐
//!                                            │ ℹ Info toast #1 │
//!                                            └────────────────┘
//! ┌ Keys ─────────────────────────────────────────────────────┐
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The toast stack is drawn last so it sits on top of the body.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Layout},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use eventdesk_notify::config::ToastPolicy;
use eventdesk_notify::types::ToastRecord;

use crate::tui::app::AppState;
use crate::tui::widgets::{HelpBarWidget, ToastStackWidget, HELP_BAR_HEIGHT};

/// Renders one frame.
pub fn render(
    frame: &mut Frame,
    state: &AppState,
    toasts: &[ToastRecord],
    policy: ToastPolicy,
    now: DateTime<Utc>,
) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(HELP_BAR_HEIGHT),
    ])
    .areas(frame.area());

    frame.render_widget(header_line(state, toasts.len(), policy), header);
    frame.render_widget(
        HelpBarWidget::new(state.status.as_deref(), &state.theme),
        footer,
    );
    frame.render_widget(
        ToastStackWidget::new(toasts, now, &state.theme, &state.symbols),
        body,
    );
}

fn header_line(state: &AppState, visible: usize, policy: ToastPolicy) -> Paragraph<'static> {
    Paragraph::new(Line::from(vec![
        Span::styled("EventDesk Console", state.theme.title),
        Span::styled(
            format!("  {visible}/{} visible", policy.max_visible),
            state.theme.text_muted,
        ),
        Span::styled(
            format!("  {}ms", policy.default_duration.as_millis()),
            state.theme.text_muted,
        ),
    ]))
}

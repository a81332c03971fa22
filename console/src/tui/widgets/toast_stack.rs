//! Toast stack widget.
//!
//! Draws the visible toasts as bordered cards, newest at the top, right
//! aligned within the given area:
//!
//! ```text
//!                       ┌ success ─────────────────────┐
//!                       │ ✓ Invitation accepted     4s │
//!                       └──────────────────────────────┘
//!                       ┌ info ────────────────────────┐
//!                       │ ℹ Dashboard refreshed     1s │
//!                       └──────────────────────────────┘
//! ```
//!
//! Cards that do not fit below the previous one are skipped, so older
//! toasts drop out of view first on short terminals.

use chrono::{DateTime, Utc};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use eventdesk_notify::types::ToastRecord;

use crate::tui::app::{Symbols, Theme};

/// Height of one toast card, borders included.
pub const TOAST_HEIGHT: u16 = 3;

/// Preferred card width. Narrower areas shrink the card.
pub const TOAST_WIDTH: u16 = 44;

/// Renders toasts as a right-aligned stack.
#[derive(Debug)]
pub struct ToastStackWidget<'a> {
    /// Visible toasts, oldest first as returned by the container.
    records: &'a [ToastRecord],
    now: DateTime<Utc>,
    theme: &'a Theme,
    symbols: &'a Symbols,
}

impl<'a> ToastStackWidget<'a> {
    pub fn new(
        records: &'a [ToastRecord],
        now: DateTime<Utc>,
        theme: &'a Theme,
        symbols: &'a Symbols,
    ) -> Self {
        Self {
            records,
            now,
            theme,
            symbols,
        }
    }

    /// Builds the content line of one card: icon, message and countdown.
    ///
    /// The message is truncated so the countdown always fits in `max_width`.
    fn toast_line(&self, record: &ToastRecord, max_width: usize) -> Line<'a> {
        let icon = self.symbols.for_kind(record.kind);
        let countdown = format_countdown(record, self.now);

        let icon_width = icon.chars().count();
        let countdown_width = countdown.chars().count();
        let message_width = max_width.saturating_sub(icon_width + countdown_width + 2);
        let message = truncate_to_width(&record.message, message_width);

        let used = icon_width + 1 + message.chars().count() + countdown_width;
        let padding = " ".repeat(max_width.saturating_sub(used).max(1));

        Line::from(vec![
            Span::styled(icon, self.theme.toast(record.kind)),
            Span::styled(" ", self.theme.text_primary),
            Span::styled(message, self.theme.text_primary),
            Span::styled(padding, self.theme.text_primary),
            Span::styled(countdown, self.theme.countdown),
        ])
    }
}

impl Widget for ToastStackWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height < TOAST_HEIGHT {
            return;
        }

        let width = TOAST_WIDTH.min(area.width);
        let x = area.right() - width;
        let mut y = area.y;

        for record in self.records.iter().rev() {
            if y + TOAST_HEIGHT > area.bottom() {
                break;
            }

            let card = Rect::new(x, y, width, TOAST_HEIGHT);
            Clear.render(card, buf);

            let style = self.theme.toast(record.kind);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(style)
                .title(record.kind.as_str())
                .title_style(style);
            let inner = block.inner(card);
            block.render(card, buf);

            if inner.width > 0 {
                let line = self.toast_line(record, inner.width as usize);
                Paragraph::new(line).render(inner, buf);
            }

            y += TOAST_HEIGHT;
        }
    }
}

/// Whole seconds left, rounded up so a toast never shows `0s` while visible.
fn format_countdown(record: &ToastRecord, now: DateTime<Utc>) -> String {
    let remaining = record.remaining(now);
    let secs = remaining.as_millis().div_ceil(1000);
    format!("{secs}s")
}

/// Truncates to `max_width` characters, ending in "..." when cut.
fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        return s.to_string();
    }
    if max_width < 4 {
        return s.chars().take(max_width).collect();
    }

    let truncated: String = s.chars().take(max_width - 3).collect();
    format!("{truncated}...")
}

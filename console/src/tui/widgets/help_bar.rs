//! Key binding hints and the last action's status.
//!
//! ```text
//! ┌ Keys ─────────────────────────────────────────────────────────┐
//! │ i/s/w/e toast  a accept  r refresh  d dismiss  c clear  q quit │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::tui::app::Theme;

/// Height of the help bar, borders included.
pub const HELP_BAR_HEIGHT: u16 = 3;

/// Key and description pairs, in display order.
const BINDINGS: [(&str, &str); 6] = [
    ("i/s/w/e", "toast"),
    ("a", "accept"),
    ("r", "refresh"),
    ("d", "dismiss"),
    ("c", "clear"),
    ("q", "quit"),
];

#[derive(Debug)]
pub struct HelpBarWidget<'a> {
    status: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> HelpBarWidget<'a> {
    pub fn new(status: Option<&'a str>, theme: &'a Theme) -> Self {
        Self { status, theme }
    }

    fn hints_line(&self) -> Line<'a> {
        let mut spans = Vec::with_capacity(BINDINGS.len() * 3);
        for (i, (key, description)) in BINDINGS.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(key, self.theme.key_hint));
            spans.push(Span::styled(format!(" {description}"), self.theme.text_muted));
        }
        Line::from(spans)
    }
}

impl Widget for HelpBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border)
            .title("Keys")
            .title_style(self.theme.title);
        if let Some(status) = self.status {
            block = block.title_bottom(Line::styled(status, self.theme.text_muted).right_aligned());
        }

        let inner = block.inner(area);
        let line = self.hints_line();
        block.render(area, buf);

        if inner.width > 0 && inner.height > 0 {
            Paragraph::new(line).render(inner, buf);
        }
    }
}

//! Rendering of the dialog stack
//!
//! Dialogs are drawn oldest first, centered, so the topmost one ends up on
//! top. Only the topmost dialog is drawn with focus colors.

use super::types::DialogDescriptor;
use crate::markup::{to_plain_text, ParseOptions};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

const MIN_WIDTH: u16 = 24;
const MAX_WIDTH: u16 = 64;

/// Widget drawing every open dialog over whatever is already in the buffer
pub struct DialogLayer<'a> {
    dialogs: &'a [DialogDescriptor],
    options: ParseOptions,
}

impl<'a> DialogLayer<'a> {
    pub fn new(dialogs: &'a [DialogDescriptor]) -> Self {
        Self {
            dialogs,
            options: ParseOptions::default(),
        }
    }

    /// Options used to turn dialog content into text
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }
}

impl Widget for DialogLayer<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let last = self.dialogs.len().saturating_sub(1);
        for (index, dialog) in self.dialogs.iter().enumerate() {
            render_dialog(dialog, index == last, &self.options, area, buf);
        }
    }
}

fn action_row(dialog: &DialogDescriptor, focused: bool) -> Line<'static> {
    let mut spans = Vec::new();
    for (index, action) in dialog.actions.iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw("  "));
        }
        let label = format!("[ {} ]", action.label());
        let style = if focused && index == dialog.selected {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(label, style));
    }
    Line::from(spans)
}

fn render_dialog(
    dialog: &DialogDescriptor,
    focused: bool,
    options: &ParseOptions,
    area: Rect,
    buf: &mut Buffer,
) {
    let text = to_plain_text(&dialog.content, options);
    let actions = action_row(dialog, focused);

    let natural = text
        .lines()
        .map(UnicodeWidthStr::width)
        .chain([dialog.title.width().saturating_add(2), actions.width()])
        .max()
        .unwrap_or(0);
    let width = u16::try_from(natural)
        .unwrap_or(u16::MAX)
        .saturating_add(4)
        .clamp(MIN_WIDTH, MAX_WIDTH)
        .min(area.width);
    let wrap_width = usize::from(width.saturating_sub(4)).max(1);

    let mut lines: Vec<Line> = Vec::new();
    if !text.trim().is_empty() {
        lines.extend(
            textwrap::wrap(&text, wrap_width)
                .into_iter()
                .map(|line| Line::from(line.into_owned())),
        );
        lines.push(Line::default());
    }
    lines.push(actions);

    // Borders plus the content
    let height = u16::try_from(lines.len())
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(area.height);
    let rect = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(" {} ", dialog.title));
    let inner = block.inner(rect);

    Clear.render(rect, buf);
    block.render(rect, buf);
    let inner = Rect {
        x: inner.x + 1,
        width: inner.width.saturating_sub(2),
        ..inner
    };
    Paragraph::new(lines).render(inner, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::components::dialogs::{DialogAction, DialogInit, DialogManager, CANCEL};
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(manager: &DialogManager, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| f.render_widget(DialogLayer::new(manager.dialogs()), f.size()))
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_renders_title_content_and_actions() {
        let mut manager = DialogManager::new();
        let _h = manager.create(
            DialogInit::new("Delete page")
                .with_content("Delete [b]page 3[/b]?")
                .with_action(DialogAction::new("Delete"))
                .with_action(CANCEL),
        );

        let out = screen(&manager, 60, 12);
        assert!(out.contains("Delete page"));
        assert!(out.contains("Delete page 3?"));
        assert!(!out.contains("[b]"));
        assert!(out.contains("[ Delete ]"));
        assert!(out.contains("[ Cancel ]"));
    }

    #[test]
    fn test_topmost_dialog_drawn_last() {
        let mut manager = DialogManager::new();
        let _a = manager.create(DialogInit::new("Bottom").with_content("underneath"));
        let _b = manager.create(DialogInit::new("Top").with_content("above"));

        let out = screen(&manager, 40, 10);
        assert!(out.contains("Top"));
        assert!(out.contains("above"));
        // Same size and position, so the bottom dialog is fully covered
        assert!(!out.contains("underneath"));
    }

    #[test]
    fn test_oversized_content_is_clamped() {
        let mut manager = DialogManager::new();
        let _wide = manager.create(DialogInit::new("Wide").with_content("x".repeat(70_000)));
        let out = screen(&manager, 60, 12);
        assert!(out.contains("Wide"));
        assert!(out.contains("xxxx"));

        let mut manager = DialogManager::new();
        let _tall = manager.create(DialogInit::new("Tall").with_content("line\n".repeat(70_000)));
        let out = screen(&manager, 60, 12);
        assert!(out.contains("Tall"));
    }

    #[test]
    fn test_empty_stack_draws_nothing() {
        let manager = DialogManager::new();
        let out = screen(&manager, 20, 4);
        assert!(out.chars().all(|c| c == ' ' || c == '\n'));
    }
}

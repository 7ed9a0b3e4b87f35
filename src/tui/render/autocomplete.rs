use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::App;
use crate::util::unicode;

/// Maximum number of visible entries in the dropdown
const MAX_VISIBLE: usize = 8;

/// Render the suggestion dropdown floating below the edit cursor
pub fn render_autocomplete(frame: &mut Frame, app: &App, anchor: Rect) {
    if app.suggestions.is_empty() {
        return;
    }

    let bg = app.theme.background;
    let count = app.suggestions.len().min(MAX_VISIBLE);

    // Widest entry plus padding
    let max_width = app
        .suggestions
        .iter()
        .take(MAX_VISIBLE)
        .map(|s| unicode::display_width(s))
        .max()
        .unwrap_or(10)
        + 4;

    let term_area = frame.area();
    let popup_w = (max_width as u16)
        .min(term_area.width.saturating_sub(2))
        .max(12);
    let popup_h = (count as u16) + 2; // +2 for borders

    // Below the cursor row, or above it when there is no room
    let y = if anchor.y + 1 + popup_h <= term_area.height {
        anchor.y + 1
    } else {
        anchor.y.saturating_sub(popup_h)
    };
    let x = anchor.x.min(term_area.width.saturating_sub(popup_w));
    let popup_area = Rect::new(x, y, popup_w, popup_h.min(term_area.height));

    // Scroll window around selected item
    let selected = app.suggestion_idx;
    let scroll_start = if selected >= MAX_VISIBLE {
        selected - MAX_VISIBLE + 1
    } else {
        0
    };

    let mut lines: Vec<Line> = Vec::new();
    for (i, entry) in app
        .suggestions
        .iter()
        .skip(scroll_start)
        .take(MAX_VISIBLE)
        .enumerate()
    {
        let is_selected = scroll_start + i == selected;
        let style = if is_selected {
            Style::default()
                .fg(app.theme.text_bright)
                .bg(app.theme.focus_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.text).bg(bg)
        };

        let prefix = if is_selected { " \u{25B8} " } else { "   " };
        let label = unicode::truncate_to_width(entry, (popup_w as usize).saturating_sub(5));
        lines.push(Line::from(vec![
            Span::styled(prefix, style),
            Span::styled(label, style),
        ]));
    }

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.dim).bg(bg))
        .style(Style::default().bg(bg));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(bg));
    frame.render_widget(paragraph, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::input::test_keys::{press, type_str};
    use crate::tui::render::test_helpers::*;
    use crossterm::event::KeyCode;

    #[test]
    fn dropdown_lists_suggestions_below_anchor() {
        let mut app = app_over(sample_backend());
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, ", ");
        press(&mut app, KeyCode::Down);

        let output = render_to_string(30, 8, |frame, _| {
            render_autocomplete(frame, &app, Rect::new(4, 0, 30, 1));
        });
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].contains("   buy"));
        assert!(lines[3].contains(" \u{25B8} greet"));
    }

    #[test]
    fn nothing_without_suggestions() {
        let app = app_over(sample_backend());
        let output = render_to_string(30, 8, |frame, _| {
            render_autocomplete(frame, &app, Rect::new(0, 0, 30, 1));
        });
        assert_eq!(output, "");
    }
}

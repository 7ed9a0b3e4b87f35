use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::app::App;

use super::{filter_terms_re, push_highlighted_spans};

/// The loaded item as pretty-printed JSON, with filter terms highlighted
pub fn render_item_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let bg = app.theme.background;
    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(Style::default().fg(app.theme.dim).bg(bg))
        .style(Style::default().bg(bg));

    let Some(item) = app.session.current_item() else {
        let text = if app.session.navigator().is_busy() {
            " Loading\u{2026}"
        } else {
            " No item loaded"
        };
        let empty = Paragraph::new(text)
            .block(block)
            .style(Style::default().fg(app.theme.dim).bg(bg));
        frame.render_widget(empty, area);
        return;
    };

    let pretty = match serde_json::to_string_pretty(item) {
        Ok(s) => s,
        Err(e) => format!("<unprintable item: {}>", e),
    };

    let filter = app.session.filter();
    let search_re = if filter.is_active() {
        filter_terms_re(filter.query())
    } else {
        None
    };
    let base = Style::default().fg(app.theme.text).bg(bg);
    let hl = Style::default()
        .fg(app.theme.background)
        .bg(app.theme.match_bg);

    let lines: Vec<Line> = pretty
        .lines()
        .map(|l| {
            let mut spans = vec![Span::styled(" ", base)];
            push_highlighted_spans(&mut spans, l, base, hl, search_re.as_ref());
            Line::from(spans)
        })
        .collect();

    // Keep the scroll offset within the content
    let max_scroll = (lines.len() as u16).saturating_sub(area.height);
    app.item_scroll = app.item_scroll.min(max_scroll);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(base)
        .scroll((app.item_scroll, 0));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn shows_pretty_json() {
        let mut app = app_over(sample_backend());
        let output = render_to_string(40, 6, |frame, area| {
            render_item_view(frame, &mut app, area);
        });
        let expected = [
            " {",
            "   \"text\": \"hello there\",",
            "   \"intent\": [",
            "     \"greet\"",
            "   ]",
            " }",
        ]
        .iter()
        .map(|l| format!("{:<39}\u{2502}", l))
        .collect::<Vec<_>>()
        .join("\n");
        assert_eq!(output, expected);
    }

    #[test]
    fn scroll_is_clamped() {
        let mut app = app_over(sample_backend());
        app.item_scroll = 100;
        let output = render_to_string(40, 3, |frame, area| {
            render_item_view(frame, &mut app, area);
        });
        assert_eq!(app.item_scroll, 3);
        assert!(output.contains("\"greet\""));
    }
}

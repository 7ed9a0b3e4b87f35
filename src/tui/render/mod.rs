pub mod autocomplete;
pub mod form_view;
pub mod header;
pub mod helpers;
pub mod item_view;
pub mod status_row;

#[cfg(test)]
pub mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::Block;
use regex::Regex;

use super::app::{App, Mode};

/// Main render function, dispatches to sub-renderers
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    // header | progress | content | status row
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    header::render_header(frame, app, rows[0]);
    header::render_progress(frame, app, rows[1]);

    // item | form
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[2]);

    item_view::render_item_view(frame, app, panes[0]);
    let anchor = form_view::render_form_view(frame, app, panes[1]);

    if app.mode == Mode::Edit
        && let Some(anchor) = anchor
    {
        autocomplete::render_autocomplete(frame, app, anchor);
    }

    status_row::render_status_row(frame, app, rows[3]);
}

/// Regex over the bare terms of the active filter query, for highlighting
/// matches in the item pane
pub(super) fn filter_terms_re(query: &str) -> Option<Regex> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|t| !t.starts_with('!') && !t.contains(':'))
        .map(|t| regex::escape(t.trim_matches('"')))
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return None;
    }
    Regex::new(&terms.join("|")).ok()
}

/// Push spans for text with regex match highlighting. If no regex or no matches,
/// pushes a single span with `base_style`. Otherwise splits text at match boundaries.
pub(super) fn push_highlighted_spans<'a>(
    spans: &mut Vec<Span<'a>>,
    text: &str,
    base_style: Style,
    highlight_style: Style,
    search_re: Option<&Regex>,
) {
    let re = match search_re {
        Some(r) => r,
        None => {
            spans.push(Span::styled(text.to_string(), base_style));
            return;
        }
    };

    let mut last_end = 0;
    for m in re.find_iter(text) {
        if m.start() > last_end {
            spans.push(Span::styled(
                text[last_end..m.start()].to_string(),
                base_style,
            ));
        }
        spans.push(Span::styled(
            text[m.start()..m.end()].to_string(),
            highlight_style,
        ));
        last_end = m.end();
    }
    if last_end < text.len() || text.is_empty() {
        spans.push(Span::styled(text[last_end..].to_string(), base_style));
    }
}

use ratatui::style::{Color, Style};
use ratatui::text::Span;

use crate::util::unicode;

/// Compute total display width of a slice of spans
pub(super) fn spans_width(spans: &[Span]) -> usize {
    spans
        .iter()
        .map(|s| unicode::display_width(&s.content))
        .sum()
}

/// Pad `spans` out so that `hint` ends at the right edge. Nothing is added
/// when the hint does not fit.
pub(super) fn push_right_hint<'a>(
    spans: &mut Vec<Span<'a>>,
    hint: &str,
    width: usize,
    style: Style,
    bg: Color,
) {
    let content_width = spans_width(spans);
    let hint_width = unicode::display_width(hint);
    if content_width + hint_width < width {
        let padding = width - content_width - hint_width;
        spans.push(Span::styled(" ".repeat(padding), Style::default().bg(bg)));
        spans.push(Span::styled(hint.to_string(), style));
    }
}

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Gauge, Paragraph};

use crate::tui::app::App;

use super::helpers::push_right_hint;

/// Title, item position and save state
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let cursor = app.session.cursor();

    let position = match cursor.total {
        Some(0) => "no items".to_string(),
        Some(total) => format!("item {}/{}", cursor.index + 1, total),
        None => "item -/-".to_string(),
    };

    let mut spans = vec![
        Span::styled(
            " fex ",
            Style::default()
                .fg(app.theme.background)
                .bg(app.theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" ", Style::default().bg(bg)),
        Span::styled(position, Style::default().fg(app.theme.text_bright).bg(bg)),
    ];
    if cursor.dirty {
        spans.push(Span::styled(
            "  \u{25CF} modified",
            Style::default().fg(app.theme.pending).bg(bg),
        ));
    }
    if let Some(activity) = app.session.navigator().activity() {
        spans.push(Span::styled(
            format!("  {}\u{2026}", activity),
            Style::default().fg(app.theme.dim).bg(bg),
        ));
    }
    if let Some(message) = app.session.filter().message() {
        push_right_hint(
            &mut spans,
            &message,
            area.width as usize,
            Style::default().fg(app.theme.info).bg(bg),
            bg,
        );
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)), area);
}

/// Fraction of the dataset reached so far
pub fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let cursor = app.session.cursor();
    let (ratio, label) = match cursor.total {
        Some(total) if total > 0 => {
            let done = (cursor.index + 1).min(total);
            let ratio = done as f64 / total as f64;
            (ratio, format!("{:.0}%", ratio * 100.0))
        }
        _ => (0.0, String::new()),
    };
    let gauge = Gauge::default()
        .gauge_style(
            Style::default()
                .fg(app.theme.accent)
                .bg(app.theme.focus_bg),
        )
        .ratio(ratio)
        .label(Span::styled(
            label,
            Style::default().fg(app.theme.text_bright),
        ));
    frame.render_widget(gauge, area);
}

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::{App, Mode};

use super::helpers::push_right_hint;

const NAVIGATE_HINTS: &str = "\u{2190}\u{2192} item  \u{2191}\u{2193} field  \u{23CE} edit  s submit  / search  q quit";
const EDIT_HINTS: &str = "\u{23CE} next  Tab accept  Esc done";
const PROMPT_HINTS: &str = "Enter ok  Esc cancel";

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;
    let hint_style = Style::default().fg(app.theme.dim).bg(bg);

    let mut spans: Vec<Span> = Vec::new();
    let hint = match app.mode {
        Mode::Navigate => {
            if let Some(notice) = app.session.notice() {
                spans.push(Span::styled(
                    format!(" {} ", notice.at.format("%H:%M:%S")),
                    hint_style,
                ));
                spans.push(Span::styled(
                    notice.text.clone(),
                    Style::default()
                        .fg(app.theme.notice_color(notice.level))
                        .bg(bg),
                ));
            } else {
                let missing = app.session.tree().missing_fields();
                if !missing.is_empty() && app.session.current_item().is_some() {
                    spans.push(Span::styled(
                        format!(" missing: {}", missing.join(", ")),
                        Style::default().fg(app.theme.pending).bg(bg),
                    ));
                }
            }
            NAVIGATE_HINTS
        }
        Mode::Edit => {
            if let Some(path) = app.focused_path() {
                spans.push(Span::styled(
                    format!(" editing {}", path),
                    Style::default().fg(app.theme.text).bg(bg),
                ));
            }
            EDIT_HINTS
        }
        Mode::Search | Mode::Jump | Mode::NewKey => {
            let label = match app.mode {
                Mode::Search => "/",
                Mode::Jump => "go to item: ",
                _ => "new key: ",
            };
            spans.push(Span::styled(
                format!(" {}{}", label, app.prompt),
                Style::default().fg(app.theme.text_bright).bg(bg),
            ));
            spans.push(Span::styled(
                "\u{258C}",
                Style::default().fg(app.theme.accent).bg(bg),
            ));
            PROMPT_HINTS
        }
    };

    if app.show_key_hints {
        push_right_hint(&mut spans, hint, width, hint_style, bg);
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

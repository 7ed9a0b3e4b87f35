use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::split_tokens;
use crate::tui::app::{App, Mode};
use crate::widget::{FieldType, MountKind, Mounted, RepeatKey};
use crate::util::unicode;

use super::helpers::spans_width;

/// Render the form, one row per mounted widget. Returns where the edit
/// cursor sits when a field is being edited, for the suggestion popup.
pub fn render_form_view(frame: &mut Frame, app: &App, area: Rect) -> Option<Rect> {
    let layout = app.session.layout();
    if layout.is_empty() {
        let empty = Paragraph::new(" The schema has no fields")
            .style(Style::default().fg(app.theme.dim).bg(app.theme.background));
        frame.render_widget(empty, area);
        return None;
    }

    let height = area.height as usize;
    let focus = app.focus.unwrap_or(0);
    let offset = if height > 0 && focus >= height {
        focus + 1 - height
    } else {
        0
    };

    let missing = app.session.tree().missing_fields();
    let mut anchor = None;
    let mut lines = Vec::new();

    for (row, mounted) in layout.iter().enumerate().skip(offset).take(height) {
        let is_focus = app.focus == Some(row);
        let bg = if is_focus {
            app.theme.focus_bg
        } else {
            app.theme.background
        };
        let mut spans = vec![
            Span::styled(
                if is_focus { " \u{25B8} " } else { "   " },
                Style::default().fg(app.theme.accent).bg(bg),
            ),
            Span::styled("  ".repeat(mounted.depth), Style::default().bg(bg)),
        ];
        let name = mounted.path.name().unwrap_or("").to_string();

        match mounted.kind {
            MountKind::Group => {
                spans.push(Span::styled(
                    name,
                    Style::default()
                        .fg(app.theme.text)
                        .bg(bg)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            MountKind::Repeated { .. } => repeated_spans(app, mounted, name, bg, &mut spans),
            MountKind::Text | MountKind::Multilabel => {
                let required_missing = mounted.depth == 0 && missing.contains(&name);
                spans.push(Span::styled(name, Style::default().fg(app.theme.text).bg(bg)));
                if required_missing {
                    spans.push(Span::styled("*", Style::default().fg(app.theme.error).bg(bg)));
                }
                spans.push(Span::styled(": ", Style::default().fg(app.theme.dim).bg(bg)));

                let budget = (area.width as usize).saturating_sub(spans_width(&spans) + 1);
                let editing = is_focus && app.mode == Mode::Edit;
                if editing {
                    let input = app
                        .session
                        .tree()
                        .field(&mounted.path)
                        .map(|f| f.input().to_string())
                        .unwrap_or_default();
                    let col = unicode::byte_offset_to_display_col(&input, app.edit_cursor);
                    let x = area.x + (spans_width(&spans) + col) as u16;
                    anchor = Some(Rect::new(
                        x.min(area.right().saturating_sub(1)),
                        area.y + (row - offset) as u16,
                        area.width,
                        1,
                    ));
                    edit_spans(app, &input, bg, &mut spans);
                } else {
                    value_spans(app, mounted, budget, bg, &mut spans);
                }
            }
        }

        let fill = (area.width as usize).saturating_sub(spans_width(&spans));
        spans.push(Span::styled(" ".repeat(fill), Style::default().bg(bg)));
        lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(lines).style(Style::default().bg(app.theme.background));
    frame.render_widget(paragraph, area);
    anchor
}

/// `name [key] N entries`, with a marker when the active key is new
fn repeated_spans<'a>(
    app: &App,
    mounted: &Mounted,
    name: String,
    bg: ratatui::style::Color,
    spans: &mut Vec<Span<'a>>,
) {
    spans.push(Span::styled(name, Style::default().fg(app.theme.text).bg(bg)));
    let Some(rep) = app.session.tree().repeated(&mounted.path) else {
        return;
    };
    let key = match rep.active_key() {
        Some(RepeatKey::Name(k)) => format!(" [{}]", k),
        Some(RepeatKey::Index(i)) => format!(" [#{}]", i),
        None => " [no key]".to_string(),
    };
    spans.push(Span::styled(key, Style::default().fg(app.theme.info).bg(bg)));

    let count = rep.keys().len();
    let entries = if count == 1 {
        " 1 entry".to_string()
    } else {
        format!(" {} entries", count)
    };
    spans.push(Span::styled(entries, Style::default().fg(app.theme.dim).bg(bg)));
    if rep.active_key().is_some() && !rep.active_is_stored() {
        spans.push(Span::styled(" (new)", Style::default().fg(app.theme.pending).bg(bg)));
    }
}

/// The input being edited, with a block cursor
fn edit_spans<'a>(app: &App, input: &str, bg: ratatui::style::Color, spans: &mut Vec<Span<'a>>) {
    let cursor = app.edit_cursor.min(input.len());
    let style = Style::default().fg(app.theme.text_bright).bg(bg);
    spans.push(Span::styled(input[..cursor].to_string(), style));
    spans.push(Span::styled(
        "\u{258C}",
        Style::default().fg(app.theme.accent).bg(bg),
    ));
    spans.push(Span::styled(input[cursor..].to_string(), style));
}

/// Committed or pending value. Multilabel tokens get their label colors.
fn value_spans<'a>(
    app: &App,
    mounted: &Mounted,
    budget: usize,
    bg: ratatui::style::Color,
    spans: &mut Vec<Span<'a>>,
) {
    let Some(field) = app.session.tree().field(&mounted.path) else {
        return;
    };
    let input = field.input();
    if input.trim().is_empty() {
        spans.push(Span::styled("-", Style::default().fg(app.theme.dim).bg(bg)));
        return;
    }

    match field.kind() {
        FieldType::Text => {
            spans.push(Span::styled(
                unicode::truncate_to_width(input, budget),
                Style::default().fg(app.theme.text_bright).bg(bg),
            ));
        }
        FieldType::Multilabel => {
            let mut used = 0;
            for (i, token) in split_tokens(input).iter().enumerate() {
                let sep = if i == 0 { "" } else { ", " };
                let width = sep.len() + unicode::display_width(token);
                if used + width > budget {
                    spans.push(Span::styled(
                        "\u{2026}",
                        Style::default().fg(app.theme.dim).bg(bg),
                    ));
                    break;
                }
                used += width;
                spans.push(Span::styled(sep, Style::default().fg(app.theme.dim).bg(bg)));
                spans.push(Span::styled(
                    token.clone(),
                    Style::default().fg(app.theme.label_color(token)).bg(bg),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::input::test_keys::{press, type_str};
    use crate::tui::render::test_helpers::*;
    use crossterm::event::KeyCode;
    use pretty_assertions::assert_eq;

    fn render(app: &App, w: u16, h: u16) -> (String, Option<Rect>) {
        let mut anchor = None;
        let output = render_to_string(w, h, |frame, area| {
            anchor = render_form_view(frame, app, area);
        });
        (output, anchor)
    }

    #[test]
    fn rows_follow_layout() {
        let app = app_over(sample_backend());
        let (output, anchor) = render(&app, 40, 6);
        assert_eq!(
            output,
            [
                " \u{25B8} intent: greet",
                "   summary: -",
                "   spans [no key] 0 entries",
                "     spans: -",
            ]
            .join("\n")
        );
        assert!(anchor.is_none());
    }

    #[test]
    fn new_key_is_marked() {
        let mut app = app_over(sample_backend());
        app.focus_path(&crate::widget::FieldPath::parse("spans"));
        press(&mut app, KeyCode::Char('+'));
        type_str(&mut app, "k1");
        press(&mut app, KeyCode::Enter);
        let (output, _) = render(&app, 50, 6);
        assert!(output.contains("spans [k1] 0 entries (new)"));
    }

    #[test]
    fn missing_required_field_is_starred() {
        let mut app = app_over(sample_backend());
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Home);
        for _ in 0..5 {
            press(&mut app, KeyCode::Delete);
        }
        press(&mut app, KeyCode::Esc);
        let (output, _) = render(&app, 40, 6);
        assert!(output.starts_with(" \u{25B8} intent*: -"));
        // optional field is never starred
        assert!(output.contains("   summary: -"));
    }

    #[test]
    fn editing_reports_cursor_anchor() {
        let mut app = app_over(sample_backend());
        press(&mut app, KeyCode::Enter);
        let (output, anchor) = render(&app, 40, 6);
        assert!(output.starts_with(" \u{25B8} intent: greet\u{258C}"));
        // 3 + "intent: " + "greet"
        assert_eq!(anchor.map(|r| (r.x, r.y)), Some((16, 0)));
    }

    #[test]
    fn focus_below_the_fold_scrolls() {
        let mut app = app_over(sample_backend());
        app.move_focus(2);
        let (output, _) = render(&app, 40, 2);
        assert_eq!(
            output,
            ["   spans [no key] 0 entries", " \u{25B8}   spans: -"].join("\n")
        );
    }

    #[test]
    fn long_labels_are_cut() {
        let mut app = app_over(sample_backend());
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, ", alpha, beta, gamma");
        press(&mut app, KeyCode::Esc);
        let (output, _) = render(&app, 30, 1);
        assert_eq!(output, " \u{25B8} intent: greet, alpha, beta\u{2026}");
    }
}

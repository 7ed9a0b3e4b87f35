use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::app::{App, Mode};
use crate::util::unicode;

/// Start editing the focused field with the cursor at the end
pub(crate) fn begin_edit(app: &mut App) {
    let Some(path) = app.focused_path() else {
        return;
    };
    let Some(field) = app.session.tree().field(&path) else {
        return;
    };
    app.edit_cursor = field.input().len();
    app.mode = Mode::Edit;
    app.suggestion_idx = 0;
    app.refresh_suggestions();
}

/// Commit the field being edited and return to Navigate
pub(crate) fn finish_edit(app: &mut App) {
    if let Some(path) = app.focused_path() {
        app.session.commit_field(&path);
    }
    app.mode = Mode::Navigate;
    app.suggestions.clear();
}

fn with_input(app: &mut App, f: impl FnOnce(&mut String, &mut usize)) {
    let Some(path) = app.focused_path() else {
        return;
    };
    let Some(field) = app.session.tree_mut().field_mut(&path) else {
        return;
    };
    let mut text = field.input().to_string();
    let mut cursor = app.edit_cursor.min(text.len());
    f(&mut text, &mut cursor);
    field.set_input(text);
    app.edit_cursor = cursor;
}

pub(super) fn handle_edit(app: &mut App, key: KeyEvent) {
    match (key.modifiers, key.code) {
        (_, KeyCode::Enter) => {
            finish_edit(app);
            app.move_focus(1);
            return;
        }
        (_, KeyCode::Esc) => {
            finish_edit(app);
            return;
        }

        // Suggestions
        (_, KeyCode::Tab) => {
            if let Some(choice) = app.suggestions.get(app.suggestion_idx).cloned()
                && let Some(path) = app.focused_path()
                && let Some(field) = app.session.tree_mut().field_mut(&path)
            {
                field.accept_suggestion(&choice);
                app.edit_cursor = field.input().len();
                app.suggestion_idx = 0;
            }
        }
        (_, KeyCode::Down) => {
            if !app.suggestions.is_empty() {
                app.suggestion_idx = (app.suggestion_idx + 1) % app.suggestions.len();
            }
            return;
        }
        (_, KeyCode::Up) => {
            if !app.suggestions.is_empty() {
                let len = app.suggestions.len();
                app.suggestion_idx = (app.suggestion_idx + len - 1) % len;
            }
            return;
        }

        // Cursor movement
        (m, KeyCode::Left) if m.contains(KeyModifiers::ALT) || m.contains(KeyModifiers::CONTROL) => {
            with_input(app, |text, cursor| {
                *cursor = unicode::word_boundary_left(text, *cursor);
            });
            return;
        }
        (_, KeyCode::Left) => {
            with_input(app, |text, cursor| {
                if let Some(prev) = unicode::prev_grapheme_boundary(text, *cursor) {
                    *cursor = prev;
                }
            });
            return;
        }
        (m, KeyCode::Right) if m.contains(KeyModifiers::ALT) || m.contains(KeyModifiers::CONTROL) => {
            with_input(app, |text, cursor| {
                *cursor = unicode::word_boundary_right(text, *cursor);
            });
            return;
        }
        (_, KeyCode::Right) => {
            with_input(app, |text, cursor| {
                if let Some(next) = unicode::next_grapheme_boundary(text, *cursor) {
                    *cursor = next;
                }
            });
            return;
        }
        (_, KeyCode::Home) | (KeyModifiers::CONTROL, KeyCode::Char('a')) => {
            app.edit_cursor = 0;
            return;
        }
        (_, KeyCode::End) | (KeyModifiers::CONTROL, KeyCode::Char('e')) => {
            with_input(app, |text, cursor| *cursor = text.len());
            return;
        }

        // Deletion
        (m, KeyCode::Backspace) if m.contains(KeyModifiers::ALT) => {
            with_input(app, |text, cursor| {
                let start = unicode::word_boundary_left(text, *cursor);
                text.replace_range(start..*cursor, "");
                *cursor = start;
            });
        }
        (KeyModifiers::CONTROL, KeyCode::Char('u')) => {
            with_input(app, |text, cursor| {
                text.replace_range(..*cursor, "");
                *cursor = 0;
            });
        }
        (_, KeyCode::Backspace) => {
            with_input(app, |text, cursor| {
                if let Some(prev) = unicode::prev_grapheme_boundary(text, *cursor) {
                    text.replace_range(prev..*cursor, "");
                    *cursor = prev;
                }
            });
        }
        (_, KeyCode::Delete) => {
            with_input(app, |text, cursor| {
                if let Some(next) = unicode::next_grapheme_boundary(text, *cursor) {
                    text.replace_range(*cursor..next, "");
                }
            });
        }

        (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
            with_input(app, |text, cursor| {
                text.insert(*cursor, c);
                *cursor += c.len_utf8();
            });
        }
        _ => return,
    }
    app.refresh_suggestions();
}

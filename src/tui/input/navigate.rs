use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::ops::NoticeLevel;
use crate::tui::app::{App, Mode};

use super::edit::begin_edit;

pub(super) fn handle_navigate(app: &mut App, key: KeyEvent) {
    if key.code != KeyCode::Char('q') {
        app.confirm_quit = false;
    }

    match (key.modifiers, key.code) {
        (_, KeyCode::Char('q')) => {
            if app.session.cursor().dirty && !app.confirm_quit {
                app.confirm_quit = true;
                app.session.notify(
                    NoticeLevel::Warning,
                    "Unsaved edits. Press q again to quit, s to save",
                );
            } else {
                app.should_quit = true;
            }
        }

        // Items
        (_, KeyCode::Right | KeyCode::Char('l')) => {
            let _ = app.session.next();
        }
        (_, KeyCode::Left | KeyCode::Char('h')) => {
            let _ = app.session.prev();
        }
        (_, KeyCode::Char('n')) => {
            let _ = app.session.next_filtered();
        }
        (_, KeyCode::Char('p')) => {
            let _ = app.session.prev_filtered();
        }
        (_, KeyCode::Char('s')) => {
            let _ = app.session.submit();
        }
        (_, KeyCode::Char('S')) => {
            let _ = app.session.save_current();
        }

        // Fields
        (_, KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab) => app.move_focus(1),
        (_, KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab) => app.move_focus(-1),
        (_, KeyCode::Enter | KeyCode::Char('e')) => begin_edit(app),
        (_, KeyCode::Char('[')) => step_key(app, false),
        (_, KeyCode::Char(']')) => step_key(app, true),
        (_, KeyCode::Char('+')) => {
            if focused_repeated(app) {
                open_prompt(app, Mode::NewKey);
            } else {
                app.session
                    .notify(NoticeLevel::Info, "The focused field is not repeated");
            }
        }

        // Prompts
        (_, KeyCode::Char('/')) => open_prompt(app, Mode::Search),
        (_, KeyCode::Char(':') | KeyCode::Char('g')) => open_prompt(app, Mode::Jump),

        // Item pane scrolling
        (KeyModifiers::CONTROL, KeyCode::Char('d')) | (_, KeyCode::PageDown) => {
            app.item_scroll = app.item_scroll.saturating_add(10);
        }
        (KeyModifiers::CONTROL, KeyCode::Char('u')) | (_, KeyCode::PageUp) => {
            app.item_scroll = app.item_scroll.saturating_sub(10);
        }

        (_, KeyCode::Esc) => {
            if app.session.filter().is_active() {
                app.session.clear_filter();
            }
            app.session.dismiss_notice();
        }
        _ => {}
    }
}

fn open_prompt(app: &mut App, mode: Mode) {
    app.prompt.clear();
    app.mode = mode;
}

fn focused_repeated(app: &App) -> bool {
    app.focused_path()
        .is_some_and(|p| app.session.tree().repeated(&p).is_some())
}

fn step_key(app: &mut App, forward: bool) {
    let Some(path) = app.focused_path() else {
        return;
    };
    if app.session.tree().repeated(&path).is_none() {
        return;
    }
    if app.session.step_key(&path, forward).is_none() {
        app.session.notify(NoticeLevel::Info, "No other entries");
    }
}

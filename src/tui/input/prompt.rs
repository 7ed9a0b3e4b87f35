use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::ops::NoticeLevel;
use crate::tui::app::{App, Mode};

/// Search, jump and new-key prompts share one line editor
pub(super) fn handle_prompt(app: &mut App, key: KeyEvent) {
    match (key.modifiers, key.code) {
        (_, KeyCode::Esc) => {
            app.prompt.clear();
            app.mode = Mode::Navigate;
        }
        (_, KeyCode::Enter) => {
            let text = std::mem::take(&mut app.prompt);
            let mode = app.mode;
            app.mode = Mode::Navigate;
            execute(app, mode, text.trim());
        }
        (_, KeyCode::Backspace) => {
            app.prompt.pop();
        }
        (KeyModifiers::CONTROL, KeyCode::Char('u')) => app.prompt.clear(),
        (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => app.prompt.push(c),
        _ => {}
    }
}

fn execute(app: &mut App, mode: Mode, text: &str) {
    match mode {
        Mode::Search => {
            if text.is_empty() {
                app.session.clear_filter();
            } else {
                app.session.search(text);
            }
        }
        Mode::Jump => match text.parse::<usize>() {
            Ok(n) => {
                let _ = app.session.jump(n);
            }
            Err(_) => {
                app.session
                    .notify(NoticeLevel::Warning, format!("Not an item number: {}", text));
            }
        },
        Mode::NewKey => {
            if text.is_empty() {
                return;
            }
            if let Some(path) = app.focused_path() {
                app.session.switch_key(&path, text);
            }
        }
        Mode::Navigate | Mode::Edit => {}
    }
}

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::backend::{Backend, Dispatcher};
use crate::io::inbox::InboxWatcher;
use crate::model::{FexConfig, Schema};
use crate::ops::{NavEvent, Routed, Session, SessionEvent, parse_line, route};
use crate::widget::{FieldPath, Mounted};

use super::input;
use super::render;
use super::theme::Theme;

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    /// Typing into the focused field
    Edit,
    /// Typing a search query
    Search,
    /// Typing a one-based item number
    Jump,
    /// Typing a new key for the focused repeated field
    NewKey,
}

/// Main application state
pub struct App {
    pub session: Session,
    pub mode: Mode,
    pub should_quit: bool,
    pub theme: Theme,
    pub show_key_hints: bool,
    /// Index into the layout of the focused row
    pub focus: Option<usize>,
    /// Byte offset of the edit cursor in the focused field's input
    pub edit_cursor: usize,
    /// Text typed at the search, jump or new-key prompt
    pub prompt: String,
    /// Filtered suggestions for the field being edited
    pub suggestions: Vec<String>,
    pub suggestion_idx: usize,
    /// Scroll offset of the item pane
    pub item_scroll: u16,
    /// Set after a quit attempt with unsaved edits
    pub confirm_quit: bool,
}

impl App {
    pub fn new(session: Session, theme: Theme) -> Self {
        let focus = session.layout().iter().position(Mounted::is_editable);
        App {
            session,
            mode: Mode::Navigate,
            should_quit: false,
            theme,
            show_key_hints: true,
            focus,
            edit_cursor: 0,
            prompt: String::new(),
            suggestions: Vec::new(),
            suggestion_idx: 0,
            item_scroll: 0,
            confirm_quit: false,
        }
    }

    /// Layout indices of the rows that take input
    pub fn editable_rows(&self) -> Vec<usize> {
        self.session
            .layout()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_editable())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn focused(&self) -> Option<&Mounted> {
        self.focus.and_then(|i| self.session.layout().get(i))
    }

    pub fn focused_path(&self) -> Option<FieldPath> {
        self.focused().map(|m| m.path.clone())
    }

    /// Move focus by `delta` editable rows, clamped to the ends
    pub fn move_focus(&mut self, delta: isize) {
        let rows = self.editable_rows();
        if rows.is_empty() {
            return;
        }
        let pos = self
            .focus
            .and_then(|f| rows.iter().position(|&r| r == f))
            .unwrap_or(0);
        let next = pos.saturating_add_signed(delta).min(rows.len() - 1);
        self.focus = Some(rows[next]);
    }

    /// Focus the first editable row at or below `path`
    pub fn focus_path(&mut self, path: &FieldPath) -> bool {
        let target = self
            .session
            .layout()
            .iter()
            .position(|m| m.is_editable() && m.path.segments().starts_with(path.segments()));
        match target {
            Some(i) => {
                self.focus = Some(i);
                true
            }
            None => {
                tracing::debug!(path = %path, "nothing to focus");
                false
            }
        }
    }

    /// Recompute suggestions for the focused field
    pub fn refresh_suggestions(&mut self) {
        if self.mode != Mode::Edit {
            self.suggestions.clear();
            return;
        }
        let Some(path) = self.focused_path() else {
            return;
        };
        self.suggestions = self.session.suggestions(&path);
        if self.suggestion_idx >= self.suggestions.len() {
            self.suggestion_idx = 0;
        }
    }

    /// Apply backend completions
    pub fn tick(&mut self) {
        for event in self.session.pump() {
            match event {
                SessionEvent::Nav(NavEvent::Loaded { .. }) => {
                    self.item_scroll = 0;
                    self.confirm_quit = false;
                }
                SessionEvent::Suggestions(_) => self.refresh_suggestions(),
                _ => {}
            }
        }
    }

    /// Apply one line from the inbox
    pub fn handle_inbound(&mut self, line: &str) {
        let Some(message) = parse_line(line) else {
            return;
        };
        if self.mode == Mode::Edit {
            input::finish_edit(self);
        }
        match route(&mut self.session, message) {
            Routed::Focus(path) => {
                self.focus_path(&path);
            }
            Routed::Presentation(action) => {
                tracing::debug!(action, "presentation request has no terminal equivalent");
            }
            Routed::Handled | Routed::Ignored => {}
        }
    }
}

/// Run the TUI until the user quits
pub fn run(
    config: &FexConfig,
    backend: Arc<dyn Backend>,
    schema: Schema,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new(schema, Dispatcher::threaded(backend));
    session.start();

    let mut app = App::new(session, Theme::from_config(&config.ui));
    app.show_key_hints = config.ui.show_key_hints;

    let mut inbox = match &config.ui.inbox {
        Some(path) => match InboxWatcher::start(Path::new(path)) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(path = %path, "could not watch inbox: {}", e);
                None
            }
        },
        None => None,
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Restore the terminal if we panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app, inbox.as_mut());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if app.session.cursor().dirty {
        tracing::warn!(
            index = app.session.cursor().index,
            "quit with unsaved edits"
        );
    }
    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut inbox: Option<&mut InboxWatcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            input::handle_key(app, key);
        }

        if let Some(watcher) = inbox.as_deref_mut() {
            for line in watcher.poll() {
                app.handle_inbound(&line);
            }
        }
        app.tick();

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::{app_over, sample_backend};
    use pretty_assertions::assert_eq;

    #[test]
    fn focus_starts_on_first_editable_row() {
        let app = app_over(sample_backend());
        assert_eq!(app.focused_path(), Some(FieldPath::parse("intent")));
    }

    #[test]
    fn move_focus_skips_headings_and_clamps() {
        let mut app = app_over(sample_backend());
        app.move_focus(1);
        assert_eq!(app.focused_path(), Some(FieldPath::parse("summary")));
        app.move_focus(1);
        // spans heading is skipped
        assert_eq!(app.focused_path(), Some(FieldPath::parse("spans")));
        assert!(app.focused().is_some_and(Mounted::is_editable));
        app.move_focus(10);
        assert_eq!(app.focused_path(), Some(FieldPath::parse("spans")));
        app.move_focus(-10);
        assert_eq!(app.focused_path(), Some(FieldPath::parse("intent")));
    }

    #[test]
    fn inbound_focus_moves_to_field() {
        let mut app = app_over(sample_backend());
        app.handle_inbound(r#"{"action": "setAnnotationFieldId", "field": "spans", "id": "k1"}"#);
        assert_eq!(app.focused_path(), Some(FieldPath::parse("spans")));
        let rep = app.session.tree().repeated(&FieldPath::parse("spans")).unwrap();
        assert_eq!(rep.active_key().map(|k| k.to_string()), Some("k1".into()));
    }

    #[test]
    fn inbound_goto_loads_item() {
        let mut app = app_over(sample_backend());
        app.handle_inbound(r#"{"action": "gotoItem", "idx": 2}"#);
        app.tick();
        assert_eq!(app.session.cursor().index, 2);
        app.handle_inbound("garbage");
        assert_eq!(app.session.cursor().index, 2);
    }
}

use std::sync::Arc;

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;
use serde_json::json;

use crate::backend::{Dispatcher, MemoryBackend};
use crate::model::{FieldDescriptor, Record, Repeat, Schema};
use crate::ops::Session;
use crate::tui::app::App;
use crate::tui::theme::Theme;

pub const TERM_W: u16 = 80;
pub const TERM_H: u16 = 24;

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// intent (multilabel), summary (optional text), spans (keyed text)
pub fn sample_schema() -> Schema {
    Schema::new()
        .with("intent", FieldDescriptor::multilabel())
        .with("summary", FieldDescriptor::text().optional())
        .with("spans", FieldDescriptor::text().repeated(Repeat::Map))
}

fn item(text: &str, intent: &[&str]) -> Record {
    json!({ "text": text, "intent": intent })
        .as_object()
        .unwrap()
        .clone()
}

/// Four items; "buy" appears in items 1 and 3.
pub fn sample_backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(
        sample_schema(),
        vec![
            item("hello there", &["greet"]),
            item("I want to buy shoes", &["buy"]),
            item("hi", &["greet"]),
            item("hello, buy this", &["buy", "greet"]),
        ],
    ))
}

/// An App over `backend` with the first item loaded. Requests complete
/// inline, so each `tick` sees every reply.
pub fn app_over(backend: Arc<MemoryBackend>) -> App {
    let schema = sample_schema();
    let mut session = Session::new(schema, Dispatcher::inline(backend));
    session.start();
    session.pump();
    App::new(session, Theme::default())
}

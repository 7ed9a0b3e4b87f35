//! Commands posted by an embedding host.
//!
//! Messages are JSON objects tagged by `action`. They are parsed into
//! [`Inbound`] and applied to a [`Session`]. Nothing here fails loudly: an
//! unknown action or an unresolvable field is logged and ignored.

use serde::Deserialize;
use serde_json::Value;

use super::session::Session;
use crate::widget::FieldPath;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Inbound {
    /// Open the item at zero-based `idx`
    GotoItem { idx: usize },
    GotoPrevFilteredItem {},
    GotoNextFilteredItem {},
    /// Save the named field (or the whole item) to the backend
    SaveAnnotation {
        #[serde(default)]
        field: Option<String>,
    },
    /// Make `id` the active key of the named repeated field and focus it
    SetAnnotationFieldId { field: String, id: Value },
    WrapInCard {},
    SetPosition {},
}

const ACTIONS: &[&str] = &[
    "gotoItem",
    "gotoPrevFilteredItem",
    "gotoNextFilteredItem",
    "saveAnnotation",
    "setAnnotationFieldId",
    "wrapInCard",
    "setPosition",
];

/// Outcome of routing one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Handled,
    /// Handled; the host should move focus to this field
    Focus(FieldPath),
    /// Styling request with no effect on the form
    Presentation(&'static str),
    Ignored,
}

pub fn parse_message(value: &Value) -> Option<Inbound> {
    match Inbound::deserialize(value) {
        Ok(message) => Some(message),
        Err(e) => {
            match value.get("action").and_then(Value::as_str) {
                Some(action) if !ACTIONS.contains(&action) => {
                    tracing::warn!(action, "unsupported action");
                }
                Some(action) => tracing::warn!(action, "malformed message: {}", e),
                None => tracing::warn!("message has no action: {}", value),
            }
            None
        }
    }
}

/// Parse one line of text as a message
pub fn parse_line(line: &str) -> Option<Inbound> {
    match serde_json::from_str::<Value>(line) {
        Ok(value) => parse_message(&value),
        Err(e) => {
            tracing::warn!("inbound message is not JSON: {}", e);
            None
        }
    }
}

fn key_text(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn route(session: &mut Session, message: Inbound) -> Routed {
    tracing::debug!(?message, "routing inbound message");
    match message {
        Inbound::GotoItem { idx } => match session.goto(idx) {
            Ok(()) => Routed::Handled,
            Err(_) => Routed::Ignored,
        },
        Inbound::GotoPrevFilteredItem {} => match session.prev_filtered() {
            Ok(()) => Routed::Handled,
            Err(_) => Routed::Ignored,
        },
        Inbound::GotoNextFilteredItem {} => match session.next_filtered() {
            Ok(()) => Routed::Handled,
            Err(_) => Routed::Ignored,
        },
        Inbound::SaveAnnotation { field: Some(field) } => {
            if session.save_field(&FieldPath::parse(&field)) {
                Routed::Handled
            } else {
                Routed::Ignored
            }
        }
        Inbound::SaveAnnotation { field: None } => match session.save_current() {
            Ok(()) => Routed::Handled,
            Err(_) => Routed::Ignored,
        },
        Inbound::SetAnnotationFieldId { field, id } => {
            let Some(key) = key_text(&id) else {
                tracing::warn!(field = %field, "annotation id must be a string or number, got {}", id);
                return Routed::Ignored;
            };
            let path = FieldPath::parse(&field);
            if session.set_active_key(&path, &key) {
                Routed::Focus(path)
            } else {
                Routed::Ignored
            }
        }
        Inbound::WrapInCard {} => Routed::Presentation("wrapInCard"),
        Inbound::SetPosition {} => Routed::Presentation("setPosition"),
    }
}

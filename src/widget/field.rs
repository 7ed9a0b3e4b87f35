use regex::RegexBuilder;
use serde_json::Value;

use super::{ChangeEvent, FieldPath, Listeners, MountKind, Mounted};
use crate::backend::{Request, Ticket, Transport};
use crate::model::value::{display_text, last_token, replace_last_token, split_tokens, tokens_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Multilabel,
}

/// Completion strings for one multilabel field.
///
/// Fetched lazily on first use. Once marked dirty the cached list is still
/// shown, but the next lookup fetches again. A fetch that was in flight when
/// the cache was marked dirty is forgotten, so its result is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionCache {
    choices: Vec<String>,
    dirty: bool,
    pending: Option<Ticket>,
}

impl Default for SuggestionCache {
    fn default() -> Self {
        SuggestionCache {
            choices: Vec::new(),
            dirty: true,
            pending: None,
        }
    }
}

impl SuggestionCache {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn pending(&self) -> Option<Ticket> {
        self.pending
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Issue a fetch if the cache is stale and none is outstanding
    pub fn request(&mut self, field: &str, tx: &mut dyn Transport) -> Option<Ticket> {
        if !self.dirty || self.pending.is_some() {
            return None;
        }
        let ticket = tx.submit(Request::Autocomplete(field.to_string()));
        self.pending = Some(ticket);
        Some(ticket)
    }

    /// Store a fetch result. Returns false for a result nobody is waiting for.
    pub fn fulfil(&mut self, ticket: Ticket, choices: Vec<String>) -> bool {
        if self.pending != Some(ticket) {
            return false;
        }
        self.choices = choices;
        self.pending = None;
        self.dirty = false;
        true
    }

    pub fn fail(&mut self, ticket: Ticket) -> bool {
        if self.pending != Some(ticket) {
            return false;
        }
        self.pending = None;
        true
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.pending = None;
    }

    /// Choices containing `token`, ignoring case. An empty token matches all.
    pub fn filter(&self, token: &str) -> Vec<String> {
        let token = token.trim();
        if token.is_empty() {
            return self.choices.clone();
        }
        match RegexBuilder::new(&regex::escape(token))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => self
                .choices
                .iter()
                .filter(|c| re.is_match(c))
                .cloned()
                .collect(),
            Err(e) => {
                tracing::warn!("could not build suggestion filter: {}", e);
                self.choices.clone()
            }
        }
    }
}

/// An editable leaf: free text or a tag list.
///
/// The edit buffer is the displayed text. Both kinds read back the same way:
/// the buffer split on commas, trimmed, empty pieces dropped.
pub struct FieldWidget {
    path: FieldPath,
    kind: FieldType,
    buffer: String,
    /// Value as of the last load or commit
    committed: Value,
    mounted: bool,
    listeners: Listeners,
    suggestions: Option<SuggestionCache>,
}

impl FieldWidget {
    pub fn new(path: FieldPath, kind: FieldType) -> Self {
        FieldWidget {
            path,
            kind,
            buffer: String::new(),
            committed: Value::Array(Vec::new()),
            mounted: false,
            listeners: Listeners::default(),
            suggestions: match kind {
                FieldType::Multilabel => Some(SuggestionCache::default()),
                FieldType::Text => None,
            },
        }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn kind(&self) -> FieldType {
        self.kind
    }

    pub fn set_value(&mut self, value: &Value) {
        self.buffer = display_text(value);
        self.committed = self.value();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.committed = Value::Array(Vec::new());
    }

    pub fn value(&self) -> Value {
        tokens_value(split_tokens(&self.buffer))
    }

    /// Current edit buffer
    pub fn input(&self) -> &str {
        &self.buffer
    }

    /// Replace the edit buffer without firing a change event
    pub fn set_input(&mut self, input: String) {
        self.buffer = input;
    }

    /// Finish editing. Listeners hear about it only when the parsed value
    /// differs from the last load or commit.
    pub fn commit(&mut self) -> Option<ChangeEvent> {
        let value = self.value();
        if value == self.committed {
            return None;
        }
        self.committed = value.clone();
        let event = ChangeEvent {
            path: self.path.clone(),
            value,
        };
        self.listeners.emit(&event);
        Some(event)
    }

    pub fn subscribe(&mut self, sender: std::sync::mpsc::Sender<ChangeEvent>) {
        self.listeners.subscribe(sender);
    }

    pub fn mark_dirty(&mut self) {
        if let Some(cache) = &mut self.suggestions {
            cache.mark_dirty();
        }
    }

    pub fn suggestion_cache(&self) -> Option<&SuggestionCache> {
        self.suggestions.as_ref()
    }

    pub fn suggestion_cache_mut(&mut self) -> Option<&mut SuggestionCache> {
        self.suggestions.as_mut()
    }

    /// Fetch suggestions if the cache needs it. Text fields have none.
    pub fn request_suggestions(&mut self, tx: &mut dyn Transport) -> Option<Ticket> {
        let field = self.path.to_string();
        self.suggestions.as_mut()?.request(&field, tx)
    }

    /// Cached suggestions matching the token being typed
    pub fn suggestions(&self) -> Vec<String> {
        match &self.suggestions {
            Some(cache) => cache.filter(last_token(&self.buffer)),
            None => Vec::new(),
        }
    }

    /// Replace the token being typed with `choice`
    pub fn accept_suggestion(&mut self, choice: &str) {
        self.buffer = replace_last_token(&self.buffer, choice);
    }

    pub fn attach(&mut self, depth: usize, mount: &mut dyn FnMut(Mounted)) -> bool {
        if self.mounted {
            tracing::debug!(path = %self.path, "field already mounted");
            return false;
        }
        self.mounted = true;
        mount(Mounted {
            path: self.path.clone(),
            depth,
            kind: match self.kind {
                FieldType::Text => MountKind::Text,
                FieldType::Multilabel => MountKind::Multilabel,
            },
        });
        true
    }
}

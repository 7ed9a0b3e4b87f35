//! One labeling session: the form, the navigator and the filter, driven by
//! completions from a [`Dispatcher`].
//!
//! Everything here runs on the UI thread. Operations only submit requests;
//! [`Session::pump`] applies whatever has come back since the last tick.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use super::filter::Filter;
use super::navigator::{Cursor, NavError, NavEvent, Navigator};
use crate::backend::{Completion, Dispatcher, Reply, Ticket};
use crate::model::{Record, Schema};
use crate::widget::{ChangeEvent, FieldPath, Mounted, RecordWidget, build_form};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the status row
#[derive(Debug, Clone)]
pub struct Notice {
    pub at: DateTime<Local>,
    pub level: NoticeLevel,
    pub text: String,
}

/// What one completion changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Nav(NavEvent),
    Searched,
    Suggestions(FieldPath),
    Stale,
}

pub struct Session {
    schema: Schema,
    tree: RecordWidget,
    layout: Vec<Mounted>,
    nav: Navigator,
    filter: Filter,
    dispatcher: Dispatcher,
    suggest_routes: HashMap<Ticket, FieldPath>,
    changes: Receiver<ChangeEvent>,
    notice: Option<Notice>,
}

impl Session {
    pub fn new(schema: Schema, dispatcher: Dispatcher) -> Self {
        let mut tree = build_form(&schema);
        let layout = tree.layout();
        let (tx, changes) = mpsc::channel();
        tree.subscribe(tx);
        Session {
            schema,
            tree,
            layout,
            nav: Navigator::new(),
            filter: Filter::new(),
            dispatcher,
            suggest_routes: HashMap::new(),
            changes,
            notice: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn tree(&self) -> &RecordWidget {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut RecordWidget {
        &mut self.tree
    }

    /// Form rows in document order
    pub fn layout(&self) -> &[Mounted] {
        &self.layout
    }

    pub fn cursor(&self) -> Cursor {
        self.nav.cursor()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn current_item(&self) -> Option<&Record> {
        self.nav.loaded()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            at: Local::now(),
            level,
            text: text.into(),
        });
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    pub fn start(&mut self) {
        if let Err(e) = self.nav.start(&mut self.dispatcher) {
            self.report(&e);
        }
    }

    fn report(&mut self, error: &NavError) {
        match error {
            NavError::OutOfRange { requested, total } => {
                self.notify(
                    NoticeLevel::Warning,
                    format!("Item {} is out of range (1-{})", requested, total),
                );
            }
            NavError::Busy => self.notify(NoticeLevel::Info, "Still waiting on the backend"),
            NavError::NothingLoaded => self.notify(NoticeLevel::Warning, "No item is loaded"),
        }
    }

    fn nav_result(&mut self, result: Result<(), NavError>) -> Result<(), NavError> {
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    /// Move to item `one_based`, saving first if needed
    pub fn jump(&mut self, one_based: usize) -> Result<(), NavError> {
        self.sync_changes();
        let result = self.nav.jump(one_based, &self.tree, &mut self.dispatcher);
        self.nav_result(result)
    }

    /// Move to the zero-based item `index`. Indices come from outside
    /// (inbound messages, search results), so one that cannot be made
    /// one-based is refused like any other out-of-range jump.
    pub fn goto(&mut self, index: usize) -> Result<(), NavError> {
        match index.checked_add(1) {
            Some(one_based) => self.jump(one_based),
            None => {
                let total = self.cursor().total.unwrap_or(0);
                tracing::warn!(index, total, "item index out of range, staying on current item");
                let error = NavError::OutOfRange {
                    requested: index,
                    total,
                };
                self.report(&error);
                Err(error)
            }
        }
    }

    pub fn next(&mut self) -> Result<(), NavError> {
        let index = self.cursor().index;
        self.jump(index.saturating_add(2))
    }

    pub fn prev(&mut self) -> Result<(), NavError> {
        let index = self.cursor().index;
        self.jump(index)
    }

    /// Next match of the active filter, or the next item without one
    pub fn next_filtered(&mut self) -> Result<(), NavError> {
        match self.filter.next_index(self.cursor().index) {
            Some(target) => self.goto(target),
            None => self.next(),
        }
    }

    pub fn prev_filtered(&mut self) -> Result<(), NavError> {
        match self.filter.prev_index(self.cursor().index) {
            Some(target) => self.goto(target),
            None => self.prev(),
        }
    }

    /// Save the item and advance
    pub fn submit(&mut self) -> Result<(), NavError> {
        self.sync_changes();
        let result = self.nav.submit(&self.tree, &mut self.dispatcher);
        self.nav_result(result)
    }

    /// Save the item in place
    pub fn save_current(&mut self) -> Result<(), NavError> {
        self.sync_changes();
        let result = self.nav.save(&self.tree, &mut self.dispatcher);
        self.nav_result(result)
    }

    pub fn search(&mut self, query: &str) {
        self.filter.search(query, &mut self.dispatcher);
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
    }

    /// Commit the field at `path`: listeners hear about it, the item is
    /// marked dirty, and any repeated field holding it is saved.
    pub fn commit_field(&mut self, path: &FieldPath) -> bool {
        let Some(field) = self.tree.field_mut(path) else {
            tracing::warn!(path = %path, "commit for unknown field");
            return false;
        };
        field.commit();
        self.sync_changes();
        true
    }

    /// Apply committed edits: mark the item dirty and save enclosing
    /// repeated fields so the edit shows up in the record's value.
    pub fn sync_changes(&mut self) {
        while let Ok(event) = self.changes.try_recv() {
            tracing::debug!(path = %event.path, "field committed");
            self.tree.flush(&event.path);
            self.nav.note_edit();
        }
    }

    /// Save the named field's enclosing repeated fields, then persist the
    /// item in place. Unknown paths are logged and ignored.
    pub fn save_field(&mut self, path: &FieldPath) -> bool {
        if self.tree.get_widget(path).is_none() {
            tracing::warn!(path = %path, "cannot save unknown field");
            return false;
        }
        self.sync_changes();
        if self.tree.flush(path) > 0 {
            self.nav.note_edit();
        }
        self.save_current().is_ok()
    }

    /// Switch the repeated field at `path` to `key` without saving the
    /// entry that was active
    pub fn set_active_key(&mut self, path: &FieldPath, key: &str) -> bool {
        match self.tree.repeated_mut(path) {
            Some(rep) => rep.set_key(key),
            None => {
                tracing::warn!(path = %path, "no repeated field at path");
                false
            }
        }
    }

    /// Save the active entry of the repeated field holding `path`, then
    /// switch to `key`
    pub fn switch_key(&mut self, path: &FieldPath, key: &str) -> bool {
        self.sync_changes();
        let Some(rep) = self.tree.repeated(path) else {
            tracing::warn!(path = %path, "no repeated field at path");
            return false;
        };
        let rep_path = rep.path().clone();
        let has_edits = rep.active_key().is_some()
            && (rep.active_is_stored() || !crate::model::is_blank(&rep.child().value()));
        let before = rep.value();

        if has_edits {
            self.tree.flush(&rep_path);
            let changed = self
                .tree
                .repeated(&rep_path)
                .is_some_and(|r| r.value() != before);
            if changed {
                self.nav.note_edit();
            }
        }
        self.set_active_key(&rep_path, key)
    }

    /// Step the active key of the repeated field holding `path`. Returns the
    /// new key, or `None` when there is nothing to step to.
    pub fn step_key(&mut self, path: &FieldPath, forward: bool) -> Option<String> {
        let key = self.tree.repeated(path)?.step_key(forward)?;
        self.switch_key(path, &key).then_some(key)
    }

    /// Filtered suggestions for the field at `path`, fetching if stale
    pub fn suggestions(&mut self, path: &FieldPath) -> Vec<String> {
        let Some(field) = self.tree.field_mut(path) else {
            return Vec::new();
        };
        if let Some(ticket) = field.request_suggestions(&mut self.dispatcher) {
            self.suggest_routes.insert(ticket, path.clone());
        }
        field.suggestions()
    }

    /// Apply every completion that has arrived
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        self.sync_changes();
        let mut events = Vec::new();
        while let Some(completion) = self.dispatcher.try_recv() {
            events.push(self.handle_completion(completion));
        }
        events
    }

    /// Pump until nothing is in flight or `timeout` passes
    pub fn settle(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.pump();
        while self.dispatcher.in_flight() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.dispatcher.recv_timeout(remaining) {
                Some(c) => {
                    events.push(self.handle_completion(c));
                    events.extend(self.pump());
                }
                None => break,
            }
        }
        events
    }

    fn handle_completion(&mut self, completion: Completion) -> SessionEvent {
        let ticket = completion.ticket;

        if self.nav.owns(ticket) {
            let event = self
                .nav
                .on_completion(completion, &mut self.tree, &mut self.dispatcher);
            self.note_nav_event(&event);
            return SessionEvent::Nav(event);
        }

        if self.filter.owns(ticket) {
            if let Some(first) = self.filter.on_completion(completion) {
                let _ = self.goto(first);
            }
            return SessionEvent::Searched;
        }

        if let Some(path) = self.suggest_routes.remove(&ticket) {
            if let Some(cache) = self
                .tree
                .field_mut(&path)
                .and_then(|f| f.suggestion_cache_mut())
            {
                match completion.result {
                    Ok(Reply::Suggestions(choices)) => {
                        cache.fulfil(ticket, choices);
                    }
                    Ok(other) => {
                        tracing::warn!(path = %path, "unexpected autocomplete reply {:?}", other);
                        cache.fail(ticket);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path, "autocomplete failed: {}", e);
                        cache.fail(ticket);
                    }
                }
            }
            return SessionEvent::Suggestions(path);
        }

        tracing::debug!(ticket, "completion for a superseded request");
        SessionEvent::Stale
    }

    fn note_nav_event(&mut self, event: &NavEvent) {
        match event {
            NavEvent::Persisted { index } => {
                self.notify(NoticeLevel::Info, format!("Saved item {}", index + 1));
            }
            NavEvent::PersistFailed { index, message } => {
                self.notify(
                    NoticeLevel::Error,
                    format!("Could not save item {}: {}", index + 1, message),
                );
            }
            NavEvent::LoadFailed { index, message } => {
                self.notify(
                    NoticeLevel::Error,
                    format!("Could not load item {}: {}", index + 1, message),
                );
            }
            NavEvent::CountFailed { message } => {
                self.notify(NoticeLevel::Error, format!("Could not count items: {}", message));
            }
            NavEvent::Counted(0) => self.notify(NoticeLevel::Warning, "The dataset is empty"),
            NavEvent::Counted(_) | NavEvent::Loaded { .. } | NavEvent::Ignored => {}
        }
    }
}

//! Cursor over the backend's items, with save-before-move.
//!
//! Every move is a chain of ticketed steps: count (once), then persist (when
//! the loaded item has unsaved edits), then fetch. Only the completion for
//! the step currently in flight is acted on; anything else is stale and
//! dropped. While a chain is running new moves are refused.

use serde_json::Value;

use crate::backend::{Completion, Reply, Request, Ticket, Transport};
use crate::model::{INDEX_KEY, Record};
use crate::widget::RecordWidget;

/// Error type for navigation requests
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavError {
    #[error("item {requested} is out of range (1..={total})")]
    OutOfRange { requested: usize, total: usize },
    #[error("still waiting on the backend")]
    Busy,
    #[error("no item is loaded")]
    NothingLoaded,
}

/// Where the navigator stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Zero-based index of the loaded item
    pub index: usize,
    /// Item count, once fetched. Fixed for the session.
    pub total: Option<usize>,
    /// Loaded item has edits the backend has not seen
    pub dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Fetching the count; `then` is the zero-based item to open afterwards
    Counting { ticket: Ticket, then: Option<usize> },
    /// `edits` is the edit generation the payload was taken at
    Persisting {
        ticket: Ticket,
        then: Option<usize>,
        edits: u64,
    },
    Fetching { ticket: Ticket, target: usize },
}

/// What a completion did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    /// Not ours, or no longer wanted
    Ignored,
    Counted(usize),
    Persisted { index: usize },
    Loaded { index: usize },
    /// The pending move was abandoned; cursor and dirty flag are unchanged
    PersistFailed { index: usize, message: String },
    LoadFailed { index: usize, message: String },
    CountFailed { message: String },
}

#[derive(Debug)]
pub struct Navigator {
    cursor: Cursor,
    phase: Phase,
    loaded: Option<Record>,
    /// Bumped on every edit to the loaded item
    edits: u64,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Navigator {
            cursor: Cursor::default(),
            phase: Phase::Idle,
            loaded: None,
            edits: 0,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The item as last fetched from the backend
    pub fn loaded(&self) -> Option<&Record> {
        self.loaded.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Whether `ticket` belongs to the step in flight
    pub fn owns(&self, ticket: Ticket) -> bool {
        match self.phase {
            Phase::Idle => false,
            Phase::Counting { ticket: t, .. }
            | Phase::Persisting { ticket: t, .. }
            | Phase::Fetching { ticket: t, .. } => t == ticket,
        }
    }

    /// Short description of the step in flight, for the status row
    pub fn activity(&self) -> Option<&'static str> {
        match self.phase {
            Phase::Idle => None,
            Phase::Counting { .. } => Some("counting"),
            Phase::Persisting { .. } => Some("saving"),
            Phase::Fetching { .. } => Some("loading"),
        }
    }

    /// Fetch the count and open the first item
    pub fn start(&mut self, tx: &mut dyn Transport) -> Result<(), NavError> {
        if self.is_busy() {
            return Err(NavError::Busy);
        }
        self.count_then(Some(0), tx);
        Ok(())
    }

    fn count_then(&mut self, then: Option<usize>, tx: &mut dyn Transport) {
        let ticket = tx.submit(Request::Count);
        self.phase = Phase::Counting { ticket, then };
    }

    /// Record that the loaded item was edited
    pub fn note_edit(&mut self) {
        if self.loaded.is_none() {
            return;
        }
        self.edits = self.edits.wrapping_add(1);
        if !self.cursor.dirty {
            tracing::debug!(index = self.cursor.index, "item has unsaved edits");
            self.cursor.dirty = true;
        }
    }

    /// Move to item `one_based` (1..=total). Out-of-range requests are
    /// logged and refused without touching the cursor or the backend.
    pub fn jump(
        &mut self,
        one_based: usize,
        tree: &RecordWidget,
        tx: &mut dyn Transport,
    ) -> Result<(), NavError> {
        if self.is_busy() {
            tracing::debug!(requested = one_based, "navigation refused while busy");
            return Err(NavError::Busy);
        }
        let Some(total) = self.cursor.total else {
            if one_based == 0 {
                return Err(self.out_of_range(one_based, 0));
            }
            self.count_then(Some(one_based - 1), tx);
            return Ok(());
        };
        if one_based == 0 || one_based > total {
            return Err(self.out_of_range(one_based, total));
        }
        self.move_to(one_based - 1, tree, tx);
        Ok(())
    }

    fn out_of_range(&self, requested: usize, total: usize) -> NavError {
        tracing::warn!(requested, total, "jump out of range, staying on current item");
        NavError::OutOfRange { requested, total }
    }

    fn move_to(&mut self, target: usize, tree: &RecordWidget, tx: &mut dyn Transport) {
        if self.cursor.dirty {
            self.persist(tree, Some(target), tx);
        } else {
            self.fetch(target, tx);
        }
    }

    /// Persist the loaded item and advance to the next one. Persists even
    /// without edits. At the last item the save happens but the cursor stays.
    pub fn submit(&mut self, tree: &RecordWidget, tx: &mut dyn Transport) -> Result<(), NavError> {
        if self.is_busy() {
            return Err(NavError::Busy);
        }
        if self.loaded.is_none() {
            return Err(NavError::NothingLoaded);
        }
        let next = self.cursor.index + 1;
        let then = match self.cursor.total {
            Some(total) if next < total => Some(next),
            _ => {
                tracing::warn!(index = self.cursor.index, "at the last item, saving without advancing");
                None
            }
        };
        self.persist(tree, then, tx);
        Ok(())
    }

    /// Persist the loaded item in place
    pub fn save(&mut self, tree: &RecordWidget, tx: &mut dyn Transport) -> Result<(), NavError> {
        if self.is_busy() {
            return Err(NavError::Busy);
        }
        if self.loaded.is_none() {
            return Err(NavError::NothingLoaded);
        }
        self.persist(tree, None, tx);
        Ok(())
    }

    /// The `/update/` body for the loaded item
    pub fn payload(&self, tree: &RecordWidget) -> Record {
        let mut payload = tree.record_value();
        payload.insert(INDEX_KEY.to_string(), Value::from(self.cursor.index));
        payload
    }

    fn persist(&mut self, tree: &RecordWidget, then: Option<usize>, tx: &mut dyn Transport) {
        let ticket = tx.submit(Request::Update(self.payload(tree)));
        self.phase = Phase::Persisting {
            ticket,
            then,
            edits: self.edits,
        };
    }

    fn fetch(&mut self, target: usize, tx: &mut dyn Transport) {
        let ticket = tx.submit(Request::Get(target));
        self.phase = Phase::Fetching { ticket, target };
    }

    /// Act on a completion. On load the tree is repopulated and every
    /// suggestion cache is invalidated, as after each successful persist.
    pub fn on_completion(
        &mut self,
        completion: Completion,
        tree: &mut RecordWidget,
        tx: &mut dyn Transport,
    ) -> NavEvent {
        if !self.owns(completion.ticket) {
            tracing::debug!(ticket = completion.ticket, "dropping stale completion");
            return NavEvent::Ignored;
        }
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        match (phase, completion.result) {
            (Phase::Counting { then, .. }, Ok(Reply::Count(total))) => {
                tracing::info!(total, "item count");
                self.cursor.total = Some(total);
                match then {
                    Some(target) if target < total => self.move_to(target, tree, tx),
                    Some(target) => {
                        if target > 0 || total > 0 {
                            self.out_of_range(target + 1, total);
                        }
                    }
                    None => {}
                }
                NavEvent::Counted(total)
            }
            (Phase::Persisting { then, edits, .. }, Ok(Reply::Updated)) => {
                let index = self.cursor.index;
                tracing::info!(index, "saved item");
                tree.mark_dirty();
                if edits != self.edits {
                    // Edited while the save was in flight; the backend has
                    // an older copy
                    tracing::debug!(index, "item changed during save");
                    if then.is_some() {
                        self.persist(tree, then, tx);
                    }
                    return NavEvent::Persisted { index };
                }
                self.cursor.dirty = false;
                if let Some(target) = then {
                    self.fetch(target, tx);
                }
                NavEvent::Persisted { index }
            }
            (Phase::Fetching { target, .. }, Ok(Reply::Item(item))) => {
                tracing::debug!(index = target, "loaded item");
                tree.set_value(&Value::Object(item.clone()));
                tree.mark_dirty();
                self.loaded = Some(item);
                self.cursor.index = target;
                self.cursor.dirty = false;
                NavEvent::Loaded { index: target }
            }
            (phase, result) => {
                let message = match result {
                    Err(e) => e.to_string(),
                    Ok(reply) => format!("unexpected reply {:?}", reply),
                };
                match phase {
                    Phase::Counting { .. } => {
                        tracing::error!("could not fetch item count: {}", message);
                        NavEvent::CountFailed { message }
                    }
                    Phase::Persisting { .. } => {
                        tracing::error!(index = self.cursor.index, "save failed: {}", message);
                        NavEvent::PersistFailed {
                            index: self.cursor.index,
                            message,
                        }
                    }
                    Phase::Fetching { target, .. } => {
                        tracing::error!(index = target, "could not load item: {}", message);
                        NavEvent::LoadFailed {
                            index: target,
                            message,
                        }
                    }
                    Phase::Idle => NavEvent::Ignored,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingTransport;
    use crate::model::{FieldDescriptor, Schema};
    use crate::widget::{FieldPath, build_form};
    use insta::assert_json_snapshot;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree() -> RecordWidget {
        build_form(&Schema::new().with("intent", FieldDescriptor::multilabel()))
    }

    fn item(v: Value) -> Reply {
        Reply::Item(v.as_object().unwrap().clone())
    }

    /// Navigator counted at `total` with item `index` loaded
    fn loaded_at(index: usize, total: usize, tree: &mut RecordWidget, tx: &mut RecordingTransport) -> Navigator {
        let mut nav = Navigator::new();
        nav.start(tx).unwrap();
        let (t, _) = tx.last().clone();
        nav.on_completion(RecordingTransport::ok(t, Reply::Count(total)), tree, tx);
        if index != 0 {
            let (t, _) = tx.last().clone();
            nav.on_completion(RecordingTransport::ok(t, item(json!({}))), tree, tx);
            nav.jump(index + 1, tree, tx).unwrap();
        }
        let (t, _) = tx.last().clone();
        nav.on_completion(RecordingTransport::ok(t, item(json!({"intent": ["a", "b"]}))), tree, tx);
        assert_eq!(nav.cursor().index, index);
        nav
    }

    #[test]
    fn start_counts_then_loads_first_item() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let nav = loaded_at(0, 3, &mut tree, &mut tx);
        assert_eq!(tx.sent[0].1, Request::Count);
        assert_eq!(tx.sent[1].1, Request::Get(0));
        assert_eq!(
            nav.cursor(),
            Cursor {
                index: 0,
                total: Some(3),
                dirty: false
            }
        );
        assert_eq!(tree.field(&FieldPath::parse("intent")).unwrap().input(), "a, b");
    }

    #[test]
    fn out_of_range_jump_sends_nothing() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = loaded_at(1, 3, &mut tree, &mut tx);
        let sent = tx.sent.len();
        let before = nav.cursor();

        for n in [0, 4, 100] {
            assert!(matches!(
                nav.jump(n, &tree, &mut tx),
                Err(NavError::OutOfRange { total: 3, .. })
            ));
        }
        assert_eq!(tx.sent.len(), sent);
        assert_eq!(nav.cursor(), before);
    }

    #[test]
    fn dirty_jump_persists_before_fetching() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = loaded_at(0, 3, &mut tree, &mut tx);
        nav.note_edit();

        nav.jump(3, &tree, &mut tx).unwrap();
        let (persist, req) = tx.last().clone();
        assert!(matches!(req, Request::Update(_)));
        assert!(nav.is_busy());

        let ev = nav.on_completion(RecordingTransport::ok(persist, Reply::Updated), &mut tree, &mut tx);
        assert_eq!(ev, NavEvent::Persisted { index: 0 });
        let (fetch, req) = tx.last().clone();
        assert_eq!(req, Request::Get(2));

        let ev = nav.on_completion(RecordingTransport::ok(fetch, item(json!({}))), &mut tree, &mut tx);
        assert_eq!(ev, NavEvent::Loaded { index: 2 });
        assert!(!nav.cursor().dirty);
    }

    #[test]
    fn clean_jump_skips_persist() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = loaded_at(0, 3, &mut tree, &mut tx);
        nav.jump(2, &tree, &mut tx).unwrap();
        assert_eq!(tx.last().1, Request::Get(1));
    }

    #[test]
    fn failed_persist_blocks_the_move() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = loaded_at(0, 3, &mut tree, &mut tx);
        nav.note_edit();
        nav.jump(2, &tree, &mut tx).unwrap();
        let (t, _) = tx.last().clone();
        let sent = tx.sent.len();

        let ev = nav.on_completion(RecordingTransport::err(t, "read-only"), &mut tree, &mut tx);
        assert!(matches!(ev, NavEvent::PersistFailed { index: 0, .. }));
        assert_eq!(tx.sent.len(), sent);
        assert_eq!(
            nav.cursor(),
            Cursor {
                index: 0,
                total: Some(3),
                dirty: true
            }
        );
        assert!(!nav.is_busy());
    }

    #[test]
    fn second_move_while_busy_is_refused() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = loaded_at(0, 3, &mut tree, &mut tx);
        nav.jump(2, &tree, &mut tx).unwrap();
        assert_eq!(nav.jump(3, &tree, &mut tx), Err(NavError::Busy));
        assert_eq!(nav.submit(&tree, &mut tx), Err(NavError::Busy));
    }

    #[test]
    fn stale_completion_is_dropped() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = loaded_at(0, 3, &mut tree, &mut tx);
        let (old, _) = tx.sent[1].clone();
        nav.jump(2, &tree, &mut tx).unwrap();

        let ev = nav.on_completion(
            RecordingTransport::ok(old, item(json!({"intent": ["stale"]}))),
            &mut tree,
            &mut tx,
        );
        assert_eq!(ev, NavEvent::Ignored);
        assert_eq!(tree.field(&FieldPath::parse("intent")).unwrap().input(), "a, b");
        assert!(nav.is_busy());
    }

    #[test]
    fn submit_persists_unchanged_item_and_advances() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = loaded_at(0, 3, &mut tree, &mut tx);
        nav.submit(&tree, &mut tx).unwrap();

        let (t, req) = tx.last().clone();
        let Request::Update(payload) = req else {
            panic!("expected an update");
        };
        assert_json_snapshot!(payload, @r#"
        {
          "intent": [
            "a",
            "b"
          ],
          "_idx": 0
        }
        "#);

        nav.on_completion(RecordingTransport::ok(t, Reply::Updated), &mut tree, &mut tx);
        assert_eq!(tx.last().1, Request::Get(1));
    }

    #[test]
    fn submit_at_last_item_saves_and_stays() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = loaded_at(2, 3, &mut tree, &mut tx);
        nav.submit(&tree, &mut tx).unwrap();
        let (t, _) = tx.last().clone();
        let sent = tx.sent.len();
        let ev = nav.on_completion(RecordingTransport::ok(t, Reply::Updated), &mut tree, &mut tx);
        assert_eq!(ev, NavEvent::Persisted { index: 2 });
        assert_eq!(tx.sent.len(), sent);
        assert_eq!(nav.cursor().index, 2);
    }

    #[test]
    fn submit_before_load_is_refused() {
        let tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = Navigator::new();
        assert_eq!(nav.submit(&tree, &mut tx), Err(NavError::NothingLoaded));
        assert!(tx.sent.is_empty());
    }

    #[test]
    fn persist_and_load_invalidate_suggestions() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = loaded_at(0, 3, &mut tree, &mut tx);

        let field = tree.field_mut(&FieldPath::parse("intent")).unwrap();
        let t = field.request_suggestions(&mut tx).unwrap();
        field.suggestion_cache_mut().unwrap().fulfil(t, vec!["a".into()]);
        assert!(!field.suggestion_cache().unwrap().is_dirty());

        nav.save(&tree, &mut tx).unwrap();
        let (t, _) = tx.last().clone();
        nav.on_completion(RecordingTransport::ok(t, Reply::Updated), &mut tree, &mut tx);
        let field = tree.field(&FieldPath::parse("intent")).unwrap();
        assert!(field.suggestion_cache().unwrap().is_dirty());
    }

    #[test]
    fn lazy_count_then_jump() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = Navigator::new();
        nav.jump(2, &tree, &mut tx).unwrap();
        assert_eq!(tx.last().1, Request::Count);
        let (t, _) = tx.last().clone();
        nav.on_completion(RecordingTransport::ok(t, Reply::Count(5)), &mut tree, &mut tx);
        assert_eq!(tx.last().1, Request::Get(1));
    }

    #[test]
    fn empty_dataset_loads_nothing() {
        let mut tree = tree();
        let mut tx = RecordingTransport::new();
        let mut nav = Navigator::new();
        nav.start(&mut tx).unwrap();
        let (t, _) = tx.last().clone();
        let ev = nav.on_completion(RecordingTransport::ok(t, Reply::Count(0)), &mut tree, &mut tx);
        assert_eq!(ev, NavEvent::Counted(0));
        assert_eq!(tx.sent.len(), 1);
        assert!(nav.loaded().is_none());
    }
}

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use super::{FieldPath, MountKind, Mounted, Widget};
use crate::model::schema::json_kind;

/// Storage for a repeated field's entries
#[derive(Debug, Clone, PartialEq)]
pub enum Store {
    /// Keyed by arbitrary strings, in insertion order
    Map(IndexMap<String, Value>),
    /// Keyed by position
    Seq(Vec<Value>),
}

/// The entry currently bound to the child widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatKey {
    Name(String),
    Index(usize),
}

impl fmt::Display for RepeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatKey::Name(name) => write!(f, "{}", name),
            RepeatKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Wraps one child widget and keeps a collection of its values.
///
/// The child shows the entry for the active key. Edits to the child reach
/// the collection only through [`RepeatedWidget::save`]; switching keys does
/// not save, and [`RepeatedWidget::value`] returns the collection as stored.
pub struct RepeatedWidget {
    path: FieldPath,
    store: Store,
    active: Option<RepeatKey>,
    child: Box<Widget>,
    mounted: bool,
}

impl RepeatedWidget {
    pub fn new(path: FieldPath, child: Widget, keyed: bool) -> Self {
        RepeatedWidget {
            path,
            store: if keyed {
                Store::Map(IndexMap::new())
            } else {
                Store::Seq(Vec::new())
            },
            active: None,
            child: Box::new(child),
            mounted: false,
        }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self.store, Store::Map(_))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn child(&self) -> &Widget {
        &self.child
    }

    pub fn child_mut(&mut self) -> &mut Widget {
        &mut self.child
    }

    pub fn active_key(&self) -> Option<&RepeatKey> {
        self.active.as_ref()
    }

    /// Keys with a stored entry, in order
    pub fn keys(&self) -> Vec<String> {
        match &self.store {
            Store::Map(map) => map.keys().cloned().collect(),
            Store::Seq(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    fn stored(&self, key: &RepeatKey) -> Option<&Value> {
        match (&self.store, key) {
            (Store::Map(map), RepeatKey::Name(name)) => map.get(name),
            (Store::Seq(items), RepeatKey::Index(i)) => items.get(*i),
            _ => None,
        }
    }

    /// Whether the active key already has an entry in the store
    pub fn active_is_stored(&self) -> bool {
        self.active.as_ref().is_some_and(|k| self.stored(k).is_some())
    }

    fn load_active(&mut self) {
        let stored = self.active.as_ref().and_then(|k| self.stored(k)).cloned();
        match stored {
            Some(value) => self.child.set_value(&value),
            None => self.child.clear(),
        }
    }

    /// Make `key` the active entry and load it into the child (or clear the
    /// child when nothing is stored yet). Unsaved edits to the previous key
    /// are discarded. A sequence only takes non-negative integer keys;
    /// anything else is refused and leaves the widget untouched. Sequences
    /// grow by appending, so an index past the next free slot is refused too.
    pub fn set_key(&mut self, key: &str) -> bool {
        let parsed = match &self.store {
            Store::Map(_) => RepeatKey::Name(key.to_string()),
            Store::Seq(items) => match key.trim().parse::<usize>() {
                Ok(i) if i <= items.len() => RepeatKey::Index(i),
                Ok(i) => {
                    tracing::warn!(path = %self.path, index = i, len = items.len(), "sequence index past the end");
                    return false;
                }
                Err(_) => {
                    tracing::warn!(path = %self.path, key, "sequence key must be a non-negative integer");
                    return false;
                }
            },
        };
        self.active = Some(parsed);
        self.load_active();
        true
    }

    /// The key after (or before) the active one.
    ///
    /// Map keys cycle through the stored keys. Sequence keys move by one and
    /// may step one past the last entry to start a new one.
    pub fn step_key(&self, forward: bool) -> Option<String> {
        match &self.store {
            Store::Map(map) => {
                if map.is_empty() {
                    return None;
                }
                let current = match &self.active {
                    Some(RepeatKey::Name(name)) => map.get_index_of(name),
                    _ => None,
                };
                let len = map.len();
                let next = match (current, forward) {
                    (None, true) => 0,
                    (None, false) => len - 1,
                    (Some(i), true) => (i + 1) % len,
                    (Some(i), false) => (i + len - 1) % len,
                };
                map.get_index(next).map(|(k, _)| k.clone())
            }
            Store::Seq(items) => {
                let next = match (&self.active, forward) {
                    (Some(RepeatKey::Index(i)), true) => (*i + 1).min(items.len()),
                    (Some(RepeatKey::Index(i)), false) => i.saturating_sub(1),
                    _ => 0,
                };
                Some(next.to_string())
            }
        }
    }

    /// Write the child's value into the store at the active key. If the
    /// sequence shrank under the active key, the gap is padded with nulls.
    pub fn save(&mut self) {
        let Some(key) = self.active.clone() else {
            tracing::debug!(path = %self.path, "save without an active key");
            return;
        };
        let value = self.child.value();
        match (&mut self.store, key) {
            (Store::Map(map), RepeatKey::Name(name)) => {
                map.insert(name, value);
            }
            (Store::Seq(items), RepeatKey::Index(i)) => {
                if i >= items.len() {
                    items.resize(i + 1, Value::Null);
                }
                items[i] = value;
            }
            _ => {}
        }
    }

    pub fn value(&self) -> Value {
        match &self.store {
            Store::Map(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            Store::Seq(items) => Value::Array(items.clone()),
        }
    }

    /// Replace the collection and reload the active entry into the child
    pub fn set_value(&mut self, value: &Value) {
        match (&mut self.store, value) {
            (Store::Map(map), Value::Object(obj)) => {
                *map = obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            }
            (Store::Seq(items), Value::Array(arr)) => {
                *items = arr.clone();
            }
            (store, Value::Null) => clear_store(store),
            (store, other) => {
                tracing::warn!(
                    path = %self.path,
                    "expected {} for repeated field, got {}",
                    if matches!(store, Store::Map(_)) { "an object" } else { "an array" },
                    json_kind(other)
                );
                clear_store(store);
            }
        }
        self.load_active();
    }

    pub fn clear(&mut self) {
        clear_store(&mut self.store);
        self.child.clear();
    }

    pub fn mark_dirty(&mut self) {
        self.child.mark_dirty();
    }

    pub fn attach(&mut self, depth: usize, mount: &mut dyn FnMut(Mounted)) -> bool {
        if self.mounted {
            tracing::debug!(path = %self.path, "repeated field already mounted");
            return false;
        }
        self.mounted = true;
        mount(Mounted {
            path: self.path.clone(),
            depth,
            kind: MountKind::Repeated {
                keyed: self.is_keyed(),
            },
        });
        self.child.attach(depth + 1, mount);
        true
    }
}

fn clear_store(store: &mut Store) {
    match store {
        Store::Map(map) => map.clear(),
        Store::Seq(items) => items.clear(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDescriptor, Repeat, Schema};
    use crate::widget::{FieldType, FieldWidget};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn text(path: &str, keyed: bool) -> RepeatedWidget {
        let p = FieldPath::parse(path);
        RepeatedWidget::new(p.clone(), Widget::Field(FieldWidget::new(p, FieldType::Text)), keyed)
    }

    fn type_into(rep: &mut RepeatedWidget, input: &str) {
        match rep.child_mut() {
            Widget::Field(f) => f.set_input(input.to_string()),
            _ => panic!("expected a field child"),
        }
    }

    fn child_input(rep: &RepeatedWidget) -> String {
        match rep.child() {
            Widget::Field(f) => f.input().to_string(),
            _ => panic!("expected a field child"),
        }
    }

    #[test]
    fn saved_keys_read_back() {
        let mut rep = text("notes", true);
        rep.set_key("k1");
        type_into(&mut rep, "x");
        rep.save();
        rep.set_key("k2");
        type_into(&mut rep, "y");
        rep.save();
        rep.set_key("k1");

        assert_eq!(child_input(&rep), "x");
        assert_eq!(rep.value(), json!({"k1": ["x"], "k2": ["y"]}));
    }

    #[test]
    fn set_key_does_not_save() {
        let mut rep = text("notes", true);
        rep.set_key("a");
        type_into(&mut rep, "lost");
        rep.set_key("b");
        assert_eq!(rep.value(), json!({}));
        // New key with nothing stored shows an empty child
        assert_eq!(child_input(&rep), "");
    }

    #[test]
    fn value_excludes_unsaved_active_edits() {
        let mut rep = text("notes", true);
        rep.set_value(&json!({"a": ["one"]}));
        rep.set_key("a");
        type_into(&mut rep, "two");
        assert_eq!(rep.value(), json!({"a": ["one"]}));
        rep.save();
        assert_eq!(rep.value(), json!({"a": ["two"]}));
    }

    #[test]
    fn save_without_active_key_is_noop() {
        let mut rep = text("notes", false);
        type_into(&mut rep, "x");
        rep.save();
        assert_eq!(rep.value(), json!([]));
    }

    #[test]
    fn sequence_rejects_names_and_gaps() {
        let mut rep = text("comments", false);
        assert!(!rep.set_key("first"));
        assert!(!rep.set_key("2"));
        assert!(!rep.set_key("18446744073709551615"));
        assert!(rep.active_key().is_none());

        assert!(rep.set_key("0"));
        type_into(&mut rep, "a");
        rep.save();
        assert!(rep.set_key("1"));
        type_into(&mut rep, "b");
        rep.save();
        assert_eq!(rep.value(), json!([["a"], ["b"]]));
    }

    #[test]
    fn sequence_pads_when_store_shrinks_under_active_key() {
        let mut rep = text("comments", false);
        rep.set_value(&json!([["a"], ["b"]]));
        rep.set_key("1");
        rep.set_value(&json!([]));
        type_into(&mut rep, "c");
        rep.save();
        assert_eq!(rep.value(), json!([null, ["c"]]));
    }

    #[test]
    fn set_value_keeps_active_key_and_reloads_child() {
        let mut rep = text("comments", false);
        rep.set_value(&json!([["x"], ["y"]]));
        rep.set_key("1");
        rep.set_value(&json!([["a"], ["b"]]));
        assert_eq!(rep.active_key(), Some(&RepeatKey::Index(1)));
        assert_eq!(child_input(&rep), "b");

        rep.set_value(&Value::Null);
        assert_eq!(rep.value(), json!([]));
        assert_eq!(child_input(&rep), "");
    }

    #[test]
    fn wrong_shape_clears_store() {
        let mut rep = text("notes", true);
        rep.set_value(&json!({"a": ["x"]}));
        rep.set_value(&json!(["not", "a", "map"]));
        assert_eq!(rep.value(), json!({}));
    }

    #[test]
    fn step_key_cycles_map_keys() {
        let mut rep = text("notes", true);
        assert_eq!(rep.step_key(true), None);
        rep.set_value(&json!({"a": [], "b": [], "c": []}));
        assert_eq!(rep.step_key(true).as_deref(), Some("a"));
        rep.set_key("c");
        assert_eq!(rep.step_key(true).as_deref(), Some("a"));
        assert_eq!(rep.step_key(false).as_deref(), Some("b"));
    }

    #[test]
    fn step_key_extends_sequence_by_one() {
        let mut rep = text("comments", false);
        assert_eq!(rep.step_key(true).as_deref(), Some("0"));
        rep.set_value(&json!([["a"]]));
        rep.set_key("0");
        assert_eq!(rep.step_key(true).as_deref(), Some("1"));
        rep.set_key("1");
        assert_eq!(rep.step_key(true).as_deref(), Some("1"));
        assert_eq!(rep.step_key(false).as_deref(), Some("0"));
    }

    #[test]
    fn record_children_round_trip_through_store() {
        let desc = FieldDescriptor::record(Schema::new().with("label", FieldDescriptor::multilabel()))
            .repeated(Repeat::Map);
        let Widget::Repeated(mut rep) = Widget::build(FieldPath::parse("spans"), &desc) else {
            panic!("expected a repeated widget");
        };
        rep.set_value(&json!({"0-3": {"label": ["verb"]}}));
        rep.set_key("0-3");
        assert_eq!(rep.child().value(), json!({"label": ["verb"]}));
    }

    #[test]
    fn attach_mounts_child_one_level_deeper() {
        let mut rep = text("notes", true);
        let mut layout = Vec::new();
        assert!(rep.attach(1, &mut |m| layout.push(m)));
        assert!(!rep.attach(1, &mut |m| layout.push(m)));
        assert_eq!(layout.len(), 2);
        assert_eq!(layout[0].kind, MountKind::Repeated { keyed: true });
        assert_eq!(layout[1].depth, 2);
        assert_eq!(layout[1].path, layout[0].path);
    }
}

//! The form: a tree of editable widgets built from a [`Schema`].
//!
//! Widgets are owned by their parent; the root is a [`RecordWidget`]. Every
//! widget is addressed by a dotted [`FieldPath`] from the root. The child of a
//! repeated widget shares the repeated widget's path, so `spans.label` names
//! the `label` field of whichever `spans` entry is active.

pub mod field;
pub mod record;
pub mod repeated;

use std::fmt;
use std::sync::mpsc::Sender;

use serde_json::Value;

use crate::model::{FieldDescriptor, FieldKind, Repeat, Schema};

pub use field::{FieldType, FieldWidget, SuggestionCache};
pub use record::RecordWidget;
pub use repeated::{RepeatKey, RepeatedWidget, Store};

/// Position of a widget in the tree, as field names from the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root() -> Self {
        FieldPath(Vec::new())
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        FieldPath(segments)
    }

    /// Parse `a.b.c`. A trailing `[n]` on a segment (`spans[2].label`) is
    /// accepted and ignored, since entries of a repeated field share a path.
    pub fn parse(text: &str) -> Self {
        FieldPath(
            text.split('.')
                .map(|seg| match seg.find('[') {
                    Some(pos) if seg.ends_with(']') => &seg[..pos],
                    _ => seg,
                })
                .map(str::trim)
                .filter(|seg| !seg.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn prefix(&self, len: usize) -> FieldPath {
        FieldPath(self.0[..len.min(self.0.len())].to_vec())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment, the field's own name
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(|s| s.as_str())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Fired when a field's value is committed
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub path: FieldPath,
    pub value: Value,
}

/// Subscribers to a widget's change events. Each subscriber is a channel;
/// a subscriber whose receiver is gone is dropped on the next emit.
#[derive(Debug, Clone, Default)]
pub struct Listeners {
    senders: Vec<Sender<ChangeEvent>>,
}

impl Listeners {
    pub fn subscribe(&mut self, sender: Sender<ChangeEvent>) {
        self.senders.push(sender);
    }

    pub fn emit(&mut self, event: &ChangeEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

/// What a mounted widget contributes to the form layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    Text,
    Multilabel,
    /// Heading for a nested record
    Group,
    Repeated { keyed: bool },
}

/// One entry of the form layout, produced by [`Widget::attach`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mounted {
    pub path: FieldPath,
    pub depth: usize,
    pub kind: MountKind,
}

impl Mounted {
    pub fn is_editable(&self) -> bool {
        matches!(self.kind, MountKind::Text | MountKind::Multilabel)
    }
}

pub enum Widget {
    Field(FieldWidget),
    Record(RecordWidget),
    Repeated(RepeatedWidget),
}

impl Widget {
    /// Build the widget for one descriptor. Repeated descriptors wrap the
    /// widget for their kind.
    pub fn build(path: FieldPath, desc: &FieldDescriptor) -> Widget {
        let inner = match &desc.kind {
            FieldKind::Text => Widget::Field(FieldWidget::new(path.clone(), FieldType::Text)),
            FieldKind::Multilabel => {
                Widget::Field(FieldWidget::new(path.clone(), FieldType::Multilabel))
            }
            FieldKind::Record(schema) => Widget::Record(RecordWidget::from_schema(path.clone(), schema)),
        };
        match desc.repeat {
            Repeat::Single => inner,
            Repeat::Sequence => Widget::Repeated(RepeatedWidget::new(path, inner, false)),
            Repeat::Map => Widget::Repeated(RepeatedWidget::new(path, inner, true)),
        }
    }

    pub fn path(&self) -> &FieldPath {
        match self {
            Widget::Field(w) => w.path(),
            Widget::Record(w) => w.path(),
            Widget::Repeated(w) => w.path(),
        }
    }

    pub fn set_value(&mut self, value: &Value) {
        match self {
            Widget::Field(w) => w.set_value(value),
            Widget::Record(w) => w.set_value(value),
            Widget::Repeated(w) => w.set_value(value),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Widget::Field(w) => w.clear(),
            Widget::Record(w) => w.clear(),
            Widget::Repeated(w) => w.clear(),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Widget::Field(w) => w.value(),
            Widget::Record(w) => w.value(),
            Widget::Repeated(w) => w.value(),
        }
    }

    pub fn mark_dirty(&mut self) {
        match self {
            Widget::Field(w) => w.mark_dirty(),
            Widget::Record(w) => w.mark_dirty(),
            Widget::Repeated(w) => w.mark_dirty(),
        }
    }

    /// Mount into the layout. Returns false when already mounted.
    pub fn attach(&mut self, depth: usize, mount: &mut dyn FnMut(Mounted)) -> bool {
        match self {
            Widget::Field(w) => w.attach(depth, mount),
            Widget::Record(w) => w.attach(depth, mount),
            Widget::Repeated(w) => w.attach(depth, mount),
        }
    }

    pub fn for_each_field_mut(&mut self, f: &mut dyn FnMut(&mut FieldWidget)) {
        match self {
            Widget::Field(w) => f(w),
            Widget::Record(w) => w.for_each_field_mut(f),
            Widget::Repeated(w) => w.child_mut().for_each_field_mut(f),
        }
    }
}

/// Build the root of the form for a schema
pub fn build_form(schema: &Schema) -> RecordWidget {
    RecordWidget::from_schema(FieldPath::root(), schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc;

    #[test]
    fn path_parse_and_display() {
        let p = FieldPath::parse("spans[3].label");
        assert_eq!(p.segments(), &["spans".to_string(), "label".to_string()]);
        assert_eq!(p.to_string(), "spans.label");
        assert_eq!(p.name(), Some("label"));
        assert_eq!(FieldPath::parse(""), FieldPath::root());
        assert_eq!(FieldPath::root().child("a").child("b"), FieldPath::parse("a.b"));
    }

    #[test]
    fn build_wraps_repeated_descriptors() {
        let desc = FieldDescriptor::multilabel().repeated(Repeat::Map);
        let w = Widget::build(FieldPath::parse("tags"), &desc);
        match w {
            Widget::Repeated(rep) => {
                assert!(rep.is_keyed());
                assert!(matches!(rep.child(), Widget::Field(_)));
                assert_eq!(rep.child().path(), &FieldPath::parse("tags"));
            }
            _ => panic!("expected a repeated widget"),
        }
    }

    #[test]
    fn listeners_drop_closed_receivers() {
        let mut listeners = Listeners::default();
        let (tx1, rx1) = mpsc::channel();
        let (tx2, rx2) = mpsc::channel();
        listeners.subscribe(tx1);
        listeners.subscribe(tx2);
        drop(rx2);

        let event = ChangeEvent {
            path: FieldPath::parse("a"),
            value: Value::Null,
        };
        listeners.emit(&event);
        assert_eq!(listeners.len(), 1);
        assert_eq!(rx1.try_recv().unwrap(), event);
    }
}

use std::collections::HashSet;
use std::sync::mpsc::Sender;

use indexmap::IndexMap;
use serde_json::Value;

use super::{ChangeEvent, FieldPath, FieldWidget, MountKind, Mounted, RepeatedWidget, Widget};
use crate::model::schema::json_kind;
use crate::model::value::is_blank;
use crate::model::{Record, Schema};

/// A group of named child widgets, one per schema field, in declaration order
pub struct RecordWidget {
    path: FieldPath,
    children: IndexMap<String, Widget>,
    optional: HashSet<String>,
    mounted: bool,
}

impl RecordWidget {
    pub fn from_schema(path: FieldPath, schema: &Schema) -> Self {
        let mut children = IndexMap::new();
        let mut optional = HashSet::new();
        for (name, desc) in &schema.fields {
            children.insert(name.clone(), Widget::build(path.child(name), desc));
            if desc.optional {
                optional.insert(name.clone());
            }
        }
        RecordWidget {
            path,
            children,
            optional,
            mounted: false,
        }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn children(&self) -> impl Iterator<Item = (&String, &Widget)> {
        self.children.iter()
    }

    pub fn record_value(&self) -> Record {
        self.children
            .iter()
            .map(|(name, w)| (name.clone(), w.value()))
            .collect()
    }

    pub fn value(&self) -> Value {
        Value::Object(self.record_value())
    }

    /// Populate from a record. Fields the record lacks are cleared, so
    /// nothing from a previously loaded item is left behind.
    pub fn set_value(&mut self, value: &Value) {
        match value {
            Value::Object(record) => {
                for (name, child) in self.children.iter_mut() {
                    match record.get(name) {
                        Some(v) => child.set_value(v),
                        None => child.clear(),
                    }
                }
            }
            Value::Null => self.clear(),
            other => {
                tracing::warn!(path = %self.path, "expected an object for record, got {}", json_kind(other));
                self.clear();
            }
        }
    }

    pub fn clear(&mut self) {
        for child in self.children.values_mut() {
            child.clear();
        }
    }

    /// Invalidate every suggestion cache below this record
    pub fn mark_dirty(&mut self) {
        for child in self.children.values_mut() {
            child.mark_dirty();
        }
    }

    /// Look up a widget by path, descending through nested records and
    /// through repeated fields into their child.
    pub fn get_widget(&self, path: &FieldPath) -> Option<&Widget> {
        let (head, rest) = path.segments().split_first()?;
        find(self.children.get(head)?, rest)
    }

    pub fn get_widget_mut(&mut self, path: &FieldPath) -> Option<&mut Widget> {
        let (head, rest) = path.segments().split_first()?;
        find_mut(self.children.get_mut(head)?, rest)
    }

    /// The editable field at `path`, looking through a repeated wrapper
    pub fn field(&self, path: &FieldPath) -> Option<&FieldWidget> {
        match self.get_widget(path)? {
            Widget::Field(f) => Some(f),
            Widget::Repeated(rep) => match rep.child() {
                Widget::Field(f) => Some(f),
                _ => None,
            },
            Widget::Record(_) => None,
        }
    }

    pub fn field_mut(&mut self, path: &FieldPath) -> Option<&mut FieldWidget> {
        match self.get_widget_mut(path)? {
            Widget::Field(f) => Some(f),
            Widget::Repeated(rep) => match rep.child_mut() {
                Widget::Field(f) => Some(f),
                _ => None,
            },
            Widget::Record(_) => None,
        }
    }

    /// The innermost repeated field that `path` lies in (or names)
    pub fn repeated(&self, path: &FieldPath) -> Option<&RepeatedWidget> {
        let depth = self.repeated_depth(path)?;
        match self.get_widget(&path.prefix(depth))? {
            Widget::Repeated(rep) => Some(rep),
            _ => None,
        }
    }

    pub fn repeated_mut(&mut self, path: &FieldPath) -> Option<&mut RepeatedWidget> {
        let depth = self.repeated_depth(path)?;
        match self.get_widget_mut(&path.prefix(depth))? {
            Widget::Repeated(rep) => Some(rep),
            _ => None,
        }
    }

    fn repeated_depth(&self, path: &FieldPath) -> Option<usize> {
        let (head, rest) = path.segments().split_first()?;
        innermost_repeated(self.children.get(head)?, rest, 1)
    }

    /// Save every repeated field along `path` into its store, innermost
    /// first, so a committed edit reaches the record's value. Returns how
    /// many repeated fields were saved.
    pub fn flush(&mut self, path: &FieldPath) -> usize {
        let Some((head, rest)) = path.segments().split_first() else {
            return 0;
        };
        match self.children.get_mut(head) {
            Some(child) => flush_widget(child, rest),
            None => 0,
        }
    }

    /// Required top-level fields that hold no value
    pub fn missing_fields(&self) -> Vec<String> {
        self.children
            .iter()
            .filter(|(name, _)| !self.optional.contains(*name))
            .filter(|(_, w)| is_blank(&w.value()))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn subscribe(&mut self, sender: Sender<ChangeEvent>) {
        self.for_each_field_mut(&mut |f| f.subscribe(sender.clone()));
    }

    pub fn for_each_field_mut(&mut self, f: &mut dyn FnMut(&mut FieldWidget)) {
        for child in self.children.values_mut() {
            child.for_each_field_mut(f);
        }
    }

    /// Mount this record and its children. The root record contributes no
    /// heading of its own.
    pub fn attach(&mut self, depth: usize, mount: &mut dyn FnMut(Mounted)) -> bool {
        if self.mounted {
            tracing::debug!(path = %self.path, "record already mounted");
            return false;
        }
        self.mounted = true;
        let child_depth = if self.path.is_root() {
            depth
        } else {
            mount(Mounted {
                path: self.path.clone(),
                depth,
                kind: MountKind::Group,
            });
            depth + 1
        };
        for child in self.children.values_mut() {
            child.attach(child_depth, mount);
        }
        true
    }

    /// Mount the whole tree and return the resulting layout
    pub fn layout(&mut self) -> Vec<Mounted> {
        let mut layout = Vec::new();
        self.attach(0, &mut |m| layout.push(m));
        layout
    }
}

fn find<'a>(widget: &'a Widget, segs: &[String]) -> Option<&'a Widget> {
    let Some((head, rest)) = segs.split_first() else {
        return Some(widget);
    };
    match widget {
        Widget::Record(r) => find(r.children.get(head)?, rest),
        Widget::Repeated(rep) => find(rep.child(), segs),
        Widget::Field(_) => None,
    }
}

fn find_mut<'a>(widget: &'a mut Widget, segs: &[String]) -> Option<&'a mut Widget> {
    let Some((head, rest)) = segs.split_first() else {
        return Some(widget);
    };
    match widget {
        Widget::Record(r) => find_mut(r.children.get_mut(head)?, rest),
        Widget::Repeated(rep) => find_mut(rep.child_mut(), segs),
        Widget::Field(_) => None,
    }
}

fn innermost_repeated(widget: &Widget, segs: &[String], consumed: usize) -> Option<usize> {
    match widget {
        Widget::Field(_) => None,
        Widget::Repeated(rep) => innermost_repeated(rep.child(), segs, consumed).or(Some(consumed)),
        Widget::Record(r) => {
            let (head, rest) = segs.split_first()?;
            innermost_repeated(r.children.get(head)?, rest, consumed + 1)
        }
    }
}

fn flush_widget(widget: &mut Widget, segs: &[String]) -> usize {
    match widget {
        Widget::Field(_) => 0,
        Widget::Repeated(rep) => {
            let inner = flush_widget(rep.child_mut(), segs);
            rep.save();
            inner + 1
        }
        Widget::Record(r) => match segs.split_first() {
            Some((head, rest)) => r
                .children
                .get_mut(head)
                .map(|c| flush_widget(c, rest))
                .unwrap_or(0),
            None => 0,
        },
    }
}

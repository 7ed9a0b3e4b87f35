//! Backends that serve items without a server: an in-memory list, and a
//! JSONL file that is rewritten after every accepted update.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use super::{Backend, BackendError, Rendered};
use crate::model::{FieldKind, INDEX_KEY, Record, Repeat, Schema};
use crate::ops::query;

/// Items held in memory. Also the engine behind [`JsonlBackend`].
pub struct MemoryBackend {
    schema: Schema,
    items: Mutex<Vec<Record>>,
    updates: Mutex<Vec<Record>>,
    read_only: bool,
}

impl MemoryBackend {
    pub fn new(schema: Schema, items: Vec<Record>) -> Self {
        MemoryBackend {
            schema,
            items: Mutex::new(items),
            updates: Mutex::new(Vec::new()),
            read_only: false,
        }
    }

    /// Reject every update, as a server with a read-only store would
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Snapshot of the stored items
    pub fn items(&self) -> Vec<Record> {
        lock(&self.items).clone()
    }

    /// Every accepted `/update/` payload, in arrival order
    pub fn updates(&self) -> Vec<Record> {
        lock(&self.updates).clone()
    }

    fn apply_update(&self, payload: &Record) -> Result<(), BackendError> {
        self.apply_update_then(payload, |_| Ok(()))
    }

    /// Merge `payload` into its item, then run `write` over the updated list
    /// while still holding the lock. If `write` fails the item is put back,
    /// so memory never runs ahead of what `write` stored.
    fn apply_update_then(
        &self,
        payload: &Record,
        write: impl FnOnce(&[Record]) -> Result<(), BackendError>,
    ) -> Result<(), BackendError> {
        if self.read_only {
            return Err(BackendError::Rejected("store is read-only".into()));
        }
        let index = payload
            .get(INDEX_KEY)
            .and_then(Value::as_u64)
            .ok_or_else(|| BackendError::Rejected(format!("payload has no {}", INDEX_KEY)))?
            as usize;

        let mut items = lock(&self.items);
        let count = items.len();
        let item = items
            .get_mut(index)
            .ok_or(BackendError::OutOfRange { index, count })?;

        // Anything that is not an annotation field must match what is stored
        for (key, value) in payload {
            if key == INDEX_KEY || self.schema.fields.contains_key(key) {
                continue;
            }
            if item.get(key) != Some(value) {
                return Err(BackendError::Rejected(
                    "Provided response has an object that does not correspond to this idx".into(),
                ));
            }
        }

        let mut merged = item.clone();
        for (key, value) in payload {
            if self.schema.fields.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
        let previous = std::mem::replace(item, merged);
        if let Err(e) = write(&items) {
            items[index] = previous;
            return Err(e);
        }
        drop(items);

        lock(&self.updates).push(payload.clone());
        tracing::debug!(index, "stored update");
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panicked writer leaves plain data behind; keep serving it
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Backend for MemoryBackend {
    fn schema(&self) -> Result<Schema, BackendError> {
        Ok(self.schema.clone())
    }

    fn count(&self) -> Result<usize, BackendError> {
        Ok(lock(&self.items).len())
    }

    fn get(&self, index: usize) -> Result<Record, BackendError> {
        let items = lock(&self.items);
        items.get(index).cloned().ok_or(BackendError::OutOfRange {
            index,
            count: items.len(),
        })
    }

    fn update(&self, payload: &Record) -> Result<(), BackendError> {
        self.apply_update(payload)
    }

    fn autocomplete(&self, field: &str) -> Result<Vec<String>, BackendError> {
        let path: Vec<&str> = field.split('.').collect();
        let mut seen = BTreeSet::new();
        for item in lock(&self.items).iter() {
            collect_values(&self.schema, item, &path, &mut seen);
        }
        Ok(seen.into_iter().collect())
    }

    fn search(&self, query: &str) -> Result<Vec<usize>, BackendError> {
        let items = lock(&self.items);
        Ok(query::find_indices(&items, query, &self.schema.text_paths())?)
    }

    fn render(&self, start: usize, count: usize) -> Result<Rendered, BackendError> {
        let items = lock(&self.items);
        if start > items.len() {
            return Err(BackendError::Rejected("No more data".into()));
        }
        let end = start.saturating_add(count).min(items.len());
        let page: Vec<Record> = items[start..end].to_vec();
        let html = page
            .iter()
            .map(|item| {
                let pretty = serde_json::to_string_pretty(item)?;
                Ok(format!("<pre>{}</pre>", escape_html(&pretty)))
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;
        Ok(Rendered { html, items: page })
    }
}

/// Gather every string stored under `path` (a dotted field path) in one
/// item, looking through repeated stores along the way.
fn collect_values(schema: &Schema, record: &Record, path: &[&str], out: &mut BTreeSet<String>) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let (Some(desc), Some(value)) = (schema.fields.get(*head), record.get(*head)) else {
        return;
    };

    let entries: Vec<&Value> = match (desc.repeat, value) {
        (Repeat::Single, v) => vec![v],
        (Repeat::Sequence, Value::Array(items)) => items.iter().collect(),
        (Repeat::Map, Value::Object(map)) => map.values().collect(),
        _ => return,
    };

    for entry in entries {
        match (&desc.kind, rest.is_empty()) {
            (FieldKind::Record(nested), false) => {
                if let Value::Object(obj) = entry {
                    collect_values(nested, obj, rest, out);
                }
            }
            (FieldKind::Text | FieldKind::Multilabel, true) => match entry {
                Value::String(s) if !s.trim().is_empty() => {
                    out.insert(s.clone());
                }
                Value::Array(tokens) => {
                    out.extend(
                        tokens
                            .iter()
                            .filter_map(Value::as_str)
                            .filter(|s| !s.trim().is_empty())
                            .map(str::to_string),
                    );
                }
                _ => {}
            },
            _ => {}
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Items loaded from a `.jsonl` file, one object per line. The file is
/// rewritten atomically after every accepted update.
pub struct JsonlBackend {
    path: PathBuf,
    inner: MemoryBackend,
}

impl JsonlBackend {
    pub fn open(path: &Path, schema: Schema) -> Result<Self, BackendError> {
        let items = if path.exists() {
            read_jsonl(path)?
        } else {
            tracing::info!(path = %path.display(), "data file does not exist yet, starting empty");
            Vec::new()
        };
        tracing::info!(path = %path.display(), count = items.len(), "loaded items");
        Ok(JsonlBackend {
            path: path.to_path_buf(),
            inner: MemoryBackend::new(schema, items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_items(&self, items: &[Record]) -> Result<(), BackendError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        for item in items {
            serde_json::to_writer(&mut tmp, item)?;
            tmp.write_all(b"\n")?;
        }
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| BackendError::Io(e.error))?;
        Ok(())
    }
}

/// Parse a JSONL file. Blank lines are skipped; a line that is not a JSON
/// object is an error naming its line number.
pub fn read_jsonl(path: &Path) -> Result<Vec<Record>, BackendError> {
    let content = fs::read_to_string(path)?;
    let mut items = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line)? {
            Value::Object(obj) => items.push(obj),
            other => {
                return Err(BackendError::Decode {
                    endpoint: "jsonl",
                    message: format!(
                        "line {} is {}, expected an object",
                        n + 1,
                        crate::model::schema::json_kind(&other)
                    ),
                });
            }
        }
    }
    Ok(items)
}

impl Backend for JsonlBackend {
    fn schema(&self) -> Result<Schema, BackendError> {
        self.inner.schema()
    }

    fn count(&self) -> Result<usize, BackendError> {
        self.inner.count()
    }

    fn get(&self, index: usize) -> Result<Record, BackendError> {
        self.inner.get(index)
    }

    fn update(&self, payload: &Record) -> Result<(), BackendError> {
        self.inner
            .apply_update_then(payload, |items| self.write_items(items))
    }

    fn autocomplete(&self, field: &str) -> Result<Vec<String>, BackendError> {
        self.inner.autocomplete(field)
    }

    fn search(&self, query: &str) -> Result<Vec<usize>, BackendError> {
        self.inner.search(query)
    }

    fn render(&self, start: usize, count: usize) -> Result<Rendered, BackendError> {
        self.inner.render(start, count)
    }
}

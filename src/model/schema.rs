use indexmap::IndexMap;
use serde_json::{Map, Value, json};

/// Error type for schema loading
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("could not parse schema: {0}")]
    Json(#[from] serde_json::Error),
}

/// Server-declared shape of one labeled item: field name → descriptor, in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub fields: IndexMap<String, FieldDescriptor>,
}

/// Describes how one field is edited and stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    pub repeat: Repeat,
    /// Optional fields do not count towards item completeness
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text blob
    Text,
    /// Ordered set of tags with server-backed suggestions
    Multilabel,
    /// Nested record with its own schema
    Record(Schema),
}

/// Whether a field holds a single value or a collection of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Single,
    /// Insertion-ordered sequence, keyed by position
    Sequence,
    /// Mapping keyed by an arbitrary external key
    Map,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Multilabel => "multilabel",
            FieldKind::Record(_) => "record",
        }
    }
}

impl FieldDescriptor {
    pub fn new(kind: FieldKind) -> Self {
        FieldDescriptor {
            kind,
            repeat: Repeat::Single,
            optional: false,
        }
    }

    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    pub fn multilabel() -> Self {
        Self::new(FieldKind::Multilabel)
    }

    pub fn record(schema: Schema) -> Self {
        Self::new(FieldKind::Record(schema))
    }

    pub fn repeated(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Parse a single descriptor. Returns `None` (after logging) when the
    /// descriptor cannot be resolved; the caller drops the field.
    fn from_json(name: &str, desc: &Value) -> Option<Self> {
        let Some(obj) = desc.as_object() else {
            tracing::warn!(field = name, "schema descriptor is not an object, skipping");
            return None;
        };

        let kind = match obj.get("type").and_then(Value::as_str) {
            Some("text") => FieldKind::Text,
            Some("multilabel") => FieldKind::Multilabel,
            Some("record") => {
                let nested = match obj.get("fields") {
                    Some(fields) => match Schema::from_json(fields) {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::warn!(field = name, "could not resolve nested schema: {}", e);
                            return None;
                        }
                    },
                    None => {
                        tracing::warn!(field = name, "record descriptor has no fields");
                        Schema::default()
                    }
                };
                FieldKind::Record(nested)
            }
            Some(other) => {
                tracing::warn!(field = name, kind = other, "unsupported field type, skipping");
                return None;
            }
            None => {
                tracing::warn!(field = name, "schema descriptor has no type, skipping");
                return None;
            }
        };

        let flag = |key: &str| obj.get(key).and_then(Value::as_bool).unwrap_or(false);
        let repeat = match (flag("repeated"), flag("useMap")) {
            (false, _) => Repeat::Single,
            (true, false) => Repeat::Sequence,
            (true, true) => Repeat::Map,
        };

        Some(FieldDescriptor {
            kind,
            repeat,
            optional: flag("optional"),
        })
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), json!(self.kind.type_name()));
        if let FieldKind::Record(nested) = &self.kind {
            obj.insert("fields".into(), nested.to_json());
        }
        match self.repeat {
            Repeat::Single => {}
            Repeat::Sequence => {
                obj.insert("repeated".into(), json!(true));
            }
            Repeat::Map => {
                obj.insert("repeated".into(), json!(true));
                obj.insert("useMap".into(), json!(true));
            }
        }
        if self.optional {
            obj.insert("optional".into(), json!(true));
        }
        Value::Object(obj)
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion (declaration order is preserved)
    pub fn with(mut self, name: &str, desc: FieldDescriptor) -> Self {
        self.fields.insert(name.to_string(), desc);
        self
    }

    /// Parse the `/schema/` payload. Fields whose descriptor cannot be
    /// resolved are logged and left out rather than failing the whole schema.
    pub fn from_json(value: &Value) -> Result<Schema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::NotAnObject(json_kind(value)))?;

        let mut fields = IndexMap::new();
        for (name, desc) in obj {
            if let Some(d) = FieldDescriptor::from_json(name, desc) {
                fields.insert(name.clone(), d);
            }
        }
        Ok(Schema { fields })
    }

    pub fn parse(text: &str) -> Result<Schema, SchemaError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Build a schema from a `[schema]` table in fex.toml
    pub fn from_toml(table: &toml::Table) -> Result<Schema, SchemaError> {
        let value = serde_json::to_value(table)?;
        Self::from_json(&value)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, desc)| (name.clone(), desc.to_json()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Dotted paths of every leaf field that holds plain text, for the
    /// local search backend's bare-term matching.
    pub fn text_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_text_paths(self, "", &mut out);
        out
    }
}

fn collect_text_paths(schema: &Schema, prefix: &str, out: &mut Vec<String>) {
    for (name, desc) in &schema.fields {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        match &desc.kind {
            FieldKind::Text => out.push(path),
            FieldKind::Multilabel => {}
            FieldKind::Record(nested) => collect_text_paths(nested, &path, out),
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_flat_schema_in_declaration_order() {
        let schema = Schema::parse(
            r#"{"summary": {"type": "text"}, "intent": {"type": "multilabel"}}"#,
        )
        .unwrap();
        let names: Vec<&str> = schema.fields.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["summary", "intent"]);
        assert_eq!(schema.fields["intent"], FieldDescriptor::multilabel());
    }

    #[test]
    fn parses_nested_repeated_record() {
        let schema = Schema::parse(
            r#"{
                "spans": {
                    "type": "record",
                    "repeated": true,
                    "useMap": true,
                    "fields": {"label": {"type": "multilabel"}, "note": {"type": "text", "optional": true}}
                },
                "comments": {"type": "text", "repeated": true}
            }"#,
        )
        .unwrap();

        let expected = Schema::new()
            .with(
                "spans",
                FieldDescriptor::record(
                    Schema::new()
                        .with("label", FieldDescriptor::multilabel())
                        .with("note", FieldDescriptor::text().optional()),
                )
                .repeated(Repeat::Map),
            )
            .with(
                "comments",
                FieldDescriptor::text().repeated(Repeat::Sequence),
            );
        assert_eq!(schema, expected);
    }

    #[test]
    fn use_map_without_repeated_is_single() {
        let schema = Schema::parse(r#"{"a": {"type": "text", "useMap": true}}"#).unwrap();
        assert_eq!(schema.fields["a"].repeat, Repeat::Single);
    }

    #[test]
    fn unknown_types_are_dropped_not_fatal() {
        let schema = Schema::parse(
            r#"{"a": {"type": "slider"}, "b": {"type": "text"}, "c": 3, "d": {}}"#,
        )
        .unwrap();
        let names: Vec<&str> = schema.fields.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn non_object_schema_is_an_error() {
        let err = Schema::parse("[1, 2]").unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObject("an array")));
    }

    #[test]
    fn to_json_round_trips() {
        let schema = Schema::new()
            .with("intent", FieldDescriptor::multilabel())
            .with(
                "spans",
                FieldDescriptor::record(Schema::new().with("t", FieldDescriptor::text()))
                    .repeated(Repeat::Sequence),
            );
        let back = Schema::from_json(&schema.to_json()).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn schema_from_toml_table() {
        let table: toml::Table = toml::from_str(
            r#"
intent = { type = "multilabel" }
notes = { type = "text", repeated = true, useMap = true }
"#,
        )
        .unwrap();
        let schema = Schema::from_toml(&table).unwrap();
        assert_eq!(schema.fields["intent"], FieldDescriptor::multilabel());
        assert_eq!(schema.fields["notes"].repeat, Repeat::Map);
    }

    #[test]
    fn text_paths_descend_into_records() {
        let schema = Schema::new()
            .with("title", FieldDescriptor::text())
            .with("tags", FieldDescriptor::multilabel())
            .with(
                "meta",
                FieldDescriptor::record(Schema::new().with("note", FieldDescriptor::text())),
            );
        assert_eq!(schema.text_paths(), vec!["title", "meta.note"]);
    }
}

use serde::Serialize;

use crate::model::{FieldKind, Repeat, Schema};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CountJson {
    pub count: usize,
}

#[derive(Serialize)]
pub struct SearchJson<'a> {
    pub query: &'a str,
    pub matches: &'a [usize],
}

#[derive(Serialize)]
pub struct ExportJson {
    pub dir: String,
    pub written: usize,
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// One line per field, nested records indented under their parent:
/// `name  type[, repeated as map|list][, optional]`
pub fn format_schema(schema: &Schema) -> Vec<String> {
    let mut lines = Vec::new();
    push_schema_lines(schema, 0, &mut lines);
    lines
}

fn push_schema_lines(schema: &Schema, depth: usize, lines: &mut Vec<String>) {
    let width = schema.fields.keys().map(|k| k.len()).max().unwrap_or(0);
    for (name, desc) in &schema.fields {
        let mut detail = desc.kind.type_name().to_string();
        match desc.repeat {
            Repeat::Single => {}
            Repeat::Sequence => detail.push_str(", list"),
            Repeat::Map => detail.push_str(", map"),
        }
        if desc.optional {
            detail.push_str(", optional");
        }
        lines.push(format!(
            "{}{:<width$}  {}",
            "  ".repeat(depth),
            name,
            detail,
            width = width
        ));
        if let FieldKind::Record(nested) = &desc.kind {
            push_schema_lines(nested, depth + 1, lines);
        }
    }
}

/// Indices as a single line, or a note when there are none
pub fn format_matches(matches: &[usize]) -> String {
    if matches.is_empty() {
        return "no matches".to_string();
    }
    matches
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

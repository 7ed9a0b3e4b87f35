//! Query language for searching items served from a local file.
//!
//! A query is a space-separated list of conditions, all of which must hold:
//!
//! - `term`: substring match against any text field
//! - `field:value`: exact match on a dotted path. A list matches if any
//!   element does, and `*` matches any present value
//! - a leading `!` negates a condition
//! - double quotes group text containing spaces or colons

use serde_json::Value;

use crate::model::Record;

/// Error type for query parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid condition {0:?}: expected `term` or `field:value`")]
    InvalidCondition(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Test {
    /// Substring of any text field
    Term(String),
    /// Exact value at a dotted path
    Field { path: Vec<String>, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Condition {
    negate: bool,
    test: Test,
}

/// A parsed query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    conditions: Vec<Condition>,
}

/// Split on `delimiter`, ignoring delimiters inside double quotes
fn smart_split(text: &str, delimiter: char, trim_quotes: bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in text.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            current.push(c);
        } else if c == delimiter && !in_quotes {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);

    if trim_quotes {
        for part in &mut parts {
            if part.len() >= 2 && part.starts_with('"') && part.ends_with('"') {
                *part = part[1..part.len() - 1].to_string();
            }
        }
    }
    parts
}

impl Query {
    pub fn parse(query: &str) -> Result<Query, QueryError> {
        let mut conditions = Vec::new();
        for raw in smart_split(query, ' ', false) {
            if raw.is_empty() {
                continue;
            }
            let (negate, body) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.as_str()),
            };
            let parts = smart_split(body, ':', true);
            let test = match parts.as_slice() {
                [term] => Test::Term(term.clone()),
                [field, value] => Test::Field {
                    path: field.split('.').map(str::to_string).collect(),
                    value: value.clone(),
                },
                _ => return Err(QueryError::InvalidCondition(raw.clone())),
            };
            conditions.push(Condition { negate, test });
        }
        Ok(Query { conditions })
    }

    /// Whether `record` satisfies every condition. `text_fields` are the
    /// dotted paths bare terms are matched against.
    pub fn matches(&self, record: &Record, text_fields: &[String]) -> bool {
        let root = Value::Object(record.clone());
        self.conditions.iter().all(|cond| {
            let hit = match &cond.test {
                Test::Term(term) => text_fields.iter().any(|field| {
                    let path: Vec<&str> = field.split('.').collect();
                    check_path(&root, &path, term, &|sv, tv| match tv {
                        Value::String(s) => s.contains(sv),
                        _ => false,
                    })
                }),
                Test::Field { path, value } => {
                    let path: Vec<&str> = path.iter().map(|s| s.as_str()).collect();
                    check_path(&root, &path, value, &|sv, tv| value_text(tv) == sv)
                }
            };
            hit != cond.negate
        })
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn check_path(
    elem: &Value,
    path: &[&str],
    search: &str,
    check: &dyn Fn(&str, &Value) -> bool,
) -> bool {
    let Some((head, rest)) = path.split_first() else {
        if search == "*" {
            return !elem.is_null();
        }
        return check(search, elem);
    };
    let Some(child) = elem.as_object().and_then(|obj| obj.get(*head)) else {
        return false;
    };
    match child {
        Value::Null => false,
        Value::Array(items) => items.iter().any(|v| check_path(v, rest, search, check)),
        other => check_path(other, rest, search, check),
    }
}

/// Indices of records matching `query`, in file order
pub fn find_indices(
    records: &[Record],
    query: &str,
    text_fields: &[String],
) -> Result<Vec<usize>, QueryError> {
    let parsed = Query::parse(query)?;
    tracing::debug!(conditions = parsed.conditions.len(), "running local search");
    Ok(records
        .iter()
        .enumerate()
        .filter(|(_, r)| parsed.matches(r, text_fields))
        .map(|(i, _)| i)
        .collect())
}

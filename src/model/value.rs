use serde_json::{Map, Value};

/// One item as exchanged with the backend: field name → value
pub type Record = Map<String, Value>;

/// Key carrying the zero-based item index in `/update/` payloads
pub const INDEX_KEY: &str = "_idx";

/// Delimiter used when joining tokens back into an editable string
pub const TOKEN_SEPARATOR: &str = ", ";

/// Split an editable string into its tokens.
///
/// Every editable field (text as well as multilabel) is normalized this way:
/// split on `,`, trim each piece, drop empty pieces. Order is preserved and
/// duplicates are kept.
pub fn split_tokens(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join tokens for display
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(TOKEN_SEPARATOR)
}

/// The token currently being typed: everything after the last comma, with
/// leading whitespace removed.
pub fn last_token(input: &str) -> &str {
    match input.rfind(',') {
        Some(pos) => input[pos + 1..].trim_start(),
        None => input.trim_start(),
    }
}

/// Replace the token being typed with `choice` and leave the input ready
/// for the next token (`"a, b, "`).
pub fn replace_last_token(input: &str, choice: &str) -> String {
    let head = match input.rfind(',') {
        Some(pos) => &input[..pos],
        None => "",
    };
    let mut tokens = split_tokens(head);
    tokens.push(choice.to_string());
    let mut out = join_tokens(&tokens);
    out.push_str(TOKEN_SEPARATOR);
    out
}

/// Render a stored value as the text shown in an editable field.
///
/// Strings are shown verbatim, lists are joined, anything else absent is
/// shown as empty. Numbers and booleans are shown through their JSON form.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            join_tokens(&parts)
        }
        other => other.to_string(),
    }
}

/// Value of a field after parsing, as sent back to the backend
pub fn tokens_value(tokens: Vec<String>) -> Value {
    Value::Array(tokens.into_iter().map(Value::String).collect())
}

/// True when a value carries no annotation (null, empty string/list/object)
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_blank),
        Value::Object(map) => map.values().all(is_blank),
        _ => false,
    }
}

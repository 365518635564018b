//! JSON parameter values → Python expression strings.

use serde_json::Value;

/// Name of the inbound event inside every generated handler.
pub const EVENT: &str = "message";

/// Quote `s` as a single-quoted Python string literal.
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// A JSON value as a Python literal (`True`, `None`, lists, dicts).
pub fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_str(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let parts: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", py_str(k), py_literal(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

/// `.chat.id` → `message.chat.id`. Only dotted identifier paths qualify.
pub fn event_expr(s: &str) -> Option<String> {
    let path = s.strip_prefix('.')?;
    if path.split('.').all(is_identifier) {
        Some(format!("{}.{}", EVENT, path))
    } else {
        None
    }
}

/// A parameter value as spliced into generated code: expression-sentinel
/// strings become event attribute access, other strings are quoted, and
/// everything else is a literal.
pub fn py_value(value: &Value) -> String {
    match value {
        Value::String(s) => event_expr(s).unwrap_or_else(|| py_str(s)),
        other => py_literal(other),
    }
}

/// Empty parameters are omitted from generated calls.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Reserved words that cannot name a keyword argument.
pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

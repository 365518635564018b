//! Emit outgoing platform actions: `await bot.<method>(<kwargs>)`.
//!
//! The method name is the snake_case form of the kind tag. Keyword arguments
//! come from the non-empty parameters minus the bookkeeping fields, in sorted
//! key order, then `reply_markup`, then rewritten file references.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::CompilerError;
use crate::parse::types::{NodeKind, NodeRecord};

use super::literal::{EVENT, is_empty_value, is_identifier, is_keyword, py_str, py_value};
use super::markup::emit_markup;
use super::naming::{camel_to_snake, handler_name};
use super::writer::CodeWriter;
use super::{EmitContext, Fragment, Resolved, emit_dispatch, open_handler};

/// Record fields that never become call arguments.
const EXCLUDED_PARAMS: &[&str] = &[
    "id",
    "bot",
    "component_type",
    "kind",
    "previous",
    "next",
    "position",
    "position_x",
    "position_y",
    "markup",
    "created_at",
    "updated_at",
];

pub fn emit_action(
    node: &NodeRecord,
    kind: &NodeKind,
    tag: &str,
    successors: &[Resolved<'_>],
    ctx: &EmitContext<'_>,
) -> Result<Fragment, CompilerError> {
    let method = camel_to_snake(tag);

    let mut kwargs: BTreeMap<&str, String> = BTreeMap::new();
    let mut files: BTreeMap<&str, String> = BTreeMap::new();
    for (key, value) in &node.parameters {
        if EXCLUDED_PARAMS.contains(&key.as_str()) || is_empty_value(value) {
            continue;
        }
        if !is_identifier(key) || is_keyword(key) {
            return Err(CompilerError::emit(
                "E004",
                format!("Parameter '{}' of {} is not a valid argument name", key, tag),
                Some(node.id.0),
            ));
        }
        if key == "reply_markup" && node.markup.is_some() {
            return Err(CompilerError::emit(
                "E004",
                format!(
                    "{} sets 'reply_markup' and also has a keyboard; keep only one",
                    tag
                ),
                Some(node.id.0),
            ));
        }
        match file_reference(value) {
            Some(path) => {
                files.insert(key.as_str(), py_str(&file_url(ctx.base_url, path)));
            }
            None => {
                kwargs.insert(key.as_str(), py_value(value));
            }
        }
    }
    if method.starts_with("send_") && !kwargs.contains_key("chat_id") {
        kwargs.insert("chat_id", format!("{}.chat.id", EVENT));
    }

    let mut args: Vec<String> = kwargs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    let mut auxiliary = Vec::new();
    if let Some(markup) = &node.markup {
        let keyboard = emit_markup(node, markup, ctx)?;
        args.push(format!("reply_markup={}", keyboard.primary));
        auxiliary = keyboard.auxiliary;
    }
    args.extend(files.into_iter().map(|(k, v)| format!("{}={}", k, v)));

    let mut w = CodeWriter::new();
    open_handler(&mut w, &handler_name(kind, node.id));
    w.line(&format!("await bot.{}({})", method, args.join(", ")));
    emit_dispatch(&mut w, successors);
    w.block_close();

    Ok(Fragment {
        primary: w.finish(),
        auxiliary,
    })
}

/// `{"file": "<path>"}` marks an uploaded file stored by the backend.
fn file_reference(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map.get("file").and_then(Value::as_str),
        _ => None,
    }
}

fn file_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}/{}", base_url, path.trim_start_matches('/'))
    }
}

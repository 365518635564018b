//! Emit `Switch`: evaluate one expression and branch on its value.
//!
//! Branch `i` pairs `parameters.values[i]` with the `i`-th successor; a value
//! with no case falls through to `case _:`.

use serde_json::Value;

use crate::error::CompilerError;
use crate::parse::types::{NodeKind, NodeRecord};

use super::literal::{event_expr, py_literal, py_str};
use super::naming::handler_name;
use super::writer::CodeWriter;
use super::{Fragment, Resolved, open_handler};

/// Without an `expression` parameter a switch branches on the message text.
const DEFAULT_EXPRESSION: &str = ".text";

pub fn emit_switch(
    node: &NodeRecord,
    kind: &NodeKind,
    successors: &[Resolved<'_>],
) -> Result<Fragment, CompilerError> {
    let values = branch_values(node)?;
    if values.len() != successors.len() {
        return Err(CompilerError::emit(
            "E001",
            format!(
                "Switch has {} value(s) but {} successor(s)",
                values.len(),
                successors.len()
            ),
            Some(node.id.0),
        ));
    }

    let subject = subject_expr(node)?;

    let mut w = CodeWriter::new();
    open_handler(&mut w, &handler_name(kind, node.id));
    w.line(&format!("value = {}", subject));
    w.block_open("match value");
    for (value, successor) in values.iter().zip(successors) {
        w.block_open(&format!("case {}", py_literal(value)));
        w.line(&format!("await {}(message, state)", successor.handler));
        w.block_close();
    }
    w.block_open("case _");
    w.line("pass");
    w.block_close();
    w.block_close();
    w.block_close();
    Ok(Fragment::primary(w.finish()))
}

fn branch_values(node: &NodeRecord) -> Result<&[Value], CompilerError> {
    match node.param("values") {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(CompilerError::emit(
            "E004",
            format!("Parameter 'values' of Switch must be an array, found {}", other),
            Some(node.id.0),
        )),
    }
}

/// `.path` reads the event; anything else reads a key of the state data.
fn subject_expr(node: &NodeRecord) -> Result<String, CompilerError> {
    let expression = node
        .param_str("expression")?
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_EXPRESSION);
    Ok(match event_expr(expression) {
        Some(expr) => expr,
        None => format!("(await state.get_data()).get({})", py_str(expression)),
    })
}

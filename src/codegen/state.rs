//! Emit conversation-state mutations: `SetState` and `SetData`.

use serde_json::Value;

use crate::error::CompilerError;
use crate::parse::types::{NodeKind, NodeRecord};

use super::literal::{py_str, py_value};
use super::naming::handler_name;
use super::writer::CodeWriter;
use super::{Fragment, Resolved, emit_dispatch, open_handler};

/// `await state.set_state('<state>')`; an absent state resets to `None`.
pub fn emit_set_state(
    node: &NodeRecord,
    kind: &NodeKind,
    successors: &[Resolved<'_>],
) -> Result<Fragment, CompilerError> {
    let target = match node.param_str("state")? {
        Some(state) if !state.is_empty() => py_str(state),
        _ => "None".to_string(),
    };

    let mut w = CodeWriter::new();
    open_handler(&mut w, &handler_name(kind, node.id));
    w.line(&format!("await state.set_state({})", target));
    emit_dispatch(&mut w, successors);
    w.block_close();
    Ok(Fragment::primary(w.finish()))
}

/// `await state.update_data({'<key>': <value>})`.
pub fn emit_set_data(
    node: &NodeRecord,
    kind: &NodeKind,
    successors: &[Resolved<'_>],
) -> Result<Fragment, CompilerError> {
    let key = match node.param_str("key")? {
        Some(key) if !key.is_empty() => key,
        _ => {
            return Err(CompilerError::emit(
                "E004",
                "Parameter 'key' of SetData must be a non-empty string",
                Some(node.id.0),
            ));
        }
    };
    let value = py_value(node.param("value").unwrap_or(&Value::Null));

    let mut w = CodeWriter::new();
    open_handler(&mut w, &handler_name(kind, node.id));
    w.line(&format!("await state.update_data({{{}: {}}})", py_str(key), value));
    emit_dispatch(&mut w, successors);
    w.block_close();
    Ok(Fragment::primary(w.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: &str, parameters: &str) -> NodeRecord {
        serde_json::from_str(&format!(
            r#"{{"id": 9, "kind": "{}", "parameters": {}}}"#,
            kind, parameters
        ))
        .unwrap()
    }

    #[test]
    fn set_state_writes_state_name() {
        let n = node("SetState", r#"{"state": "menu"}"#);
        let fragment = emit_set_state(&n, &NodeKind::SetState, &[]).unwrap();
        assert_eq!(
            fragment.primary,
            "async def set_state_9(message: types.Message, state: FSMContext):\n    await state.set_state('menu')\n"
        );
    }

    #[test]
    fn set_state_without_name_resets() {
        let n = node("SetState", "{}");
        let fragment = emit_set_state(&n, &NodeKind::SetState, &[]).unwrap();
        assert!(fragment.primary.contains("await state.set_state(None)"));
    }

    #[test]
    fn set_data_splices_event_expressions() {
        let n = node("SetData", r#"{"key": "name", "value": ".text"}"#);
        let fragment = emit_set_data(&n, &NodeKind::SetData, &[]).unwrap();
        assert!(fragment
            .primary
            .contains("await state.update_data({'name': message.text})"));

        let n = node("SetData", r#"{"key": "count", "value": 3}"#);
        let fragment = emit_set_data(&n, &NodeKind::SetData, &[]).unwrap();
        assert!(fragment.primary.contains("await state.update_data({'count': 3})"));
    }

    #[test]
    fn set_data_requires_key() {
        let n = node("SetData", r#"{"value": 1}"#);
        let err = emit_set_data(&n, &NodeKind::SetData, &[]).unwrap_err();
        assert_eq!(err.code, "E004");
    }
}

//! Emit `OnMessage` triggers: a `@dp.message(...)` registration whose filters
//! come from the node parameters, followed by dispatch to every successor.

use crate::error::CompilerError;
use crate::parse::types::{NodeKind, NodeRecord};

use super::literal::py_str;
use super::naming::handler_name;
use super::writer::CodeWriter;
use super::{Fragment, Resolved, emit_dispatch, open_handler};

/// Message filters derived from trigger parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerFilters {
    pub text: Option<String>,
    pub case_sensitive: bool,
    pub regex: bool,
    pub states: Vec<String>,
}

impl TriggerFilters {
    pub fn from_node(node: &NodeRecord) -> Result<Self, CompilerError> {
        let text = node
            .param_str("text")?
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let states = node
            .param_str("states")?
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            text,
            case_sensitive: node.param_bool("case_sensitive", true)?,
            regex: node.param_bool("regex", false)?,
            states,
        })
    }

    /// Filter expressions in decorator order: text first, then state.
    pub fn expressions(&self) -> Vec<String> {
        let mut filters = Vec::new();
        if let Some(text) = &self.text {
            filters.push(match (self.regex, self.case_sensitive) {
                (true, true) => format!("F.text.regexp({})", py_str(text)),
                (true, false) => format!("F.text.regexp({})", py_str(&format!("(?i){}", text))),
                (false, true) => format!("F.text == {}", py_str(text)),
                (false, false) => format!("F.text.lower() == {}", py_str(&text.to_lowercase())),
            });
        }
        if !self.states.is_empty() {
            let states: Vec<String> = self.states.iter().map(|s| py_str(s)).collect();
            filters.push(format!("StateFilter({})", states.join(", ")));
        }
        filters
    }
}

pub fn emit_trigger(
    node: &NodeRecord,
    kind: &NodeKind,
    successors: &[Resolved<'_>],
) -> Result<Fragment, CompilerError> {
    let filters = TriggerFilters::from_node(node)?;
    if successors.is_empty() {
        log::debug!("trigger {} has no successors; nothing to register", node.id);
        return Ok(Fragment::empty());
    }

    let mut w = CodeWriter::new();
    w.line(&format!("@dp.message({})", filters.expressions().join(", ")));
    open_handler(&mut w, &handler_name(kind, node.id));
    if !filters.states.is_empty() {
        w.line("await state.clear()");
    }
    emit_dispatch(&mut w, successors);
    w.block_close();
    Ok(Fragment::primary(w.finish()))
}

//! Code emitters: component node → Python fragment for an aiogram bot.
//!
//! Public API: `emit_node(node, ctx) -> Fragment`. The emitter is selected by
//! matching on [`NodeKind`]; successors are resolved to their handler names
//! before the emitter runs.

mod action;
mod code;
pub mod literal;
mod markup;
pub mod naming;
mod state;
mod switch;
pub mod template;
mod trigger;
pub mod writer;

use crate::error::CompilerError;
use crate::format::SourceFormatter;
use crate::parse::graph::ComponentGraph;
use crate::parse::types::{NodeId, NodeKind, NodeRecord};
use literal::EVENT;
use writer::CodeWriter;

/// Generated code for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    /// The node's handler function (or, for markup, the keyboard expression).
    pub primary: String,
    /// Extra top-level declarations such as callback registrations.
    pub auxiliary: Vec<String>,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn primary(primary: String) -> Self {
        Self {
            primary,
            auxiliary: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.auxiliary.is_empty()
    }
}

/// Collaborators shared by all emitters during one compile.
pub struct EmitContext<'a> {
    pub graph: &'a ComponentGraph,
    pub formatter: &'a dyn SourceFormatter,
    /// Base URL without a trailing slash.
    pub base_url: &'a str,
}

/// A successor node resolved to the handler that runs it.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    pub node: &'a NodeRecord,
    pub handler: String,
}

impl<'a> EmitContext<'a> {
    pub fn resolve(&self, id: NodeId, referrer: NodeId) -> Result<Resolved<'a>, CompilerError> {
        let node = self.graph.node(id).ok_or_else(|| {
            CompilerError::emit(
                "E002",
                format!("Node {} references missing node {}", referrer, id),
                Some(referrer.0),
            )
        })?;
        let kind = kind_of(node)?;
        Ok(Resolved {
            node,
            handler: naming::handler_name(&kind, node.id),
        })
    }
}

/// Emit the fragment for a single node.
pub fn emit_node(node: &NodeRecord, ctx: &EmitContext<'_>) -> Result<Fragment, CompilerError> {
    let kind = kind_of(node)?;
    let successors = ctx
        .graph
        .successors(node.id)
        .into_iter()
        .map(|id| ctx.resolve(id, node.id))
        .collect::<Result<Vec<_>, _>>()?;

    if node.markup.is_some() && !matches!(kind, NodeKind::Action(_)) {
        log::debug!("markup on {} node {} is not rendered", node.kind, node.id);
    }

    match &kind {
        NodeKind::OnMessage => trigger::emit_trigger(node, &kind, &successors),
        NodeKind::Switch => switch::emit_switch(node, &kind, &successors),
        NodeKind::SetState => state::emit_set_state(node, &kind, &successors),
        NodeKind::SetData => state::emit_set_data(node, &kind, &successors),
        NodeKind::Code => code::emit_code(node, &kind, &successors, ctx.formatter),
        NodeKind::Action(tag) => action::emit_action(node, &kind, tag, &successors, ctx),
    }
}

fn kind_of(node: &NodeRecord) -> Result<NodeKind, CompilerError> {
    node.kind()
        .map_err(|e| CompilerError::emit("E003", e.message, e.node_id))
}

/// Open `async def <name>(message, state):` with the uniform handler signature.
fn open_handler(w: &mut CodeWriter, name: &str) {
    w.block_open(&format!(
        "async def {}({}: types.Message, state: FSMContext)",
        name, EVENT
    ));
}

/// Await every successor in order. Returns the number of calls written.
fn emit_dispatch(w: &mut CodeWriter, successors: &[Resolved<'_>]) -> usize {
    for successor in successors {
        w.line(&format!("await {}({}, state)", successor.handler, EVENT));
    }
    successors.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PythonNormalizer;
    use crate::parse::parse_and_build;

    #[test]
    fn dispatch_selects_emitter_by_kind() {
        let (_, graph) = parse_and_build(
            r#"{"id": 1, "token": "t", "nodes": [
                {"id": 1, "kind": "SetState", "parameters": {"state": "menu"}, "outgoing": [{"target": 2}]},
                {"id": 2, "kind": "SendMessage", "parameters": {"text": "Hi"}}
            ]}"#,
        )
        .unwrap();
        let formatter = PythonNormalizer::default();
        let ctx = EmitContext {
            graph: &graph,
            formatter: &formatter,
            base_url: "http://localhost",
        };

        let fragment = emit_node(graph.node(NodeId(1)).unwrap(), &ctx).unwrap();
        assert!(fragment.primary.starts_with("async def set_state_1("));
        assert!(fragment.primary.contains("await send_message_2(message, state)"));
    }

    #[test]
    fn unsupported_kind_is_an_emit_error() {
        let (_, graph) = parse_and_build(
            r#"{"id": 1, "token": "t", "nodes": [{"id": 1, "kind": "lower_case"}]}"#,
        )
        .unwrap();
        let formatter = PythonNormalizer::default();
        let ctx = EmitContext {
            graph: &graph,
            formatter: &formatter,
            base_url: "",
        };
        let err = emit_node(graph.node(NodeId(1)).unwrap(), &ctx).unwrap_err();
        assert_eq!(err.code, "E003");
        assert_eq!(err.node_id, Some(1));
    }
}

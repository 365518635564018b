//! Graph-level structural validation rules (V001–V006).

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::codegen::naming::callback_data;
use crate::error::CompilerError;
use crate::parse::graph::ComponentGraph;
use crate::parse::types::{MarkupType, NodeId, NodeKind};

/// Run all structural validation rules. Returns all errors found.
pub fn validate_structural(graph: &ComponentGraph) -> Vec<CompilerError> {
    let mut errors = Vec::new();

    v001_switch_arity(graph, &mut errors);
    v002_supported_kinds(graph, &mut errors);
    v003_switch_values_are_scalars(graph, &mut errors);
    v004_trigger_no_incoming(graph, &mut errors);
    v005_unique_callback_data(graph, &mut errors);
    v006_unique_reply_buttons(graph, &mut errors);

    if graph.has_cycle() {
        log::warn!("component graph contains a cycle; revisits will be treated as already emitted");
    }

    errors
}

fn v001_switch_arity(graph: &ComponentGraph, errors: &mut Vec<CompilerError>) {
    for node in graph.nodes() {
        if node.kind != "Switch" {
            continue;
        }
        let values = match node.param("values") {
            Some(Value::Array(values)) => values.len(),
            None | Some(Value::Null) => 0,
            // Reported by V003.
            Some(_) => continue,
        };
        let successors = graph.successors(node.id).len();
        if values != successors {
            errors.push(CompilerError::validate(
                "V001",
                format!(
                    "Switch node {} has {} branch values but {} successors",
                    node.id, values, successors
                ),
                Some(node.id.0),
            ));
        }
    }
}

fn v002_supported_kinds(graph: &ComponentGraph, errors: &mut Vec<CompilerError>) {
    for node in graph.nodes() {
        if let Err(e) = node.kind() {
            errors.push(e);
        }
    }
}

fn v003_switch_values_are_scalars(graph: &ComponentGraph, errors: &mut Vec<CompilerError>) {
    for node in graph.nodes() {
        if node.kind != "Switch" {
            continue;
        }
        let valid = match node.param("values") {
            None | Some(Value::Null) => true,
            Some(Value::Array(values)) => values
                .iter()
                .all(|v| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))),
            Some(_) => false,
        };
        if !valid {
            errors.push(CompilerError::validate(
                "V003",
                format!(
                    "Switch node {} values must be a list of strings, numbers or booleans",
                    node.id
                ),
                Some(node.id.0),
            ));
        }
    }
}

fn v004_trigger_no_incoming(graph: &ComponentGraph, errors: &mut Vec<CompilerError>) {
    for node in graph.nodes() {
        if node.is_trigger() && graph.incoming_count(node.id) > 0 {
            errors.push(CompilerError::validate(
                "V004",
                format!("Trigger node {} must not have incoming edges", node.id),
                Some(node.id.0),
            ));
        }
    }
}

fn v005_unique_callback_data(graph: &ComponentGraph, errors: &mut Vec<CompilerError>) {
    for node in graph.nodes() {
        let Some(markup) = &node.markup else { continue };
        if markup.markup_type != MarkupType::Inline {
            continue;
        }
        let mut seen = HashSet::new();
        for cell in markup.rows.iter().flatten().filter(|c| c.target.is_some()) {
            let data = callback_data(node.id, &cell.text);
            if !seen.insert(data.clone()) {
                errors.push(CompilerError::validate(
                    "V005",
                    format!(
                        "Buttons of node {} collide on callback data '{}'",
                        node.id, data
                    ),
                    Some(node.id.0),
                ));
            }
        }
    }
}

/// Reply buttons register global text handlers, so a targeted text may
/// appear only once across all keyboards that are actually sent.
fn v006_unique_reply_buttons(graph: &ComponentGraph, errors: &mut Vec<CompilerError>) {
    let mut owners: HashMap<&str, NodeId> = HashMap::new();
    for node in graph.nodes() {
        if !matches!(node.kind(), Ok(NodeKind::Action(_))) {
            continue;
        }
        let Some(markup) = &node.markup else { continue };
        if markup.markup_type != MarkupType::Reply {
            continue;
        }
        for cell in markup.rows.iter().flatten().filter(|c| c.target.is_some()) {
            if let Some(first) = owners.insert(cell.text.as_str(), node.id) {
                errors.push(CompilerError::validate(
                    "V006",
                    format!(
                        "Reply button '{}' of node {} is already handled by a button of node {}",
                        cell.text, node.id, first
                    ),
                    Some(node.id.0),
                ));
            }
        }
    }
}

//! Program assembler: walks every trigger's reachable set, concatenates the
//! emitted fragments and renders them into one formatted source unit.

use std::collections::HashSet;

use crate::codegen::{self, EmitContext, template};
use crate::error::CompilerError;
use crate::format::SourceFormatter;
use crate::parse::graph::ComponentGraph;
use crate::parse::types::Bot;
use crate::settings::Settings;
use crate::validate;

/// A complete generated program for one bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub bot_id: u64,
    pub source: String,
    /// Node handlers emitted (auxiliary registrations not counted).
    pub handler_count: usize,
}

/// Separator between top-level declarations.
const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Assemble the program for `bot`.
///
/// Triggers are visited in ascending id order and each node is emitted at
/// most once across all of them, successors ahead of the node that calls
/// them.
pub fn assemble(
    bot: &Bot,
    graph: &ComponentGraph,
    formatter: &dyn SourceFormatter,
    settings: &Settings,
) -> Result<SourceUnit, CompilerError> {
    let base_url = settings.base_url();
    let ctx = EmitContext {
        graph,
        formatter,
        base_url,
    };

    let mut visited = HashSet::new();
    let mut pieces: Vec<String> = Vec::new();
    let mut handler_count = 0;

    for trigger in graph.triggers() {
        let order = graph.post_order(trigger, &mut visited);
        log::debug!("trigger {}: {} new node(s)", trigger, order.len());
        for id in order {
            let Some(node) = graph.node(id) else {
                continue;
            };
            let fragment = codegen::emit_node(node, &ctx)?;
            if fragment.is_empty() {
                continue;
            }
            if !fragment.primary.is_empty() {
                handler_count += 1;
                pieces.push(fragment.primary);
            }
            pieces.extend(fragment.auxiliary);
        }
    }

    let handlers = pieces.join(FRAGMENT_SEPARATOR);
    let program = template::render_program(&bot.token, base_url, &handlers);
    let source = formatter.format(&program).map_err(|e| {
        CompilerError::assemble("A001", format!("Generated program failed to format: {}", e))
    })?;

    log::info!(
        "assembled bot {}: {} handler(s), {} bytes",
        bot.id,
        handler_count,
        source.len()
    );
    Ok(SourceUnit {
        bot_id: bot.id,
        source,
        handler_count,
    })
}

/// Graph build, validation and assembly in phase order. Stops at the first
/// phase that reports errors.
pub fn compile(
    bot: &Bot,
    formatter: &dyn SourceFormatter,
    settings: &Settings,
) -> Result<SourceUnit, Vec<CompilerError>> {
    let graph = ComponentGraph::build(bot)?;

    let errors = validate::validate_graph(&graph);
    if !errors.is_empty() {
        return Err(errors);
    }

    assemble(bot, &graph, formatter, settings).map_err(|e| vec![e])
}

/// Parse and validate a bot document without emitting code.
pub fn check(json: &str) -> Vec<CompilerError> {
    let (_, graph) = match crate::parse::parse_and_build(json) {
        Ok(parsed) => parsed,
        Err(errors) => return errors,
    };
    validate::validate_graph(&graph)
}

/// [`compile`] starting from a JSON document.
pub fn compile_json(
    json: &str,
    formatter: &dyn SourceFormatter,
    settings: &Settings,
) -> Result<SourceUnit, Vec<CompilerError>> {
    let bot = crate::parse::parse(json)?;
    compile(&bot, formatter, settings)
}

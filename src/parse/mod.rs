//! Parse phase: JSON → Rust types + graph construction.

pub mod graph;
pub mod types;

pub use graph::{ComponentGraph, EdgeLabel};
pub use types::*;

use crate::error::CompilerError;

/// Deserialize a bot document JSON string into a `Bot` struct.
pub fn parse(json: &str) -> Result<Bot, Vec<CompilerError>> {
    serde_json::from_str::<Bot>(json).map_err(|e| {
        vec![CompilerError::parse(
            "P001",
            format!("Failed to parse bot JSON: {}", e),
            None,
        )]
    })
}

/// Parse JSON and build the graph in one step.
pub fn parse_and_build(json: &str) -> Result<(Bot, ComponentGraph), Vec<CompilerError>> {
    let bot = parse(json)?;
    let graph = ComponentGraph::build(&bot)?;
    Ok((bot, graph))
}

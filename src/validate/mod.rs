//! Graph-level validation phase (pre-emission).
//!
//! Validates the component graph before any code is generated.

pub mod structural;

use crate::error::CompilerError;
use crate::parse::graph::ComponentGraph;

/// Validate the entire component graph. Returns all errors found.
pub fn validate_graph(graph: &ComponentGraph) -> Vec<CompilerError> {
    structural::validate_structural(graph)
}

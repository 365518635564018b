//! Serde types for an exported bot document.
//!
//! The persistence layer stores one record per component; these types are the
//! read-only view the compiler consumes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CompilerError;

// =============================================================================
// IDENTIFIERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// TOP-LEVEL BOT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    pub id: u64,
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<NodeRecord>,
}

impl Bot {
    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub outgoing: Vec<EdgeRecord>,
    #[serde(default)]
    pub markup: Option<Markup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub target: NodeId,
}

// =============================================================================
// MARKUP
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Markup {
    #[serde(rename = "type")]
    pub markup_type: MarkupType,
    pub rows: Vec<Vec<MarkupCell>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupType {
    Inline,
    Reply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupCell {
    pub text: String,
    #[serde(default)]
    pub target: Option<NodeId>,
}

// =============================================================================
// NODE KINDS
// =============================================================================

/// Emitter selector resolved from a record's `kind` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    OnMessage,
    Switch,
    SetState,
    SetData,
    Code,
    /// Outgoing platform call; carries the original CamelCase tag.
    Action(String),
}

impl NodeKind {
    pub fn classify(tag: &str, node_id: NodeId) -> Result<Self, CompilerError> {
        let kind = match tag {
            "OnMessage" => NodeKind::OnMessage,
            "Switch" => NodeKind::Switch,
            "SetState" => NodeKind::SetState,
            "SetData" => NodeKind::SetData,
            "Code" => NodeKind::Code,
            other if is_action_tag(other) => NodeKind::Action(other.to_string()),
            other => {
                return Err(CompilerError::validate(
                    "V002",
                    format!("Unsupported component kind '{}'", other),
                    Some(node_id.0),
                ));
            }
        };
        Ok(kind)
    }

    pub fn tag(&self) -> &str {
        match self {
            NodeKind::OnMessage => "OnMessage",
            NodeKind::Switch => "Switch",
            NodeKind::SetState => "SetState",
            NodeKind::SetData => "SetData",
            NodeKind::Code => "Code",
            NodeKind::Action(tag) => tag,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, NodeKind::OnMessage)
    }
}

/// Platform actions are UpperCamelCase ASCII identifiers (`SendMessage`).
fn is_action_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

impl NodeRecord {
    pub fn kind(&self) -> Result<NodeKind, CompilerError> {
        NodeKind::classify(&self.kind, self.id)
    }

    pub fn is_trigger(&self) -> bool {
        self.kind == "OnMessage"
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// String parameter; `null` or absent reads as `None`, other types are an error.
    pub fn param_str(&self, key: &str) -> Result<Option<&str>, CompilerError> {
        match self.parameters.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.param_type_error(key, "a string", other)),
        }
    }

    pub fn param_bool(&self, key: &str, default: bool) -> Result<bool, CompilerError> {
        match self.parameters.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.param_type_error(key, "a boolean", other)),
        }
    }

    fn param_type_error(&self, key: &str, expected: &str, found: &Value) -> CompilerError {
        CompilerError::emit(
            "E004",
            format!(
                "Parameter '{}' of {} must be {}, found {}",
                key, self.kind, expected, found
            ),
            Some(self.id.0),
        )
    }
}

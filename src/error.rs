//! Unified compiler error type used across all phases, plus the error enums of
//! the formatter and deployment layers.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Validate,
    Emit,
    Assemble,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Parse => write!(f, "Parse"),
            Phase::Validate => write!(f, "Validate"),
            Phase::Emit => write!(f, "Emit"),
            Phase::Assemble => write!(f, "Assemble"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerError {
    pub code: String,
    pub phase: Phase,
    pub message: String,
    pub node_id: Option<u64>,
}

impl std::fmt::Display for CompilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_id {
            Some(id) => write!(
                f,
                "[{}:{}] {} (node {})",
                self.phase, self.code, self.message, id
            ),
            None => write!(f, "[{}:{}] {}", self.phase, self.code, self.message),
        }
    }
}

impl std::error::Error for CompilerError {}

impl CompilerError {
    pub fn parse(code: &str, message: impl Into<String>, node_id: Option<u64>) -> Self {
        CompilerError {
            code: code.into(),
            phase: Phase::Parse,
            message: message.into(),
            node_id,
        }
    }

    pub fn validate(code: &str, message: impl Into<String>, node_id: Option<u64>) -> Self {
        CompilerError {
            code: code.into(),
            phase: Phase::Validate,
            message: message.into(),
            node_id,
        }
    }

    pub fn emit(code: &str, message: impl Into<String>, node_id: Option<u64>) -> Self {
        CompilerError {
            code: code.into(),
            phase: Phase::Emit,
            message: message.into(),
            node_id,
        }
    }

    pub fn assemble(code: &str, message: impl Into<String>) -> Self {
        CompilerError {
            code: code.into(),
            phase: Phase::Assemble,
            message: message.into(),
            node_id: None,
        }
    }
}

/// Joins a batch of compiler errors into one human-readable message.
pub fn describe(errors: &[CompilerError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised by a [`crate::format::SourceFormatter`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: unbalanced bracket '{bracket}'")]
    UnbalancedBracket { line: usize, bracket: char },

    #[error("line {line}: {message}")]
    Indentation { line: usize, message: String },

    #[error("line {line}: expected an indented block")]
    ExpectedBlock { line: usize },

    #[error("line {line}: invalid syntax: {message}")]
    Syntax { line: usize, message: String },

    #[error("formatter command failed: {0}")]
    Command(String),
}

/// Failures of the container build/run backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("'{command}' did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Failures of a single deployment run. Converted into a
/// [`crate::deploy::DeploymentResult`] at the orchestrator boundary.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to load bot {bot_id}: {message}")]
    Load { bot_id: u64, message: String },

    #[error("compilation failed: {}", describe(.0))]
    Compile(Vec<CompilerError>),

    #[error("compile task failed: {0}")]
    CompileTask(#[from] tokio::task::JoinError),

    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Failures loading [`crate::settings::Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

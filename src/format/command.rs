//! External formatter invoked over stdin/stdout (e.g. `black -q -`).

use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::FormatError;

use super::SourceFormatter;

pub struct CommandFormatter {
    program: String,
    args: Vec<String>,
}

impl CommandFormatter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl SourceFormatter for CommandFormatter {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FormatError::Command(format!("failed to spawn {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(source.as_bytes())
                .map_err(|e| FormatError::Command(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| FormatError::Command(e.to_string()))?;

        if !output.status.success() {
            return Err(FormatError::Command(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        String::from_utf8(output.stdout).map_err(|e| FormatError::Command(e.to_string()))
    }
}

//! Emit `Code`: user-authored Python pasted into the handler body.
//!
//! The snippet runs through the injected formatter. When formatting fails the
//! original text is kept as comments so the rest of the bot still compiles.

use crate::error::CompilerError;
use crate::format::SourceFormatter;
use crate::parse::types::{NodeKind, NodeRecord};

use super::naming::handler_name;
use super::writer::CodeWriter;
use super::{Fragment, Resolved, emit_dispatch, open_handler};

pub fn emit_code(
    node: &NodeRecord,
    kind: &NodeKind,
    successors: &[Resolved<'_>],
    formatter: &dyn SourceFormatter,
) -> Result<Fragment, CompilerError> {
    let source = node.param_str("code")?.unwrap_or("");

    let mut w = CodeWriter::new();
    open_handler(&mut w, &handler_name(kind, node.id));

    let mut statements = 0;
    match formatter.format(source) {
        Ok(formatted) => {
            if !formatted.trim().is_empty() {
                w.lines(&formatted);
                statements += 1;
            }
        }
        Err(e) => {
            log::warn!("code node {}: formatting failed, body commented out: {}", node.id, e);
            let reason = e.to_string();
            let mut reason_lines = reason.lines();
            w.line(&format!(
                "# formatting failed: {}",
                reason_lines.next().unwrap_or_default().trim_end()
            ));
            for line in reason_lines.chain(source.lines()) {
                comment_out(&mut w, line);
            }
        }
    }

    statements += emit_dispatch(&mut w, successors);
    if statements == 0 {
        w.line("pass");
    }
    w.block_close();
    Ok(Fragment::primary(w.finish()))
}

fn comment_out(w: &mut CodeWriter, line: &str) {
    let line = line.trim_end();
    if line.is_empty() {
        w.line("#");
    } else {
        w.line(&format!("# {}", line));
    }
}

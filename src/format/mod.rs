//! Source formatting collaborators.
//!
//! Both the inline-code emitter and the program assembler format code through a
//! `&dyn SourceFormatter` handed to them by the caller.

mod command;
mod normalizer;

pub use command::CommandFormatter;
pub use normalizer::PythonNormalizer;

use crate::error::FormatError;
use crate::settings::FormatterSettings;

/// Deterministic formatter: the same input always yields the same output.
pub trait SourceFormatter: Send + Sync {
    fn format(&self, source: &str) -> Result<String, FormatError>;
}

/// Build the formatter selected by the settings. An external command takes
/// precedence over the built-in normalizer.
pub fn from_settings(settings: &FormatterSettings) -> Box<dyn SourceFormatter> {
    match settings.command.split_first() {
        Some((program, args)) => Box::new(CommandFormatter::new(program.clone(), args.to_vec())),
        None => Box::new(PythonNormalizer::new(settings.tab_width)),
    }
}

//! Compiles visually authored chat-bot graphs into aiogram programs and deploys
//! them as containers.
//!
//! Pipeline: `parse` → `validate` → `codegen` (per node) → `assemble` →
//! `deploy`.

pub mod assemble;
pub mod codegen;
pub mod deploy;
pub mod error;
pub mod format;
pub mod parse;
pub mod settings;
pub mod validate;

pub use assemble::{SourceUnit, assemble, check, compile, compile_json};
pub use error::{CompilerError, Phase};
pub use settings::Settings;

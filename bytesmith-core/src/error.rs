//! Error kinds surfaced by the run console.
//!
//! Every variant is terminal to the current operation only. The session
//! renders each one as a console line before handing it back to the caller,
//! except `Cancelled`, which the stop that caused it has already announced.

use crate::language::Language;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Run command not supported for language: {0}")]
    UnsupportedLanguage(Language),

    #[error("Compilation errors:\n{details}")]
    Compile { details: String },

    #[error("Failed to run process `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No running process to send input.")]
    NoProcess,

    #[error("Already running a process! Stop it first.")]
    AlreadyRunning,

    #[error("Process is not reading its input; line dropped.")]
    InputBacklog,

    #[error("Build cancelled.")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid toolchain config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

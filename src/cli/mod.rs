//! CLI support for lox-lang
//!
//! Script execution and the interactive prompt, kept in the library so
//! they can be driven without spawning the binary.

mod repl;
mod script;

pub use repl::{Repl, repl_source, run_prompt};
pub use script::{ScriptOptions, check_source, run_script};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit code for malformed command-line usage.
pub const EXIT_USAGE: i32 = 64;
/// Exit code when lexing, parsing or resolution failed.
pub const EXIT_STATIC_ERROR: i32 = 65;
/// Exit code when execution stopped at a runtime error.
pub const EXIT_RUNTIME_ERROR: i32 = 70;
/// Exit code for I/O failures.
pub const EXIT_IO_ERROR: i32 = 74;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Could not read '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The script did not compile; the individual errors were already
    /// reported
    #[error("{count} error(s) found")]
    Static { count: usize },

    /// The script stopped at a runtime error, already reported
    #[error("runtime error")]
    Runtime,
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Read { .. } | CliError::Io(_) => EXIT_IO_ERROR,
            CliError::Static { .. } => EXIT_STATIC_ERROR,
            CliError::Runtime => EXIT_RUNTIME_ERROR,
        }
    }
}

//! Error reporting shared by every stage.
//!
//! Stages return typed errors; the interpreter forwards them to a
//! [`DiagnosticSink`]. The bundled [`Diagnostics`] collector keeps every
//! report and remembers whether a static or runtime error occurred, which is
//! all a front end needs to choose an exit code.

use std::fmt;

use thiserror::Error;
use tracing::{debug, error};

use crate::{
    ast::Location, evaluator::RuntimeError, lexer::LexError, parser::ParseError,
    resolver::ResolveError,
};

/// Any error that stops a program before it runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StaticError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl StaticError {
    pub fn location(&self) -> Location {
        match self {
            StaticError::Lex(err) => err.location(),
            StaticError::Parse(err) => err.location(),
            StaticError::Resolve(err) => err.location(),
        }
    }
}

/// Receiver for error reports.
pub trait DiagnosticSink {
    /// A lexical, syntax or resolution error.
    fn report_error(&mut self, location: Location, message: &str);

    /// An error raised while executing. Errors raised inside native
    /// functions have no location.
    fn report_runtime_error(&mut self, location: Option<Location>, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Static,
    Runtime,
}

/// A single recorded report.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Option<Location>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{location} Error: {}", self.message),
            None => write!(f, "Error: {}", self.message),
        }
    }
}

/// Collecting [`DiagnosticSink`].
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Removes and returns every recorded report, keeping the flags.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    /// Forgets all reports and flags. A REPL calls this between lines.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

impl DiagnosticSink for Diagnostics {
    fn report_error(&mut self, location: Location, message: &str) {
        debug!(%location, message, "static error");
        self.had_error = true;
        self.entries.push(Diagnostic {
            severity: Severity::Static,
            location: Some(location),
            message: message.to_string(),
        });
    }

    fn report_runtime_error(&mut self, location: Option<Location>, message: &str) {
        error!(?location, message, "runtime error");
        self.had_runtime_error = true;
        self.entries.push(Diagnostic {
            severity: Severity::Runtime,
            location,
            message: message.to_string(),
        });
    }
}

/// Reports a static error through `sink`.
pub fn report_static(sink: &mut dyn DiagnosticSink, err: &StaticError) {
    sink.report_error(err.location(), &err.to_string());
}

/// Reports a runtime error through `sink`.
pub fn report_runtime(sink: &mut dyn DiagnosticSink, err: &RuntimeError) {
    sink.report_runtime_error(err.location, &err.to_string());
}

//! Interactive prompt

use std::io::{self, BufRead, Write};

use super::CliError;
use crate::{
    Diagnostic, Diagnostics, Interpreter, InterpreterConfig, OutputSink, StdoutSink,
    diagnostics::Severity,
};

/// Turns one input line into a runnable program: a missing trailing `;` is
/// appended unless the line ends a block. Blank lines yield `None`.
pub fn repl_source(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.ends_with(';') || trimmed.ends_with('}') {
        Some(trimmed.to_string())
    } else {
        Some(format!("{trimmed};"))
    }
}

/// An interpreter session fed one line at a time.
///
/// Runtime errors are written to the output sink alongside printed values;
/// static errors are returned to the caller.
pub struct Repl {
    interpreter: Interpreter,
    diagnostics: Diagnostics,
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

impl Repl {
    pub fn new() -> Self {
        let config = InterpreterConfig {
            repl: true,
            ..InterpreterConfig::default()
        };
        Repl {
            interpreter: Interpreter::with_config(config),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Runs one line and returns its static error reports.
    pub fn eval_line(&mut self, line: &str, output: &mut dyn OutputSink) -> Vec<Diagnostic> {
        let Some(source) = repl_source(line) else {
            return Vec::new();
        };

        self.interpreter
            .run_with(&source, output, &mut self.diagnostics);
        let reports = self
            .diagnostics
            .drain()
            .into_iter()
            .filter(|report| report.severity == Severity::Static)
            .collect();
        self.diagnostics.reset();
        reports
    }
}

/// Reads lines from stdin until end of input. `interactive` controls the
/// `> ` prompt.
pub fn run_prompt(interactive: bool) -> Result<(), CliError> {
    let mut repl = Repl::new();
    let mut output = StdoutSink::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        if interactive {
            print!("> ");
            io::stdout().flush()?;
        }

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        for report in repl.eval_line(&line, &mut output) {
            eprintln!("{report}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_source_appends_semicolon() {
        assert_eq!(repl_source("print 1\n"), Some("print 1;".to_string()));
        assert_eq!(repl_source("var a = 2;"), Some("var a = 2;".to_string()));
        assert_eq!(
            repl_source("fun f() { return 1; }"),
            Some("fun f() { return 1; }".to_string())
        );
        assert_eq!(repl_source("   \n"), None);
    }

    #[test]
    fn test_session_keeps_declarations() {
        let mut repl = Repl::new();
        let mut output: Vec<String> = Vec::new();

        assert!(repl.eval_line("var greeting = \"hi\"", &mut output).is_empty());
        assert!(repl.eval_line("print greeting", &mut output).is_empty());
        assert_eq!(output, vec!["hi"]);
    }

    #[test]
    fn test_runtime_errors_go_to_output() {
        let mut repl = Repl::new();
        let mut output: Vec<String> = Vec::new();

        let reports = repl.eval_line("print -\"x\"", &mut output);
        assert!(reports.is_empty());
        assert_eq!(output, vec!["Operand must be a number."]);
    }

    #[test]
    fn test_static_errors_are_returned() {
        let mut repl = Repl::new();
        let mut output: Vec<String> = Vec::new();

        let reports = repl.eval_line("print (1", &mut output);
        assert_eq!(reports.len(), 1);
        assert!(output.is_empty());
    }
}

//! Run or check a script file

use std::fs;
use std::path::PathBuf;

use super::CliError;
use crate::{
    Diagnostics, Interpreter, RunStatus, Statement, StaticError, StdoutSink, diagnostics,
    output::to_tree, parse_program, resolver::Resolver,
};

/// Options for running a script
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    /// Path of the script to run
    pub script: PathBuf,
    /// Only lex, parse and resolve; don't execute
    pub syntax_only: bool,
    /// Print the syntax tree instead of executing
    pub print_ast: bool,
}

/// Lexes, parses and resolves `source` without running it.
pub fn check_source(source: &str) -> Result<Vec<Statement>, Vec<StaticError>> {
    let program = parse_program(source)?;
    Resolver::new()
        .resolve(&program)
        .map_err(|errors| errors.into_iter().map(StaticError::from).collect::<Vec<_>>())?;
    Ok(program)
}

/// Runs a script file. Printed output goes to stdout and every error report
/// to stderr.
pub fn run_script(options: &ScriptOptions) -> Result<(), CliError> {
    let source = fs::read_to_string(&options.script).map_err(|source| CliError::Read {
        path: options.script.clone(),
        source,
    })?;

    if options.syntax_only || options.print_ast {
        let program = check_source(&source).map_err(|errors| {
            let mut reports = Diagnostics::new();
            for err in &errors {
                diagnostics::report_static(&mut reports, err);
            }
            for report in reports.entries() {
                eprintln!("{report}");
            }
            CliError::Static {
                count: errors.len(),
            }
        })?;

        if options.print_ast {
            println!("{}", to_tree(&program));
        }
        return Ok(());
    }

    let mut interpreter = Interpreter::new();
    let mut output = StdoutSink::new();
    let mut reports = Diagnostics::new();
    let status = interpreter.run_with(&source, &mut output, &mut reports);

    for report in reports.entries() {
        eprintln!("{report}");
    }

    match status {
        RunStatus::Completed => Ok(()),
        RunStatus::StaticError => Err(CliError::Static {
            count: reports.entries().len(),
        }),
        RunStatus::RuntimeError => Err(CliError::Runtime),
    }
}

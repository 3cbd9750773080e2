//! A tree-walking interpreter for a Lox dialect with string interpolation,
//! a ternary operator, arrays returned by natives, and `break`/`continue`.
//!
//! The pipeline is [`Lexer`] → [`Parser`] (driven by an [`OperatorTable`]) →
//! [`Resolver`] → [`Interpreter`].
//!
//! ```
//! let outcome = lox_lang::run(r#"var a = 1; var b = 2; print "sum: ${a + b}";"#);
//! assert_eq!(outcome.outputs, vec!["sum: 3"]);
//! assert!(!outcome.had_compile_error);
//! ```
pub mod ast;
pub mod cli;
pub mod diagnostics;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod natives;
pub mod output;
pub mod parser;
pub mod precedence;
pub mod resolver;
mod stack;
pub mod value;

pub use ast::{Expr, Location, Statement, Token, TokenKind};
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, StaticError};
pub use evaluator::{
    Interpreter, InterpreterConfig, RunOutcome, RunStatus, RuntimeError, RuntimeErrorKind,
};
pub use lexer::{LexError, Lexer};
pub use output::{OutputSink, StdoutSink};
pub use parser::{ParseError, Parser};
pub use precedence::OperatorTable;
pub use resolver::{ResolveError, Resolver};
pub use value::Value;

/// Runs `source` in a fresh interpreter.
pub fn run(source: &str) -> RunOutcome {
    Interpreter::new().run(source)
}

/// Lexes and parses a whole program without resolving or running it.
pub fn parse_program(source: &str) -> Result<Vec<Statement>, Vec<StaticError>> {
    let scan = Lexer::new(source).scan_tokens();
    let mut errors: Vec<StaticError> = scan.errors.into_iter().map(StaticError::from).collect();

    let table = OperatorTable::standard();
    match Parser::new(scan.tokens, &table).parse() {
        Ok(program) if errors.is_empty() => Ok(program),
        Ok(_) => Err(errors),
        Err(parse_errors) => {
            errors.extend(parse_errors.into_iter().map(StaticError::from));
            Err(errors)
        }
    }
}

/// Lexes and parses a single expression spanning all of `source`.
pub fn parse_expression(source: &str) -> Result<Expr, Vec<StaticError>> {
    let scan = Lexer::new(source).scan_tokens();
    if !scan.errors.is_empty() {
        return Err(scan.errors.into_iter().map(StaticError::from).collect());
    }

    let table = OperatorTable::standard();
    Parser::new(scan.tokens, &table)
        .parse_expression()
        .map_err(|err| vec![StaticError::from(err)])
}

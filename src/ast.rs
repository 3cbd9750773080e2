//! # Lox - Abstract Syntax Tree
//!
//! This module defines the tokens and syntax tree shared by every stage of the
//! interpreter pipeline.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens and source locations produced by the lexer
//! - **[expressions]** - Expression nodes (literals, variables, operators, calls, templates)
//! - **[operators]** - Binary, logical and unary operator kinds
//! - **[statements]** - Statement nodes and function declarations
//!
//! ## Quick Start
//!
//! ```text
//! fun greet(name) { return "hello ${name}"; }
//! print greet("world");
//! ```
//!
//! ## String Templates
//!
//! A string containing `${ ... }` is parsed into an [`Expr::StringTemplate`]
//! whose parts alternate between literal segments and
//! [`Expr::TemplateLiteral`] nodes. A string without interpolation is a plain
//! [`Expr::Literal`].
//!
//! ## Variable Identity
//!
//! Every `Variable` and `Assign` node carries an [`ExprId`]. The resolver
//! records a `(distance, slot)` pair per id and the evaluator reads that
//! side table instead of looking names up at runtime.
pub mod expressions;
pub mod operators;
pub mod statements;
pub mod tokens;

pub use expressions::{Expr, ExprId, LiteralValue};
pub use operators::{BinOp, LogicalOp, UnaryOp};
pub use statements::{FunctionDecl, Statement};
pub use tokens::{Literal, Location, Token, TokenKind};

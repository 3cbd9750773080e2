use std::rc::Rc;

use crate::ast::{Expr, Token};

/// Statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Expression evaluated for its side effects
    Expression(Expr),

    /// Writes the stringified value to the output sink
    ///
    /// # Example
    /// ```text
    /// print "hello";
    /// ```
    Print(Expr),

    /// Variable declaration. Without an initializer the slot stays
    /// uninitialized until assigned.
    ///
    /// # Example
    /// ```text
    /// var total = 0;
    /// ```
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// `{ ... }`, introduces a scope
    Block(Vec<Statement>),

    If {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },

    /// `while` loop. `for` loops are desugared into this form, keeping their
    /// update clause in `increment` so it runs after every iteration,
    /// including one cut short by `continue`.
    While {
        condition: Expr,
        body: Box<Statement>,
        increment: Option<Expr>,
    },

    Break(Token),

    Continue(Token),

    /// Named function declaration
    Function(Rc<FunctionDecl>),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },
}

/// Function declaration.
///
/// Held behind an `Rc` so closures can keep the body alive without copying
/// the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    /// Parameter names; their order is the argument binding order
    pub params: Vec<Token>,
    pub body: Vec<Statement>,
}

use crate::ast::{BinOp, LogicalOp, Token, UnaryOp};

/// Identity of a `Variable` or `Assign` node.
///
/// The resolver keys its side table by this id; ids are unique across every
/// program parsed by one interpreter session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

/// Value of a literal expression.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Nil,
}

/// Abstract Syntax Tree node representing a parsed expression.
///
/// Nodes own their children; the tree is never shared or mutated after the
/// parser builds it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string, boolean or `nil` literal
    Literal(LiteralValue),

    /// Reference to a named variable
    ///
    /// # Example
    /// ```text
    /// count
    /// ```
    Variable { id: ExprId, name: Token },

    /// Assignment to a named variable. The target is always a bare name.
    ///
    /// # Example
    /// ```text
    /// count = count + 1
    /// ```
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Prefix operation (`-x`, `!x`)
    Unary {
        op: UnaryOp,
        operator: Token,
        right: Box<Expr>,
    },

    /// Arithmetic, comparison, equality and comma operations
    Binary {
        left: Box<Expr>,
        op: BinOp,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short-circuiting `and` / `or`
    ///
    /// The left operand is returned as-is when it decides the result (`or`
    /// with a truthy left, `and` with a falsy left). Otherwise the right
    /// operand is the result, except that it collapses to `false` when it is
    /// falsy or numeric zero. Conditions still treat `0` as truthy, so
    /// `nil or 0` is `false` while `0 or 2` is `0`.
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        operator: Token,
        right: Box<Expr>,
    },

    /// Conditional expression
    ///
    /// # Example
    /// ```text
    /// n > 0 ? "positive" : "other"
    /// ```
    Ternary {
        condition: Box<Expr>,
        question: Token,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Parenthesized expression
    Grouping(Box<Expr>),

    /// Function call
    ///
    /// `paren` is the closing `)`, used to locate runtime errors.
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// Array index (`items[0]`). `bracket` is the closing `]`.
    ArrayAccess {
        array: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
    },

    /// A single `${ ... }` embedded in a string
    TemplateLiteral(Box<Expr>),

    /// A string containing at least one interpolation
    ///
    /// Parts are literal segments and [`Expr::TemplateLiteral`] nodes in
    /// source order; evaluation concatenates their stringified values.
    ///
    /// # Example
    /// ```text
    /// "sum: ${a + b}!"
    /// ```
    StringTemplate(Vec<Expr>),
}

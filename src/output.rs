//! Output routing and syntax tree rendering.
//!
//! Print statements never write to stdout directly; they hand each line to an
//! [`OutputSink`] supplied by the caller, so a REPL, a script runner and a
//! test harness can each route output their own way.
//!
//! The tree printer renders parsed programs either compactly as
//! S-expressions or as an indented tree for debugging.
//!
//! # Examples
//!
//! ```
//! use lox_lang::output::{OutputSink, to_sexpr};
//! use lox_lang::parse_expression;
//!
//! let expr = parse_expression("1 + 2 * 3").unwrap();
//! assert_eq!(to_sexpr(&expr), "(+ 1 (* 2 3))");
//!
//! let mut lines: Vec<String> = Vec::new();
//! lines.print("hello");
//! assert_eq!(lines, vec!["hello".to_string()]);
//! ```

use std::io::{self, Write};

use crate::{
    ast::{Expr, LiteralValue, Statement},
    value::format_number,
};

/// Destination for printed lines.
pub trait OutputSink {
    /// Receives one printed line, without its trailing newline.
    fn print(&mut self, line: &str);
}

impl OutputSink for Vec<String> {
    fn print(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Writes each line to standard output and flushes it immediately.
#[derive(Debug)]
pub struct StdoutSink {
    stdout: io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        StdoutSink {
            stdout: io::stdout(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for StdoutSink {
    fn print(&mut self, line: &str) {
        let mut handle = self.stdout.lock();
        // A closed stdout is not the script's problem
        let _ = writeln!(handle, "{line}");
        let _ = handle.flush();
    }
}

/// Intermediate rendering tree shared by both output styles.
struct Node {
    label: String,
    children: Vec<Node>,
}

impl Node {
    fn leaf(label: impl Into<String>) -> Self {
        Node {
            label: label.into(),
            children: Vec::new(),
        }
    }

    fn branch(label: impl Into<String>, children: Vec<Node>) -> Self {
        Node {
            label: label.into(),
            children,
        }
    }
}

pub struct TreePrinter {
    pretty: bool,
}

impl TreePrinter {
    pub fn new(pretty: bool) -> Self {
        TreePrinter { pretty }
    }

    pub fn print_expr(&self, expr: &Expr) -> String {
        self.render(&expr_node(expr))
    }

    pub fn print_statement(&self, stmt: &Statement) -> String {
        self.render(&stmt_node(stmt))
    }

    /// Renders each statement on its own line (or block of lines).
    pub fn print_program(&self, statements: &[Statement]) -> String {
        statements
            .iter()
            .map(|stmt| self.print_statement(stmt))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render(&self, node: &Node) -> String {
        let mut out = String::new();
        if self.pretty {
            self.render_pretty(node, 0, &mut out);
        } else {
            self.render_compact(node, &mut out);
        }
        out
    }

    fn render_compact(&self, node: &Node, out: &mut String) {
        if node.children.is_empty() {
            out.push_str(&node.label);
            return;
        }
        out.push('(');
        out.push_str(&node.label);
        for child in &node.children {
            out.push(' ');
            self.render_compact(child, out);
        }
        out.push(')');
    }

    fn render_pretty(&self, node: &Node, depth: usize, out: &mut String) {
        if depth > 0 {
            out.push('\n');
            out.push_str(&self.indent(depth - 1));
            out.push_str("| ");
        }
        out.push_str(&node.label);
        for child in &node.children {
            self.render_pretty(child, depth + 1, out);
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }
}

fn literal_label(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Number(n) => format_number(*n),
        LiteralValue::String(s) => format!("{s:?}"),
        LiteralValue::Boolean(b) => b.to_string(),
        LiteralValue::Nil => "nil".to_string(),
    }
}

fn expr_node(expr: &Expr) -> Node {
    match expr {
        Expr::Literal(value) => Node::leaf(literal_label(value)),
        Expr::Variable { name, .. } => Node::leaf(&name.lexeme),
        Expr::Assign { name, value, .. } => {
            Node::branch("=", vec![Node::leaf(&name.lexeme), expr_node(value)])
        }
        Expr::Unary {
            operator, right, ..
        } => Node::branch(&operator.lexeme, vec![expr_node(right)]),
        Expr::Binary {
            left,
            operator,
            right,
            ..
        }
        | Expr::Logical {
            left,
            operator,
            right,
            ..
        } => Node::branch(&operator.lexeme, vec![expr_node(left), expr_node(right)]),
        Expr::Ternary {
            condition,
            then_branch,
            else_branch,
            ..
        } => Node::branch(
            "?:",
            vec![
                expr_node(condition),
                expr_node(then_branch),
                expr_node(else_branch),
            ],
        ),
        Expr::Grouping(inner) => Node::branch("group", vec![expr_node(inner)]),
        Expr::Call {
            callee, arguments, ..
        } => {
            let mut children = vec![expr_node(callee)];
            children.extend(arguments.iter().map(expr_node));
            Node::branch("call", children)
        }
        Expr::ArrayAccess { array, index, .. } => {
            Node::branch("index", vec![expr_node(array), expr_node(index)])
        }
        Expr::TemplateLiteral(inner) => Node::branch("${}", vec![expr_node(inner)]),
        Expr::StringTemplate(parts) => {
            Node::branch("template", parts.iter().map(expr_node).collect())
        }
    }
}

fn stmt_node(stmt: &Statement) -> Node {
    match stmt {
        Statement::Expression(expr) => Node::branch("expr", vec![expr_node(expr)]),
        Statement::Print(expr) => Node::branch("print", vec![expr_node(expr)]),
        Statement::Var { name, initializer } => {
            let mut children = vec![Node::leaf(&name.lexeme)];
            children.extend(initializer.iter().map(expr_node));
            Node::branch("var", children)
        }
        Statement::Block(statements) => {
            Node::branch("block", statements.iter().map(stmt_node).collect())
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut children = vec![expr_node(condition), stmt_node(then_branch)];
            children.extend(else_branch.iter().map(|stmt| stmt_node(stmt)));
            Node::branch("if", children)
        }
        Statement::While {
            condition,
            body,
            increment,
        } => {
            let mut children = vec![expr_node(condition), stmt_node(body)];
            children.extend(increment.iter().map(expr_node));
            Node::branch("while", children)
        }
        Statement::Break(_) => Node::leaf("break"),
        Statement::Continue(_) => Node::leaf("continue"),
        Statement::Function(decl) => {
            let params = decl
                .params
                .iter()
                .map(|param| Node::leaf(&param.lexeme))
                .collect();
            let mut children = vec![Node::leaf(&decl.name.lexeme), Node::branch("params", params)];
            children.extend(decl.body.iter().map(stmt_node));
            Node::branch("fun", children)
        }
        Statement::Return { value, .. } => {
            Node::branch("return", value.iter().map(expr_node).collect())
        }
    }
}

/// Renders an expression as a single-line S-expression.
pub fn to_sexpr(expr: &Expr) -> String {
    TreePrinter::new(false).print_expr(expr)
}

/// Renders a program as an indented tree, one node per line.
pub fn to_tree(statements: &[Statement]) -> String {
    TreePrinter::new(true).print_program(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_program;

    #[test]
    fn test_compact_statements() {
        let program = parse_program("var x = 1; while (x < 3) x = x + 1;").unwrap();
        let printer = TreePrinter::new(false);
        assert_eq!(printer.print_statement(&program[0]), "(var x 1)");
        assert_eq!(
            printer.print_statement(&program[1]),
            "(while (< x 3) (expr (= x (+ x 1))))"
        );
    }

    #[test]
    fn test_bare_keyword_statements() {
        let program = parse_program("while (true) { break; }").unwrap();
        assert_eq!(
            TreePrinter::new(false).print_program(&program),
            "(while true (block break))"
        );
    }

    #[test]
    fn test_pretty_tree() {
        let program = parse_program("print -a;").unwrap();
        assert_eq!(to_tree(&program), "print\n| -\n  | a");
    }
}

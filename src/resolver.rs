//! Static scope resolution.
//!
//! A single pass over the statement tree that gives every declared name a
//! slot in its lexical scope and records, for every `Variable` and `Assign`
//! node, how many scopes to walk outward and which slot to use. The
//! evaluator then reads and writes variables by position only.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{Expr, ExprId, FunctionDecl, Location, Statement, Token},
    stack::ensure_sufficient_stack,
};

/// Where a variable reference lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Number of environments to walk up from the current one
    pub distance: usize,
    pub slot: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Can't read local variable in its own initializer.")]
    SelfReference { name: String, location: Location },

    #[error("Can't return from top-level code.")]
    TopLevelReturn { location: Location },
}

impl ResolveError {
    pub fn location(&self) -> Location {
        match self {
            ResolveError::SelfReference { location, .. }
            | ResolveError::TopLevelReturn { location } => *location,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    slot: usize,
    defined: bool,
}

/// Names declared in one lexical scope.
///
/// Slots are handed out in declaration order and never reused; declaring a
/// name twice gives the second declaration a fresh slot.
#[derive(Debug, Clone, Default)]
pub struct ScopeFrame {
    names: HashMap<String, Binding>,
    next_slot: usize,
}

impl ScopeFrame {
    /// Number of slots handed out so far.
    pub fn len(&self) -> usize {
        self.next_slot
    }

    pub fn is_empty(&self) -> bool {
        self.next_slot == 0
    }

    /// Slot of the most recent declaration of `name`.
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).map(|binding| binding.slot)
    }

    fn declare(&mut self, name: &str) {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.names.insert(
            name.to_string(),
            Binding {
                slot,
                defined: false,
            },
        );
    }

    fn define(&mut self, name: &str) {
        if let Some(binding) = self.names.get_mut(name) {
            binding.defined = true;
        }
    }
}

/// Output of a successful resolution pass.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub resolutions: HashMap<ExprId, Resolution>,
    /// The outermost frame after the pass, including every top-level
    /// declaration the program made
    pub globals: ScopeFrame,
}

pub struct Resolver {
    scopes: Vec<ScopeFrame>,
    resolutions: HashMap<ExprId, Resolution>,
    errors: Vec<ResolveError>,
    function_depth: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// A resolver whose program starts with an empty top-level scope.
    pub fn new() -> Self {
        Self::with_globals(ScopeFrame::default())
    }

    /// A resolver that continues from the top-level scope of an earlier
    /// program, so its declarations stay visible.
    pub fn with_globals(globals: ScopeFrame) -> Self {
        Resolver {
            scopes: vec![globals],
            resolutions: HashMap::new(),
            errors: Vec::new(),
            function_depth: 0,
        }
    }

    pub fn resolve(mut self, statements: &[Statement]) -> Result<Resolved, Vec<ResolveError>> {
        for stmt in statements {
            self.resolve_statement(stmt);
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        debug!(resolutions = self.resolutions.len(), "resolved program");
        let globals = self.scopes.pop().unwrap_or_default();
        Ok(Resolved {
            resolutions: self.resolutions,
            globals,
        })
    }

    fn begin_scope(&mut self) {
        self.scopes.push(ScopeFrame::default());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.declare(&name.lexeme);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.define(&name.lexeme);
        }
    }

    fn resolve_statement(&mut self, stmt: &Statement) {
        ensure_sufficient_stack(|| match stmt {
            Statement::Expression(expr) | Statement::Print(expr) => self.resolve_expr(expr),
            Statement::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Statement::Block(statements) => {
                self.begin_scope();
                for stmt in statements {
                    self.resolve_statement(stmt);
                }
                self.end_scope();
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_statement(else_branch);
                }
            }
            Statement::While {
                condition,
                body,
                increment,
            } => {
                self.resolve_expr(condition);
                self.resolve_statement(body);
                if let Some(increment) = increment {
                    self.resolve_expr(increment);
                }
            }
            Statement::Break(_) | Statement::Continue(_) => {}
            Statement::Function(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl);
            }
            Statement::Return { keyword, value } => {
                if self.function_depth == 0 {
                    self.errors.push(ResolveError::TopLevelReturn {
                        location: keyword.location,
                    });
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
        })
    }

    /// Parameters and body share one scope; parameter slots are the
    /// argument positions.
    fn resolve_function(&mut self, decl: &FunctionDecl) {
        self.function_depth += 1;
        self.begin_scope();

        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_statement(stmt);
        }

        self.end_scope();
        self.function_depth -= 1;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        ensure_sufficient_stack(|| match expr {
            Expr::Literal(_) => {}
            Expr::Variable { id, name } => {
                let uninitialized = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.names.get(&name.lexeme))
                    .is_some_and(|binding| !binding.defined);
                if uninitialized {
                    self.errors.push(ResolveError::SelfReference {
                        name: name.lexeme.clone(),
                        location: name.location,
                    });
                }
                self.resolve_local(*id, name);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Grouping(inner) | Expr::TemplateLiteral(inner) => self.resolve_expr(inner),
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
            Expr::ArrayAccess { array, index, .. } => {
                self.resolve_expr(array);
                self.resolve_expr(index);
            }
            Expr::StringTemplate(parts) => {
                for part in parts {
                    self.resolve_expr(part);
                }
            }
        })
    }

    /// Records the innermost scope declaring `name`. Names found nowhere are
    /// left unresolved and looked up by name at runtime.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        let found = self
            .scopes
            .iter()
            .rev()
            .enumerate()
            .find_map(|(distance, scope)| {
                scope
                    .slot_of(&name.lexeme)
                    .map(|slot| Resolution { distance, slot })
            });

        if let Some(resolution) = found {
            self.resolutions.insert(id, resolution);
        }
    }
}

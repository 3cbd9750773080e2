use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    ast::{BinOp, Expr, ExprId, LiteralValue, Location, LogicalOp, Statement, Token, UnaryOp},
    diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, StaticError, report_runtime, report_static},
    environment::{EnvId, Environments, LookupError, Slot},
    lexer::Lexer,
    natives::{self, NativeError},
    output::{OutputSink, to_tree},
    parser::Parser,
    precedence::OperatorTable,
    resolver::{Resolution, Resolver, ScopeFrame},
    stack::ensure_sufficient_stack,
    value::{Callable, Function, Value, ValueType, format_number},
};

/// Errors raised while executing a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandNotNumber,

    #[error("Operands must be numbers.")]
    OperandsNotNumbers,

    #[error("Operands must be two numbers or two strings.")]
    InvalidAddition,

    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    /// Read of a slot declared without an initializer and never assigned
    #[error("Variable '{0}' used before initialization.")]
    Uninitialized(String),

    #[error("Cannot reassign native function '{0}'.")]
    NativeAssignment(String),

    #[error("Can only call functions.")]
    NotCallable,

    #[error("Expected {expected} arguments but got {found}.")]
    Arity { expected: usize, found: usize },

    /// `position` is 1-based
    #[error("Parameter {position} of '{function}' expected {expected} but got {found}.")]
    ArgumentType {
        function: String,
        position: usize,
        expected: ValueType,
        found: &'static str,
    },

    #[error("Can only index arrays.")]
    NotAnArray,

    #[error("Array index must be a whole number.")]
    InvalidIndex,

    #[error("Array index {index} out of bounds for length {len}.")]
    IndexOutOfBounds { index: String, len: usize },

    /// `break` or `continue` that is not inside a loop
    #[error("'{0}' outside of a loop.")]
    LoopControl(&'static str),

    #[error("Stack overflow.")]
    StackOverflow,

    #[error(transparent)]
    Native(#[from] NativeError),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub location: Option<Location>,
}

impl RuntimeError {
    fn at(kind: RuntimeErrorKind, location: Location) -> Self {
        RuntimeError {
            kind,
            location: Some(location),
        }
    }
}

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
enum Flow {
    Normal,
    Break(Location),
    Continue(Location),
    Return(Value),
}

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Nested user function calls allowed before `Stack overflow.`
    pub max_call_depth: usize,
    /// Interactive mode: runtime errors are also written to the output sink
    pub repl: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_call_depth: 10_000,
            repl: false,
        }
    }
}

/// How a call to [`Interpreter::run_with`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Lexing, parsing or resolution failed; nothing was executed
    StaticError,
    /// Execution stopped at a runtime error
    RuntimeError,
}

/// Everything one [`Interpreter::run`] produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    pub outputs: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub had_compile_error: bool,
    pub had_runtime_error: bool,
}

/// A persistent interpreter session.
///
/// Top-level declarations survive from one `run` to the next, so a REPL can
/// define a function on one line and call it on the next.
///
/// # Examples
///
/// ```
/// use lox_lang::Interpreter;
///
/// let mut interpreter = Interpreter::new();
/// interpreter.run("fun twice(n) { return n * 2; }");
/// let outcome = interpreter.run("print twice(21);");
/// assert_eq!(outcome.outputs, vec!["42"]);
/// ```
pub struct Interpreter {
    config: InterpreterConfig,
    operators: OperatorTable,
    envs: Environments,
    globals: EnvId,
    global_scope: ScopeFrame,
    resolutions: HashMap<ExprId, Resolution>,
    next_id: ExprId,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        let mut envs = Environments::new();
        let globals = envs.alloc(None);
        Interpreter {
            config,
            operators: OperatorTable::standard(),
            envs,
            globals,
            global_scope: ScopeFrame::default(),
            resolutions: HashMap::new(),
            next_id: ExprId(0),
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Number of environments still allocated, globals included.
    pub fn live_environments(&self) -> usize {
        self.envs.live_count()
    }

    /// Runs `source`, collecting printed lines and error reports.
    pub fn run(&mut self, source: &str) -> RunOutcome {
        let mut outputs = Vec::new();
        let mut diagnostics = Diagnostics::new();
        self.run_with(source, &mut outputs, &mut diagnostics);

        RunOutcome {
            outputs,
            had_compile_error: diagnostics.had_error(),
            had_runtime_error: diagnostics.had_runtime_error(),
            diagnostics: diagnostics.drain(),
        }
    }

    /// Runs `source`, printing to `output` and reporting errors to
    /// `diagnostics`.
    ///
    /// Static errors from every stage are reported together and prevent
    /// execution. A runtime error aborts the remaining top-level statements;
    /// declarations made before it stay in the session.
    pub fn run_with(
        &mut self,
        source: &str,
        output: &mut dyn OutputSink,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> RunStatus {
        let program = match self.compile(source) {
            Ok(program) => program,
            Err(errors) => {
                for err in &errors {
                    report_static(diagnostics, err);
                }
                return RunStatus::StaticError;
            }
        };

        let mut executor = Executor {
            envs: &mut self.envs,
            resolutions: &self.resolutions,
            global_scope: &self.global_scope,
            globals: self.globals,
            env: self.globals,
            call_depth: 0,
            max_call_depth: self.config.max_call_depth,
            output: &mut *output,
        };
        let result = executor.execute_program(&program);

        // Declarations skipped by a runtime error still own their slots
        self.envs.pad(self.globals, self.global_scope.len());
        // Between runs every reachable value lives in a global slot
        self.envs.sweep(&[self.globals]);

        match result {
            Ok(()) => RunStatus::Completed,
            Err(err) => {
                report_runtime(diagnostics, &err);
                if self.config.repl {
                    output.print(&err.to_string());
                }
                RunStatus::RuntimeError
            }
        }
    }

    /// Lexes, parses and resolves `source`. On success the resolutions and
    /// the updated top-level scope are committed to the session.
    fn compile(&mut self, source: &str) -> Result<Vec<Statement>, Vec<StaticError>> {
        let scan = Lexer::new(source).scan_tokens();
        debug!(tokens = scan.tokens.len(), errors = scan.errors.len(), "scanned source");
        let mut errors: Vec<StaticError> = scan.errors.into_iter().map(StaticError::from).collect();

        let mut parser = Parser::new(scan.tokens, &self.operators).with_first_id(self.next_id);
        let parsed = parser.parse();
        self.next_id = parser.next_id();

        let program = match parsed {
            Ok(program) => program,
            Err(parse_errors) => {
                errors.extend(parse_errors.into_iter().map(StaticError::from));
                return Err(errors);
            }
        };
        if !errors.is_empty() {
            return Err(errors);
        }
        debug!(statements = program.len(), "parsed program");
        trace!("syntax tree:\n{}", to_tree(&program));

        let resolved = Resolver::with_globals(self.global_scope.clone())
            .resolve(&program)
            .map_err(|errors| errors.into_iter().map(StaticError::from).collect::<Vec<_>>())?;

        self.resolutions.extend(resolved.resolutions);
        self.global_scope = resolved.globals;
        Ok(program)
    }
}

/// Per-run execution state borrowed from an [`Interpreter`].
struct Executor<'i> {
    envs: &'i mut Environments,
    resolutions: &'i HashMap<ExprId, Resolution>,
    global_scope: &'i ScopeFrame,
    globals: EnvId,
    /// Innermost environment of the code being executed
    env: EnvId,
    call_depth: usize,
    max_call_depth: usize,
    output: &'i mut dyn OutputSink,
}

impl Executor<'_> {
    fn execute_program(&mut self, program: &[Statement]) -> Result<(), RuntimeError> {
        for stmt in program {
            match self.execute(stmt)? {
                Flow::Normal | Flow::Return(_) => {}
                Flow::Break(location) => {
                    return Err(RuntimeError::at(RuntimeErrorKind::LoopControl("break"), location));
                }
                Flow::Continue(location) => {
                    return Err(RuntimeError::at(
                        RuntimeErrorKind::LoopControl("continue"),
                        location,
                    ));
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Statement) -> Result<Flow, RuntimeError> {
        ensure_sufficient_stack(|| match stmt {
            Statement::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
            Statement::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.output.print(&value.to_string());
                Ok(Flow::Normal)
            }
            Statement::Var { initializer, .. } => {
                let slot = match initializer {
                    Some(init) => Slot::Value(self.evaluate(init)?),
                    None => Slot::Undefined,
                };
                self.envs.define(self.env, slot);
                Ok(Flow::Normal)
            }
            Statement::Block(statements) => {
                let env = self.envs.alloc(Some(self.env));
                self.execute_block(statements, env)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::While {
                condition,
                body,
                increment,
            } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal | Flow::Continue(_) => {}
                        Flow::Break(_) => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Break(keyword) => Ok(Flow::Break(keyword.location)),
            Statement::Continue(keyword) => Ok(Flow::Continue(keyword.location)),
            Statement::Function(decl) => {
                self.envs.capture(self.env);
                let function = Function {
                    declaration: Rc::clone(decl),
                    closure: self.env,
                };
                let value = Value::Callable(Callable::Function(Rc::new(function)));
                self.envs.define(self.env, Slot::Value(value));
                Ok(Flow::Normal)
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        })
    }

    /// Runs `statements` inside `env`, then releases `env` unless a closure
    /// captured it.
    fn execute_block(&mut self, statements: &[Statement], env: EnvId) -> Result<Flow, RuntimeError> {
        let previous = mem::replace(&mut self.env, env);
        let result = self.execute_statements(statements);
        self.env = previous;
        self.envs.release(env);
        result
    }

    fn execute_statements(&mut self, statements: &[Statement]) -> Result<Flow, RuntimeError> {
        for stmt in statements {
            let flow = self.execute(stmt)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::String(s) => Value::string(s.as_str()),
                LiteralValue::Boolean(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),
            Expr::Variable { id, name } => self.lookup_variable(*id, name),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }
            Expr::Unary {
                op,
                operator,
                right,
            } => {
                let right = self.evaluate(right)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
                    UnaryOp::Negate => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::at(
                            RuntimeErrorKind::OperandNotNumber,
                            operator.location,
                        )),
                    },
                }
            }
            Expr::Binary {
                left,
                op,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                apply_binop(*op, left, right)
                    .map_err(|kind| RuntimeError::at(kind, operator.location))
            }
            Expr::Logical {
                left, op, right, ..
            } => {
                let left = self.evaluate(left)?;
                match op {
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    LogicalOp::And if !left.is_truthy() => Ok(Value::Bool(false)),
                    _ => {
                        let right = self.evaluate(right)?;
                        Ok(if keeps_logical_operand(&right) {
                            right
                        } else {
                            Value::Bool(false)
                        })
                    }
                }
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expr::Grouping(inner) | Expr::TemplateLiteral(inner) => self.evaluate(inner),
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }
                self.call(callee, args, paren.location)
            }
            Expr::ArrayAccess {
                array,
                bracket,
                index,
            } => {
                let array = self.evaluate(array)?;
                let index = self.evaluate(index)?;
                index_array(&array, &index).map_err(|kind| RuntimeError::at(kind, bracket.location))
            }
            Expr::StringTemplate(parts) => {
                let mut text = String::new();
                for part in parts {
                    text.push_str(&self.evaluate(part)?.to_string());
                }
                Ok(Value::string(text))
            }
        })
    }

    /// Reads a variable through its resolution, or by name for references
    /// the resolver left open: later top-level declarations, then natives.
    fn lookup_variable(&self, id: ExprId, name: &Token) -> Result<Value, RuntimeError> {
        let undefined = |err| {
            let kind = match err {
                LookupError::Uninitialized => RuntimeErrorKind::Uninitialized(name.lexeme.clone()),
                LookupError::Missing => RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()),
            };
            RuntimeError::at(kind, name.location)
        };

        if let Some(resolution) = self.resolutions.get(&id) {
            return self
                .envs
                .get_at(self.env, resolution.distance, resolution.slot)
                .map_err(undefined);
        }

        if let Some(slot) = self.global_scope.slot_of(&name.lexeme) {
            // Declared at top level but not reached yet
            return self
                .envs
                .get_at(self.globals, 0, slot)
                .map_err(|_| undefined(LookupError::Uninitialized));
        }

        match natives::lookup(&name.lexeme) {
            Some(native) => Ok(Value::Callable(Callable::Native(native))),
            None => Err(undefined(LookupError::Missing)),
        }
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let undefined =
            || RuntimeError::at(RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()), name.location);

        if let Some(resolution) = self.resolutions.get(&id) {
            return self
                .envs
                .assign_at(self.env, resolution.distance, resolution.slot, value)
                .map_err(|_| undefined());
        }

        if let Some(slot) = self.global_scope.slot_of(&name.lexeme) {
            return self
                .envs
                .assign_at(self.globals, 0, slot, value)
                .map_err(|_| undefined());
        }

        if natives::lookup(&name.lexeme).is_some() {
            return Err(RuntimeError::at(
                RuntimeErrorKind::NativeAssignment(name.lexeme.clone()),
                name.location,
            ));
        }
        Err(undefined())
    }

    fn call(&mut self, callee: Value, args: Vec<Value>, location: Location) -> Result<Value, RuntimeError> {
        let Value::Callable(callable) = callee else {
            return Err(RuntimeError::at(RuntimeErrorKind::NotCallable, location));
        };

        if args.len() != callable.arity() {
            return Err(RuntimeError::at(
                RuntimeErrorKind::Arity {
                    expected: callable.arity(),
                    found: args.len(),
                },
                location,
            ));
        }

        match callable {
            Callable::Native(native) => {
                let mismatch = native
                    .params
                    .iter()
                    .zip(&args)
                    .position(|(expected, arg)| !expected.accepts(arg));
                if let Some(index) = mismatch {
                    return Err(RuntimeError::at(
                        RuntimeErrorKind::ArgumentType {
                            function: native.name.to_string(),
                            position: index + 1,
                            expected: native.params[index],
                            found: args[index].type_name(),
                        },
                        location,
                    ));
                }

                trace!(native = native.name, args = args.len(), "calling native");
                (native.func)(&args).map_err(|err| RuntimeError {
                    kind: err.into(),
                    location: None,
                })
            }
            Callable::Function(function) => self.call_function(&function, args, location),
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        args: Vec<Value>,
        location: Location,
    ) -> Result<Value, RuntimeError> {
        if self.call_depth >= self.max_call_depth {
            return Err(RuntimeError::at(RuntimeErrorKind::StackOverflow, location));
        }

        let env = self.envs.alloc(Some(function.closure));
        for arg in args {
            self.envs.define(env, Slot::Value(arg));
        }

        self.call_depth += 1;
        let result = self.execute_block(&function.declaration.body, env);
        self.call_depth -= 1;

        match result? {
            Flow::Normal => Ok(Value::Nil),
            Flow::Return(value) => Ok(value),
            Flow::Break(location) => Err(RuntimeError::at(
                RuntimeErrorKind::LoopControl("break"),
                location,
            )),
            Flow::Continue(location) => Err(RuntimeError::at(
                RuntimeErrorKind::LoopControl("continue"),
                location,
            )),
        }
    }
}

/// Whether the right operand of `and`/`or` is returned as is. Falsy values
/// and numeric zero collapse to `false`.
fn keeps_logical_operand(value: &Value) -> bool {
    value.is_truthy() && value.as_number() != Some(0.0)
}

fn number_operands(left: &Value, right: &Value) -> Result<(f64, f64), RuntimeErrorKind> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeErrorKind::OperandsNotNumbers),
    }
}

fn apply_binop(op: BinOp, left: Value, right: Value) -> Result<Value, RuntimeErrorKind> {
    let value = match op {
        BinOp::Comma => right,
        BinOp::Equal => Value::Bool(left == right),
        BinOp::NotEqual => Value::Bool(left != right),
        BinOp::Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::string(format!("{a}{b}")),
            (Value::String(a), Value::Number(b)) => {
                Value::string(format!("{a}{}", format_number(*b)))
            }
            (Value::Number(a), Value::String(b)) => {
                Value::string(format!("{}{b}", format_number(*a)))
            }
            _ => return Err(RuntimeErrorKind::InvalidAddition),
        },
        BinOp::Subtract => {
            let (a, b) = number_operands(&left, &right)?;
            Value::Number(a - b)
        }
        BinOp::Multiply => {
            let (a, b) = number_operands(&left, &right)?;
            Value::Number(a * b)
        }
        BinOp::Divide => {
            let (a, b) = number_operands(&left, &right)?;
            Value::Number(a / b)
        }
        BinOp::Less => {
            let (a, b) = number_operands(&left, &right)?;
            Value::Bool(a < b)
        }
        BinOp::LessEqual => {
            let (a, b) = number_operands(&left, &right)?;
            Value::Bool(a <= b)
        }
        BinOp::Greater => {
            let (a, b) = number_operands(&left, &right)?;
            Value::Bool(a > b)
        }
        BinOp::GreaterEqual => {
            let (a, b) = number_operands(&left, &right)?;
            Value::Bool(a >= b)
        }
    };
    Ok(value)
}

fn index_array(array: &Value, index: &Value) -> Result<Value, RuntimeErrorKind> {
    let Value::Array(items) = array else {
        return Err(RuntimeErrorKind::NotAnArray);
    };
    let Some(index) = index.as_number() else {
        return Err(RuntimeErrorKind::InvalidIndex);
    };
    if index.fract() != 0.0 || !index.is_finite() {
        return Err(RuntimeErrorKind::InvalidIndex);
    }
    if index < 0.0 || index >= items.len() as f64 {
        return Err(RuntimeErrorKind::IndexOutOfBounds {
            index: format_number(index),
            len: items.len(),
        });
    }
    Ok(items[index as usize].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_mixes_numbers_and_strings() {
        assert_eq!(
            apply_binop(BinOp::Add, Value::string("n="), Value::Number(3.0)),
            Ok(Value::string("n=3"))
        );
        assert_eq!(
            apply_binop(BinOp::Add, Value::Number(1.5), Value::string("x")),
            Ok(Value::string("1.5x"))
        );
        assert_eq!(
            apply_binop(BinOp::Add, Value::Bool(true), Value::Number(1.0)),
            Err(RuntimeErrorKind::InvalidAddition)
        );
    }

    #[test]
    fn test_comparison_requires_numbers() {
        assert_eq!(
            apply_binop(BinOp::Less, Value::string("a"), Value::string("b")),
            Err(RuntimeErrorKind::OperandsNotNumbers)
        );
        assert_eq!(
            apply_binop(BinOp::GreaterEqual, Value::Number(2.0), Value::Number(2.0)),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_division_by_zero_is_ieee() {
        let result = apply_binop(BinOp::Divide, Value::Number(1.0), Value::Number(0.0)).unwrap();
        assert_eq!(result, Value::Number(f64::INFINITY));
    }

    #[test]
    fn test_index_checks() {
        let items = Value::array(vec![Value::Number(10.0), Value::Number(20.0)]);
        assert_eq!(index_array(&items, &Value::Number(1.0)), Ok(Value::Number(20.0)));
        assert_eq!(
            index_array(&items, &Value::Number(0.5)),
            Err(RuntimeErrorKind::InvalidIndex)
        );
        assert_eq!(
            index_array(&items, &Value::Number(2.0)),
            Err(RuntimeErrorKind::IndexOutOfBounds {
                index: "2".to_string(),
                len: 2
            })
        );
        assert_eq!(
            index_array(&Value::Nil, &Value::Number(0.0)),
            Err(RuntimeErrorKind::NotAnArray)
        );
    }
}

use std::fmt;
use std::rc::Rc;

use crate::{ast::FunctionDecl, environment::EnvId, natives::NativeFunction};

/// A runtime value.
///
/// Strings and arrays are immutable and shared by reference, so cloning a
/// value is cheap.
///
/// # Examples
///
/// ```
/// use lox_lang::Value;
///
/// assert_eq!(Value::Number(3.0).to_string(), "3");
/// assert_eq!(Value::Number(2.5).to_string(), "2.5");
/// assert_eq!(Value::Nil.to_string(), "nil");
///
/// let parts = Value::array(vec![Value::string("a"), Value::Bool(true)]);
/// assert_eq!(parts.to_string(), "[a, true]");
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    Nil,

    Bool(bool),

    /// Double-precision float; the language has no separate integer type
    Number(f64),

    String(Rc<str>),

    /// Fixed-size sequence of values
    Array(Rc<[Value]>),

    Callable(Callable),
}

/// A value that can be called.
#[derive(Debug, Clone)]
pub enum Callable {
    /// User-defined function paired with the environment it was declared in
    Function(Rc<Function>),

    /// Host function from the native registry
    Native(&'static NativeFunction),
}

#[derive(Debug)]
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvId,
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Function(function) => &function.declaration.name.lexeme,
            Callable::Native(native) => native.name,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.declaration.params.len(),
            Callable::Native(native) => native.params.len(),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

/// Argument type a native function declares for each parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Number,
    String,
    Array,
    Boolean,
    Nil,
    /// Accepts every value
    Any,
}

impl ValueType {
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueType::Any, _)
                | (ValueType::Number, Value::Number(_))
                | (ValueType::String, Value::String(_))
                | (ValueType::Array, Value::Array(_))
                | (ValueType::Boolean, Value::Bool(_))
                | (ValueType::Nil, Value::Nil)
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Boolean => "boolean",
            ValueType::Nil => "nil",
            ValueType::Any => "any",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(items.into())
    }

    /// `nil` and `false` are falsy; everything else, `0` and `""` included,
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Name of the value's runtime type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Callable(_) => "function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Deep equality: arrays compare element-wise, callables by identity and
/// numbers with IEEE `==`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

/// Formats a number for printing.
///
/// Magnitudes in `[1e-3, 1e7)` (and zero) print as plain decimals, anything
/// else as `d.dddE±n` with at least one fractional digit. Non-finite values
/// print as `Infinity`, `-Infinity` and `NaN`. A trailing `.0` is dropped,
/// so `7.0` prints as `7` but `1.0E7` keeps its mantissa.
pub fn format_number(n: f64) -> String {
    let text = if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 || (1e-3..1e7).contains(&n.abs()) {
        format!("{n:?}")
    } else {
        scientific(n)
    };

    match text.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => text,
    }
}

/// Shortest-digit exponent form, e.g. `1.0E7` or `-1.25E-5`.
fn scientific(n: f64) -> String {
    let text = format!("{n:e}");
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}.0E{exponent}")
    }
}

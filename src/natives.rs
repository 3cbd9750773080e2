//! Host functions callable from scripts.
//!
//! Every native declares a fixed parameter list of [`ValueType`]s. The
//! evaluator checks arity and argument types before calling, so the
//! implementations can assume well-typed input.

use std::fmt;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use thiserror::Error;

use crate::value::{Value, ValueType};

/// Failure inside a native function body.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct NativeError(pub String);

pub type NativeFn = fn(&[Value]) -> Result<Value, NativeError>;

pub struct NativeFunction {
    pub name: &'static str,
    pub params: &'static [ValueType],
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

static NATIVES: [NativeFunction; 6] = [
    NativeFunction {
        name: "clock",
        params: &[],
        func: clock,
    },
    NativeFunction {
        name: "arrayLength",
        params: &[ValueType::Array],
        func: array_length,
    },
    NativeFunction {
        name: "floor",
        params: &[ValueType::Number],
        func: floor,
    },
    NativeFunction {
        name: "stringSplit",
        params: &[ValueType::String, ValueType::String],
        func: string_split,
    },
    NativeFunction {
        name: "stringToNumber",
        params: &[ValueType::String],
        func: string_to_number,
    },
    NativeFunction {
        name: "read",
        params: &[ValueType::String],
        func: read,
    },
];

/// Finds the native registered under `name`.
pub fn lookup(name: &str) -> Option<&'static NativeFunction> {
    NATIVES.iter().find(|native| native.name == name)
}

/// All registered natives, in registration order.
pub fn all() -> &'static [NativeFunction] {
    &NATIVES
}

fn expect_string(value: &Value) -> Result<&str, NativeError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(NativeError(format!(
            "Expected string but got {}.",
            other.type_name()
        ))),
    }
}

/// Seconds since the Unix epoch.
fn clock(_args: &[Value]) -> Result<Value, NativeError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| NativeError(err.to_string()))?;
    Ok(Value::Number(elapsed.as_secs_f64()))
}

fn array_length(args: &[Value]) -> Result<Value, NativeError> {
    match args.first() {
        Some(Value::Array(items)) => Ok(Value::Number(items.len() as f64)),
        _ => Err(NativeError("Expected array.".to_string())),
    }
}

fn floor(args: &[Value]) -> Result<Value, NativeError> {
    match args.first() {
        Some(Value::Number(n)) => Ok(Value::Number(n.floor())),
        _ => Err(NativeError("Expected number.".to_string())),
    }
}

/// Splits the first argument around matches of the regular expression in
/// the second. Trailing empty fields are dropped, as is the leading empty
/// field produced by a zero-width match at the start.
fn string_split(args: &[Value]) -> Result<Value, NativeError> {
    let [text, pattern] = args else {
        return Err(NativeError("Expected two arguments.".to_string()));
    };
    let text = expect_string(text)?;
    let pattern = expect_string(pattern)?;
    let regex = Regex::new(pattern)
        .map_err(|_| NativeError(format!("Invalid split pattern '{pattern}'.")))?;

    if !regex.is_match(text) {
        return Ok(Value::array(vec![Value::string(text)]));
    }

    let mut fields: Vec<&str> = regex.split(text).collect();
    let zero_width_at_start = regex
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == 0);
    if zero_width_at_start && fields.first() == Some(&"") {
        fields.remove(0);
    }
    while fields.last() == Some(&"") {
        fields.pop();
    }

    Ok(Value::array(fields.into_iter().map(Value::string).collect()))
}

fn string_to_number(args: &[Value]) -> Result<Value, NativeError> {
    let text = expect_string(args.first().unwrap_or(&Value::Nil))?;
    text.trim()
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| NativeError(format!("Cannot convert '{text}' to number.")))
}

/// Reads a whole file as a string.
fn read(args: &[Value]) -> Result<Value, NativeError> {
    let path = expect_string(args.first().unwrap_or(&Value::Nil))?;
    fs::read_to_string(path)
        .map(Value::string)
        .map_err(|_| NativeError(format!("Could not open file {path}")))
}

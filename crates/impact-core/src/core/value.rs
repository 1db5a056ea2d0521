use std::fmt;

/// A single argument slot in an engine command.
///
/// Values are either literal numbers or references that the engine resolves on its side
/// (`${name}` substitution, `$(expr)` immediate evaluation). Rendering goes through
/// [`fmt::Display`], which uses the shortest round-trip representation for floats so that
/// derived constants reach the engine bit-for-bit.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Integer(i64),
    /// `${name}`
    Var(String),
    /// `-${name}`
    NegVar(String),
    /// `$(expr)`
    Immediate(String),
    /// `INF`
    Inf,
    /// `NULL`, leaves a component untouched.
    Null,
}

impl Value {
    pub fn var(name: impl Into<String>) -> Self {
        Value::Var(name.into())
    }

    pub fn neg_var(name: impl Into<String>) -> Self {
        Value::NegVar(name.into())
    }

    pub fn immediate(expr: impl Into<String>) -> Self {
        Value::Immediate(expr.into())
    }

    /// Name of the engine variable this value substitutes, if any.
    pub fn referenced_variable(&self) -> Option<&str> {
        match self {
            Value::Var(name) | Value::NegVar(name) => Some(name),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Var(name) => write!(f, "${{{}}}", name),
            Value::NegVar(name) => write!(f, "-${{{}}}", name),
            Value::Immediate(expr) => write!(f, "$({})", expr),
            Value::Inf => f.write_str("INF"),
            Value::Null => f.write_str("NULL"),
        }
    }
}

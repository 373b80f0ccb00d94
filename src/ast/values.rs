use serde::{Deserialize, Serialize};

use crate::error::{TreeqlError, TreeqlResult};

/// A scalar value, either bound as a parameter or read back from a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Blob(bytes) => {
                write!(f, "x'")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                write!(f, "'")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Blob(bytes)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A non-null literal: one scalar, or a flat non-empty array of scalars.
///
/// Literals never reach the SQL text. The emitter turns every element into a
/// bound parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralNode {
    Scalar(Value),
    Array(Vec<Value>),
}

impl LiteralNode {
    /// Create a scalar literal. `Value::Null` is rejected; use [`ValueNode::Null`].
    pub fn new(value: impl Into<Value>) -> TreeqlResult<Self> {
        let value = value.into();
        if value.is_null() {
            return Err(TreeqlError::validation(
                "literal value must not be null, use a null node instead",
            ));
        }
        Ok(LiteralNode::Scalar(value))
    }

    /// Create an array literal, expanded to one placeholder per element.
    pub fn array<I, V>(values: I) -> TreeqlResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(TreeqlError::validation("array literal must not be empty"));
        }
        if values.iter().any(Value::is_null) {
            return Err(TreeqlError::validation(
                "array literal must not contain null elements",
            ));
        }
        Ok(LiteralNode::Array(values))
    }

    /// The bound values, in placeholder order.
    pub fn values(&self) -> &[Value] {
        match self {
            LiteralNode::Scalar(v) => std::slice::from_ref(v),
            LiteralNode::Array(values) => values,
        }
    }
}

macro_rules! literal_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for LiteralNode {
                fn from(v: $ty) -> Self {
                    LiteralNode::Scalar(Value::from(v))
                }
            }
        )*
    };
}

literal_from!(bool, i32, i64, f64, &str, String, Vec<u8>);

/// A value operand: a bound literal or SQL `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Literal(LiteralNode),
    Null,
}

impl ValueNode {
    pub fn is_null(&self) -> bool {
        matches!(self, ValueNode::Null)
    }
}

impl From<LiteralNode> for ValueNode {
    fn from(literal: LiteralNode) -> Self {
        ValueNode::Literal(literal)
    }
}

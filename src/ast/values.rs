//! Literal values carried by bind parameters and DDL defaults.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A typed literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Exact decimal
    Decimal(Decimal),
    /// String
    String(String),
    /// UUID value
    Uuid(Uuid),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// Calendar date
    Date(NaiveDate),
    /// JSON document
    Json(serde_json::Value),
    /// Row value / tuple (for tuple-valued expanding parameters)
    Tuple(Vec<Value>),
    /// Collection bound to an expanding (IN-list) parameter
    Array(Vec<Value>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Uuid(u) => write!(f, "'{}'", u),
            Value::Timestamp(ts) => write!(f, "'{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Date(d) => write!(f, "'{}'", d),
            Value::Json(j) => write!(f, "'{}'", j),
            Value::Tuple(vals) | Value::Array(vals) => {
                write!(f, "(")?;
                for (i, v) in vals.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
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
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
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

/// Declared SQL-side type of an expression or bind parameter.
///
/// This is not a full type system: the compiler consults it only for
/// literal rendering, native-boolean decisions, floor-division emulation
/// and the tuple width of expanding parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TypeInfo {
    #[default]
    Unspecified,
    Boolean,
    Integer,
    Float,
    Numeric,
    Text,
    Uuid,
    Timestamp,
    Date,
    Json,
    /// Row type for tuple-valued IN lists; carries per-element types.
    Tuple(Vec<TypeInfo>),
}

impl TypeInfo {
    pub fn is_integer(&self) -> bool {
        matches!(self, TypeInfo::Integer)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, TypeInfo::Tuple(_))
    }

    /// The number of placeholders one element of an expanding parameter of
    /// this type occupies.
    pub fn width(&self) -> usize {
        match self {
            TypeInfo::Tuple(types) => types.len(),
            _ => 1,
        }
    }
}

//! Literal values written in filter expressions and the borrowed view of event data
//! they are compared with.

use std::{cmp::Ordering, fmt};

use tracer_core::{ArgValue, FieldType};

use crate::FilterError;

/// Typed literal from the right-hand side of an expression.
///
/// The variant always agrees with the declared type of the field it is compared with:
/// this is checked once, when the expression is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Str(String),
    Bool(bool),
    /// Right-hand side of [crate::Operator::In] and [crate::Operator::NotIn].
    Set(Vec<Value>),
}

impl Value {
    /// Parse a scalar literal as an instance of `field_type`.
    ///
    /// For [FieldType::StrArray] the literal is a single element of the array.
    pub fn parse(raw: &str, field_type: FieldType) -> Result<Value, FilterError> {
        let invalid = || FilterError::InvalidValue(raw.to_string());

        match field_type {
            FieldType::Int => parse_int(raw).map(Value::Int).ok_or_else(invalid),
            FieldType::UInt => parse_uint(raw).map(Value::UInt).ok_or_else(invalid),
            FieldType::Bool => raw.parse().map(Value::Bool).map_err(|_| invalid()),
            FieldType::Str | FieldType::StrArray => Ok(Value::Str(raw.to_string())),
        }
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    match raw.strip_prefix("-") {
        Some(rest) => parse_uint(rest)
            .and_then(|v| i128::from(v).checked_neg())
            .and_then(|v| i64::try_from(v).ok()),
        None => parse_uint(raw).and_then(|v| i64::try_from(v).ok()),
    }
}

fn parse_uint(raw: &str) -> Option<u64> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => {
                write!(f, "\"")?;
                for c in v.chars() {
                    if c == '"' || c == '\\' {
                        write!(f, "\\")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, "\"")
            }
            Value::Set(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Borrowed view over a field of a live event.
///
/// Building it never allocates, so it can be produced on the matching hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Int(i64),
    UInt(u64),
    Str(&'a str),
    Bool(bool),
    StrArray(&'a [String]),
}

impl FieldValue<'_> {
    /// Compare with a literal of a scalar type.
    ///
    /// Returns [None] when the two values are not comparable.
    pub fn compare(&self, expected: &Value) -> Option<Ordering> {
        match (self, expected) {
            (FieldValue::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (FieldValue::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
            (FieldValue::Int(a), Value::UInt(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (FieldValue::UInt(a), Value::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (FieldValue::Str(a), Value::Str(b)) => Some((*a).cmp(b.as_str())),
            (FieldValue::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl<'a> From<&'a ArgValue> for FieldValue<'a> {
    fn from(value: &'a ArgValue) -> Self {
        match value {
            ArgValue::Bool(v) => FieldValue::Bool(*v),
            ArgValue::Int(v) => FieldValue::Int(*v),
            ArgValue::UInt(v) => FieldValue::UInt(*v),
            ArgValue::Str(v) => FieldValue::Str(v),
            ArgValue::StrArray(v) => FieldValue::StrArray(v),
        }
    }
}

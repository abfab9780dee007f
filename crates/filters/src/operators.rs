//! This module contains the closed set of comparison operators available in filter expressions.

use std::{cmp::Ordering, str::FromStr};

use strum::{Display, EnumIter, EnumString};
use tracer_core::FieldType;

use crate::{FieldValue, FilterError, Value};

/// Enum of all possible operators.
///
/// The [Display] form is the canonical symbol used when printing expressions.
/// Word operators are accepted regardless of case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Operator {
    #[strum(to_string = "==", serialize = "=")]
    Equal,
    #[strum(to_string = "!=")]
    NotEqual,
    #[strum(to_string = ">")]
    GreaterThan,
    #[strum(to_string = "<")]
    LessThan,
    #[strum(to_string = ">=")]
    GreaterOrEqual,
    #[strum(to_string = "<=")]
    LessOrEqual,
    #[strum(to_string = "contains")]
    Contains,
    #[strum(to_string = "startswith", serialize = "starts_with")]
    StartsWith,
    #[strum(to_string = "endswith", serialize = "ends_with")]
    EndsWith,
    #[strum(to_string = "in")]
    In,
    #[strum(to_string = "notin", serialize = "not_in")]
    NotIn,
}

impl Operator {
    /// Look up an operator by its textual symbol.
    pub fn parse(symbol: &str) -> Result<Operator, FilterError> {
        Operator::from_str(symbol)
            .map_err(|_| FilterError::UnsupportedOperator(symbol.to_string()))
    }

    /// Whether the right-hand side of this operator is a set of values.
    pub fn takes_set(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::GreaterThan
                | Operator::LessThan
                | Operator::GreaterOrEqual
                | Operator::LessOrEqual
        )
    }

    /// Whether this operator can be applied on a field of the given type.
    pub fn is_allowed_on(&self, field_type: FieldType) -> bool {
        match field_type {
            FieldType::Int | FieldType::UInt => self.is_relational() || self.takes_set(),
            FieldType::Str => true,
            FieldType::Bool => matches!(self, Operator::Equal | Operator::NotEqual),
            FieldType::StrArray => matches!(self, Operator::Contains),
        }
    }

    /// Whether this operator can be applied on the name of an event.
    pub fn is_allowed_on_event_name(&self) -> bool {
        matches!(
            self,
            Operator::Equal | Operator::NotEqual | Operator::In | Operator::NotIn
        )
    }

    /// Check if `actual` satisfies this operator against the `expected` literal.
    ///
    /// Types have been checked when the expression was compiled: a value which doesn't
    /// agree with the literal never matches.
    pub fn apply(&self, actual: FieldValue<'_>, expected: &Value) -> bool {
        match self {
            Operator::Equal => actual.compare(expected) == Some(Ordering::Equal),
            Operator::NotEqual => matches!(
                actual.compare(expected),
                Some(Ordering::Less | Ordering::Greater)
            ),
            Operator::GreaterThan => actual.compare(expected) == Some(Ordering::Greater),
            Operator::LessThan => actual.compare(expected) == Some(Ordering::Less),
            Operator::GreaterOrEqual => matches!(
                actual.compare(expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::LessOrEqual => matches!(
                actual.compare(expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Contains => match (actual, expected) {
                (FieldValue::Str(a), Value::Str(b)) => a.contains(b.as_str()),
                (FieldValue::StrArray(a), Value::Str(b)) => a.iter().any(|item| item == b),
                _ => false,
            },
            Operator::StartsWith => match (actual, expected) {
                (FieldValue::Str(a), Value::Str(b)) => a.starts_with(b.as_str()),
                _ => false,
            },
            Operator::EndsWith => match (actual, expected) {
                (FieldValue::Str(a), Value::Str(b)) => a.ends_with(b.as_str()),
                _ => false,
            },
            Operator::In => match expected {
                Value::Set(items) => items
                    .iter()
                    .any(|item| actual.compare(item) == Some(Ordering::Equal)),
                _ => false,
            },
            Operator::NotIn => match expected {
                Value::Set(items) => items.iter().all(|item| {
                    matches!(
                        actual.compare(item),
                        Some(Ordering::Less | Ordering::Greater)
                    )
                }),
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn symbols() {
        assert_eq!(Operator::parse("==").unwrap(), Operator::Equal);
        assert_eq!(Operator::parse("=").unwrap(), Operator::Equal);
        assert_eq!(Operator::parse("!=").unwrap(), Operator::NotEqual);
        assert_eq!(Operator::parse(">=").unwrap(), Operator::GreaterOrEqual);
        assert_eq!(Operator::parse("STARTSWITH").unwrap(), Operator::StartsWith);
        assert_eq!(Operator::parse("ends_with").unwrap(), Operator::EndsWith);
        assert_eq!(Operator::parse("NOT_IN").unwrap(), Operator::NotIn);
        assert_eq!(
            Operator::parse("~="),
            Err(FilterError::UnsupportedOperator("~=".to_string()))
        );
        assert_eq!(
            Operator::parse("badop"),
            Err(FilterError::UnsupportedOperator("badop".to_string()))
        );
    }

    #[test]
    fn canonical_form_parses_back() {
        for op in Operator::iter() {
            assert_eq!(Operator::parse(&op.to_string()).unwrap(), op);
        }
    }

    #[test]
    fn relational() {
        let five = FieldValue::Int(5);
        assert!(Operator::Equal.apply(five, &Value::Int(5)));
        assert!(!Operator::Equal.apply(five, &Value::Int(6)));
        assert!(Operator::NotEqual.apply(five, &Value::Int(6)));
        assert!(Operator::GreaterThan.apply(five, &Value::Int(4)));
        assert!(!Operator::GreaterThan.apply(five, &Value::Int(5)));
        assert!(Operator::GreaterOrEqual.apply(five, &Value::Int(5)));
        assert!(Operator::LessThan.apply(five, &Value::Int(6)));
        assert!(Operator::LessOrEqual.apply(five, &Value::Int(5)));
        assert!(!Operator::LessOrEqual.apply(five, &Value::Int(4)));
        assert!(Operator::Equal.apply(FieldValue::UInt(0), &Value::UInt(0)));
        assert!(Operator::Equal.apply(FieldValue::Bool(true), &Value::Bool(true)));
    }

    #[test]
    fn mismatched_types_never_match() {
        let value = FieldValue::Str("0");
        assert!(!Operator::Equal.apply(value, &Value::Int(0)));
        assert!(!Operator::NotEqual.apply(value, &Value::Int(0)));
        assert!(!Operator::StartsWith.apply(FieldValue::Int(1), &s("1")));
        assert!(!Operator::In.apply(value, &s("0")));
        assert!(!Operator::NotIn.apply(value, &Value::Set(vec![Value::Int(1)])));
    }

    #[test]
    fn strings() {
        let path = FieldValue::Str("/usr/bin/bash");
        assert!(Operator::Contains.apply(path, &s("bin")));
        assert!(Operator::StartsWith.apply(path, &s("/usr")));
        assert!(!Operator::StartsWith.apply(path, &s("/bin")));
        assert!(Operator::EndsWith.apply(path, &s("bash")));
        assert!(Operator::LessThan.apply(path, &s("/usr/bin/zsh")));
    }

    #[test]
    fn string_array_contains() {
        let argv = vec!["ls".to_string(), "-la".to_string()];
        let argv = FieldValue::StrArray(&argv);
        assert!(Operator::Contains.apply(argv, &s("-la")));
        assert!(!Operator::Contains.apply(argv, &s("-l")));
    }

    #[test]
    fn sets() {
        let set = Value::Set(vec![Value::UInt(0), Value::UInt(1000)]);
        assert!(Operator::In.apply(FieldValue::UInt(1000), &set));
        assert!(!Operator::In.apply(FieldValue::UInt(1), &set));
        assert!(Operator::NotIn.apply(FieldValue::UInt(1), &set));
        assert!(!Operator::NotIn.apply(FieldValue::UInt(0), &set));
        assert!(!Operator::In.apply(FieldValue::UInt(0), &Value::UInt(0)));
    }

    #[test]
    fn allowed_types() {
        assert!(Operator::GreaterThan.is_allowed_on(FieldType::Int));
        assert!(!Operator::Contains.is_allowed_on(FieldType::UInt));
        assert!(Operator::StartsWith.is_allowed_on(FieldType::Str));
        assert!(!Operator::GreaterThan.is_allowed_on(FieldType::Bool));
        assert!(Operator::Contains.is_allowed_on(FieldType::StrArray));
        assert!(!Operator::Equal.is_allowed_on(FieldType::StrArray));
        assert!(Operator::In.is_allowed_on_event_name());
        assert!(!Operator::StartsWith.is_allowed_on_event_name());
    }
}

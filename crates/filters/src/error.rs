use std::fmt::Display;

use thiserror::Error;

use crate::Operator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("failed to add filter: unsupported operator {0}")]
    UnsupportedOperator(String),
    #[error("failed to add filter: operator {operator} not allowed on {field} of type {field_type}")]
    OperatorNotAllowed {
        operator: Operator,
        field: String,
        field_type: String,
    },
    #[error("invalid filter scope: {0}")]
    InvalidScope(String),
    #[error("invalid filter expression: {0}")]
    InvalidExpression(String),
    #[error("invalid filter value {0}")]
    InvalidValue(String),
    #[error("invalid event name in filter: {0}")]
    InvalidEventName(String),
    #[error("invalid filter event argument: {0}")]
    InvalidEventArgument(String),
    #[error("invalid event context field: {0}")]
    InvalidContextField(String),
    #[error("failed to retrieve host mount namespace: {0}")]
    HostNamespaceUnavailable(String),
    #[error("contradictory filter expression on {field}: {detail}")]
    ContradictoryExpression { field: String, detail: String },
    #[error("filter {0} defined more than once")]
    DuplicateFilter(String),
}

impl FilterError {
    pub(crate) fn operator_not_allowed(
        operator: Operator,
        field: impl Into<String>,
        field_type: impl Display,
    ) -> Self {
        FilterError::OperatorNotAllowed {
            operator,
            field: field.into(),
            field_type: field_type.to_string(),
        }
    }
}

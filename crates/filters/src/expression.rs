use std::{collections::BTreeSet, fmt};

use crate::{FieldReference, Operator, Scope, Value};

/// Base condition: compare a field of the event with a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Leaf {
    pub field: FieldReference,
    pub op: Operator,
    pub value: Value,
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

/// Validated predicate tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    And {
        l: Box<Expression>,
        r: Box<Expression>,
    },
    Or {
        l: Box<Expression>,
        r: Box<Expression>,
    },
    Not {
        inner: Box<Expression>,
    },
    Leaf(Leaf),
}

impl Expression {
    pub fn leaf(field: FieldReference, op: Operator, value: Value) -> Self {
        Expression::Leaf(Leaf { field, op, value })
    }

    pub fn and(l: Expression, r: Expression) -> Self {
        Expression::And {
            l: Box::new(l),
            r: Box::new(r),
        }
    }

    pub fn or(l: Expression, r: Expression) -> Self {
        Expression::Or {
            l: Box::new(l),
            r: Box::new(r),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expression) -> Self {
        Expression::Not {
            inner: Box::new(inner),
        }
    }

    /// Leaves joined by the top level chain of `&&`.
    pub fn conjuncts(&self) -> Vec<&Leaf> {
        let mut leaves = Vec::new();
        self.collect_conjuncts(&mut leaves);
        leaves
    }

    fn collect_conjuncts<'a>(&'a self, leaves: &mut Vec<&'a Leaf>) {
        match self {
            Expression::And { l, r } => {
                l.collect_conjuncts(leaves);
                r.collect_conjuncts(leaves);
            }
            Expression::Leaf(leaf) => leaves.push(leaf),
            Expression::Or { .. } | Expression::Not { .. } => {}
        }
    }

    /// Every leaf of the tree, left to right.
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a Leaf>) {
        match self {
            Expression::And { l, r } | Expression::Or { l, r } => {
                l.collect_leaves(leaves);
                r.collect_leaves(leaves);
            }
            Expression::Not { inner } => inner.collect_leaves(leaves),
            Expression::Leaf(leaf) => leaves.push(leaf),
        }
    }

    /// Names of the events this expression can possibly match.
    ///
    /// [None] means the expression doesn't restrict the event name. The result is an
    /// over-approximation: an event outside the set never matches.
    pub fn event_names(&self) -> Option<BTreeSet<String>> {
        match self {
            Expression::And { l, r } => match (l.event_names(), r.event_names()) {
                (Some(l), Some(r)) => Some(l.intersection(&r).cloned().collect()),
                (Some(names), None) | (None, Some(names)) => Some(names),
                (None, None) => None,
            },
            Expression::Or { l, r } => match (l.event_names(), r.event_names()) {
                (Some(mut l), Some(r)) => {
                    l.extend(r);
                    Some(l)
                }
                _ => None,
            },
            Expression::Not { .. } => None,
            Expression::Leaf(leaf) => match (&leaf.field, leaf.op, &leaf.value) {
                (FieldReference::EventName, Operator::Equal, Value::Str(name)) => {
                    Some(BTreeSet::from([name.clone()]))
                }
                (FieldReference::EventName, Operator::In, Value::Set(names)) => Some(
                    names
                        .iter()
                        .filter_map(|name| match name {
                            Value::Str(name) => Some(name.clone()),
                            _ => None,
                        })
                        .collect(),
                ),
                (FieldReference::EventArgument { event, .. }, _, _) => {
                    Some(BTreeSet::from([event.clone()]))
                }
                _ => None,
            },
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::And { l, r } => write!(f, "({l} && {r})"),
            Expression::Or { l, r } => write!(f, "({l} || {r})"),
            Expression::Not { inner } => write!(f, "!({inner})"),
            Expression::Leaf(leaf) => write!(f, "{leaf}"),
        }
    }
}

/// Result of parsing a textual expression: the predicate and the scope given by its
/// prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedExpression {
    pub scope: Scope,
    pub expression: Expression,
}

impl fmt::Display for ScopedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Global => write!(f, "{}", self.expression),
            scope => write!(f, "[{scope}] {}", self.expression),
        }
    }
}

//! Evaluation of compiled filters against live events.
//!
//! Nothing here allocates or fails: every field and value was validated when the
//! filter was compiled, values are read through borrowed [crate::FieldValue]s.

use tracer_core::Event;

use crate::{Expression, Filter, FilterSet, Leaf};

impl Leaf {
    /// A field missing from the event never matches.
    pub fn is_match(&self, event: &Event) -> bool {
        self.field
            .value(event)
            .is_some_and(|actual| self.op.apply(actual, &self.value))
    }
}

impl Expression {
    pub fn is_match(&self, event: &Event) -> bool {
        match self {
            Expression::And { l, r } => l.is_match(event) && r.is_match(event),
            Expression::Or { l, r } => l.is_match(event) || r.is_match(event),
            Expression::Not { inner } => !inner.is_match(event),
            Expression::Leaf(leaf) => leaf.is_match(event),
        }
    }
}

impl Filter {
    /// Check the event name restriction, then the scope, then the expression tree.
    pub fn is_match(&self, event: &Event) -> bool {
        if let Some(events) = &self.events {
            if !events.contains(event.name.as_str()) {
                return false;
            }
        }

        if !self.scope.admits(event, self.namespace.as_ref()) {
            return false;
        }

        self.expression
            .as_ref()
            .is_none_or(|expression| expression.is_match(event))
    }
}

impl FilterSet {
    pub fn is_match(&self, event: &Event) -> bool {
        self.filters.iter().any(|filter| filter.is_match(event))
    }

    /// Filters matching the event, in set order.
    pub fn matches<'a>(&'a self, event: &'a Event) -> impl Iterator<Item = &'a Filter> + 'a {
        self.filters.iter().filter(move |filter| filter.is_match(event))
    }
}

pub fn matches(filters: &FilterSet, event: &Event) -> bool {
    filters.is_match(event)
}

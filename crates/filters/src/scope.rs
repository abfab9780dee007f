use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};
use tracer_core::Event;

use crate::{FilterError, NamespaceContext};

/// Evaluation boundary of a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Scope {
    /// Every event.
    #[default]
    Global,
    /// Events attributed to a user-space process.
    Process,
    /// Events generated inside a mount namespace other than the host one.
    Container,
    /// Events generated in the host mount namespace.
    Host,
}

impl Scope {
    pub fn parse(prefix: &str) -> Result<Scope, FilterError> {
        Scope::from_str(prefix).map_err(|_| FilterError::InvalidScope(prefix.to_string()))
    }

    /// Scopes which need the host mount namespace to be evaluated.
    pub fn needs_namespace(&self) -> bool {
        matches!(self, Scope::Container | Scope::Host)
    }

    /// Combine two scopes restricting the same filter.
    ///
    /// [Scope::Global] is compatible with anything, different specific scopes are not.
    pub fn merge(self, other: Scope) -> Option<Scope> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Scope::Global, s) | (s, Scope::Global) => Some(s),
            _ => None,
        }
    }

    /// Check if the event falls inside this scope.
    ///
    /// `namespace` is always available for scopes which [need it](Scope::needs_namespace)
    /// once a filter is compiled.
    pub fn admits(&self, event: &Event, namespace: Option<&NamespaceContext>) -> bool {
        match self {
            Scope::Global => true,
            Scope::Process => event.context.host_pid > 0,
            Scope::Container => namespace
                .and_then(|ns| ns.classify(event))
                .is_some_and(|class| class == EventClass::Container),
            Scope::Host => namespace
                .and_then(|ns| ns.classify(event))
                .is_some_and(|class| class == EventClass::Host),
        }
    }
}

/// Classification of an event relative to the host mount namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EventClass {
    Host,
    Container,
}

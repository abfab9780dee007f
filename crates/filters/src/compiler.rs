use std::collections::{BTreeSet, HashSet};

use tracer_core::EventSchema;

use crate::{
    Expression, FieldReference, FilterError, NamespaceContext, NamespaceProvider, Operator,
    Parser, Scope, ScopedExpression,
};

/// Compiled filter, ready to be matched against events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub(crate) name: String,
    pub(crate) scope: Scope,
    /// [None] accepts every event in scope.
    pub(crate) expression: Option<Expression>,
    /// Names of the only events this filter can match. [None] means no restriction.
    pub(crate) events: Option<BTreeSet<String>>,
    /// Always present for scopes needing it.
    pub(crate) namespace: Option<NamespaceContext>,
}

impl Filter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn expression(&self) -> Option<&Expression> {
        self.expression.as_ref()
    }

    pub fn events(&self) -> Option<&BTreeSet<String>> {
        self.events.as_ref()
    }

    pub fn namespace(&self) -> Option<&NamespaceContext> {
        self.namespace.as_ref()
    }
}

/// Ordered collection of filters. An event matches the set if it matches any filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub(crate) filters: Vec<Filter>,
}

impl FilterSet {
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|filter| filter.name == name)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Turns parsed expressions into [Filter]s and [FilterSet]s.
pub struct FilterCompiler<'a> {
    parser: Parser<'a>,
    namespace: &'a dyn NamespaceProvider,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(schema: &'a EventSchema, namespace: &'a dyn NamespaceProvider) -> Self {
        Self {
            parser: Parser::new(schema),
            namespace,
        }
    }

    pub fn parser(&self) -> &Parser<'a> {
        &self.parser
    }

    /// Build a filter restricted to `scope` matching all the given expressions.
    ///
    /// The scope of each expression must agree with `scope`. Container and host
    /// scoped filters capture the host namespace here, failing if it can't be resolved.
    pub fn compile(
        &self,
        name: impl Into<String>,
        scope: Scope,
        expressions: Vec<ScopedExpression>,
    ) -> Result<Filter, FilterError> {
        let name = name.into();

        let mut filter_scope = scope;
        for expression in &expressions {
            filter_scope = filter_scope.merge(expression.scope).ok_or_else(|| {
                FilterError::InvalidScope(format!(
                    "{} conflicts with {filter_scope} in filter {name}",
                    expression.scope
                ))
            })?;
        }

        let expression = expressions
            .into_iter()
            .map(|scoped| scoped.expression)
            .reduce(Expression::and);

        if let Some(expression) = &expression {
            check_scope_fields(filter_scope, expression)?;
            check_contradictions(expression)?;
        }

        let namespace = if filter_scope.needs_namespace() {
            Some(self.namespace.namespace_context()?)
        } else {
            None
        };

        let events = expression.as_ref().and_then(Expression::event_names);
        if events.as_ref().is_some_and(BTreeSet::is_empty) {
            log::warn!("filter {name} can never match: its event name constraints exclude every event");
        }

        Ok(Filter {
            name,
            scope: filter_scope,
            expression,
            events,
            namespace,
        })
    }

    /// Parse and compile a single textual expression.
    pub fn compile_str(&self, name: impl Into<String>, raw: &str) -> Result<Filter, FilterError> {
        let expression = self.parser.parse(raw)?;
        self.compile(name, Scope::Global, vec![expression])
    }

    /// Collect filters into a set. Names must be unique.
    pub fn compile_set(&self, filters: Vec<Filter>) -> Result<FilterSet, FilterError> {
        let mut names = HashSet::new();
        for filter in &filters {
            if !names.insert(filter.name.as_str()) {
                return Err(FilterError::DuplicateFilter(filter.name.clone()));
            }
        }

        log::debug!("Loaded {} filters", filters.len());

        Ok(FilterSet { filters })
    }
}

/// Reject context fields the scope of the filter never provides.
fn check_scope_fields(scope: Scope, expression: &Expression) -> Result<(), FilterError> {
    expression
        .leaves()
        .into_iter()
        .try_for_each(|leaf| match &leaf.field {
            FieldReference::ContextField(field) => field.check_scope(scope),
            FieldReference::EventName | FieldReference::EventArgument { .. } => Ok(()),
        })
}

/// Reject top level conjunctions which can never hold on a single field.
fn check_contradictions(expression: &Expression) -> Result<(), FilterError> {
    let leaves = expression.conjuncts();

    for (index, a) in leaves.iter().enumerate() {
        for b in &leaves[index + 1..] {
            if a.field != b.field {
                continue;
            }

            let contradiction = match (a.op, b.op) {
                (Operator::Equal, Operator::NotEqual) | (Operator::NotEqual, Operator::Equal) => {
                    a.value == b.value
                }
                (Operator::Equal, Operator::Equal) => a.value != b.value,
                _ => false,
            };

            if contradiction {
                return Err(FilterError::ContradictoryExpression {
                    field: a.field.to_string(),
                    detail: format!("{a} && {b}"),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST_MNTNS: u32 = 4026531840;

    struct Unavailable;

    impl NamespaceProvider for Unavailable {
        fn namespace_context(&self) -> Result<NamespaceContext, FilterError> {
            Err(FilterError::HostNamespaceUnavailable("no procfs".to_string()))
        }
    }

    fn compile(raw: &str) -> Result<Filter, FilterError> {
        let schema = EventSchema::builtin();
        let namespace = NamespaceContext::new(HOST_MNTNS);
        FilterCompiler::new(&schema, &namespace).compile_str("test", raw)
    }

    #[test]
    fn compile_simple() {
        let filter = compile("execve.args.path == /bin/sh").unwrap();
        assert_eq!(filter.name(), "test");
        assert_eq!(filter.scope(), Scope::Global);
        assert_eq!(filter.namespace(), None);
        assert_eq!(
            filter.events(),
            Some(&BTreeSet::from(["execve".to_string()]))
        );
    }

    #[test]
    fn container_scope_captures_namespace() {
        let filter = compile("container.uid != 0").unwrap();
        assert_eq!(filter.scope(), Scope::Container);
        assert_eq!(filter.namespace(), Some(&NamespaceContext::new(HOST_MNTNS)));
        assert_eq!(filter.events(), None);
    }

    #[test]
    fn namespace_failure_is_fatal_for_namespaced_scopes() {
        let schema = EventSchema::builtin();
        let compiler = FilterCompiler::new(&schema, &Unavailable);

        assert_eq!(
            compiler.compile_str("a", "container.uid != 0"),
            Err(FilterError::HostNamespaceUnavailable("no procfs".to_string()))
        );
        assert!(matches!(
            compiler.compile_str("b", "host.uid == 0"),
            Err(FilterError::HostNamespaceUnavailable(_))
        ));
        // other scopes never need it
        assert!(compiler.compile_str("c", "uid == 0").is_ok());
        assert!(compiler.compile_str("d", "process.uid == 0").is_ok());
    }

    #[test]
    fn multiple_expressions() {
        let schema = EventSchema::builtin();
        let namespace = NamespaceContext::new(HOST_MNTNS);
        let compiler = FilterCompiler::new(&schema, &namespace);
        let parser = compiler.parser();

        let filter = compiler
            .compile(
                "multi",
                Scope::Host,
                vec![
                    parser.parse("uid == 0").unwrap(),
                    parser.parse("host.execve").unwrap(),
                ],
            )
            .unwrap();
        assert_eq!(filter.scope(), Scope::Host);
        assert_eq!(
            filter.expression().unwrap().to_string(),
            r#"(uid == 0 && event == "execve")"#
        );

        assert!(matches!(
            compiler.compile(
                "conflict",
                Scope::Container,
                vec![parser.parse("host.uid == 0").unwrap()]
            ),
            Err(FilterError::InvalidScope(_))
        ));
    }

    #[test]
    fn container_fields_need_a_container() {
        let expected = Err(FilterError::InvalidContextField("host.containerId".to_string()));

        assert_eq!(compile("host.uid == 0 && containerId == abc"), expected);
        assert_eq!(compile("containerId == abc && host.uid == 0"), expected);
        // anywhere in the tree
        assert_eq!(
            compile("host.uid == 0 || !(podName == web)"),
            Err(FilterError::InvalidContextField("host.podName".to_string()))
        );

        let schema = EventSchema::builtin();
        let namespace = NamespaceContext::new(HOST_MNTNS);
        let compiler = FilterCompiler::new(&schema, &namespace);
        let parsed = compiler.parser().parse("containerId == abc").unwrap();
        assert_eq!(
            compiler.compile("default", Scope::Host, vec![parsed.clone()]),
            expected
        );

        assert!(compiler.compile("default", Scope::Container, vec![parsed.clone()]).is_ok());
        assert!(compiler.compile("default", Scope::Global, vec![parsed]).is_ok());
    }

    #[test]
    fn no_expressions() {
        let schema = EventSchema::builtin();
        let namespace = NamespaceContext::new(HOST_MNTNS);
        let compiler = FilterCompiler::new(&schema, &namespace);

        let filter = compiler.compile("all", Scope::Process, vec![]).unwrap();
        assert_eq!(filter.expression(), None);
        assert_eq!(filter.events(), None);
    }

    #[test]
    fn contradictions() {
        assert!(matches!(
            compile("uid == 0 && uid != 0"),
            Err(FilterError::ContradictoryExpression { .. })
        ));
        assert!(matches!(
            compile("uid == 0 && pid == 1 && uid == 1000"),
            Err(FilterError::ContradictoryExpression { .. })
        ));
        assert!(matches!(
            compile("execve && openat.context.pid == 1"),
            Err(FilterError::ContradictoryExpression { .. })
        ));

        // not contradictions
        assert!(compile("uid == 0 && uid == 0").is_ok());
        assert!(compile("uid != 0 && uid != 1000").is_ok());
        assert!(compile("uid == 0 || uid != 0").is_ok());
        // only the top level conjunction is checked
        assert!(compile("!(uid == 0 && uid != 0)").is_ok());
    }

    #[test]
    fn unsatisfiable_event_restriction_compiles() {
        // different fields, so only the derived restriction tells it apart
        let filter = compile("event == openat && execve.args.path == /bin/sh").unwrap();
        assert_eq!(filter.events(), Some(&BTreeSet::new()));
    }

    #[test]
    fn compile_errors() {
        assert!(matches!(
            compile("openat.args.nosuchfield == 1"),
            Err(FilterError::InvalidEventArgument(_))
        ));
        assert!(matches!(
            compile("badop(x)"),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn compile_set() {
        let schema = EventSchema::builtin();
        let namespace = NamespaceContext::new(HOST_MNTNS);
        let compiler = FilterCompiler::new(&schema, &namespace);

        let a = compiler.compile_str("a", "uid == 0").unwrap();
        let b = compiler.compile_str("b", "execve").unwrap();

        let set = compiler.compile_set(vec![a.clone(), b]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a"), Some(&a));
        assert_eq!(set.filters()[1].name(), "b");

        let duplicate = compiler.compile_str("a", "uid == 1").unwrap();
        assert_eq!(
            compiler.compile_set(vec![a, duplicate]),
            Err(FilterError::DuplicateFilter("a".to_string()))
        );

        assert!(compiler.compile_set(vec![]).unwrap().is_empty());
    }
}

//! filters compiles textual filter expressions into predicates over captured events and
//! matches them on the hot path.
//!
//! Every identifier of an expression is checked against an [EventSchema](tracer_core::EventSchema)
//! and every literal is typed against its field when the filter is compiled, so matching
//! never fails. Example:
//!
//! ```
//! use filters::{FilterCompiler, NamespaceContext};
//! use tracer_core::{Event, EventSchema};
//!
//! let schema = EventSchema::builtin();
//! let namespace = NamespaceContext::new(4026531840);
//! let compiler = FilterCompiler::new(&schema, &namespace);
//!
//! let filter = compiler
//!     .compile_str("shell", "(uid == 0) && (execve.args.path == /bin/sh)")
//!     .unwrap();
//! let filters = compiler.compile_set(vec![filter]).unwrap();
//!
//! let event = Event::new("execve").with_arg("path", "/bin/sh");
//! assert!(filters.is_match(&event));
//! ```
//!
//! Expressions are combined with `&&`, `||` and `!` (or `and`, `or`, `not`) and grouped
//! with parentheses. An identifier can carry a scope prefix (`container.`, `host.`,
//! `process.` or `global.`) restricting the whole filter:
//!
//! ```
//! use filters::{FilterCompiler, FilterError, NamespaceContext, Scope};
//! use tracer_core::EventSchema;
//!
//! let schema = EventSchema::builtin();
//! let namespace = NamespaceContext::new(4026531840);
//! let compiler = FilterCompiler::new(&schema, &namespace);
//!
//! let filter = compiler.compile_str("non-root", "container.uid != 0").unwrap();
//! assert_eq!(filter.scope(), Scope::Container);
//!
//! assert!(matches!(
//!     compiler.compile_str("typo", "openat.args.nosuchfield == 1"),
//!     Err(FilterError::InvalidEventArgument(_))
//! ));
//! ```

mod active;
mod compiler;
mod error;
mod expression;
mod fields;
mod matcher;
mod namespace;
mod operators;
mod parser;
mod scope;
mod value;

pub use active::{ActiveFilters, FilterSetReader};
pub use compiler::{Filter, FilterCompiler, FilterSet};
pub use error::FilterError;
pub use expression::{Expression, Leaf, ScopedExpression};
pub use fields::{ContextField, EVENT_FIELD, FieldReference, FieldResolver};
pub use matcher::matches;
pub use namespace::{DEFAULT_PROC_ROOT, HostNamespace, NamespaceContext, NamespaceProvider};
pub use operators::Operator;
pub use parser::Parser;
pub use scope::{EventClass, Scope};
pub use value::{FieldValue, Value};

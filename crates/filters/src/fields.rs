//! Resolution of the left-hand side of an expression.
//!
//! An identifier can name:
//! - the event itself, with the `event` pseudo-field or a bare event name (`execve`)
//! - an argument of an event: `execve.args.path`
//! - a context field: `uid`, `mntns`, `processName`. The form `openat.context.pid`
//!   refers to the same field restricted to a single event.
//!
//! Identifiers are checked against an [EventSchema]: anything unknown is rejected here
//! and never reaches the matcher.

use std::{fmt, str::FromStr};

use strum::{Display, EnumIter, EnumString};
use tracer_core::{Event, EventContext, EventDefinition, EventSchema, FieldType};

use crate::{FieldValue, FilterError, Scope};

/// Name of the pseudo-field holding the event name.
pub const EVENT_FIELD: &str = "event";

const ARGS_SEGMENT: &str = "args";
const CONTEXT_SEGMENT: &str = "context";

/// Metadata of an event, not part of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum ContextField {
    #[strum(to_string = "timestamp")]
    Timestamp,
    #[strum(to_string = "processorId")]
    ProcessorId,
    #[strum(to_string = "pid", serialize = "processId")]
    Pid,
    #[strum(to_string = "tid", serialize = "threadId")]
    Tid,
    #[strum(to_string = "ppid", serialize = "parentProcessId")]
    Ppid,
    #[strum(to_string = "hostPid", serialize = "hostProcessId")]
    HostPid,
    #[strum(to_string = "hostTid", serialize = "hostThreadId")]
    HostTid,
    #[strum(to_string = "hostPpid", serialize = "hostParentProcessId")]
    HostPpid,
    #[strum(to_string = "uid", serialize = "userId")]
    Uid,
    #[strum(to_string = "mntns", serialize = "mountNamespace")]
    Mntns,
    #[strum(to_string = "pidns", serialize = "pidNamespace")]
    Pidns,
    #[strum(to_string = "processName", serialize = "comm")]
    ProcessName,
    #[strum(to_string = "hostName")]
    HostName,
    #[strum(to_string = "cgroupId")]
    CgroupId,
    #[strum(to_string = "containerId")]
    ContainerId,
    #[strum(to_string = "containerImage")]
    ContainerImage,
    #[strum(to_string = "containerName")]
    ContainerName,
    #[strum(to_string = "podName")]
    PodName,
    #[strum(to_string = "syscall")]
    Syscall,
    #[strum(to_string = "retval", serialize = "returnValue")]
    ReturnValue,
}

impl ContextField {
    pub fn field_type(&self) -> FieldType {
        match self {
            ContextField::Timestamp | ContextField::CgroupId => FieldType::UInt,
            ContextField::Uid | ContextField::Mntns | ContextField::Pidns => FieldType::UInt,
            ContextField::ProcessorId
            | ContextField::Pid
            | ContextField::Tid
            | ContextField::Ppid
            | ContextField::HostPid
            | ContextField::HostTid
            | ContextField::HostPpid
            | ContextField::ReturnValue => FieldType::Int,
            ContextField::ProcessName
            | ContextField::HostName
            | ContextField::ContainerId
            | ContextField::ContainerImage
            | ContextField::ContainerName
            | ContextField::PodName
            | ContextField::Syscall => FieldType::Str,
        }
    }

    /// Fields which are only populated for events coming from a container.
    pub fn is_container_only(&self) -> bool {
        matches!(
            self,
            ContextField::ContainerId
                | ContextField::ContainerImage
                | ContextField::ContainerName
                | ContextField::PodName
        )
    }

    /// Reject fields which never hold a value in `scope`.
    pub(crate) fn check_scope(&self, scope: Scope) -> Result<(), FilterError> {
        // host events never carry container metadata
        if scope == Scope::Host && self.is_container_only() {
            return Err(FilterError::InvalidContextField(format!("{scope}.{self}")));
        }
        Ok(())
    }

    pub fn value<'a>(&self, ctx: &'a EventContext) -> FieldValue<'a> {
        match self {
            ContextField::Timestamp => FieldValue::UInt(ctx.timestamp),
            ContextField::ProcessorId => FieldValue::Int(ctx.processor_id),
            ContextField::Pid => FieldValue::Int(ctx.pid.into()),
            ContextField::Tid => FieldValue::Int(ctx.tid.into()),
            ContextField::Ppid => FieldValue::Int(ctx.ppid.into()),
            ContextField::HostPid => FieldValue::Int(ctx.host_pid.into()),
            ContextField::HostTid => FieldValue::Int(ctx.host_tid.into()),
            ContextField::HostPpid => FieldValue::Int(ctx.host_ppid.into()),
            ContextField::Uid => FieldValue::UInt(ctx.uid.into()),
            ContextField::Mntns => FieldValue::UInt(ctx.mntns.into()),
            ContextField::Pidns => FieldValue::UInt(ctx.pidns.into()),
            ContextField::ProcessName => FieldValue::Str(&ctx.process_name),
            ContextField::HostName => FieldValue::Str(&ctx.host_name),
            ContextField::CgroupId => FieldValue::UInt(ctx.cgroup_id),
            ContextField::ContainerId => FieldValue::Str(&ctx.container_id),
            ContextField::ContainerImage => FieldValue::Str(&ctx.container_image),
            ContextField::ContainerName => FieldValue::Str(&ctx.container_name),
            ContextField::PodName => FieldValue::Str(&ctx.pod_name),
            ContextField::Syscall => FieldValue::Str(&ctx.syscall),
            ContextField::ReturnValue => FieldValue::Int(ctx.return_value),
        }
    }
}

/// Resolved left-hand side of an expression leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldReference {
    /// Name of the event.
    EventName,
    /// Argument `name` of the event `event`.
    EventArgument {
        event: String,
        name: String,
        field_type: FieldType,
    },
    ContextField(ContextField),
}

impl FieldReference {
    /// Declared type of the field. The event name has no schema type.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            FieldReference::EventName => None,
            FieldReference::EventArgument { field_type, .. } => Some(*field_type),
            FieldReference::ContextField(field) => Some(field.field_type()),
        }
    }

    /// Extract the field from a live event.
    ///
    /// Returns [None] for arguments missing from the event, including every argument
    /// of a different event.
    pub fn value<'a>(&self, event: &'a Event) -> Option<FieldValue<'a>> {
        match self {
            FieldReference::EventName => Some(FieldValue::Str(&event.name)),
            FieldReference::EventArgument {
                event: event_name,
                name,
                ..
            } => {
                if event.name != *event_name {
                    return None;
                }
                event.arg(name).map(FieldValue::from)
            }
            FieldReference::ContextField(field) => Some(field.value(&event.context)),
        }
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldReference::EventName => write!(f, "{EVENT_FIELD}"),
            FieldReference::EventArgument { event, name, .. } => {
                write!(f, "{event}.{ARGS_SEGMENT}.{name}")
            }
            FieldReference::ContextField(field) => write!(f, "{field}"),
        }
    }
}

/// Schema driven lookup of identifiers.
#[derive(Debug, Clone, Copy)]
pub struct FieldResolver<'s> {
    schema: &'s EventSchema,
}

impl<'s> FieldResolver<'s> {
    pub fn new(schema: &'s EventSchema) -> Self {
        Self { schema }
    }

    /// Resolve an identifier, without its scope prefix, into a [FieldReference].
    ///
    /// A bare event name resolves to [FieldReference::EventName]. `<event>.context.<field>`
    /// resolves to the context field: use [FieldResolver::event_qualifier] to recover
    /// the event restriction.
    pub fn resolve(&self, scope: Scope, identifier: &str) -> Result<FieldReference, FilterError> {
        if identifier == EVENT_FIELD || self.schema.contains(identifier) {
            return Ok(FieldReference::EventName);
        }

        let segments: Vec<&str> = identifier.split('.').collect();
        match segments.as_slice() {
            [field] => self.resolve_context_field(scope, field),
            [event, ARGS_SEGMENT, rest @ ..] => {
                let definition = self.event(event)?;
                match rest {
                    [name] => {
                        let arg = definition.arg(name).ok_or_else(|| {
                            FilterError::InvalidEventArgument(identifier.to_string())
                        })?;
                        Ok(FieldReference::EventArgument {
                            event: definition.name.clone(),
                            name: arg.name.clone(),
                            field_type: arg.field_type,
                        })
                    }
                    _ => Err(FilterError::InvalidEventArgument(identifier.to_string())),
                }
            }
            [event, CONTEXT_SEGMENT, field] => {
                self.event(event)?;
                self.resolve_context_field(scope, field)
            }
            [event, ..] if self.schema.contains(event) => {
                Err(FilterError::InvalidEventArgument(identifier.to_string()))
            }
            [prefix, ..] => match Scope::parse(prefix) {
                // a valid scope here was left over by the caller
                Ok(_) => Err(FilterError::InvalidExpression(identifier.to_string())),
                Err(err) => Err(err),
            },
            [] => Err(FilterError::InvalidExpression(identifier.to_string())),
        }
    }

    /// Event named by an `<event>.context.<field>` identifier.
    pub fn event_qualifier<'i>(&self, identifier: &'i str) -> Option<&'i str> {
        let mut segments = identifier.split('.');
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(event), Some(CONTEXT_SEGMENT), Some(_), None) => Some(event),
            _ => None,
        }
    }

    /// Check that `name` is a known event.
    pub fn event(&self, name: &str) -> Result<&'s EventDefinition, FilterError> {
        self.schema
            .event(name)
            .ok_or_else(|| FilterError::InvalidEventName(name.to_string()))
    }

    fn resolve_context_field(&self, scope: Scope, name: &str) -> Result<FieldReference, FilterError> {
        let field = ContextField::from_str(name)
            .map_err(|_| FilterError::InvalidContextField(name.to_string()))?;
        field.check_scope(scope)?;

        Ok(FieldReference::ContextField(field))
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;
    use tracer_core::ArgValue;

    use super::*;

    fn resolve(identifier: &str) -> Result<FieldReference, FilterError> {
        let schema = EventSchema::builtin();
        FieldResolver::new(&schema).resolve(Scope::Global, identifier)
    }

    #[test]
    fn event_name() {
        assert_eq!(resolve("event"), Ok(FieldReference::EventName));
        assert_eq!(resolve("execve"), Ok(FieldReference::EventName));
    }

    #[test]
    fn event_argument() {
        assert_eq!(
            resolve("execve.args.path"),
            Ok(FieldReference::EventArgument {
                event: "execve".to_string(),
                name: "path".to_string(),
                field_type: FieldType::Str,
            })
        );
        assert_eq!(
            resolve("openat.args.nosuchfield"),
            Err(FilterError::InvalidEventArgument(
                "openat.args.nosuchfield".to_string()
            ))
        );
        assert_eq!(
            resolve("openat.args"),
            Err(FilterError::InvalidEventArgument("openat.args".to_string()))
        );
        assert_eq!(
            resolve("openat.args.path.len"),
            Err(FilterError::InvalidEventArgument(
                "openat.args.path.len".to_string()
            ))
        );
        assert_eq!(
            resolve("openat.path"),
            Err(FilterError::InvalidEventArgument("openat.path".to_string()))
        );
        assert_eq!(
            resolve("nosuchevent.args.path"),
            Err(FilterError::InvalidEventName("nosuchevent".to_string()))
        );
    }

    #[test]
    fn context_field() {
        assert_eq!(
            resolve("uid"),
            Ok(FieldReference::ContextField(ContextField::Uid))
        );
        assert_eq!(
            resolve("userId"),
            Ok(FieldReference::ContextField(ContextField::Uid))
        );
        assert_eq!(
            resolve("comm"),
            Ok(FieldReference::ContextField(ContextField::ProcessName))
        );
        assert_eq!(
            resolve("openat.context.pid"),
            Ok(FieldReference::ContextField(ContextField::Pid))
        );
        assert_eq!(
            resolve("nosuchfield"),
            Err(FilterError::InvalidContextField("nosuchfield".to_string()))
        );
        // no fuzzy matching
        assert_eq!(
            resolve("UID"),
            Err(FilterError::InvalidContextField("UID".to_string()))
        );
        assert_eq!(
            resolve("openat.context.nosuchfield"),
            Err(FilterError::InvalidContextField("nosuchfield".to_string()))
        );
        assert_eq!(
            resolve("nosuchevent.context.pid"),
            Err(FilterError::InvalidEventName("nosuchevent".to_string()))
        );
    }

    #[test]
    fn unknown_prefix_is_a_scope_error() {
        assert_eq!(
            resolve("contaner.uid"),
            Err(FilterError::InvalidScope("contaner".to_string()))
        );
    }

    #[test]
    fn container_fields_in_host_scope() {
        let schema = EventSchema::builtin();
        let resolver = FieldResolver::new(&schema);
        assert!(resolver.resolve(Scope::Container, "containerImage").is_ok());
        assert_eq!(
            resolver.resolve(Scope::Host, "containerImage"),
            Err(FilterError::InvalidContextField(
                "host.containerImage".to_string()
            ))
        );
    }

    #[test]
    fn event_qualifier() {
        let schema = EventSchema::builtin();
        let resolver = FieldResolver::new(&schema);
        assert_eq!(resolver.event_qualifier("openat.context.pid"), Some("openat"));
        assert_eq!(resolver.event_qualifier("openat.args.path"), None);
        assert_eq!(resolver.event_qualifier("pid"), None);
    }

    #[test]
    fn context_names_parse_back() {
        for field in ContextField::iter() {
            assert_eq!(ContextField::from_str(&field.to_string()).unwrap(), field);
        }
    }

    #[test]
    fn extract_values() {
        let mut event = Event::new("execve").with_arg("path", "/bin/sh");
        event.context.uid = 1000;

        let path = resolve("execve.args.path").unwrap();
        assert_eq!(path.value(&event), Some(FieldValue::Str("/bin/sh")));

        let uid = resolve("uid").unwrap();
        assert_eq!(uid.value(&event), Some(FieldValue::UInt(1000)));

        assert_eq!(
            FieldReference::EventName.value(&event),
            Some(FieldValue::Str("execve"))
        );

        let argv = resolve("execve.args.argv").unwrap();
        assert_eq!(argv.value(&event), None);

        // same argument name on a different event
        let open = Event::new("openat").with_arg("path", ArgValue::from("/bin/sh"));
        assert_eq!(path.value(&open), None);
    }
}

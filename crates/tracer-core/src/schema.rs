//! Catalogue of the events the capture subsystem is able to produce.
//!
//! Every event has a name, a numeric id and a list of typed arguments. The filter
//! engine uses this catalogue to reject unknown events and arguments before a filter
//! is accepted.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("reading schema file {path} failed")]
    ReadFile {
        #[source]
        source: std::io::Error,
        path: String,
    },
    #[error("parsing schema failed")]
    Parse(#[from] serde_yaml::Error),
    #[error("event {0} defined more than once")]
    DuplicateEvent(String),
    #[error("argument {arg} defined more than once on event {event}")]
    DuplicateArgument { event: String, arg: String },
}

/// Declared type of an event argument or of a context field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum FieldType {
    #[serde(rename = "int")]
    #[strum(serialize = "int")]
    Int,
    #[serde(rename = "uint")]
    #[strum(serialize = "uint")]
    UInt,
    #[serde(rename = "string")]
    #[strum(serialize = "string")]
    Str,
    #[serde(rename = "bool")]
    #[strum(serialize = "bool")]
    Bool,
    #[serde(rename = "string_array")]
    #[strum(serialize = "string_array")]
    StrArray,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub args: Vec<ArgDefinition>,
}

impl EventDefinition {
    pub fn arg(&self, name: &str) -> Option<&ArgDefinition> {
        self.args.iter().find(|arg| arg.name == name)
    }
}

/// Read-only catalogue of known events, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct EventSchema {
    events: BTreeMap<String, EventDefinition>,
}

impl EventSchema {
    pub fn from_definitions(definitions: Vec<EventDefinition>) -> Result<Self, SchemaError> {
        let mut events = BTreeMap::new();

        for definition in definitions {
            let mut seen = Vec::with_capacity(definition.args.len());
            for arg in &definition.args {
                if seen.contains(&arg.name.as_str()) {
                    return Err(SchemaError::DuplicateArgument {
                        event: definition.name.clone(),
                        arg: arg.name.clone(),
                    });
                }
                seen.push(arg.name.as_str());
            }

            let name = definition.name.clone();
            if events.insert(name.clone(), definition).is_some() {
                return Err(SchemaError::DuplicateEvent(name));
            }
        }

        log::debug!("Loaded schema with {} events", events.len());

        Ok(Self { events })
    }

    /// Parse a YAML list of [EventDefinition].
    pub fn from_yaml(s: &str) -> Result<Self, SchemaError> {
        let definitions: Vec<EventDefinition> = serde_yaml::from_str(s)?;
        Self::from_definitions(definitions)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        log::debug!("loading schema {}", path.display());
        let body = fs::read_to_string(path).map_err(|source| SchemaError::ReadFile {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_yaml(&body)
    }

    /// Default catalogue with the most common syscalls and scheduler events.
    pub fn builtin() -> Self {
        use FieldType::*;

        let table: &[(u32, &str, &[(&str, FieldType)])] = &[
            (0, "read", &[("fd", Int), ("count", UInt)]),
            (1, "write", &[("fd", Int), ("count", UInt)]),
            (2, "open", &[("path", Str), ("flags", Int), ("mode", UInt)]),
            (3, "close", &[("fd", Int)]),
            (41, "socket", &[("domain", Int), ("type", Int), ("protocol", Int)]),
            (42, "connect", &[("sockfd", Int), ("addr", Str)]),
            (43, "accept", &[("sockfd", Int), ("addr", Str)]),
            (49, "bind", &[("sockfd", Int), ("addr", Str)]),
            (56, "clone", &[("flags", UInt), ("tls", UInt)]),
            (57, "fork", &[]),
            (59, "execve", &[("path", Str), ("argv", StrArray), ("envp", StrArray)]),
            (60, "exit", &[("status", Int)]),
            (62, "kill", &[("pid", Int), ("sig", Int)]),
            (87, "unlink", &[("path", Str)]),
            (90, "chmod", &[("path", Str), ("mode", UInt)]),
            (101, "ptrace", &[("request", Int), ("pid", Int)]),
            (105, "setuid", &[("uid", UInt)]),
            (
                165,
                "mount",
                &[("source", Str), ("target", Str), ("filesystemtype", Str), ("mountflags", UInt)],
            ),
            (257, "openat", &[("dirfd", Int), ("path", Str), ("flags", Int), ("mode", UInt)]),
            (263, "unlinkat", &[("dirfd", Int), ("path", Str), ("flags", Int)]),
            (
                322,
                "execveat",
                &[("dirfd", Int), ("path", Str), ("argv", StrArray), ("envp", StrArray), ("flags", Int)],
            ),
            (
                1000,
                "sched_process_fork",
                &[("parent_pid", Int), ("child_pid", Int)],
            ),
            (
                1001,
                "sched_process_exec",
                &[("cmdpath", Str), ("argv", StrArray), ("interpreter", Str), ("stdin_is_tty", Bool)],
            ),
            (1002, "sched_process_exit", &[("exit_code", Int), ("process_group_exit", Bool)]),
            (1003, "security_file_open", &[("path", Str), ("flags", Int), ("dev", UInt), ("inode", UInt)]),
            (1004, "security_socket_connect", &[("sockfd", Int), ("remote_addr", Str)]),
            (1005, "net_packet_dns_request", &[("query", Str)]),
        ];

        let events = table
            .iter()
            .map(|(id, name, args)| {
                let definition = EventDefinition {
                    id: *id,
                    name: name.to_string(),
                    args: args
                        .iter()
                        .map(|(arg, field_type)| ArgDefinition {
                            name: arg.to_string(),
                            field_type: *field_type,
                        })
                        .collect(),
                };
                (definition.name.clone(), definition)
            })
            .collect();

        Self { events }
    }

    pub fn event(&self, name: &str) -> Option<&EventDefinition> {
        self.events.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    /// Iterate the known events sorted by name.
    pub fn events(&self) -> impl Iterator<Item = &EventDefinition> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A captured event as handed over by the capture subsystem.
///
/// It carries the event name, the context of the task that generated it and the
/// list of decoded arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub context: EventContext,
    #[serde(default)]
    pub args: Vec<Argument>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.push(Argument {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Returns the value of the argument with the given name, if present.
    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        self.args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }

    /// Parse an event from a single JSON document.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = &self.context;
        write!(
            f,
            "[{} {} ({}) mntns={}] {} ",
            ctx.timestamp, ctx.process_name, ctx.host_pid, ctx.mntns, self.name
        )?;
        print_args(f, &self.args)
    }
}

/// Metadata of the task which generated an event, not part of the event arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventContext {
    pub timestamp: u64,
    pub processor_id: i64,
    pub pid: i32,
    pub tid: i32,
    pub ppid: i32,
    pub host_pid: i32,
    pub host_tid: i32,
    pub host_ppid: i32,
    pub uid: u32,
    pub mntns: u32,
    pub pidns: u32,
    pub process_name: String,
    pub host_name: String,
    pub cgroup_id: u64,
    pub container_id: String,
    pub container_image: String,
    pub container_name: String,
    pub pod_name: String,
    pub syscall: String,
    pub return_value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: ArgValue,
}

/// Decoded value of an event argument.
///
/// Integers which don't fit an [i64] are kept as [ArgValue::UInt].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(String),
    StrArray(Vec<String>),
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(v.into())
    }
}

impl From<u64> for ArgValue {
    fn from(v: u64) -> Self {
        ArgValue::UInt(v)
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        ArgValue::UInt(v.into())
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(v: Vec<String>) -> Self {
        ArgValue::StrArray(v)
    }
}

impl Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(v) => write!(f, "{v}"),
            ArgValue::Int(v) => write!(f, "{v}"),
            ArgValue::UInt(v) => write!(f, "{v}"),
            ArgValue::Str(v) => write!(f, "{v}"),
            ArgValue::StrArray(v) => print_vec(f, v),
        }
    }
}

fn print_args(f: &mut fmt::Formatter<'_>, args: &[Argument]) -> fmt::Result {
    write!(f, "{{ ")?;

    for (index, arg) in args.iter().enumerate() {
        if index != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", arg.name, arg.value)?;
    }

    write!(f, " }}")
}

fn print_vec(f: &mut fmt::Formatter<'_>, v: impl IntoIterator<Item = impl Display>) -> fmt::Result {
    write!(f, "[ ")?;

    for (index, elem) in v.into_iter().enumerate() {
        if index != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{elem}")?;
    }

    write!(f, " ]")
}

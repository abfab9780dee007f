//! Types shared between the capture subsystem and its consumers: the [event::Event]
//! record, the [schema::EventSchema] describing which events exist and the section
//! based [config::SectionConfig].

pub mod config;
pub mod event;
pub mod schema;

pub use config::{ConfigError, SectionConfig};
pub use event::{ArgValue, Argument, Event, EventContext};
pub use schema::{ArgDefinition, EventDefinition, EventSchema, FieldType, SchemaError};

/// Utility function to pretty print an error with its sources.
///
/// By default Rust won't print the source of an error message, making it much less
/// useful. anyhow is used as the error pretty-printer.
pub fn log_error<E: std::error::Error + Send + Sync + 'static>(msg: &str, err: E) {
    log::error!("{}: {:?}", msg, anyhow::Error::from(err));
}

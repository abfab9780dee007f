//! tracer-filter is the administrative front end of the [filters] engine.
//!
//! It loads filter expressions from an `INI` [configuration](crate::config::TracerConfig)
//! and from the command line, compiles them against the event schema and either prints
//! the result or matches a stream of JSON events against them. Example:
//!
//! ```sh
//! # Compile and show the configured filters
//! tracer-filter check --config /etc/tracer/filters.ini
//!
//! # Match captured events, one JSON object per line
//! tracer-filter match --filter 'shell=execve.args.path endswith sh' < events.jsonl
//!
//! # List known events and context fields
//! tracer-filter schema
//! ```

pub mod cli;
pub mod config;
pub mod term_print;
pub mod tracer_filter;
pub mod utils;

pub mod metadata {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Init logger. We log from info level and above, hide timestamp
/// and module path.
/// If RUST_LOG is set, we assume the user wants to debug something
/// and use env_logger default behaviour.
pub fn init_logger(override_log_level: Option<log::LevelFilter>) {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
    } else {
        let level_filter = override_log_level.unwrap_or(log::LevelFilter::Info);

        env_logger::builder()
            .filter_level(level_filter)
            .format_timestamp(None)
            .format_module_path(false)
            .init();
    }
}

use std::{ffi::OsString, path::PathBuf};

use anyhow::{Result, ensure};
use clap::{ArgAction, Args, Parser, Subcommand};

pub const NAME: &str = "tracer-filter";

#[derive(Parser, Debug, Clone)]
#[clap(name = NAME)]
#[clap(about = "Compile event filters and match them against captured events")]
#[clap(version = crate::metadata::VERSION)]
#[clap(disable_help_subcommand = true)]
pub struct TracerFilterOpts {
    /// Pass many times for a more verbose output. Passing `-v` adds debug logs, `-vv` enables trace logging
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

impl TracerFilterOpts {
    pub fn override_log_level(&self) -> log::LevelFilter {
        log_level_from_verbosity_flag_count(self.verbosity)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Compile the configured filters and print them
    Check(FilterSource),

    /// Match events, one JSON object per line, against the configured filters
    Match(Match),

    /// Print the known events and context fields
    Schema(Schema),
}

#[derive(Args, Debug, Clone)]
pub struct FilterSource {
    /// Configuration file
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    /// Add or replace a filter: syntax is 'NAME=EXPRESSION'
    #[clap(long = "filter", short, value_parser = parse_filter_kv, value_name = "NAME=EXPRESSION")]
    pub filters: Vec<FilterKV>,
}

#[derive(Args, Debug, Clone)]
pub struct Match {
    #[command(flatten)]
    pub source: FilterSource,

    /// Read events from this file instead of the standard input
    #[clap(long, short)]
    pub events: Option<PathBuf>,

    /// Also print events matching no filter
    #[clap(long, default_value_t = false)]
    pub all: bool,
}

#[derive(Args, Debug, Clone)]
pub struct Schema {
    /// YAML schema file, the built-in schema is used when missing
    #[clap(long)]
    pub schema_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterKV {
    pub name: String,
    pub expression: String,
}

fn parse_filter_kv(input: &str) -> Result<FilterKV> {
    // split 'name=expression', the expression itself can contain '='
    let (name, expression) = input.split_once('=').unwrap_or((input, ""));
    let (name, expression) = (name.trim(), expression.trim());

    ensure!(
        !name.is_empty() && !expression.is_empty(),
        "invalid filter '{}': syntax is 'NAME=EXPRESSION'",
        input
    );
    ensure!(
        !name.contains(char::is_whitespace),
        "invalid filter name '{}': whitespace not allowed",
        name
    );

    Ok(FilterKV {
        name: name.to_string(),
        expression: expression.to_string(),
    })
}

pub fn parse_from_args() -> TracerFilterOpts {
    parse_from(std::env::args_os())
}

pub fn parse_from<I, T>(args: I) -> TracerFilterOpts
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    TracerFilterOpts::try_parse_from(args).unwrap_or_else(|e| e.exit())
}

fn log_level_from_verbosity_flag_count(num: u8) -> log::LevelFilter {
    match num {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        2..=u8::MAX => log::LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_kv() {
        assert_eq!(
            parse_filter_kv("shell=execve.args.path == /bin/sh").unwrap(),
            FilterKV {
                name: "shell".to_string(),
                expression: "execve.args.path == /bin/sh".to_string(),
            }
        );
        assert_eq!(
            parse_filter_kv("root = uid=0").unwrap().expression,
            "uid=0"
        );
        assert!(parse_filter_kv("shell").is_err());
        assert!(parse_filter_kv("=uid == 0").is_err());
        assert!(parse_filter_kv("shell=").is_err());
        assert!(parse_filter_kv("my shell=uid == 0").is_err());
    }

    #[test]
    fn subcommands() {
        let opts = TracerFilterOpts::try_parse_from([
            NAME,
            "-vv",
            "match",
            "--config",
            "/etc/tracer.ini",
            "--filter",
            "root=uid == 0",
            "-f",
            "shell=execve",
        ])
        .unwrap();

        assert_eq!(opts.override_log_level(), log::LevelFilter::Trace);
        match opts.command {
            Commands::Match(Match { source, events, all }) => {
                assert_eq!(source.config, Some(PathBuf::from("/etc/tracer.ini")));
                assert_eq!(source.filters.len(), 2);
                assert_eq!(source.filters[1].name, "shell");
                assert_eq!(events, None);
                assert!(!all);
            }
            command => panic!("unexpected command {command:?}"),
        }

        let opts = TracerFilterOpts::try_parse_from([NAME, "schema"]).unwrap();
        assert_eq!(opts.override_log_level(), log::LevelFilter::Info);
        assert!(matches!(
            opts.command,
            Commands::Schema(Schema { schema_file: None })
        ));

        assert!(TracerFilterOpts::try_parse_from([NAME]).is_err());
        assert!(TracerFilterOpts::try_parse_from([NAME, "check", "-f", "bad"]).is_err());
    }
}

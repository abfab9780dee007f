use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use filters::{
    ActiveFilters, Filter, FilterCompiler, FilterSet, FilterSetReader, HostNamespace,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    signal::unix::{signal, SignalKind},
};
use tracer_core::{Event, EventSchema};

use crate::{
    cli::{Commands, FilterKV, FilterSource, Match, Schema, TracerFilterOpts},
    config::{EngineConfig, TracerConfig},
    term_print::{ContextFields, TermPrintable, TermPrinted},
};

pub async fn tracer_filter_run(options: &TracerFilterOpts) -> Result<()> {
    log::trace!("Options: {:?}", options);

    match &options.command {
        Commands::Check(source) => Session::load(source)?.compile()?.term_print(),
        Commands::Match(Match {
            source,
            events,
            all,
        }) => {
            let active = ActiveFilters::new(Session::load(source)?.compile()?);

            let input: Box<dyn AsyncBufRead + Unpin> = match events {
                Some(path) => Box::new(BufReader::new(
                    tokio::fs::File::open(path)
                        .await
                        .with_context(|| format!("Error opening events file {path:?}"))?,
                )),
                None => Box::new(BufReader::new(tokio::io::stdin())),
            };

            let mut stdout = std::io::stdout();
            let matching = match_events(active.subscribe(), input, &mut stdout, *all);
            tokio::pin!(matching);

            let mut sig_hup = signal(SignalKind::hangup())?;

            let summary = loop {
                tokio::select! {
                    summary = &mut matching => break summary?,
                    _ = sig_hup.recv() => {
                        log::info!("Received SIGHUP, reloading filters");
                        reload(source, &active);
                    }
                }
            };

            log::info!("{} of {} events matched", summary.matched, summary.events);
            Ok(TermPrinted)
        }
        Commands::Schema(Schema { schema_file }) => {
            load_schema(schema_file.as_deref())?.term_print()?;
            ContextFields.term_print()
        }
    }?;

    Ok(())
}

/// Recompile the filters and swap them in. On failure the active set is kept.
fn reload(source: &FilterSource, active: &ActiveFilters) {
    match Session::load(source).and_then(|session| session.compile()) {
        Ok(filters) => {
            let previous = active.replace(filters);
            log::info!(
                "Reloaded filters: {} active, {} before",
                active.current().len(),
                previous.len()
            );
        }
        Err(err) => log::error!("Reload failed, keeping the active filters: {err:?}"),
    }
}

/// Everything needed to compile the configured filters.
struct Session {
    config: TracerConfig,
    engine: EngineConfig,
    schema: EventSchema,
    namespace: HostNamespace,
}

impl Session {
    fn load(source: &FilterSource) -> Result<Self> {
        let mut config = match &source.config {
            Some(config_file) => TracerConfig::from_config_file(config_file)?,
            None => TracerConfig::default(),
        };

        for FilterKV { name, expression } in &source.filters {
            log::debug!("Filter {name} from command line");
            config.force_filter(name, expression);
        }

        let engine = config.engine().context("Invalid [engine] configuration")?;
        let schema = load_schema(engine.schema_file.as_deref())?;
        let namespace = HostNamespace::new(&engine.proc_root);

        Ok(Self {
            config,
            engine,
            schema,
            namespace,
        })
    }

    fn compile(&self) -> Result<FilterSet> {
        let compiler = FilterCompiler::new(&self.schema, &self.namespace);

        let filters = self
            .config
            .enabled_filters()?
            .into_iter()
            .map(|(name, raw)| {
                compiler
                    .parser()
                    .parse(raw)
                    .and_then(|expression| {
                        compiler.compile(name, self.engine.default_scope, vec![expression])
                    })
                    .with_context(|| format!("Failed to compile filter {name}"))
            })
            .collect::<Result<Vec<Filter>>>()?;

        Ok(compiler.compile_set(filters)?)
    }
}

fn load_schema(schema_file: Option<&Path>) -> Result<EventSchema> {
    match schema_file {
        Some(path) => {
            let schema = EventSchema::from_file(path)?;
            log::debug!("Loaded {} events from {}", schema.len(), path.display());
            Ok(schema)
        }
        None => Ok(EventSchema::builtin()),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct MatchSummary {
    /// Well-formed events read.
    events: usize,
    matched: usize,
    malformed: usize,
}

/// Match every JSON line of `input` against the filters currently published to `reader`,
/// writing one line per matching event (per event with `all`) to `output`.
async fn match_events(
    reader: FilterSetReader,
    input: impl AsyncBufRead + Unpin,
    output: &mut impl Write,
    all: bool,
) -> Result<MatchSummary> {
    let mut lines = input.lines();
    let mut summary = MatchSummary::default();

    while let Some(line) = lines.next_line().await.context("Error reading events")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match Event::from_json(line) {
            Ok(event) => event,
            Err(err) => {
                summary.malformed += 1;
                tracer_core::log_error("Skipping malformed event", err);
                continue;
            }
        };
        summary.events += 1;

        // snapshot per event, a reload applies from the next line on
        let filters = reader.current();
        let names: Vec<&str> = filters.matches(&event).map(Filter::name).collect();

        if !names.is_empty() {
            summary.matched += 1;
            writeln!(output, "{} => {event}", names.join(","))?;
        } else if all {
            writeln!(output, "- => {event}")?;
        }
    }

    Ok(summary)
}

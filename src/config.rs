use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, bail};
use filters::{DEFAULT_PROC_ROOT, Scope};
use ini::{Ini, ParseOption};
use tracer_core::{ConfigError, SectionConfig};

pub const ENGINE_SECTION: &str = "engine";
pub const FILTERS_SECTION: &str = "filters";

/// Configuration of the filter engine, backed by an `INI` file.
///
/// ```ini
/// [engine]
/// schema_file = /etc/tracer/events.yaml
/// proc_root = /proc
/// default_scope = global
/// enabled = shell, root
///
/// [filters]
/// shell = execve.args.path endswith sh
/// root = container.uid == 0
/// ```
#[derive(Debug, Clone)]
pub struct TracerConfig {
    engine: SectionConfig,
    /// Filter expressions by name, in file order.
    filters: Vec<(String, String)>,
    /// Filters enabled regardless of the `enabled` list.
    forced: Vec<String>,
}

impl TracerConfig {
    pub fn from_config_file(config_file: &Path) -> Result<Self> {
        if !config_file.exists() {
            bail!("Configuration file {} not found", config_file.display());
        }

        let conf = Ini::load_from_file_opt(config_file, parse_option())
            .with_context(|| format!("Error loading configuration from {config_file:?}"))?;

        Ok(Self::from_ini(&conf))
    }

    fn from_ini(conf: &Ini) -> Self {
        let mut config = Self::default();

        for (section, prop) in conf {
            match section {
                Some(ENGINE_SECTION) => {
                    for (key, value) in prop.iter() {
                        log::debug!("{ENGINE_SECTION}.{key}={value}");
                        config.engine.insert(key, value);
                    }
                }
                Some(FILTERS_SECTION) => {
                    for (name, expression) in prop.iter() {
                        log::debug!("{FILTERS_SECTION}.{name}={expression}");
                        config.set_filter(name, expression);
                    }
                }
                Some(other) => log::warn!("Ignoring unknown configuration section [{other}]"),
                None => {}
            }
        }

        config
    }

    /// Add a filter, replacing any previous one with the same name.
    pub fn set_filter(&mut self, name: &str, expression: &str) {
        match self.filters.iter_mut().find(|(n, _)| n == name) {
            Some((_, current)) => *current = expression.to_string(),
            None => self
                .filters
                .push((name.to_string(), expression.to_string())),
        }
    }

    /// Add a filter which is always enabled.
    pub fn force_filter(&mut self, name: &str, expression: &str) {
        self.set_filter(name, expression);
        if !self.forced.iter().any(|n| n == name) {
            self.forced.push(name.to_string());
        }
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Filters selected by the `enabled` list, all of them when the list is empty.
    pub fn enabled_filters(&self) -> Result<Vec<(&str, &str)>> {
        let enabled = self.engine()?.enabled;

        for name in &enabled {
            if !self.filters.iter().any(|(n, _)| n == name) {
                bail!("enabled filter {name} is not defined in section [{FILTERS_SECTION}]");
            }
        }

        Ok(self
            .filters
            .iter()
            .filter(|(name, _)| {
                enabled.is_empty() || enabled.contains(name) || self.forced.contains(name)
            })
            .map(|(name, expression)| (name.as_str(), expression.as_str()))
            .collect())
    }

    pub fn engine(&self) -> Result<EngineConfig, ConfigError> {
        EngineConfig::try_from(&self.engine)
    }
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            engine: SectionConfig::new(ENGINE_SECTION),
            filters: Vec::new(),
            forced: Vec::new(),
        }
    }
}

/// Settings of section `[engine]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub schema_file: Option<PathBuf>,
    pub proc_root: PathBuf,
    pub default_scope: Scope,
    pub enabled: Vec<String>,
}

impl TryFrom<&SectionConfig> for EngineConfig {
    type Error = ConfigError;

    fn try_from(config: &SectionConfig) -> Result<Self, Self::Error> {
        Ok(EngineConfig {
            schema_file: config.optional("schema_file")?,
            proc_root: config.with_default("proc_root", PathBuf::from(DEFAULT_PROC_ROOT))?,
            default_scope: config.with_default("default_scope", Scope::Global)?,
            enabled: config.get_list("enabled")?,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_file: None,
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            default_scope: Scope::Global,
            enabled: Vec::new(),
        }
    }
}

impl FromStr for TracerConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let conf =
            Ini::load_from_str_opt(s, parse_option()).context("Error parsing configuration")?;

        Ok(Self::from_ini(&conf))
    }
}

// Expressions use quotes and backslashes on their own.
fn parse_option() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

use std::{collections::HashMap, fmt::Display, str::FromStr};

use thiserror::Error;

/// Settings of one section of the configuration file, as raw key/value strings.
///
/// Values are parsed on access, errors name the section and key at fault.
#[derive(Debug, Clone)]
pub struct SectionConfig {
    section: String,
    values: HashMap<String, String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("[{section}] {value} is not a valid value for {key}: {err}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        err: String,
    },
}

impl SectionConfig {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            values: HashMap::new(),
        }
    }

    /// Set a value, replacing the previous one for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns an optional typed value.
    pub fn optional<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        <T as FromStr>::Err: Display,
    {
        self.values
            .get(key)
            .map(|value| self.parse(key, value))
            .transpose()
    }

    /// Returns a typed value, falling back to `default` when missing.
    pub fn with_default<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        <T as FromStr>::Err: Display,
    {
        Ok(self.optional(key)?.unwrap_or(default))
    }

    /// Comma separated list of values, empty when the key is missing.
    pub fn get_list<T>(&self, key: &str) -> Result<Vec<T>, ConfigError>
    where
        T: FromStr,
        <T as FromStr>::Err: Display,
    {
        self.values
            .get(key)
            .iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| self.parse(key, item))
            .collect()
    }

    fn parse<T>(&self, key: &str, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        <T as FromStr>::Err: Display,
    {
        T::from_str(value).map_err(|err| ConfigError::InvalidValue {
            section: self.section.clone(),
            key: key.to_string(),
            value: value.to_string(),
            err: err.to_string(),
        })
    }
}

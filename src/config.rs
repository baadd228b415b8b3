//! Configuration management for the epubcfi tools

use serde::Deserialize;
use std::env;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Default number of open packages kept by a locator
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "epubcfi=info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Maximum number of packages a locator keeps open
    pub cache_capacity: NonZeroUsize,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Read `EPUBCFI_CACHE_CAPACITY` and `EPUBCFI_LOG`, falling back to
    /// defaults for unset variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let cache_capacity = match lookup("EPUBCFI_CACHE_CAPACITY") {
            Some(value) => parse_capacity(&value)?,
            None => defaults.cache_capacity,
        };

        Ok(Config {
            cache_capacity,
            log_filter: lookup("EPUBCFI_LOG").unwrap_or(defaults.log_filter),
        })
    }
}

fn parse_capacity(value: &str) -> Result<NonZeroUsize, ConfigError> {
    value
        .trim()
        .parse::<NonZeroUsize>()
        .map_err(|err| ConfigError::InvalidValue {
            name: "EPUBCFI_CACHE_CAPACITY",
            value: value.to_string(),
            reason: err.to_string(),
        })
}

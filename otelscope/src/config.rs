//! Configuration shared by the otelscope binaries
//!
//! Configuration is layered: built-in defaults, then an optional YAML file (or
//! the `OTELSCOPE_CONFIG` environment variable holding the same YAML), then
//! command line flags, which the binaries apply on top of [`Config`].
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{debug, error};

/// Environment variable that may carry the full YAML configuration.
pub const CONFIG_ENV_VAR: &str = "OTELSCOPE_CONFIG";

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_prometheus_timeout() -> u64 {
    30
}

fn default_pprof_tool() -> String {
    "go".to_string()
}

fn default_pprof_timeout() -> u64 {
    10
}

/// Main configuration struct for this program
#[derive(Debug, Default, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How to reach the metrics backend
    #[serde(default)]
    pub prometheus: Prometheus,
    /// How to invoke the profiling tool
    #[serde(default)]
    pub pprof: Pprof,
}

/// Settings for the Prometheus-compatible backend
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
pub struct Prometheus {
    /// Base URL of the backend, without the `/api/v1` path
    #[serde(default = "default_prometheus_url")]
    pub url: String,
    /// Upper bound on a single range query
    #[serde(default = "default_prometheus_timeout")]
    pub timeout_seconds: u64,
}

impl Default for Prometheus {
    fn default() -> Self {
        Self {
            url: default_prometheus_url(),
            timeout_seconds: default_prometheus_timeout(),
        }
    }
}

impl Prometheus {
    /// The per-request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Settings for the external profiling tool
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
pub struct Pprof {
    /// Program invoked as `<tool> tool pprof -top <file>`
    #[serde(default = "default_pprof_tool")]
    pub tool: String,
    /// Upper bound on a single tool invocation
    #[serde(default = "default_pprof_timeout")]
    pub timeout_seconds: u64,
}

impl Default for Pprof {
    fn default() -> Self {
        Self {
            tool: default_pprof_tool(),
            timeout_seconds: default_pprof_timeout(),
        }
    }
}

impl Pprof {
    /// The per-invocation timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Parse a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or names unknown fields.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        serde_yaml::from_str(contents).map_err(|err| {
            error!("Configuration validation failed: {err}");
            Error::SerdeYaml(err)
        })
    }

    /// Load the configuration
    ///
    /// `OTELSCOPE_CONFIG` takes precedence when set. Otherwise `path` is read
    /// if given, and defaults are used if it is not.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_from(env::var(CONFIG_ENV_VAR).ok(), path)
    }

    /// Load the configuration from `env_contents`, the value of
    /// `OTELSCOPE_CONFIG` if any, falling back to `path` and then defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the selected source does
    /// not parse.
    pub fn load_from(env_contents: Option<String>, path: Option<&Path>) -> Result<Self, Error> {
        if let Some(contents) = env_contents {
            debug!("Using config from env var '{CONFIG_ENV_VAR}'");
            return Self::parse(&contents);
        }
        let Some(path) = path else {
            debug!("No config file given, using defaults");
            return Ok(Self::default());
        };
        debug!("Attempting to open configuration file at: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        Self::parse(&contents)
    }
}

/// Engine configuration
///
/// Priority: CLI flags > ENV (JSONQL_*) > config file > defaults.
/// CLI overrides are applied by the binary on top of what `load` returns.

use crate::core::{QueryError, QueryResult};
use crate::executor::{ExecutionOptions, GroupColumnPolicy};
use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_CONFIG_FILE: &str = "./jsonql.toml";

/// How result sets are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}' (expected table or json)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub group_columns: GroupColumnPolicy,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_history_file")]
    pub history_file: Option<PathBuf>,
}

fn default_log_level() -> String { "jsonql=warn".to_string() }
fn default_history_file() -> Option<PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".jsonql_history");
        p
    })
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            group_columns: GroupColumnPolicy::default(),
            log_level: default_log_level(),
            history_file: default_history_file(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from `path` (must exist) or, when absent, from
    /// `./jsonql.toml` if present, then overlays `JSONQL_*` environment variables.
    pub fn load(path: Option<&Path>) -> QueryResult<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        builder = builder.add_source(Environment::with_prefix("JSONQL"));

        let config = builder
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| QueryError::config(format!("invalid configuration: {e}")))?;

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    #[must_use]
    pub const fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            group_columns: self.group_columns,
        }
    }
}

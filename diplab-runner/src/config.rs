//! Serializable run configuration (TOML).

use diplab_core::StrategyParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or schema error, flattened to one line.
    #[error("invalid config{}: {message}", at_line(*line))]
    Parse { line: Option<usize>, message: String },
}

impl ConfigError {
    fn parse(content: &str, err: &toml::de::Error) -> Self {
        let line = err.span().map(|span| {
            let end = span.start.min(content.len());
            content.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
        });
        Self::Parse {
            line,
            message: err.message().split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

fn at_line(line: Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

/// Everything needed to reproduce one simulation run.
///
/// ```toml
/// [data]
/// path = "Poloniex_BTCUSDT_1h.csv"
///
/// [strategy]
/// type = "scale_out"
/// dip_fraction = 0.975
/// purchase_amount = 1000.0
/// profit_fraction = 1.05
/// sell_fraction = 0.5
///
/// [report]
/// transcript = true
/// ```
///
/// Strategy parameters are range-checked by the simulator, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub data: DataConfig,
    pub strategy: StrategyParams,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// CSV file of bars. Relative paths resolve against the config file.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Print one line per event after the totals.
    pub transcript: bool,
}

impl RunConfig {
    pub fn new(path: impl Into<PathBuf>, strategy: StrategyParams) -> Self {
        Self {
            data: DataConfig { path: path.into() },
            strategy,
            report: ReportConfig::default(),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::parse(s, &e))
    }

    /// Load a config file and resolve its data path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if config.data.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.data.path = dir.join(&config.data.path);
            }
        }
        Ok(config)
    }
}

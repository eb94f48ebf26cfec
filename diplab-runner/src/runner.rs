//! Simulation runner: wires together loading, simulation, and summary.
//!
//! Three entry points:
//! - `run_config()`: runs a parsed [`RunConfig`]. Used by the CLI `run` command.
//! - `run_file()`: streams bars from a CSV path. Used by the per-strategy commands.
//! - `run_reader()`: streams bars from an already-open [`BarReader`].
//!
//! Bars are never collected: the reader feeds the simulator one row at a
//! time, so memory grows with the number of events only.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use diplab_core::{PriceBar, StrategyError, StrategyParams, TradeEvent};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{BarReader, LoadError};
use crate::report::Summary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Coarse classification of a [`RunError`] for user-facing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParameter,
    MalformedInput,
    ResourceUnavailable,
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Strategy(_) | Self::Config(ConfigError::Parse { .. }) => ErrorKind::InvalidParameter,
            Self::Load(LoadError::Malformed { .. }) => ErrorKind::MalformedInput,
            Self::Load(LoadError::Unavailable { .. }) | Self::Config(ConfigError::Io { .. }) => {
                ErrorKind::ResourceUnavailable
            }
        }
    }
}

/// What the input series looked like, gathered while streaming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub bar_count: usize,
    pub symbol: Option<String>,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
}

impl SeriesInfo {
    fn observe(&mut self, bar: &PriceBar) {
        self.bar_count += 1;
        if self.symbol.is_none() {
            self.symbol = Some(bar.symbol.clone());
        }
        if self.first.is_none() {
            self.first = Some(bar.timestamp);
        }
        self.last = Some(bar.timestamp);
    }
}

/// Complete result of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy: StrategyParams,
    pub source: PathBuf,
    pub series: SeriesInfo,
    /// Events in emission order.
    pub events: Vec<TradeEvent>,
}

impl RunResult {
    pub fn summary(&self) -> Summary {
        Summary::from_events(&self.events)
    }
}

/// Run the simulation described by a config.
pub fn run_config(config: &RunConfig) -> Result<RunResult, RunError> {
    run_file(&config.strategy, &config.data.path)
}

/// Stream bars from a CSV file through the selected strategy.
///
/// Parameters are validated before the file is opened, so an invalid
/// parameter set is reported as such even when the file is missing.
pub fn run_file(strategy: &StrategyParams, path: &Path) -> Result<RunResult, RunError> {
    strategy.validate()?;
    let reader = BarReader::from_path(path)?;
    run_reader(strategy, reader, path)
}

/// Stream bars from an open reader through the selected strategy.
pub fn run_reader<R: Read>(
    strategy: &StrategyParams,
    reader: BarReader<R>,
    source: impl Into<PathBuf>,
) -> Result<RunResult, RunError> {
    let source = source.into();
    let mut series = SeriesInfo::default();

    let events = strategy.try_simulate(reader.map(|bar| {
        let bar = bar?;
        series.observe(&bar);
        Ok::<_, RunError>(bar)
    }))?;

    tracing::info!(
        strategy = strategy.name(),
        source = %source.display(),
        bars = series.bar_count,
        events = events.len(),
        "simulation complete"
    );

    Ok(RunResult {
        strategy: *strategy,
        source,
        series,
        events,
    })
}

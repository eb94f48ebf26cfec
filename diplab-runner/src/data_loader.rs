//! Bar loading from delimited exchange dumps.
//!
//! Reads a CSV file with one OHLCV bar per row and yields [`PriceBar`]s
//! lazily, one record at a time. Loading policy:
//! 1. The file must open and carry every required column in its header
//! 2. Each row is parsed and checked against the bar invariants
//! 3. The first bad row ends the stream with an error; rows are never skipped
//!
//! Skipping a bad row would silently bend the all-time-high trajectory, so a
//! malformed file aborts the run instead.

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use diplab_core::PriceBar;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Format of the `date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header names every input file must provide.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "unix",
    "date",
    "symbol",
    "open",
    "high",
    "low",
    "close",
    "Volume BTC",
    "Volume USDT",
    "buyTakerAmount",
    "buyTakerQuantity",
    "tradeCount",
    "weightedAverage",
];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{}'", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input in '{}' at line {line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    unix: i64,
    date: String,
    symbol: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(rename = "Volume BTC")]
    volume_btc: f64,
    #[serde(rename = "Volume USDT")]
    volume_usdt: f64,
    #[serde(rename = "buyTakerAmount")]
    buy_taker_amount: f64,
    #[serde(rename = "buyTakerQuantity")]
    buy_taker_quantity: f64,
    #[serde(rename = "tradeCount")]
    trade_count: u64,
    #[serde(rename = "weightedAverage")]
    weighted_average: f64,
}

impl CsvRow {
    fn into_bar(self) -> Result<PriceBar, String> {
        let timestamp = NaiveDateTime::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|e| format!("invalid date '{}': {e}", self.date))?;
        let bar = PriceBar {
            unix_time: self.unix,
            timestamp,
            symbol: self.symbol,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume_base: self.volume_btc,
            volume_quote: self.volume_usdt,
            buy_taker_amount: self.buy_taker_amount,
            buy_taker_quantity: self.buy_taker_quantity,
            trade_count: self.trade_count,
            weighted_average: self.weighted_average,
        };
        bar.validate().map_err(|e| e.to_string())?;
        Ok(bar)
    }
}

/// Streaming bar reader over any byte source.
///
/// Implements `Iterator<Item = Result<PriceBar, LoadError>>`. After the first
/// error the iterator is exhausted.
pub struct BarReader<R> {
    reader: csv::Reader<R>,
    headers: StringRecord,
    record: StringRecord,
    source: PathBuf,
    last_timestamp: Option<NaiveDateTime>,
    warned_unordered: bool,
    finished: bool,
}

impl BarReader<File> {
    /// Open a CSV file for streaming.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path)
    }
}

impl<R: Read> BarReader<R> {
    /// Wrap a byte source. `source` names it in error messages.
    pub fn from_reader(rdr: R, source: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let source = source.into();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(rdr);

        let headers = reader
            .headers()
            .map_err(|e| csv_error(&source, e))?
            .clone();
        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|col| !headers.iter().any(|h| h == **col))
        {
            return Err(LoadError::Malformed {
                path: source,
                line: 1,
                reason: format!("missing column '{missing}'"),
            });
        }

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
            source,
            last_timestamp: None,
            warned_unordered: false,
            finished: false,
        })
    }

    fn parse_current(&mut self) -> Result<PriceBar, LoadError> {
        let line = self.record.position().map_or(0, |p| p.line());
        let malformed = |reason: String| LoadError::Malformed {
            path: self.source.clone(),
            line,
            reason,
        };

        let row: CsvRow = self
            .record
            .deserialize(Some(&self.headers))
            .map_err(|e| malformed(csv_kind_reason(e.into_kind())))?;
        let bar = row.into_bar().map_err(malformed)?;

        if let Some(prev) = self.last_timestamp {
            if bar.timestamp < prev && !self.warned_unordered {
                tracing::warn!(
                    file = %self.source.display(),
                    line,
                    "bar at {} precedes {}; bars are processed in file order",
                    bar.timestamp,
                    prev
                );
                self.warned_unordered = true;
            }
        }
        self.last_timestamp = Some(bar.timestamp);
        Ok(bar)
    }
}

impl<R: Read> Iterator for BarReader<R> {
    type Item = Result<PriceBar, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = match self.reader.read_record(&mut self.record) {
            Ok(false) => {
                self.finished = true;
                return None;
            }
            Ok(true) => self.parse_current(),
            Err(e) => Err(csv_error(&self.source, e)),
        };

        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

/// Load every bar of a file into memory.
///
/// Prefer [`BarReader`] for large files; the simulators accept it directly.
pub fn load_bars(path: impl AsRef<Path>) -> Result<Vec<PriceBar>, LoadError> {
    BarReader::from_path(path)?.collect()
}

fn csv_error(source: &Path, err: csv::Error) -> LoadError {
    let line = err.position().map_or(0, |p| p.line());
    match err.into_kind() {
        csv::ErrorKind::Io(io) => LoadError::Unavailable {
            path: source.to_path_buf(),
            source: io,
        },
        kind => LoadError::Malformed {
            path: source.to_path_buf(),
            line,
            reason: csv_kind_reason(kind),
        },
    }
}

fn csv_kind_reason(kind: csv::ErrorKind) -> String {
    match kind {
        csv::ErrorKind::Utf8 { err, .. } => format!("invalid UTF-8: {err}"),
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {expected_len} fields, found {len}"),
        csv::ErrorKind::Deserialize { err, .. } => deserialize_reason(&err),
        other => format!("{other:?}"),
    }
}

fn deserialize_reason(err: &csv::DeserializeError) -> String {
    match err.field() {
        Some(idx) => format!("field {}: {}", idx + 1, err.kind()),
        None => err.kind().to_string(),
    }
}

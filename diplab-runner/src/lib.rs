//! DipLab Runner: CSV loading, run configuration, orchestration, and reports.
//!
//! This crate builds on `diplab-core` to provide:
//! - Streaming CSV bar reader with row-level validation
//! - TOML run configuration
//! - Single-run orchestration with error classification
//! - Plain-text totals and trade transcript

pub mod config;
pub mod data_loader;
pub mod report;
pub mod runner;

pub use config::{ConfigError, DataConfig, ReportConfig, RunConfig};
pub use data_loader::{load_bars, BarReader, LoadError};
pub use report::{format_usd, render, render_transcript, Summary};
pub use runner::{run_config, run_file, run_reader, ErrorKind, RunError, RunResult, SeriesInfo};

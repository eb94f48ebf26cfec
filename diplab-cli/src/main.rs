//! DipLab CLI: run the dip-buy and scale-out simulators over a CSV of bars.
//!
//! Commands:
//! - `dip-buy`: buy-only simulation with flags for every parameter
//! - `scale-out`: buy and partial-sell simulation with flags for every parameter
//! - `run`: execute a simulation described by a TOML config file
//!
//! The report goes to stdout, logs and diagnostics to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use diplab_core::strategy::params::{
    DEFAULT_DIP_FRACTION, DEFAULT_PROFIT_FRACTION, DEFAULT_PURCHASE_AMOUNT, DEFAULT_SELL_FRACTION,
};
use diplab_core::{DipBuyParams, ScaleOutParams, StrategyParams};
use diplab_runner::{render, run_config, ErrorKind, RunConfig, RunError, RunResult};

#[derive(Parser)]
#[command(
    name = "diplab",
    version,
    about = "DipLab CLI: dip-buying and scale-out trade simulator"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG is used when absent.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buy a fixed dollar amount each time price dips below the all-time high.
    DipBuy {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Buy on dips with growing size and sell part of the position on rallies.
    ScaleOut {
        #[command(flatten)]
        common: CommonArgs,

        /// Sell once the high reaches this multiple of the all-time high at the last purchase.
        #[arg(long, default_value_t = DEFAULT_PROFIT_FRACTION)]
        profit_fraction: f64,

        /// Fraction of current holdings sold on each sale.
        #[arg(long, default_value_t = DEFAULT_SELL_FRACTION)]
        sell_fraction: f64,
    },
    /// Execute a simulation from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Print the trade history even if the config disables it.
        #[arg(long, default_value_t = false)]
        transcript: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// CSV file of hourly bars.
    #[arg(long)]
    data: PathBuf,

    /// Buy when the low falls to this fraction of the all-time high.
    #[arg(long, default_value_t = DEFAULT_DIP_FRACTION)]
    dip_fraction: f64,

    /// Dollars spent per purchase (base amount for scale-out).
    #[arg(long, default_value_t = DEFAULT_PURCHASE_AMOUNT)]
    amount: f64,

    /// Print one line per trade after the totals.
    #[arg(long, default_value_t = false)]
    transcript: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", diagnostic(&err));
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::DipBuy { common } => {
            let strategy = StrategyParams::DipBuy(DipBuyParams::new(common.dip_fraction, common.amount));
            run_strategy_cmd(strategy, common.data, common.transcript)
        }
        Commands::ScaleOut {
            common,
            profit_fraction,
            sell_fraction,
        } => {
            let strategy = StrategyParams::ScaleOut(ScaleOutParams {
                dip_fraction: common.dip_fraction,
                purchase_amount: common.amount,
                profit_fraction,
                sell_fraction,
            });
            run_strategy_cmd(strategy, common.data, common.transcript)
        }
        Commands::Run { config, transcript } => run_config_cmd(config, transcript),
    }
}

fn run_strategy_cmd(strategy: StrategyParams, data: PathBuf, transcript: bool) -> Result<()> {
    let mut config = RunConfig::new(data, strategy);
    config.report.transcript = transcript;
    execute(&config)
}

fn run_config_cmd(path: PathBuf, transcript: bool) -> Result<()> {
    let mut config = RunConfig::from_file(&path).map_err(RunError::from)?;
    tracing::debug!(config = %path.display(), strategy = config.strategy.name(), "loaded run config");
    config.report.transcript |= transcript;
    execute(&config)
}

fn execute(config: &RunConfig) -> Result<()> {
    let result = run_config(config)?;
    print_summary(&result, config.report.transcript)
}

fn print_summary(result: &RunResult, transcript: bool) -> Result<()> {
    print!("{}", render(result, transcript)?);
    println!();
    Ok(())
}

/// The one-line message printed to stderr on failure, causes included.
fn diagnostic(err: &anyhow::Error) -> String {
    format!("error: {err:#}")
}

/// 2 invalid parameters or config, 3 malformed input, 4 unavailable resource.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RunError>().map(RunError::kind) {
        Some(ErrorKind::InvalidParameter) => 2,
        Some(ErrorKind::MalformedInput) => 3,
        Some(ErrorKind::ResourceUnavailable) => 4,
        None => 1,
    }
}

//! DipLab Core: domain types and the dip-trading simulators.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (price bars, purchases, sales, trade events)
//! - Strategy parameters with up-front validation
//! - Buy-only dip simulator
//! - Buy-and-scale-out simulator
//!
//! Both simulators are a single forward fold over the bars. They accept any
//! iterator, so callers can stream bars from disk without materialising the
//! whole series.

pub mod domain;
pub mod strategy;

pub use domain::{BarError, PriceBar, Purchase, Sale, TradeEvent};
pub use strategy::{
    DipBuyParams, DipBuySimulator, ScaleOutOutcome, ScaleOutParams, ScaleOutSimulator,
    StrategyError, StrategyParams,
};

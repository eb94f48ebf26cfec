//! Dip-trading strategies.
//!
//! Two variants of one engine, both a single forward fold over the bars:
//! - [`DipBuySimulator`] buys a fixed dollar amount whenever the low dips to
//!   a fraction of the running all-time-high.
//! - [`ScaleOutSimulator`] adds partial profit-taking sales and scales the
//!   purchase size with the number of realised sales.
//!
//! Parameters are validated before the first bar is looked at; a rejected
//! parameter set never produces events.

pub mod dip_buy;
pub mod params;
pub mod scale_out;

pub use dip_buy::DipBuySimulator;
pub use params::{DipBuyParams, ScaleOutParams, StrategyError, StrategyParams};
pub use scale_out::{BarEvents, ScaleOutOutcome, ScaleOutSimulator};

use crate::domain::{PriceBar, TradeEvent};
use std::borrow::Borrow;

/// Running all-time-high and buy eligibility, shared by both variants.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct DipState {
    pub all_time_high: f64,
    pub can_buy: bool,
}

impl DipState {
    /// Raise the all-time-high if `bar.high` exceeds it. A new high re-arms buying.
    pub fn observe_high(&mut self, bar: &PriceBar) -> bool {
        if bar.high > self.all_time_high {
            self.all_time_high = bar.high;
            self.can_buy = true;
            true
        } else {
            false
        }
    }

    pub fn dip_target(&self, dip_fraction: f64) -> f64 {
        self.all_time_high * dip_fraction
    }

    /// True when buying is armed and the bar's low reaches the dip target.
    pub fn dip_triggered(&self, bar: &PriceBar, dip_fraction: f64) -> bool {
        self.can_buy && bar.low <= self.dip_target(dip_fraction)
    }
}

impl StrategyParams {
    /// Run the selected variant over a fallible bar sequence and return the
    /// emission-order timeline.
    ///
    /// The first `Err` from `bars` aborts the run; no partial timeline is
    /// returned.
    pub fn try_simulate<I, B, E>(&self, bars: I) -> Result<Vec<TradeEvent>, E>
    where
        I: IntoIterator<Item = Result<B, E>>,
        B: Borrow<PriceBar>,
        E: From<StrategyError>,
    {
        match self {
            Self::DipBuy(params) => {
                let purchases = DipBuySimulator::try_run(*params, bars)?;
                Ok(purchases.into_iter().map(TradeEvent::Purchase).collect())
            }
            Self::ScaleOut(params) => Ok(ScaleOutSimulator::try_run(*params, bars)?.events),
        }
    }

    /// Infallible-input form of [`StrategyParams::try_simulate`].
    pub fn simulate<I, B>(&self, bars: I) -> Result<Vec<TradeEvent>, StrategyError>
    where
        I: IntoIterator<Item = B>,
        B: Borrow<PriceBar>,
    {
        self.try_simulate(bars.into_iter().map(Ok::<B, StrategyError>))
    }
}

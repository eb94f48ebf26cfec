//! Buy-and-scale-out simulator.
//!
//! Extends the dip buyer with partial profit-taking. Per bar the order is
//! fixed: all-time-high update, then the sell check, then the buy check, so a
//! sale on a bar can re-arm a purchase on that same bar.
//!
//! Position state per run:
//!
//! ```text
//!   Idle ──purchase──▶ Holding (ready_to_sell, sell_target = ATH × profit)
//!    ▲                    │
//!    └───────sale─────────┘  (ready_to_sell cleared, buying re-armed)
//! ```
//!
//! A sale clears `ready_to_sell` even when holdings remain; only a later
//! purchase arms the next sale.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

use super::params::{ScaleOutParams, StrategyError};
use super::DipState;
use crate::domain::{PriceBar, Purchase, Sale, TradeEvent};

/// Events emitted while processing one bar. A sale, when present, always
/// precedes the purchase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarEvents {
    pub sale: Option<Sale>,
    pub purchase: Option<Purchase>,
}

impl BarEvents {
    pub fn is_empty(&self) -> bool {
        self.sale.is_none() && self.purchase.is_none()
    }
}

/// Result of a scale-out run: every event in emission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleOutOutcome {
    pub events: Vec<TradeEvent>,
}

impl ScaleOutOutcome {
    pub fn purchases(&self) -> impl Iterator<Item = &Purchase> {
        self.events.iter().filter_map(TradeEvent::as_purchase)
    }

    pub fn sales(&self) -> impl Iterator<Item = &Sale> {
        self.events.iter().filter_map(TradeEvent::as_sale)
    }

    /// Split into the ordered purchase and sale lists.
    pub fn into_parts(self) -> (Vec<Purchase>, Vec<Sale>) {
        let mut purchases = Vec::new();
        let mut sales = Vec::new();
        for event in self.events {
            match event {
                TradeEvent::Purchase(p) => purchases.push(p),
                TradeEvent::Sale(s) => sales.push(s),
            }
        }
        (purchases, sales)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn push(&mut self, bar_events: BarEvents) {
        if let Some(sale) = bar_events.sale {
            self.events.push(TradeEvent::Sale(sale));
        }
        if let Some(purchase) = bar_events.purchase {
            self.events.push(TradeEvent::Purchase(purchase));
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PositionState {
    holdings: f64,
    ready_to_sell: bool,
    sell_target: f64,
    sale_count: usize,
}

/// Dip buyer with scale-out sales.
///
/// Purchase size is `purchase_amount * log2(sales_so_far + 2)`: the first
/// purchase spends exactly `purchase_amount` and each realised sale grows
/// later purchases without bound.
#[derive(Debug, Clone)]
pub struct ScaleOutSimulator {
    params: ScaleOutParams,
    dip: DipState,
    position: PositionState,
}

impl ScaleOutSimulator {
    pub fn new(params: ScaleOutParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self {
            params,
            dip: DipState::default(),
            position: PositionState::default(),
        })
    }

    pub fn params(&self) -> &ScaleOutParams {
        &self.params
    }

    pub fn all_time_high(&self) -> f64 {
        self.dip.all_time_high
    }

    pub fn holdings(&self) -> f64 {
        self.position.holdings
    }

    pub fn ready_to_sell(&self) -> bool {
        self.position.ready_to_sell
    }

    pub fn sale_count(&self) -> usize {
        self.position.sale_count
    }

    /// Dollars the next purchase would spend.
    pub fn next_purchase_size(&self) -> f64 {
        self.params.purchase_amount * (self.position.sale_count as f64 + 2.0).log2()
    }

    /// Advance the simulation by one bar.
    pub fn on_bar(&mut self, bar: &PriceBar) -> BarEvents {
        self.dip.observe_high(bar);
        let sale = self.check_sell(bar);
        let purchase = self.check_buy(bar);
        BarEvents { sale, purchase }
    }

    fn check_sell(&mut self, bar: &PriceBar) -> Option<Sale> {
        let pos = &mut self.position;
        if !pos.ready_to_sell || pos.holdings <= 0.0 || bar.high < pos.sell_target {
            return None;
        }

        let sold = pos.holdings * self.params.sell_fraction;
        let sale = Sale {
            timestamp: bar.timestamp,
            price: bar.high,
            all_time_high: self.dip.all_time_high,
            btc_sold: sold,
            dollars_received: sold * bar.high,
            remaining_holdings: pos.holdings - sold,
        };
        pos.holdings -= sold;
        pos.ready_to_sell = false;
        pos.sale_count += 1;
        self.dip.can_buy = true;

        tracing::debug!(
            timestamp = %sale.timestamp,
            price = sale.price,
            btc = sale.btc_sold,
            remaining = sale.remaining_holdings,
            "scale-out sale"
        );
        Some(sale)
    }

    fn check_buy(&mut self, bar: &PriceBar) -> Option<Purchase> {
        if !self.dip.dip_triggered(bar, self.params.dip_fraction) {
            return None;
        }

        let size = self.next_purchase_size();
        let bought = size / bar.low;
        let pos = &mut self.position;
        let purchase = Purchase {
            timestamp: bar.timestamp,
            price: bar.low,
            all_time_high: self.dip.all_time_high,
            btc_acquired: bought,
            dollars_spent: size,
            holdings_after: Some(pos.holdings + bought),
        };
        pos.holdings += bought;
        pos.ready_to_sell = true;
        pos.sell_target = self.dip.all_time_high * self.params.profit_fraction;
        self.dip.can_buy = false;

        tracing::debug!(
            timestamp = %purchase.timestamp,
            price = purchase.price,
            spent = size,
            sell_target = pos.sell_target,
            "scale-out purchase"
        );
        Some(purchase)
    }

    /// Simulate over a fallible, lazily produced bar sequence.
    pub fn try_run<I, B, E>(params: ScaleOutParams, bars: I) -> Result<ScaleOutOutcome, E>
    where
        I: IntoIterator<Item = Result<B, E>>,
        B: Borrow<PriceBar>,
        E: From<StrategyError>,
    {
        let mut sim = Self::new(params)?;
        let mut outcome = ScaleOutOutcome::default();
        for bar in bars {
            let bar_events = sim.on_bar(bar?.borrow());
            outcome.push(bar_events);
        }
        Ok(outcome)
    }

    /// Simulate over an in-memory or borrowed bar sequence.
    pub fn run<I, B>(params: ScaleOutParams, bars: I) -> Result<ScaleOutOutcome, StrategyError>
    where
        I: IntoIterator<Item = B>,
        B: Borrow<PriceBar>,
    {
        Self::try_run(params, bars.into_iter().map(Ok::<B, StrategyError>))
    }
}

//! Buy-only dip simulator.

use std::borrow::Borrow;

use super::params::{DipBuyParams, StrategyError};
use super::DipState;
use crate::domain::{PriceBar, Purchase};

/// Buys a fixed dollar amount when the bar low dips to `dip_fraction` of the
/// all-time-high.
///
/// At most one purchase fires per all-time-high: after a purchase, buying
/// stays disarmed until a bar prints a strictly higher high. A new high
/// re-arms buying even if no purchase fired at the previous one.
#[derive(Debug, Clone)]
pub struct DipBuySimulator {
    params: DipBuyParams,
    state: DipState,
}

impl DipBuySimulator {
    pub fn new(params: DipBuyParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self {
            params,
            state: DipState::default(),
        })
    }

    pub fn params(&self) -> &DipBuyParams {
        &self.params
    }

    pub fn all_time_high(&self) -> f64 {
        self.state.all_time_high
    }

    /// Advance the simulation by one bar.
    pub fn on_bar(&mut self, bar: &PriceBar) -> Option<Purchase> {
        self.state.observe_high(bar);

        if !self.state.dip_triggered(bar, self.params.dip_fraction) {
            return None;
        }

        let purchase = Purchase {
            timestamp: bar.timestamp,
            price: bar.low,
            all_time_high: self.state.all_time_high,
            btc_acquired: self.params.purchase_amount / bar.low,
            dollars_spent: self.params.purchase_amount,
            holdings_after: None,
        };
        self.state.can_buy = false;

        tracing::debug!(
            timestamp = %purchase.timestamp,
            price = purchase.price,
            ath = purchase.all_time_high,
            btc = purchase.btc_acquired,
            "dip purchase"
        );
        Some(purchase)
    }

    /// Simulate over a fallible, lazily produced bar sequence.
    pub fn try_run<I, B, E>(params: DipBuyParams, bars: I) -> Result<Vec<Purchase>, E>
    where
        I: IntoIterator<Item = Result<B, E>>,
        B: Borrow<PriceBar>,
        E: From<StrategyError>,
    {
        let mut sim = Self::new(params)?;
        let mut purchases = Vec::new();
        for bar in bars {
            if let Some(purchase) = sim.on_bar(bar?.borrow()) {
                purchases.push(purchase);
            }
        }
        Ok(purchases)
    }

    /// Simulate over an in-memory or borrowed bar sequence.
    pub fn run<I, B>(params: DipBuyParams, bars: I) -> Result<Vec<Purchase>, StrategyError>
    where
        I: IntoIterator<Item = B>,
        B: Borrow<PriceBar>,
    {
        Self::try_run(params, bars.into_iter().map(Ok::<B, StrategyError>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_bars::bars;

    fn params(d: f64) -> DipBuyParams {
        DipBuyParams::new(d, 1000.0)
    }

    #[test]
    fn dip_below_new_high_buys_at_low() {
        let data = bars(&[100.0, 110.0], &[100.0, 95.0]);
        let purchases = DipBuySimulator::run(params(0.975), &data).unwrap();

        assert_eq!(purchases.len(), 1);
        let p = &purchases[0];
        assert_eq!(p.timestamp, data[1].timestamp);
        assert_eq!(p.price, 95.0);
        assert_eq!(p.all_time_high, 110.0);
        assert_eq!(p.dollars_spent, 1000.0);
        assert!((p.btc_acquired - 10.526_315_789).abs() < 1e-6);
    }

    #[test]
    fn first_bar_can_buy_its_own_dip() {
        // ATH is seeded at 0, so the first bar sets it and arms buying.
        let data = bars(&[100.0], &[90.0]);
        let purchases = DipBuySimulator::run(params(0.95), &data).unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].all_time_high, 100.0);
    }

    #[test]
    fn one_purchase_per_high() {
        let data = bars(
            &[100.0, 96.0, 95.0, 94.0],
            &[100.0, 90.0, 89.0, 80.0],
        );
        let purchases = DipBuySimulator::run(params(0.95), &data).unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].price, 90.0);
    }

    #[test]
    fn new_high_without_dip_waits_for_next_dip() {
        let data = bars(
            &[100.0, 96.0, 120.0, 125.0, 119.0],
            &[100.0, 90.0, 119.0, 124.0, 110.0],
        );
        let purchases = DipBuySimulator::run(params(0.95), &data).unwrap();

        assert_eq!(purchases.len(), 2);
        assert_eq!(purchases[0].price, 90.0);
        assert_eq!(purchases[1].price, 110.0);
        assert_eq!(purchases[1].all_time_high, 125.0);
    }

    #[test]
    fn invalid_dip_fraction_fails_before_bars() {
        let data = bars(&[100.0, 110.0], &[100.0, 95.0]);
        let err = DipBuySimulator::run(params(1.0), &data).unwrap_err();
        assert!(matches!(err, StrategyError::InvalidParameter { name: "dip_fraction", .. }));
    }

    #[test]
    fn empty_series_yields_no_purchases() {
        let purchases = DipBuySimulator::run(params(0.975), Vec::<PriceBar>::new()).unwrap();
        assert!(purchases.is_empty());
    }

    #[test]
    fn owned_and_borrowed_inputs_agree() {
        let data = bars(&[100.0, 110.0, 90.0], &[100.0, 95.0, 80.0]);
        let borrowed = DipBuySimulator::run(params(0.9), &data).unwrap();
        let owned = DipBuySimulator::run(params(0.9), data).unwrap();
        assert_eq!(borrowed, owned);
    }

    #[test]
    fn stepwise_tracks_all_time_high() {
        let data = bars(&[100.0, 90.0, 130.0], &[100.0, 90.0, 130.0]);
        let mut sim = DipBuySimulator::new(params(0.5)).unwrap();
        for bar in &data {
            sim.on_bar(bar);
        }
        assert_eq!(sim.all_time_high(), 130.0);
        assert_eq!(sim.params().purchase_amount, 1000.0);
    }
}

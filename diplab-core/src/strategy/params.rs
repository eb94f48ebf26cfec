//! Strategy parameters and their validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DIP_FRACTION: f64 = 0.975;
pub const DEFAULT_PURCHASE_AMOUNT: f64 = 1000.0;
pub const DEFAULT_PROFIT_FRACTION: f64 = 1.05;
pub const DEFAULT_SELL_FRACTION: f64 = 0.5;

/// Errors raised before a simulation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("invalid parameter {name} = {value}: must be {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

fn check(
    name: &'static str,
    value: f64,
    expected: &'static str,
    ok: impl Fn(f64) -> bool,
) -> Result<(), StrategyError> {
    // NaN fails every range comparison, so it is rejected here too.
    if ok(value) {
        Ok(())
    } else {
        Err(StrategyError::InvalidParameter {
            name,
            value,
            expected,
        })
    }
}

fn check_dip_fraction(value: f64) -> Result<(), StrategyError> {
    check("dip_fraction", value, "in (0, 1)", |v| v > 0.0 && v < 1.0)
}

fn check_purchase_amount(value: f64) -> Result<(), StrategyError> {
    check("purchase_amount", value, "finite and > 0", |v| {
        v.is_finite() && v > 0.0
    })
}

/// Parameters of the buy-only variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DipBuyParams {
    /// Fraction of the all-time-high at or below which a purchase fires.
    pub dip_fraction: f64,
    /// Dollars spent on every purchase.
    pub purchase_amount: f64,
}

impl DipBuyParams {
    pub fn new(dip_fraction: f64, purchase_amount: f64) -> Self {
        Self {
            dip_fraction,
            purchase_amount,
        }
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        check_dip_fraction(self.dip_fraction)?;
        check_purchase_amount(self.purchase_amount)
    }
}

impl Default for DipBuyParams {
    fn default() -> Self {
        Self::new(DEFAULT_DIP_FRACTION, DEFAULT_PURCHASE_AMOUNT)
    }
}

/// Parameters of the buy-and-scale-out variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScaleOutParams {
    pub dip_fraction: f64,
    /// Base dollar amount; the actual spend grows with the number of sales.
    pub purchase_amount: f64,
    /// Multiple of the all-time-high at purchase time that arms the sale.
    pub profit_fraction: f64,
    /// Share of current holdings liquidated per sale.
    pub sell_fraction: f64,
}

impl ScaleOutParams {
    pub fn validate(&self) -> Result<(), StrategyError> {
        check_dip_fraction(self.dip_fraction)?;
        check_purchase_amount(self.purchase_amount)?;
        check("profit_fraction", self.profit_fraction, "> 1", |v| v > 1.0)?;
        check("sell_fraction", self.sell_fraction, "in (0, 1]", |v| {
            v > 0.0 && v <= 1.0
        })
    }
}

impl Default for ScaleOutParams {
    fn default() -> Self {
        Self {
            dip_fraction: DEFAULT_DIP_FRACTION,
            purchase_amount: DEFAULT_PURCHASE_AMOUNT,
            profit_fraction: DEFAULT_PROFIT_FRACTION,
            sell_fraction: DEFAULT_SELL_FRACTION,
        }
    }
}

/// Strategy selection as it appears in a run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyParams {
    DipBuy(DipBuyParams),
    ScaleOut(ScaleOutParams),
}

impl StrategyParams {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DipBuy(_) => "dip_buy",
            Self::ScaleOut(_) => "scale_out",
        }
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        match self {
            Self::DipBuy(p) => p.validate(),
            Self::ScaleOut(p) => p.validate(),
        }
    }
}

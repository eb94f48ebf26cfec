//! Trade events emitted by the simulators.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A simulated purchase filled at the low of the triggering bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub timestamp: NaiveDateTime,
    /// Fill price (the bar low).
    pub price: f64,
    /// All-time-high in effect when the purchase fired.
    pub all_time_high: f64,
    pub btc_acquired: f64,
    pub dollars_spent: f64,
    /// Holdings after this purchase. Only tracked by the scale-out simulator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holdings_after: Option<f64>,
}

/// A simulated partial sale filled at the high of the triggering bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub timestamp: NaiveDateTime,
    /// Fill price (the bar high).
    pub price: f64,
    pub all_time_high: f64,
    pub btc_sold: f64,
    pub dollars_received: f64,
    pub remaining_holdings: f64,
}

/// One entry of a simulation timeline, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "side", rename_all = "snake_case")]
pub enum TradeEvent {
    Purchase(Purchase),
    Sale(Sale),
}

impl TradeEvent {
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Self::Purchase(p) => p.timestamp,
            Self::Sale(s) => s.timestamp,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            Self::Purchase(p) => p.price,
            Self::Sale(s) => s.price,
        }
    }

    pub fn all_time_high(&self) -> f64 {
        match self {
            Self::Purchase(p) => p.all_time_high,
            Self::Sale(s) => s.all_time_high,
        }
    }

    /// BTC moved by this event (acquired or sold).
    pub fn btc(&self) -> f64 {
        match self {
            Self::Purchase(p) => p.btc_acquired,
            Self::Sale(s) => s.btc_sold,
        }
    }

    pub fn is_purchase(&self) -> bool {
        matches!(self, Self::Purchase(_))
    }

    pub fn as_purchase(&self) -> Option<&Purchase> {
        match self {
            Self::Purchase(p) => Some(p),
            Self::Sale(_) => None,
        }
    }

    pub fn as_sale(&self) -> Option<&Sale> {
        match self {
            Self::Sale(s) => Some(s),
            Self::Purchase(_) => None,
        }
    }
}

impl From<Purchase> for TradeEvent {
    fn from(p: Purchase) -> Self {
        Self::Purchase(p)
    }
}

impl From<Sale> for TradeEvent {
    fn from(s: Sale) -> Self {
        Self::Sale(s)
    }
}

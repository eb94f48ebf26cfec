//! Domain types for DipLab

pub mod bar;
pub mod trade;

pub use bar::{BarError, PriceBar};
pub use trade::{Purchase, Sale, TradeEvent};

//! Run totals and plain-text report rendering.

use std::fmt::{self, Write};

use diplab_core::{StrategyParams, TradeEvent};
use serde::{Deserialize, Serialize};

use crate::runner::RunResult;

/// Aggregate totals over an event timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub purchase_count: usize,
    pub sale_count: usize,
    pub btc_bought: f64,
    pub dollars_spent: f64,
    pub btc_sold: f64,
    pub dollars_received: f64,
}

impl Summary {
    pub fn from_events(events: &[TradeEvent]) -> Self {
        events.iter().fold(Self::default(), |mut acc, event| {
            match event {
                TradeEvent::Purchase(p) => {
                    acc.purchase_count += 1;
                    acc.btc_bought += p.btc_acquired;
                    acc.dollars_spent += p.dollars_spent;
                }
                TradeEvent::Sale(s) => {
                    acc.sale_count += 1;
                    acc.btc_sold += s.btc_sold;
                    acc.dollars_received += s.dollars_received;
                }
            }
            acc
        })
    }

    /// Dollars received from sales minus dollars spent on purchases.
    pub fn net_proceeds(&self) -> f64 {
        self.dollars_received - self.dollars_spent
    }

    /// BTC still held at the end of the run.
    pub fn remaining_holdings(&self) -> f64 {
        self.btc_bought - self.btc_sold
    }
}

/// Render totals, and optionally the event transcript, as plain text.
pub fn render(result: &RunResult, transcript: bool) -> Result<String, fmt::Error> {
    let summary = result.summary();
    let mut out = String::new();

    writeln!(out)?;
    writeln!(out, "=== {} ===", title(&result.strategy))?;
    writeln!(out, "Source:         {}", result.source.display())?;
    if let Some(symbol) = &result.series.symbol {
        writeln!(out, "Symbol:         {symbol}")?;
    }
    if let (Some(first), Some(last)) = (result.series.first, result.series.last) {
        writeln!(out, "Period:         {first} to {last}")?;
    }
    writeln!(out, "Bars:           {}", result.series.bar_count)?;
    writeln!(out)?;

    writeln!(out, "Total purchases made: {}", summary.purchase_count)?;
    writeln!(out, "Total BTC acquired: {:.8}", summary.btc_bought)?;
    writeln!(out, "Total USD spent: {}", format_usd(summary.dollars_spent))?;

    if let StrategyParams::ScaleOut(_) = result.strategy {
        writeln!(out, "Total sales made: {}", summary.sale_count)?;
        writeln!(out, "Total BTC sold: {:.8}", summary.btc_sold)?;
        writeln!(out, "Total USD received: {}", format_usd(summary.dollars_received))?;
        writeln!(out, "Net proceeds: {}", format_usd(summary.net_proceeds()))?;
        writeln!(out, "Remaining BTC: {:.8}", summary.remaining_holdings())?;
    }

    if transcript {
        out.push_str(&render_transcript(&result.events)?);
    }
    Ok(out)
}

/// One line per event, in emission order.
pub fn render_transcript(events: &[TradeEvent]) -> Result<String, fmt::Error> {
    let mut out = String::from("\nTrade history:\n");
    if events.is_empty() {
        out.push_str("(no trades)\n");
        return Ok(out);
    }
    for event in events {
        let side = if event.is_purchase() { "BUY " } else { "SELL" };
        write!(
            out,
            "Date: {}, {side} Price: {}, BTC: {:.8}",
            event.timestamp(),
            format_usd(event.price()),
            event.btc()
        )?;
        if let TradeEvent::Sale(s) = event {
            write!(out, ", remaining: {:.8}", s.remaining_holdings)?;
        }
        writeln!(out)?;
    }
    Ok(out)
}

fn title(strategy: &StrategyParams) -> String {
    match strategy {
        StrategyParams::DipBuy(p) => format!(
            "Dip Buy (dip {:.4}, {} per purchase)",
            p.dip_fraction,
            format_usd(p.purchase_amount)
        ),
        StrategyParams::ScaleOut(p) => format!(
            "Scale Out (dip {:.4}, profit {:.4}, sell {:.2}%, base {})",
            p.dip_fraction,
            p.profit_fraction,
            p.sell_fraction * 100.0,
            format_usd(p.purchase_amount)
        ),
    }
}

/// Dollar amount with thousands separators and two decimals, e.g. `-$1,234.50`.
pub fn format_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("${amount}");
    }
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

//! Open position tracking and the closed-trade ledger record.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short; used in pnl arithmetic.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Position {
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub entry_reason: String,
}

impl Position {
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.sign() * self.quantity * (price - self.entry_price)
    }

    /// Whether the stop level is touched anywhere inside a candle spanning
    /// `low..=high`.
    pub fn stop_hit(&self, high: f64, low: f64) -> bool {
        match (self.stop_loss, self.side) {
            (Some(stop), Side::Long) => low <= stop,
            (Some(stop), Side::Short) => high >= stop,
            (None, _) => false,
        }
    }

    pub fn take_profit_hit(&self, high: f64, low: f64) -> bool {
        match (self.take_profit, self.side) {
            (Some(target), Side::Long) => high >= target,
            (Some(target), Side::Short) => low <= target,
            (None, _) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trade {
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub fees: f64,
    pub entry_reason: String,
    pub exit_reason: String,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

//! Position sizing and fee arithmetic.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionSizing {
    /// Size so that hitting the stop loses `risk_per_trade` of the balance.
    RiskFraction { risk_per_trade: f64 },
    /// Commit a fixed fraction of the balance at the entry price.
    FixedFraction { fraction: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeConfig {
    pub fee_per_trade: f64,
    pub fee_pct: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        FeeConfig {
            fee_per_trade: 0.0,
            fee_pct: 0.0,
        }
    }
}

/// Fee for one fill: flat_fee + (trade_value * pct / 100).
pub fn calculate_fee(trade_value: f64, config: &FeeConfig) -> f64 {
    config.fee_per_trade + (trade_value * config.fee_pct / 100.0)
}

/// Quantity for a new position, or 0.0 when the inputs cannot produce one.
///
/// Risk-based sizing needs a stop distance; without one it degrades to the
/// fixed-fraction formula using `risk_per_trade` as the fraction. The result
/// is capped so the position's notional never exceeds
/// `max_position_size * balance`.
pub fn calculate_quantity(
    sizing: PositionSizing,
    balance: f64,
    entry_price: f64,
    stop_price: Option<f64>,
    max_position_size: f64,
) -> f64 {
    if balance <= 0.0 || entry_price <= 0.0 {
        return 0.0;
    }
    let raw = match sizing {
        PositionSizing::RiskFraction { risk_per_trade } => {
            let stop_distance = stop_price.map(|s| (entry_price - s).abs()).unwrap_or(0.0);
            if stop_distance > 0.0 {
                risk_per_trade * balance / stop_distance
            } else {
                risk_per_trade * balance / entry_price
            }
        }
        PositionSizing::FixedFraction { fraction } => fraction * balance / entry_price,
    };
    let cap = max_position_size * balance / entry_price;
    raw.min(cap).max(0.0)
}

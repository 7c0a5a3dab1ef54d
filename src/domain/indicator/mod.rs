//! Technical indicator types and per-indicator compute modules.
//!
//! - `IndicatorPoint`: one sample of an indicator time series, aligned with
//!   the input candle at the same index; `valid = false` marks warm-up
//!   positions whose value is undefined.
//! - `IndicatorValue`: output shapes (simple or tuple).
//! - `IndicatorType`: indicator identity + parameters; hashable, used as the
//!   key of the per-run indicator table.
//! - `IndicatorSeries`: a full series, one point per input candle.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod helpers;
pub mod macd;
pub mod mfi;
pub mod obv;
pub mod registry;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod wma;

pub use registry::compute;

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: IndicatorValue,
}

impl IndicatorPoint {
    /// Warm-up placeholder; never read by the rule evaluator.
    pub fn undefined(timestamp: DateTime<Utc>) -> Self {
        IndicatorPoint {
            timestamp,
            valid: false,
            value: IndicatorValue::Simple(0.0),
        }
    }

    pub fn simple(timestamp: DateTime<Utc>, value: f64) -> Self {
        IndicatorPoint {
            timestamp,
            valid: true,
            value: IndicatorValue::Simple(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Wma(usize),
    Rsi(usize),
    Roc(usize),
    Atr(usize),
    Mfi(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

impl IndicatorType {
    /// Minimum number of candles before the first valid output.
    pub fn lookback(&self) -> usize {
        match self {
            IndicatorType::Sma(p)
            | IndicatorType::Ema(p)
            | IndicatorType::Wma(p)
            | IndicatorType::Atr(p) => *p,
            // RSI and MFI need one extra candle for the first delta/flow.
            IndicatorType::Rsi(p) | IndicatorType::Mfi(p) => *p + 1,
            IndicatorType::Roc(p) => *p + 1,
            IndicatorType::Obv => 1,
            IndicatorType::Macd { slow, signal, .. } => *slow + *signal - 1,
            IndicatorType::Stochastic { k_period, d_period } => *k_period + *d_period - 1,
            IndicatorType::Bollinger { period, .. } => *period,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Wma(period) => write!(f, "WMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Roc(period) => write!(f, "ROC({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Mfi(period) => write!(f, "MFI({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        let boll = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 200,
        };
        assert_eq!(boll.to_string(), "BOLLINGER(20,2)");
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Sma(20), "sma20");
        map.insert(IndicatorType::Sma(50), "sma50");
        map.insert(IndicatorType::Mfi(14), "mfi14");

        assert_eq!(map.get(&IndicatorType::Sma(20)), Some(&"sma20"));
        assert_eq!(map.get(&IndicatorType::Sma(50)), Some(&"sma50"));
        assert_eq!(map.get(&IndicatorType::Mfi(14)), Some(&"mfi14"));
        assert_eq!(map.get(&IndicatorType::Rsi(14)), None);
    }

    #[test]
    fn lookback_window_indicators() {
        assert_eq!(IndicatorType::Sma(5).lookback(), 5);
        assert_eq!(IndicatorType::Rsi(14).lookback(), 15);
        assert_eq!(
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .lookback(),
            34
        );
        assert_eq!(
            IndicatorType::Stochastic {
                k_period: 14,
                d_period: 3
            }
            .lookback(),
            16
        );
    }
}

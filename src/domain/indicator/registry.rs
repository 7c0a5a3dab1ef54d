//! Indicator registry: stable identifiers, parameter schemas, and dispatch.
//!
//! The indicator set is a closed enum ([`IndicatorType`]); the registry adds
//! the metadata layer external tooling needs (listing indicators, rendering
//! parameter forms) without computing anything. [`build`] turns an id plus a
//! loosely-typed parameter map into a concrete `IndicatorType`, default-filling
//! missing parameters and clamping out-of-range values to the declared bounds.
//! [`compute`] is the single dispatch point from type to calculation.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use crate::domain::indicator::{
    atr::calculate_atr, bollinger::calculate_bollinger, ema::calculate_ema,
    macd::calculate_macd, mfi::calculate_mfi, obv::calculate_obv, roc::calculate_roc,
    rsi::calculate_rsi, sma::calculate_sma, stochastic::calculate_stochastic,
    wma::calculate_wma, IndicatorSeries, IndicatorType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Number,
    Select,
    Text,
}

/// Declarative schema for one indicator parameter. Used to validate and
/// default-fill external configuration, never for runtime reflection.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct IndicatorSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

const PERIOD: ParamSpec = ParamSpec {
    name: "period",
    kind: ParamKind::Number,
    default: 14.0,
    min: 1.0,
    max: 500.0,
};

const REGISTRY: &[IndicatorSpec] = &[
    IndicatorSpec {
        id: "sma",
        name: "Simple Moving Average",
        category: "trend",
        description: "Arithmetic mean of closing prices over a window",
        params: &[ParamSpec {
            name: "period",
            kind: ParamKind::Number,
            default: 20.0,
            min: 1.0,
            max: 500.0,
        }],
    },
    IndicatorSpec {
        id: "ema",
        name: "Exponential Moving Average",
        category: "trend",
        description: "Recursively smoothed average seeded with the first SMA",
        params: &[ParamSpec {
            name: "period",
            kind: ParamKind::Number,
            default: 20.0,
            min: 1.0,
            max: 500.0,
        }],
    },
    IndicatorSpec {
        id: "wma",
        name: "Weighted Moving Average",
        category: "trend",
        description: "Linearly weighted average favoring recent closes",
        params: &[ParamSpec {
            name: "period",
            kind: ParamKind::Number,
            default: 20.0,
            min: 1.0,
            max: 500.0,
        }],
    },
    IndicatorSpec {
        id: "rsi",
        name: "Relative Strength Index",
        category: "momentum",
        description: "Wilder-smoothed gain/loss ratio bounded to [0, 100]",
        params: &[PERIOD],
    },
    IndicatorSpec {
        id: "roc",
        name: "Rate of Change",
        category: "momentum",
        description: "Percentage change of close over a window",
        params: &[ParamSpec {
            name: "period",
            kind: ParamKind::Number,
            default: 10.0,
            min: 1.0,
            max: 500.0,
        }],
    },
    IndicatorSpec {
        id: "atr",
        name: "Average True Range",
        category: "volatility",
        description: "Wilder-smoothed true range",
        params: &[PERIOD],
    },
    IndicatorSpec {
        id: "mfi",
        name: "Money Flow Index",
        category: "volume",
        description: "Volume-weighted RSI over typical price, bounded to [0, 100]",
        params: &[PERIOD],
    },
    IndicatorSpec {
        id: "obv",
        name: "On-Balance Volume",
        category: "volume",
        description: "Cumulative volume signed by close direction",
        params: &[],
    },
    IndicatorSpec {
        id: "macd",
        name: "MACD",
        category: "trend",
        description: "Fast/slow EMA spread with signal line and histogram",
        params: &[
            ParamSpec {
                name: "fast",
                kind: ParamKind::Number,
                default: 12.0,
                min: 1.0,
                max: 200.0,
            },
            ParamSpec {
                name: "slow",
                kind: ParamKind::Number,
                default: 26.0,
                min: 2.0,
                max: 500.0,
            },
            ParamSpec {
                name: "signal",
                kind: ParamKind::Number,
                default: 9.0,
                min: 1.0,
                max: 200.0,
            },
        ],
    },
    IndicatorSpec {
        id: "stochastic",
        name: "Stochastic Oscillator",
        category: "momentum",
        description: "%K position of close within the recent range, %D smoothing",
        params: &[
            ParamSpec {
                name: "k_period",
                kind: ParamKind::Number,
                default: 14.0,
                min: 1.0,
                max: 500.0,
            },
            ParamSpec {
                name: "d_period",
                kind: ParamKind::Number,
                default: 3.0,
                min: 1.0,
                max: 200.0,
            },
        ],
    },
    IndicatorSpec {
        id: "bollinger",
        name: "Bollinger Bands",
        category: "volatility",
        description: "SMA middle band with stddev-multiple envelopes",
        params: &[
            ParamSpec {
                name: "period",
                kind: ParamKind::Number,
                default: 20.0,
                min: 1.0,
                max: 500.0,
            },
            ParamSpec {
                name: "stddev_mult",
                kind: ParamKind::Number,
                default: 2.0,
                min: 0.1,
                max: 10.0,
            },
        ],
    },
];

/// Queryable metadata for every available indicator, independent of
/// computing values.
pub fn registry() -> &'static [IndicatorSpec] {
    REGISTRY
}

pub fn spec(id: &str) -> Option<&'static IndicatorSpec> {
    REGISTRY.iter().find(|s| s.id == id)
}

/// Resolve a parameter against its schema: default-fill when absent, clamp
/// when outside the declared bounds.
fn resolve_param(spec: &IndicatorSpec, param: &ParamSpec, params: &HashMap<String, f64>) -> f64 {
    match params.get(param.name) {
        None => param.default,
        Some(&v) if v < param.min || v > param.max => {
            let clamped = v.clamp(param.min, param.max);
            warn!(
                indicator = spec.id,
                param = param.name,
                value = v,
                clamped, "parameter out of bounds, clamping"
            );
            clamped
        }
        Some(&v) => v,
    }
}

/// Build a concrete indicator from a stable id and external parameters.
/// Unknown ids are the only fatal case; out-of-range parameters are clamped.
pub fn build(id: &str, params: &HashMap<String, f64>) -> Result<IndicatorType, EngineError> {
    let spec = spec(id).ok_or_else(|| EngineError::InvalidParameter {
        indicator: id.to_string(),
        param: "id".to_string(),
        reason: "unknown indicator identifier".to_string(),
    })?;

    let get = |name: &str| -> f64 {
        let param = spec
            .params
            .iter()
            .find(|p| p.name == name)
            .expect("parameter declared in registry");
        resolve_param(spec, param, params)
    };

    let indicator = match id {
        "sma" => IndicatorType::Sma(get("period") as usize),
        "ema" => IndicatorType::Ema(get("period") as usize),
        "wma" => IndicatorType::Wma(get("period") as usize),
        "rsi" => IndicatorType::Rsi(get("period") as usize),
        "roc" => IndicatorType::Roc(get("period") as usize),
        "atr" => IndicatorType::Atr(get("period") as usize),
        "mfi" => IndicatorType::Mfi(get("period") as usize),
        "obv" => IndicatorType::Obv,
        "macd" => {
            let fast = get("fast") as usize;
            let mut slow = get("slow") as usize;
            if slow <= fast {
                warn!(indicator = id, fast, slow, "slow <= fast, widening slow");
                slow = fast + 1;
            }
            IndicatorType::Macd {
                fast,
                slow,
                signal: get("signal") as usize,
            }
        }
        "stochastic" => IndicatorType::Stochastic {
            k_period: get("k_period") as usize,
            d_period: get("d_period") as usize,
        },
        "bollinger" => IndicatorType::Bollinger {
            period: get("period") as usize,
            stddev_mult_x100: (get("stddev_mult") * 100.0).round() as u32,
        },
        _ => unreachable!("id validated against registry"),
    };

    Ok(indicator)
}

/// Single dispatch point from indicator type to calculation.
pub fn compute(indicator: IndicatorType, candles: &[Candle]) -> IndicatorSeries {
    match indicator {
        IndicatorType::Sma(period) => calculate_sma(candles, period),
        IndicatorType::Ema(period) => calculate_ema(candles, period),
        IndicatorType::Wma(period) => calculate_wma(candles, period),
        IndicatorType::Rsi(period) => calculate_rsi(candles, period),
        IndicatorType::Roc(period) => calculate_roc(candles, period),
        IndicatorType::Atr(period) => calculate_atr(candles, period),
        IndicatorType::Mfi(period) => calculate_mfi(candles, period),
        IndicatorType::Obv => calculate_obv(candles),
        IndicatorType::Macd { fast, slow, signal } => {
            calculate_macd(candles, fast, slow, signal)
        }
        IndicatorType::Stochastic { k_period, d_period } => {
            calculate_stochastic(candles, k_period, d_period)
        }
        IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        } => calculate_bollinger(candles, period, stddev_mult_x100),
    }
}

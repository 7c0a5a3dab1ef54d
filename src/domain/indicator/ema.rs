//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) candles are undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::helpers::ema_over;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let ema = ema_over(&closes, period);

    let values = candles
        .iter()
        .zip(ema)
        .map(|(candle, v)| match v {
            Some(v) => IndicatorPoint::simple(candle.timestamp, v),
            None => IndicatorPoint::undefined(candle.timestamp),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

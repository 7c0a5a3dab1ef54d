//! ATR (Average True Range) with Wilder smoothing.
//!
//! Seed: simple mean of the first n true ranges (first candle uses high - low).
//! Subsequent: atr = (prev_atr * (n-1) + tr) / n.
//! Warmup: first (n-1) candles are undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_atr(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    if period == 0 {
        values.extend(candles.iter().map(|c| IndicatorPoint::undefined(c.timestamp)));
        return IndicatorSeries {
            indicator_type: IndicatorType::Atr(period),
            values,
        };
    }

    let mut tr_values: Vec<f64> = Vec::with_capacity(candles.len());
    for (i, candle) in candles.iter().enumerate() {
        let tr = if i == 0 {
            candle.high - candle.low
        } else {
            candle.true_range(candles[i - 1].close)
        };
        tr_values.push(tr);
    }

    let mut atr = 0.0;
    for (i, candle) in candles.iter().enumerate() {
        if i + 1 < period {
            values.push(IndicatorPoint::undefined(candle.timestamp));
        } else if i + 1 == period {
            atr = tr_values[..period].iter().sum::<f64>() / period as f64;
            values.push(IndicatorPoint::simple(candle.timestamp, atr));
        } else {
            atr = (atr * (period - 1) as f64 + tr_values[i]) / period as f64;
            values.push(IndicatorPoint::simple(candle.timestamp, atr));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}

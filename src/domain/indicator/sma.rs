//! Simple Moving Average: arithmetic mean of the last n closes.
//!
//! Warmup: first (n-1) candles are undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_sma(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    if period == 0 {
        values.extend(candles.iter().map(|c| IndicatorPoint::undefined(c.timestamp)));
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values,
        };
    }

    let mut sum = 0.0;
    for (i, candle) in candles.iter().enumerate() {
        sum += candle.close;
        if i >= period {
            sum -= candles[i - period].close;
        }
        if i + 1 >= period {
            values.push(IndicatorPoint::simple(candle.timestamp, sum / period as f64));
        } else {
            values.push(IndicatorPoint::undefined(candle.timestamp));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

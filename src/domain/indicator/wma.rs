//! Weighted Moving Average: linearly increasing weights favoring recent closes.
//!
//! WMA[i] = sum(close[i-n+1+j] * (j+1)) / (n * (n+1) / 2)
//! Warmup: first (n-1) candles are undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_wma(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    if period == 0 {
        values.extend(candles.iter().map(|c| IndicatorPoint::undefined(c.timestamp)));
        return IndicatorSeries {
            indicator_type: IndicatorType::Wma(period),
            values,
        };
    }

    let denominator = (period * (period + 1)) as f64 / 2.0;

    for (i, candle) in candles.iter().enumerate() {
        if i + 1 < period {
            values.push(IndicatorPoint::undefined(candle.timestamp));
            continue;
        }

        let window = &candles[i + 1 - period..=i];
        let weighted_sum: f64 = window
            .iter()
            .enumerate()
            .map(|(j, c)| c.close * (j + 1) as f64)
            .sum();

        values.push(IndicatorPoint::simple(
            candle.timestamp,
            weighted_sum / denominator,
        ));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Wma(period),
        values,
    }
}

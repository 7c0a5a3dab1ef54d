//! ROC (Rate of Change): percentage change of close over n candles.
//!
//! ROC[i] = 100 * (close[i] - close[i-n]) / close[i-n]
//! Warmup: first n candles are undefined. A zero reference close resolves
//! to 0 rather than dividing by zero.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_roc(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    if period == 0 {
        values.extend(candles.iter().map(|c| IndicatorPoint::undefined(c.timestamp)));
        return IndicatorSeries {
            indicator_type: IndicatorType::Roc(period),
            values,
        };
    }

    for (i, candle) in candles.iter().enumerate() {
        if i < period {
            values.push(IndicatorPoint::undefined(candle.timestamp));
            continue;
        }
        let reference = candles[i - period].close;
        let roc = if reference == 0.0 {
            0.0
        } else {
            100.0 * (candle.close - reference) / reference
        };
        values.push(IndicatorPoint::simple(candle.timestamp, roc));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Roc(period),
        values,
    }
}

//! Stochastic oscillator.
//!
//! %K = 100 * (close - lowest_low(k)) / (highest_high(k) - lowest_low(k))
//! %D = SMA(d) of %K. A flat window (highest == lowest) resolves %K to the
//! 50 midpoint rather than dividing by zero. Bounded to [0, 100].
//!
//! Warmup: first (k-1) + (d-1) candles are undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Stochastic { k_period, d_period };
    let mut values = Vec::with_capacity(candles.len());

    if k_period == 0 || d_period == 0 {
        values.extend(candles.iter().map(|c| IndicatorPoint::undefined(c.timestamp)));
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let mut k_values: Vec<Option<f64>> = Vec::with_capacity(candles.len());
    for (i, candle) in candles.iter().enumerate() {
        if i + 1 < k_period {
            k_values.push(None);
            continue;
        }
        let window = &candles[i + 1 - k_period..=i];
        let highest = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let k = if highest == lowest {
            50.0
        } else {
            100.0 * (candle.close - lowest) / (highest - lowest)
        };
        k_values.push(Some(k.clamp(0.0, 100.0)));
    }

    for (i, candle) in candles.iter().enumerate() {
        let d_ready = i + 1 >= k_period + d_period - 1;
        if !d_ready {
            values.push(IndicatorPoint::undefined(candle.timestamp));
            continue;
        }

        let k = k_values[i].unwrap_or(50.0);
        let d = k_values[i + 1 - d_period..=i]
            .iter()
            .map(|v| v.unwrap_or(50.0))
            .sum::<f64>()
            / d_period as f64;

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: IndicatorValue::Stochastic { k, d },
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

//! MACD (Moving Average Convergence Divergence).
//!
//! line = EMA(fast) - EMA(slow); signal = EMA(signal_period) of the line;
//! histogram = line - signal. Points are defined only once all three parts
//! are available, i.e. from index (slow - 1) + (signal_period - 1).

use crate::domain::candle::Candle;
use crate::domain::indicator::helpers::ema_over;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };

    let mut values = Vec::with_capacity(candles.len());

    if fast == 0 || slow == 0 || signal_period == 0 || fast >= slow {
        values.extend(candles.iter().map(|c| IndicatorPoint::undefined(c.timestamp)));
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast_ema = ema_over(&closes, fast);
    let slow_ema = ema_over(&closes, slow);

    // MACD line exists from slow-1 onward; signal is an EMA over that suffix.
    let line_start = slow.saturating_sub(1);
    let line: Vec<f64> = (line_start..candles.len())
        .map(|i| fast_ema[i].unwrap_or(0.0) - slow_ema[i].unwrap_or(0.0))
        .collect();
    let signal = ema_over(&line, signal_period);

    for (i, candle) in candles.iter().enumerate() {
        if i < line_start {
            values.push(IndicatorPoint::undefined(candle.timestamp));
            continue;
        }
        let j = i - line_start;
        match signal[j] {
            Some(sig) => values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: true,
                value: IndicatorValue::Macd {
                    line: line[j],
                    signal: sig,
                    histogram: line[j] - sig,
                },
            }),
            None => values.push(IndicatorPoint::undefined(candle.timestamp)),
        }
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

//! Bollinger bands: SMA middle band ± multiplier × population stddev.
//!
//! Warmup: first (n-1) candles are undefined. The multiplier is carried as
//! an integer hundredth (200 = 2.0) so the type stays hashable.

use crate::domain::candle::Candle;
use crate::domain::indicator::helpers::{mean, stddev};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_bollinger(
    candles: &[Candle],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100,
    };
    let mult = stddev_mult_x100 as f64 / 100.0;
    let mut values = Vec::with_capacity(candles.len());

    if period == 0 {
        values.extend(candles.iter().map(|c| IndicatorPoint::undefined(c.timestamp)));
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    for (i, candle) in candles.iter().enumerate() {
        if i + 1 < period {
            values.push(IndicatorPoint::undefined(candle.timestamp));
            continue;
        }

        let window = &closes[i + 1 - period..=i];
        let middle = mean(window);
        let band = mult * stddev(window);

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: IndicatorValue::Bollinger {
                upper: middle + band,
                middle,
                lower: middle - band,
            },
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Timeframe;
    use chrono::{Duration, TimeZone, Utc};

    fn make_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                symbol: "TEST".into(),
                timeframe: Timeframe::H1,
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + Duration::hours(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn bollinger_warmup() {
        let candles = make_candles(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_bollinger(&candles, 3, 200);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn bollinger_band_symmetry() {
        let candles = make_candles(&[10.0, 20.0, 30.0, 25.0, 15.0]);
        let series = calculate_bollinger(&candles, 3, 200);

        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } = point.value
            {
                assert!((upper - middle - (middle - lower)).abs() < 1e-9);
                assert!(upper >= middle && middle >= lower);
            } else {
                panic!("Expected Bollinger value");
            }
        }
    }

    #[test]
    fn bollinger_flat_prices_collapse_bands() {
        let candles = make_candles(&[100.0; 5]);
        let series = calculate_bollinger(&candles, 3, 200);

        if let IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } = series.values[4].value
        {
            assert!((upper - 100.0).abs() < f64::EPSILON);
            assert!((middle - 100.0).abs() < f64::EPSILON);
            assert!((lower - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn bollinger_known_window() {
        let candles = make_candles(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&candles, 3, 100);

        // mean 20, population stddev sqrt(200/3)
        let sd = (200.0_f64 / 3.0).sqrt();
        if let IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } = series.values[2].value
        {
            assert!((middle - 20.0).abs() < 1e-12);
            assert!((upper - (20.0 + sd)).abs() < 1e-9);
            assert!((lower - (20.0 - sd)).abs() < 1e-9);
        }
    }
}

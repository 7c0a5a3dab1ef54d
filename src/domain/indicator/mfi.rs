//! MFI (Money Flow Index).
//!
//! Raw money flow = typical_price * volume, signed by the typical-price
//! change versus the previous candle. Over the last n flows:
//! MFI = 100 - 100 / (1 + positive_flow / negative_flow).
//! Zero negative flow saturates to 100; a window with no flow at all (flat
//! prices) resolves to the 50 midpoint. Bounded to [0, 100].
//!
//! Warmup: first n candles are undefined (n flows need n+1 candles).

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_mfi(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    if period == 0 || candles.len() < 2 {
        values.extend(candles.iter().map(|c| IndicatorPoint::undefined(c.timestamp)));
        return IndicatorSeries {
            indicator_type: IndicatorType::Mfi(period),
            values,
        };
    }

    // Signed flow per change; index i holds the flow from candle i-1 to i.
    let mut positive: Vec<f64> = Vec::with_capacity(candles.len() - 1);
    let mut negative: Vec<f64> = Vec::with_capacity(candles.len() - 1);
    for i in 1..candles.len() {
        let tp = candles[i].typical_price();
        let prev_tp = candles[i - 1].typical_price();
        let flow = tp * candles[i].volume;
        if tp > prev_tp {
            positive.push(flow);
            negative.push(0.0);
        } else if tp < prev_tp {
            positive.push(0.0);
            negative.push(flow);
        } else {
            positive.push(0.0);
            negative.push(0.0);
        }
    }

    values.push(IndicatorPoint::undefined(candles[0].timestamp));

    for (i, candle) in candles.iter().enumerate().skip(1) {
        let flow_idx = i - 1;
        if flow_idx + 1 < period {
            values.push(IndicatorPoint::undefined(candle.timestamp));
            continue;
        }

        let window = flow_idx + 1 - period..=flow_idx;
        let pos: f64 = positive[window.clone()].iter().sum();
        let neg: f64 = negative[window].iter().sum();

        let mfi = if pos == 0.0 && neg == 0.0 {
            50.0
        } else if neg == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + pos / neg)
        };
        values.push(IndicatorPoint::simple(candle.timestamp, mfi));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Mfi(period),
        values,
    }
}

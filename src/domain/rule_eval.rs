//! Rule evaluation against candle history and pre-computed indicator series.
//!
//! Evaluation is tri-state: a rule fires, holds, or is not ready because an
//! operand is still inside its indicator warm-up window. Cross comparators
//! read the previous step as well as the current one and never fire on the
//! first evaluable step.

use std::collections::HashMap;

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::rule::{Comparator, IndicatorField, Operand, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Fire,
    Hold,
    NotReady,
}

fn extract_field(value: &IndicatorValue, field: IndicatorField) -> Option<f64> {
    match (value, field) {
        (IndicatorValue::Simple(v), IndicatorField::Value) => Some(*v),
        (IndicatorValue::Macd { line, .. }, IndicatorField::MacdLine) => Some(*line),
        (IndicatorValue::Macd { signal, .. }, IndicatorField::MacdSignal) => Some(*signal),
        (IndicatorValue::Macd { histogram, .. }, IndicatorField::MacdHistogram) => Some(*histogram),
        (IndicatorValue::Stochastic { k, .. }, IndicatorField::StochasticK) => Some(*k),
        (IndicatorValue::Stochastic { d, .. }, IndicatorField::StochasticD) => Some(*d),
        (IndicatorValue::Bollinger { upper, .. }, IndicatorField::BollingerUpper) => Some(*upper),
        (IndicatorValue::Bollinger { middle, .. }, IndicatorField::BollingerMiddle) => Some(*middle),
        (IndicatorValue::Bollinger { lower, .. }, IndicatorField::BollingerLower) => Some(*lower),
        _ => None,
    }
}

fn resolve_operand(
    operand: &Operand,
    candles: &[Candle],
    series: &HashMap<IndicatorType, IndicatorSeries>,
    step: usize,
) -> Option<f64> {
    let candle = candles.get(step)?;
    match operand {
        Operand::Open => Some(candle.open),
        Operand::High => Some(candle.high),
        Operand::Low => Some(candle.low),
        Operand::Close => Some(candle.close),
        Operand::Volume => Some(candle.volume),
        Operand::Constant(v) => Some(*v),
        Operand::Indicator(ind_ref) => {
            let points = &series.get(&ind_ref.indicator_type)?.values;
            let point = points.get(step)?;
            if !point.valid {
                return None;
            }
            extract_field(&point.value, ind_ref.field)
        }
    }
}

/// Evaluate one rule at `step`.
///
/// An undefined operand at the current step yields `NotReady`. Cross
/// comparators additionally require both operands at `step - 1`; when the
/// previous step is unavailable the rule holds rather than firing.
pub fn evaluate_rule(
    rule: &Rule,
    candles: &[Candle],
    series: &HashMap<IndicatorType, IndicatorSeries>,
    step: usize,
) -> Signal {
    let left = resolve_operand(&rule.left, candles, series, step);
    let right = resolve_operand(&rule.right, candles, series, step);
    let (left, right) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        _ => return Signal::NotReady,
    };

    match rule.comparator {
        Comparator::Above => {
            if left > right {
                Signal::Fire
            } else {
                Signal::Hold
            }
        }
        Comparator::Below => {
            if left < right {
                Signal::Fire
            } else {
                Signal::Hold
            }
        }
        Comparator::CrossesAbove | Comparator::CrossesBelow => {
            if step == 0 {
                return Signal::Hold;
            }
            let prev_left = resolve_operand(&rule.left, candles, series, step - 1);
            let prev_right = resolve_operand(&rule.right, candles, series, step - 1);
            let (prev_left, prev_right) = match (prev_left, prev_right) {
                (Some(l), Some(r)) => (l, r),
                _ => return Signal::Hold,
            };
            let fired = match rule.comparator {
                Comparator::CrossesAbove => prev_left <= prev_right && left > right,
                Comparator::CrossesBelow => prev_left >= prev_right && left < right,
                _ => unreachable!(),
            };
            if fired {
                Signal::Fire
            } else {
                Signal::Hold
            }
        }
    }
}

/// Conjunction over an entry rule set.
///
/// Fires only when every rule fires; any rule still warming up blocks the
/// whole set with `NotReady`.
pub fn evaluate_entry(
    rules: &[Rule],
    candles: &[Candle],
    series: &HashMap<IndicatorType, IndicatorSeries>,
    step: usize,
) -> Signal {
    if rules.is_empty() {
        return Signal::Hold;
    }
    let mut all_fire = true;
    for rule in rules {
        match evaluate_rule(rule, candles, series, step) {
            Signal::NotReady => return Signal::NotReady,
            Signal::Hold => all_fire = false,
            Signal::Fire => {}
        }
    }
    if all_fire { Signal::Fire } else { Signal::Hold }
}

/// First exit rule that fires at `step`, in configured order.
pub fn evaluate_exit(
    rules: &[Rule],
    candles: &[Candle],
    series: &HashMap<IndicatorType, IndicatorSeries>,
    step: usize,
) -> Option<usize> {
    rules
        .iter()
        .position(|rule| evaluate_rule(rule, candles, series, step) == Signal::Fire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Timeframe;
    use crate::domain::indicator::{compute, IndicatorType};
    use crate::domain::rule::IndicatorRef;
    use chrono::{TimeZone, Utc};

    fn make_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                symbol: "TEST".to_string(),
                timeframe: Timeframe::H1,
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn series_for(
        candles: &[Candle],
        types: &[IndicatorType],
    ) -> HashMap<IndicatorType, IndicatorSeries> {
        types
            .iter()
            .map(|&t| (t, compute(t, candles)))
            .collect()
    }

    #[test]
    fn above_fires_on_strict_inequality() {
        let candles = make_candles(&[100.0, 101.0]);
        let series = HashMap::new();
        let rule = Rule::new(Operand::Close, Comparator::Above, Operand::Constant(100.0));
        assert_eq!(evaluate_rule(&rule, &candles, &series, 0), Signal::Hold);
        assert_eq!(evaluate_rule(&rule, &candles, &series, 1), Signal::Fire);
    }

    #[test]
    fn below_holds_on_equality() {
        let candles = make_candles(&[100.0]);
        let series = HashMap::new();
        let rule = Rule::new(Operand::Close, Comparator::Below, Operand::Constant(100.0));
        assert_eq!(evaluate_rule(&rule, &candles, &series, 0), Signal::Hold);
    }

    #[test]
    fn not_ready_during_indicator_warmup() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let sma3 = IndicatorType::Sma(3);
        let series = series_for(&candles, &[sma3]);
        let rule = Rule::new(
            Operand::Close,
            Comparator::Above,
            Operand::Indicator(IndicatorRef::value(sma3)),
        );
        assert_eq!(evaluate_rule(&rule, &candles, &series, 0), Signal::NotReady);
        assert_eq!(evaluate_rule(&rule, &candles, &series, 1), Signal::NotReady);
        assert_eq!(evaluate_rule(&rule, &candles, &series, 2), Signal::Fire);
    }

    #[test]
    fn crosses_above_fires_only_on_transition() {
        // Close sits below 100, crosses it once, then stays above.
        let candles = make_candles(&[99.0, 101.0, 102.0]);
        let series = HashMap::new();
        let rule = Rule::new(
            Operand::Close,
            Comparator::CrossesAbove,
            Operand::Constant(100.0),
        );
        assert_eq!(evaluate_rule(&rule, &candles, &series, 0), Signal::Hold);
        assert_eq!(evaluate_rule(&rule, &candles, &series, 1), Signal::Fire);
        assert_eq!(evaluate_rule(&rule, &candles, &series, 2), Signal::Hold);
    }

    #[test]
    fn crosses_above_from_equality_counts() {
        let candles = make_candles(&[100.0, 101.0]);
        let series = HashMap::new();
        let rule = Rule::new(
            Operand::Close,
            Comparator::CrossesAbove,
            Operand::Constant(100.0),
        );
        assert_eq!(evaluate_rule(&rule, &candles, &series, 1), Signal::Fire);
    }

    #[test]
    fn crosses_below_mirror() {
        let candles = make_candles(&[101.0, 99.0, 98.0]);
        let series = HashMap::new();
        let rule = Rule::new(
            Operand::Close,
            Comparator::CrossesBelow,
            Operand::Constant(100.0),
        );
        assert_eq!(evaluate_rule(&rule, &candles, &series, 1), Signal::Fire);
        assert_eq!(evaluate_rule(&rule, &candles, &series, 2), Signal::Hold);
    }

    #[test]
    fn crosses_holds_when_previous_step_is_warmup() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let sma3 = IndicatorType::Sma(3);
        let series = series_for(&candles, &[sma3]);
        let rule = Rule::new(
            Operand::Close,
            Comparator::CrossesAbove,
            Operand::Indicator(IndicatorRef::value(sma3)),
        );
        // Step 2 is the first step with a defined SMA; the previous step is
        // still warming up, so no cross can be observed yet.
        assert_eq!(evaluate_rule(&rule, &candles, &series, 2), Signal::Hold);
    }

    #[test]
    fn entry_requires_all_rules() {
        let candles = make_candles(&[100.0, 105.0]);
        let series = HashMap::new();
        let rules = vec![
            Rule::new(Operand::Close, Comparator::Above, Operand::Constant(100.0)),
            Rule::new(Operand::Close, Comparator::Below, Operand::Constant(104.0)),
        ];
        assert_eq!(evaluate_entry(&rules, &candles, &series, 1), Signal::Hold);

        let rules = vec![
            Rule::new(Operand::Close, Comparator::Above, Operand::Constant(100.0)),
            Rule::new(Operand::Close, Comparator::Below, Operand::Constant(110.0)),
        ];
        assert_eq!(evaluate_entry(&rules, &candles, &series, 1), Signal::Fire);
    }

    #[test]
    fn entry_not_ready_blocks_the_set() {
        let candles = make_candles(&[10.0, 11.0, 12.0]);
        let sma3 = IndicatorType::Sma(3);
        let series = series_for(&candles, &[sma3]);
        let rules = vec![
            Rule::new(Operand::Close, Comparator::Above, Operand::Constant(0.0)),
            Rule::new(
                Operand::Close,
                Comparator::Above,
                Operand::Indicator(IndicatorRef::value(sma3)),
            ),
        ];
        assert_eq!(evaluate_entry(&rules, &candles, &series, 1), Signal::NotReady);
    }

    #[test]
    fn empty_entry_set_never_fires() {
        let candles = make_candles(&[100.0]);
        let series = HashMap::new();
        assert_eq!(evaluate_entry(&[], &candles, &series, 0), Signal::Hold);
    }

    #[test]
    fn exit_returns_first_firing_rule() {
        let candles = make_candles(&[100.0]);
        let series = HashMap::new();
        let rules = vec![
            Rule::new(Operand::Close, Comparator::Below, Operand::Constant(50.0)),
            Rule::new(Operand::Close, Comparator::Above, Operand::Constant(50.0)),
            Rule::new(Operand::Close, Comparator::Above, Operand::Constant(10.0)),
        ];
        assert_eq!(evaluate_exit(&rules, &candles, &series, 0), Some(1));
    }
}

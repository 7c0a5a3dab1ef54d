//! Strategy definition: rule sets plus execution parameters.

use crate::domain::candle::Timeframe;
use crate::domain::indicator::IndicatorType;
use crate::domain::position::Side;
use crate::domain::rule::{collect_indicators, Rule};
use crate::domain::sizing::{FeeConfig, PositionSizing};

#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub side: Side,
    /// Logical AND; all must fire on the same candle to enter.
    pub entry_rules: Vec<Rule>,
    /// Checked in order; the first firing rule closes the position.
    pub exit_rules: Vec<Rule>,
    /// Stop distance as a fraction of entry price (0.02 = 2%).
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub sizing: PositionSizing,
    /// Cap on position notional as a fraction of balance.
    pub max_position_size: f64,
    pub fees: FeeConfig,
}

impl Strategy {
    /// Every indicator referenced by any rule, deduplicated, for one
    /// precomputation pass before the run loop starts.
    pub fn referenced_indicators(&self) -> Vec<IndicatorType> {
        let mut rules = self.entry_rules.clone();
        rules.extend(self.exit_rules.clone());
        collect_indicators(&rules)
    }

    /// Longest warm-up across referenced indicators; the run needs at least
    /// this many candles to ever produce a signal.
    pub fn max_lookback(&self) -> usize {
        self.referenced_indicators()
            .iter()
            .map(|i| i.lookback())
            .max()
            .unwrap_or(0)
    }

    pub fn stop_price(&self, entry_price: f64) -> Option<f64> {
        self.stop_loss_pct
            .filter(|pct| *pct > 0.0)
            .map(|pct| entry_price * (1.0 - self.side.sign() * pct))
    }

    pub fn take_profit_price(&self, entry_price: f64) -> Option<f64> {
        self.take_profit_pct
            .filter(|pct| *pct > 0.0)
            .map(|pct| entry_price * (1.0 + self.side.sign() * pct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{Comparator, IndicatorRef, Operand};

    fn sample_strategy() -> Strategy {
        Strategy {
            name: "SMA Crossover".into(),
            symbol: "BTCUSDT".into(),
            timeframe: Timeframe::H1,
            side: Side::Long,
            entry_rules: vec![Rule::new(
                Operand::Indicator(IndicatorRef::value(IndicatorType::Sma(5))),
                Comparator::CrossesAbove,
                Operand::Indicator(IndicatorRef::value(IndicatorType::Sma(20))),
            )],
            exit_rules: vec![Rule::new(
                Operand::Indicator(IndicatorRef::value(IndicatorType::Sma(5))),
                Comparator::CrossesBelow,
                Operand::Indicator(IndicatorRef::value(IndicatorType::Sma(20))),
            )],
            stop_loss_pct: Some(0.02),
            take_profit_pct: None,
            sizing: PositionSizing::FixedFraction { fraction: 0.25 },
            max_position_size: 1.0,
            fees: FeeConfig::default(),
        }
    }

    #[test]
    fn referenced_indicators_deduplicated() {
        let s = sample_strategy();
        assert_eq!(
            s.referenced_indicators(),
            vec![IndicatorType::Sma(5), IndicatorType::Sma(20)]
        );
    }

    #[test]
    fn max_lookback_is_longest_warmup() {
        let s = sample_strategy();
        assert_eq!(s.max_lookback(), 20);
    }

    #[test]
    fn stop_and_take_prices_long() {
        let s = sample_strategy();
        let stop = s.stop_price(100.0).unwrap();
        assert!((stop - 98.0).abs() < f64::EPSILON);
        assert!(s.take_profit_price(100.0).is_none());
    }

    #[test]
    fn stop_and_take_prices_short() {
        let mut s = sample_strategy();
        s.side = Side::Short;
        s.take_profit_pct = Some(0.05);
        let stop = s.stop_price(100.0).unwrap();
        let take = s.take_profit_price(100.0).unwrap();
        assert!((stop - 102.0).abs() < f64::EPSILON);
        assert!((take - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_pct_levels_disabled() {
        let mut s = sample_strategy();
        s.stop_loss_pct = Some(0.0);
        assert!(s.stop_price(100.0).is_none());
    }
}

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use quantsim::domain::candle::{Candle, Timeframe};
use quantsim::domain::error::EngineError;
use quantsim::domain::position::Side;
use quantsim::domain::rule::{Comparator, IndicatorRef, Operand, Rule};
use quantsim::domain::indicator::IndicatorType;
use quantsim::domain::sizing::{FeeConfig, PositionSizing};
use quantsim::domain::strategy::Strategy;
use quantsim::ports::candle_port::CandleSource;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn make_candle(symbol: &str, hour: i64, close: f64) -> Candle {
    Candle {
        symbol: symbol.to_string(),
        timeframe: Timeframe::H1,
        timestamp: base_time() + Duration::hours(hour),
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 1000.0,
    }
}

/// Hourly candles from a close series, with high/low a half point out.
pub fn make_candles(symbol: &str, closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_candle(symbol, i as i64, close))
        .collect()
}

/// A close series that stays flat at 100, ramps from `rise_at` to force a
/// fast SMA above a slow one, then falls from `fall_at`.
pub fn crossover_closes(len: usize, rise_at: usize, fall_at: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            if i >= fall_at {
                100.0 - 3.0 * (i - fall_at + 1) as f64
            } else if i >= rise_at {
                100.0 + 3.0 * (i - rise_at + 1) as f64
            } else {
                100.0
            }
        })
        .collect()
}

pub fn sma_crossover_strategy(fast: usize, slow: usize) -> Strategy {
    Strategy {
        name: "sma crossover".into(),
        symbol: "TEST".into(),
        timeframe: Timeframe::H1,
        side: Side::Long,
        entry_rules: vec![Rule::new(
            Operand::Indicator(IndicatorRef::value(IndicatorType::Sma(fast))),
            Comparator::CrossesAbove,
            Operand::Indicator(IndicatorRef::value(IndicatorType::Sma(slow))),
        )],
        exit_rules: vec![Rule::new(
            Operand::Indicator(IndicatorRef::value(IndicatorType::Sma(fast))),
            Comparator::CrossesBelow,
            Operand::Indicator(IndicatorRef::value(IndicatorType::Sma(slow))),
        )],
        stop_loss_pct: None,
        take_profit_pct: None,
        sizing: PositionSizing::FixedFraction { fraction: 1.0 },
        max_position_size: 1.0,
        fees: FeeConfig::default(),
    }
}

type PairKey = (String, Timeframe);

/// In-memory candle source with injectable failures and a fetch counter.
pub struct MockCandleSource {
    data: Mutex<HashMap<PairKey, Vec<Candle>>>,
    error: Mutex<Option<String>>,
    pub fetches: Mutex<usize>,
}

impl MockCandleSource {
    pub fn new() -> Self {
        MockCandleSource {
            data: Mutex::new(HashMap::new()),
            error: Mutex::new(None),
            fetches: Mutex::new(0),
        }
    }

    pub fn with_candles(self, symbol: &str, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        self.data
            .lock()
            .unwrap()
            .insert((symbol.to_string(), timeframe), candles);
        self
    }

    pub fn push(&self, symbol: &str, timeframe: Timeframe, candle: Candle) {
        self.data
            .lock()
            .unwrap()
            .entry((symbol.to_string(), timeframe))
            .or_default()
            .push(candle);
    }

    pub fn set_error(&self, reason: Option<&str>) {
        *self.error.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    fn check_error(&self) -> Result<(), EngineError> {
        *self.fetches.lock().unwrap() += 1;
        match self.error.lock().unwrap().as_ref() {
            Some(reason) => Err(EngineError::StorageUnavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl CandleSource for MockCandleSource {
    fn get_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, EngineError> {
        self.check_error()?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), timeframe))
            .map(|candles| {
                candles
                    .iter()
                    .filter(|c| c.timestamp >= start && c.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_latest(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Candle>, EngineError> {
        self.check_error()?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), timeframe))
            .and_then(|candles| candles.last().cloned()))
    }

    fn count(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        Ok(self.get_range(symbol, timeframe, start, end)?.len())
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        self.check_error()?;
        let mut symbols: Vec<String> = self
            .data
            .lock()
            .unwrap()
            .keys()
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

// Lets a borrowed mock sit inside a CachedCandleStore while the test keeps
// pushing candles into it.
impl CandleSource for &MockCandleSource {
    fn get_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, EngineError> {
        <MockCandleSource as CandleSource>::get_range(self, symbol, timeframe, start, end)
    }

    fn get_latest(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Candle>, EngineError> {
        <MockCandleSource as CandleSource>::get_latest(self, symbol, timeframe)
    }

    fn count(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        <MockCandleSource as CandleSource>::count(self, symbol, timeframe, start, end)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        <MockCandleSource as CandleSource>::list_symbols(self)
    }
}

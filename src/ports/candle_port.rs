//! Candle access port trait.

use chrono::{DateTime, Utc};

use crate::domain::candle::{Candle, Timeframe};
use crate::domain::error::EngineError;

pub trait CandleSource: Send + Sync {
    /// Candles in `start..=end`, ascending by timestamp.
    fn get_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, EngineError>;

    fn get_latest(&self, symbol: &str, timeframe: Timeframe)
    -> Result<Option<Candle>, EngineError>;

    fn count(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, EngineError>;

    fn list_symbols(&self) -> Result<Vec<String>, EngineError>;
}

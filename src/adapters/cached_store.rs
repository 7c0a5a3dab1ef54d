//! Caching decorator over any `CandleSource`.
//!
//! Range, latest, and symbol-listing results are cached with a freshness TTL.
//! Entries within the TTL are served without touching the backing store, so
//! reads can be up to one TTL stale. Each cache map has its own mutex.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::candle::{Candle, Timeframe};
use crate::domain::error::EngineError;
use crate::ports::candle_port::CandleSource;

pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

type RangeKey = (String, Timeframe, DateTime<Utc>, DateTime<Utc>);
type PairKey = (String, Timeframe);

struct Entry<T> {
    value: T,
    fetched_at: Instant,
}

impl<T> Entry<T> {
    fn new(value: T) -> Self {
        Entry {
            value,
            fetched_at: Instant::now(),
        }
    }

    fn fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

pub struct CachedCandleStore<S: CandleSource> {
    inner: S,
    ttl: Duration,
    ranges: Mutex<HashMap<RangeKey, Entry<Vec<Candle>>>>,
    latest: Mutex<HashMap<PairKey, Entry<Option<Candle>>>>,
    symbols: Mutex<Option<Entry<Vec<String>>>>,
}

impl<S: CandleSource> CachedCandleStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        CachedCandleStore {
            inner,
            ttl,
            ranges: Mutex::new(HashMap::new()),
            latest: Mutex::new(HashMap::new()),
            symbols: Mutex::new(None),
        }
    }

    /// Drop every cached entry for the pair, including the symbol listing.
    /// The next read goes to the backing store.
    pub fn invalidate(&self, symbol: &str, timeframe: Timeframe) {
        debug!(symbol, timeframe = %timeframe, "cache invalidated");
        if let Ok(mut ranges) = self.ranges.lock() {
            ranges.retain(|(s, tf, _, _), _| !(s == symbol && *tf == timeframe));
        }
        if let Ok(mut latest) = self.latest.lock() {
            latest.remove(&(symbol.to_string(), timeframe));
        }
        if let Ok(mut symbols) = self.symbols.lock() {
            *symbols = None;
        }
    }
}

impl<S: CandleSource> CandleSource for CachedCandleStore<S> {
    fn get_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, EngineError> {
        let key = (symbol.to_string(), timeframe, start, end);
        if let Ok(ranges) = self.ranges.lock() {
            if let Some(entry) = ranges.get(&key) {
                if entry.fresh(self.ttl) {
                    debug!(symbol, timeframe = %timeframe, "range cache hit");
                    return Ok(entry.value.clone());
                }
            }
        }
        debug!(symbol, timeframe = %timeframe, "range cache miss");
        let candles = self.inner.get_range(symbol, timeframe, start, end)?;
        if let Ok(mut ranges) = self.ranges.lock() {
            ranges.insert(key, Entry::new(candles.clone()));
        }
        Ok(candles)
    }

    fn get_latest(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Candle>, EngineError> {
        let key = (symbol.to_string(), timeframe);
        if let Ok(latest) = self.latest.lock() {
            if let Some(entry) = latest.get(&key) {
                if entry.fresh(self.ttl) {
                    debug!(symbol, timeframe = %timeframe, "latest cache hit");
                    return Ok(entry.value.clone());
                }
            }
        }
        debug!(symbol, timeframe = %timeframe, "latest cache miss");
        let candle = self.inner.get_latest(symbol, timeframe)?;
        if let Ok(mut latest) = self.latest.lock() {
            latest.insert(key, Entry::new(candle.clone()));
        }
        Ok(candle)
    }

    fn count(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        // Served off the range cache so a count right after a fetch is free.
        Ok(self.get_range(symbol, timeframe, start, end)?.len())
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        if let Ok(symbols) = self.symbols.lock() {
            if let Some(entry) = symbols.as_ref() {
                if entry.fresh(self.ttl) {
                    debug!("symbol listing cache hit");
                    return Ok(entry.value.clone());
                }
            }
        }
        debug!("symbol listing cache miss");
        let listing = self.inner.list_symbols()?;
        if let Ok(mut symbols) = self.symbols.lock() {
            *symbols = Some(Entry::new(listing.clone()));
        }
        Ok(listing)
    }
}

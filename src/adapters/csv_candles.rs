//! CSV file candle adapter.
//!
//! One file per (symbol, timeframe) pair named `{symbol}_{timeframe}.csv`
//! with columns `timestamp,open,high,low,close,volume`; timestamps are
//! RFC 3339.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::domain::candle::{Candle, Timeframe};
use crate::domain::error::EngineError;
use crate::ports::candle_port::CandleSource;

pub struct CsvCandleSource {
    base_path: PathBuf,
}

impl CsvCandleSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, timeframe.as_str()))
    }

    fn read_all(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, EngineError> {
        let path = self.csv_path(symbol, timeframe);
        let content = fs::read_to_string(&path).map_err(|e| EngineError::StorageUnavailable {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| EngineError::StorageUnavailable {
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp = parse_field(&record, 0, "timestamp")?;
            let timestamp = DateTime::parse_from_rfc3339(timestamp).map_err(|e| {
                EngineError::StorageUnavailable {
                    reason: format!("invalid timestamp: {}", e),
                }
            })?;

            candles.push(Candle {
                symbol: symbol.to_string(),
                timeframe,
                timestamp: timestamp.with_timezone(&Utc),
                open: parse_number(&record, 1, "open")?,
                high: parse_number(&record, 2, "high")?,
                low: parse_number(&record, 3, "low")?,
                close: parse_number(&record, 4, "close")?,
                volume: parse_number(&record, 5, "volume")?,
            });
        }

        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

fn parse_field<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'a str, EngineError> {
    record
        .get(index)
        .ok_or_else(|| EngineError::StorageUnavailable {
            reason: format!("missing {} column", name),
        })
}

fn parse_number(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<f64, EngineError> {
    parse_field(record, index, name)?
        .parse()
        .map_err(|e| EngineError::StorageUnavailable {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl CandleSource for CsvCandleSource {
    fn get_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, EngineError> {
        let candles = self.read_all(symbol, timeframe)?;
        Ok(candles
            .into_iter()
            .filter(|c| c.timestamp >= start && c.timestamp <= end)
            .collect())
    }

    fn get_latest(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Candle>, EngineError> {
        let candles = self.read_all(symbol, timeframe)?;
        Ok(candles.into_iter().next_back())
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
        let entries =
            fs::read_dir(&self.base_path).map_err(|e| EngineError::StorageUnavailable {
                reason: format!("failed to list {}: {}", self.base_path.display(), e),
            })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::StorageUnavailable {
                reason: format!("failed to read directory entry: {}", e),
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".csv") else {
                continue;
            };
            // File stems are `{symbol}_{timeframe}`; symbols may themselves
            // contain underscores, so split from the right.
            let Some((symbol, timeframe)) = stem.rsplit_once('_') else {
                continue;
            };
            if timeframe.parse::<Timeframe>().is_err() {
                continue;
            }
            let symbol = symbol.to_string();
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
timestamp,open,high,low,close,volume
2024-01-01T02:00:00Z,101.0,102.0,100.0,101.5,1200
2024-01-01T00:00:00Z,100.0,101.0,99.0,100.5,1000
2024-01-01T01:00:00Z,100.5,101.5,99.5,101.0,1100
";

    fn write_sample(dir: &TempDir, name: &str) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        write!(file, "{}", SAMPLE).unwrap();
    }

    fn full_range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn get_range_sorts_ascending() {
        let dir = TempDir::new().unwrap();
        write_sample(&dir, "BTCUSDT_1h.csv");
        let source = CsvCandleSource::new(dir.path().to_path_buf());
        let (start, end) = full_range();
        let candles = source.get_range("BTCUSDT", Timeframe::H1, start, end).unwrap();
        assert_eq!(candles.len(), 3);
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!((candles[0].close - 100.5).abs() < f64::EPSILON);
    }

    #[test]
    fn get_range_is_inclusive() {
        let dir = TempDir::new().unwrap();
        write_sample(&dir, "BTCUSDT_1h.csv");
        let source = CsvCandleSource::new(dir.path().to_path_buf());
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        let candles = source.get_range("BTCUSDT", Timeframe::H1, start, end).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, start);
        assert_eq!(candles[1].timestamp, end);
    }

    #[test]
    fn get_latest_returns_newest() {
        let dir = TempDir::new().unwrap();
        write_sample(&dir, "BTCUSDT_1h.csv");
        let source = CsvCandleSource::new(dir.path().to_path_buf());
        let latest = source.get_latest("BTCUSDT", Timeframe::H1).unwrap().unwrap();
        assert_eq!(
            latest.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn count_matches_range() {
        let dir = TempDir::new().unwrap();
        write_sample(&dir, "BTCUSDT_1h.csv");
        let source = CsvCandleSource::new(dir.path().to_path_buf());
        let (start, end) = full_range();
        assert_eq!(source.count("BTCUSDT", Timeframe::H1, start, end).unwrap(), 3);
    }

    #[test]
    fn missing_file_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let source = CsvCandleSource::new(dir.path().to_path_buf());
        let (start, end) = full_range();
        let err = source
            .get_range("NOPE", Timeframe::H1, start, end)
            .unwrap_err();
        assert!(matches!(err, EngineError::StorageUnavailable { .. }));
    }

    #[test]
    fn malformed_row_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("BAD_1h.csv")).unwrap();
        write!(
            file,
            "timestamp,open,high,low,close,volume\n2024-01-01T00:00:00Z,abc,1,1,1,1\n"
        )
        .unwrap();
        let source = CsvCandleSource::new(dir.path().to_path_buf());
        let (start, end) = full_range();
        let err = source
            .get_range("BAD", Timeframe::H1, start, end)
            .unwrap_err();
        assert!(matches!(err, EngineError::StorageUnavailable { .. }));
    }

    #[test]
    fn list_symbols_parses_file_stems() {
        let dir = TempDir::new().unwrap();
        write_sample(&dir, "BTCUSDT_1h.csv");
        write_sample(&dir, "BTCUSDT_4h.csv");
        write_sample(&dir, "ETH_USDT_1d.csv");
        std::fs::File::create(dir.path().join("notes.txt")).unwrap();
        let source = CsvCandleSource::new(dir.path().to_path_buf());
        assert_eq!(
            source.list_symbols().unwrap(),
            vec!["BTCUSDT".to_string(), "ETH_USDT".to_string()]
        );
    }
}

//! CSV replay market data adapter.
//!
//! Reads `<base>/<INSTRUMENT>_<TIMEFRAME>.csv` with columns
//! `timestamp,open,high,low,close,tick_volume` (timestamp `%Y-%m-%d %H:%M:%S`, UTC).
//! With a replay clock set, only bars that have closed by the clock are visible:
//! a bar opened at `t` shows up once the clock reaches `t + timeframe`.
//! Every timestamp must sit on a bar boundary of its timeframe.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::error::TraderError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::Timeframe;
use crate::ports::market_data_port::MarketDataPort;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvAdapter {
    base_path: PathBuf,
    now: Option<DateTime<Utc>>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            now: None,
        }
    }

    /// Sets the replay clock.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = Some(now);
    }

    pub fn now(&self) -> Option<DateTime<Utc>> {
        self.now
    }

    /// Close time of the newest bar in the file, ignoring the replay clock.
    /// `None` for a file without bars.
    pub fn data_end(
        &self,
        instrument: &str,
        timeframe: Timeframe,
    ) -> Result<Option<DateTime<Utc>>, TraderError> {
        let bars = self.read_bars(instrument, timeframe)?;
        Ok(bars.last().map(|bar| bar.timestamp + timeframe.duration()))
    }

    fn csv_path(&self, instrument: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", instrument, timeframe))
    }

    /// Instruments with a file for `timeframe`, sorted.
    pub fn list_instruments(&self, timeframe: Timeframe) -> Result<Vec<String>, TraderError> {
        let entries = fs::read_dir(&self.base_path)?;

        let suffix = format!("_{}.csv", timeframe);
        let mut instruments = Vec::new();

        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();

            if let Some(instrument) = name_str.strip_suffix(&suffix) {
                instruments.push(instrument.to_string());
            }
        }

        instruments.sort();
        Ok(instruments)
    }

    /// Every bar in the file, sorted by timestamp.
    fn read_bars(&self, instrument: &str, timeframe: Timeframe) -> Result<Vec<Bar>, TraderError> {
        let unavailable = |reason: String| TraderError::DataUnavailable {
            instrument: instrument.to_string(),
            timeframe,
            reason,
        };

        let path = self.csv_path(instrument, timeframe);
        let content = fs::read_to_string(&path)
            .map_err(|e| unavailable(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| unavailable(format!("CSV parse error: {}", e)))?;
            let bar = parse_record(&record).map_err(unavailable)?;
            if !timeframe.is_aligned(bar.timestamp) {
                return Err(unavailable(format!(
                    "bar at {} is not aligned to {}",
                    bar.timestamp, timeframe
                )));
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

fn column<T: FromStr>(record: &csv::StringRecord, index: usize, name: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| format!("missing {} column", name))?
        .trim()
        .parse()
        .map_err(|e| format!("invalid {} value: {}", name, e))
}

fn parse_record(record: &csv::StringRecord) -> Result<Bar, String> {
    let ts_str = record.get(0).ok_or("missing timestamp column")?;
    let timestamp = NaiveDateTime::parse_from_str(ts_str.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid timestamp format: {}", e))?
        .and_utc();

    Ok(Bar {
        timestamp,
        open: column(record, 1, "open")?,
        high: column(record, 2, "high")?,
        low: column(record, 3, "low")?,
        close: column(record, 4, "close")?,
        tick_volume: column(record, 5, "tick_volume")?,
    })
}

impl MarketDataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, TraderError> {
        let mut bars = self.read_bars(instrument, timeframe)?;

        if let Some(now) = self.now {
            // Forming bars stay hidden until their close.
            bars.retain(|bar| bar.timestamp + timeframe.duration() <= now);
        }

        let skip = bars.len().saturating_sub(count);
        Ok(bars.split_off(skip))
    }
}

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use triplescreen::domain::error::TraderError;
pub use triplescreen::domain::ohlcv::Bar;
use triplescreen::domain::order::{OrderOutcome, OrderReference, OrderRequest};
pub use triplescreen::domain::timeframe::Timeframe;
use triplescreen::domain::trader_config::TraderConfig;
use triplescreen::ports::market_data_port::MarketDataPort;
use triplescreen::ports::order_port::OrderPort;

type SeriesKey = (String, Timeframe);

/// Serves the newest `count` bars of each (instrument, timeframe) series.
pub struct MockMarketData {
    pub series: HashMap<SeriesKey, Vec<Bar>>,
    pub errors: HashMap<SeriesKey, String>,
    pub fetches: RefCell<Vec<(String, Timeframe, usize)>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            errors: HashMap::new(),
            fetches: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, instrument: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.series.insert((instrument.to_string(), timeframe), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, timeframe: Timeframe, reason: &str) -> Self {
        self.set_error(instrument, timeframe, reason);
        self
    }

    pub fn set_error(&mut self, instrument: &str, timeframe: Timeframe, reason: &str) {
        self.errors
            .insert((instrument.to_string(), timeframe), reason.to_string());
    }

    pub fn clear_error(&mut self, instrument: &str, timeframe: Timeframe) {
        self.errors.remove(&(instrument.to_string(), timeframe));
    }

    pub fn push_bar(&mut self, instrument: &str, timeframe: Timeframe, bar: Bar) {
        self.series
            .entry((instrument.to_string(), timeframe))
            .or_default()
            .push(bar);
    }

    pub fn last_bar(&self, instrument: &str, timeframe: Timeframe) -> Option<Bar> {
        self.series
            .get(&(instrument.to_string(), timeframe))
            .and_then(|bars| bars.last().cloned())
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_bars(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, TraderError> {
        self.fetches
            .borrow_mut()
            .push((instrument.to_string(), timeframe, count));

        let key = (instrument.to_string(), timeframe);
        if let Some(reason) = self.errors.get(&key) {
            return Err(TraderError::DataUnavailable {
                instrument: instrument.to_string(),
                timeframe,
                reason: reason.clone(),
            });
        }
        let bars = self.series.get(&key).cloned().unwrap_or_default();
        let skip = bars.len().saturating_sub(count);
        Ok(bars[skip..].to_vec())
    }
}

/// Plays back queued outcomes, then accepts everything with sequential references.
pub struct ScriptedBroker {
    pub script: VecDeque<OrderOutcome>,
    pub requests: Vec<OrderRequest>,
    next_reference: u64,
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            requests: Vec::new(),
            next_reference: 1000,
        }
    }

    pub fn then_reject(mut self, reason: &str) -> Self {
        self.script.push_back(OrderOutcome::Rejected {
            reason: reason.to_string(),
        });
        self
    }
}

impl OrderPort for ScriptedBroker {
    fn submit_order(&mut self, request: &OrderRequest) -> OrderOutcome {
        self.requests.push(request.clone());
        if let Some(outcome) = self.script.pop_front() {
            return outcome;
        }
        let reference = OrderReference(self.next_reference);
        self.next_reference += 1;
        OrderOutcome::Accepted { reference }
    }
}

pub fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
}

/// Shared end of every generated series; aligned to M5, M30 and H2.
pub fn end() -> DateTime<Utc> {
    ts(2024, 1, 10, 12, 0)
}

pub fn make_bar(timestamp: DateTime<Utc>, close: f64, tick_volume: u64) -> Bar {
    Bar {
        timestamp,
        open: close,
        high: close,
        low: close,
        close,
        tick_volume,
    }
}

/// Bars with the given closes, the last one opening at `last`.
pub fn series_ending(timeframe: Timeframe, last: DateTime<Utc>, closes: &[f64]) -> Vec<Bar> {
    let n = closes.len();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let timestamp = last - timeframe.duration() * (n - 1 - i) as i32;
            make_bar(timestamp, close, 100 + i as u64)
        })
        .collect()
}

/// `count` bars moving by `slope` per bar from 100, with rising tick volume.
pub fn linear(timeframe: Timeframe, count: usize, slope: f64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..count).map(|i| 100.0 + slope * i as f64).collect();
    series_ending(timeframe, end(), &closes)
}

/// Same trend on the default M5/M30/H2 screens.
pub fn trending_market(instruments: &[&str], slope: f64) -> MockMarketData {
    instruments
        .iter()
        .fold(MockMarketData::new(), |market, instrument| {
            [Timeframe::M5, Timeframe::M30, Timeframe::H2]
                .into_iter()
                .fold(market, |market, tf| {
                    market.with_bars(instrument, tf, linear(tf, 30, slope))
                })
        })
}

pub fn sample_config(instruments: &[&str]) -> TraderConfig {
    TraderConfig {
        instruments: instruments.iter().map(|s| s.to_string()).collect(),
        bar_count: 30,
        ..TraderConfig::default()
    }
}

pub fn instrument_list(instruments: &[&str]) -> Vec<String> {
    instruments.iter().map(|s| s.to_string()).collect()
}

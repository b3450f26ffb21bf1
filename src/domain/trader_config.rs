//! Trading loop parameters.

use std::collections::HashMap;
use std::time::Duration;

use crate::domain::indicator::IndicatorParams;
use crate::domain::timeframe::TimeframeSet;

pub const DEFAULT_BAR_COUNT: usize = 100;
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_VOLUME: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct TraderConfig {
    pub instruments: Vec<String>,
    pub timeframes: TimeframeSet,
    /// Bars fetched per timeframe per tick.
    pub bar_count: usize,
    /// Newest bars retained per history; `None` keeps everything.
    pub history_capacity: Option<usize>,
    pub poll_interval: Duration,
    pub default_volume: f64,
    /// Per-instrument entry volume overrides.
    pub volumes: HashMap<String, f64>,
    pub indicators: IndicatorParams,
}

impl TraderConfig {
    pub fn volume_for(&self, instrument: &str) -> f64 {
        self.volumes
            .get(instrument)
            .copied()
            .unwrap_or(self.default_volume)
    }

    /// Entry volume for every configured instrument, as handed to each tick.
    pub fn volumes_by_instrument(&self) -> HashMap<String, f64> {
        self.instruments
            .iter()
            .map(|i| (i.clone(), self.volume_for(i)))
            .collect()
    }
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            instruments: Vec::new(),
            timeframes: TimeframeSet::default(),
            bar_count: DEFAULT_BAR_COUNT,
            history_capacity: Some(DEFAULT_HISTORY_CAPACITY),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            default_volume: DEFAULT_VOLUME,
            volumes: HashMap::new(),
            indicators: IndicatorParams::default(),
        }
    }
}

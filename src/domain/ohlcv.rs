//! OHLC + tick volume bar representation.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub tick_volume: u64,
}

impl Bar {
    /// close - previous close, weighted by this bar's tick volume.
    pub fn volume_weighted_change(&self, prev_close: f64) -> f64 {
        (self.close - prev_close) * self.tick_volume as f64
    }
}

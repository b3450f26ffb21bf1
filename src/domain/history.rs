//! Rolling per-timeframe bar history.
//!
//! Bars are keyed by timestamp, so ordering and uniqueness hold by construction.
//! A merge lets the newest fetch win for a timestamp that is already present.
//! With a capacity set, the oldest bars are evicted after every merge and handed
//! back to the caller. A bar at or before the newest evicted timestamp is stale
//! and is never merged back in.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::Timeframe;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub replaced: usize,
    pub stale: usize,
    /// Evicted bars, oldest first.
    pub evicted: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeframeHistory {
    pub timeframe: Timeframe,
    bars: BTreeMap<DateTime<Utc>, Bar>,
    capacity: Option<usize>,
    evicted_through: Option<DateTime<Utc>>,
}

impl TimeframeHistory {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            bars: BTreeMap::new(),
            capacity: None,
            evicted_through: None,
        }
    }

    /// History keeping at most `capacity` of the newest bars.
    pub fn with_capacity(timeframe: Timeframe, capacity: usize) -> Self {
        Self {
            timeframe,
            bars: BTreeMap::new(),
            capacity: Some(capacity),
            evicted_through: None,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn merge(&mut self, new_bars: &[Bar]) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for bar in new_bars {
            if self.evicted_through.is_some_and(|t| bar.timestamp <= t) {
                summary.stale += 1;
                continue;
            }
            match self.bars.insert(bar.timestamp, bar.clone()) {
                Some(_) => summary.replaced += 1,
                None => summary.inserted += 1,
            }
        }

        if let Some(capacity) = self.capacity {
            while self.bars.len() > capacity {
                let Some((timestamp, bar)) = self.bars.pop_first() else {
                    break;
                };
                self.evicted_through = Some(timestamp);
                summary.evicted.push(bar);
            }
        }

        summary
    }

    /// Timestamp of the newest bar ever evicted.
    pub fn evicted_through(&self) -> Option<DateTime<Utc>> {
        self.evicted_through
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get_bar(&self, timestamp: DateTime<Utc>) -> Option<&Bar> {
        self.bars.get(&timestamp)
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last_key_value().map(|(_, bar)| bar)
    }

    /// Bars in timestamp order.
    pub fn bars(&self) -> Vec<Bar> {
        self.bars.values().cloned().collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.keys().copied().collect()
    }
}

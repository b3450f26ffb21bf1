//! Sampling periods and the fast/mid/slow timeframe triple.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H2 => 120,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// True if `timestamp` falls exactly on a bar boundary of this timeframe.
    pub fn is_aligned(self, timestamp: DateTime<Utc>) -> bool {
        let seconds = self.minutes() * 60;
        timestamp.timestamp().rem_euclid(seconds) == 0
    }

    /// Open time of the bar of this timeframe containing `timestamp`.
    pub fn floor(self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let seconds = self.minutes() * 60;
        let offset = timestamp.timestamp().rem_euclid(seconds);
        let nanos = i64::from(timestamp.timestamp_subsec_nanos());
        timestamp - Duration::seconds(offset) - Duration::nanoseconds(nanos)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H2 => "H2",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown timeframe '{0}'")]
pub struct UnknownTimeframe(pub String);

impl FromStr for Timeframe {
    type Err = UnknownTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.to_string() == wanted)
            .ok_or_else(|| UnknownTimeframe(s.to_string()))
    }
}

/// Which of the three screens a timeframe plays in a [`TimeframeSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeframeRole {
    Fast,
    Mid,
    Slow,
}

impl fmt::Display for TimeframeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeframeRole::Fast => f.write_str("fast"),
            TimeframeRole::Mid => f.write_str("mid"),
            TimeframeRole::Slow => f.write_str("slow"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframeSet {
    pub fast: Timeframe,
    pub mid: Timeframe,
    pub slow: Timeframe,
}

impl TimeframeSet {
    /// Builds a set, requiring fast < mid < slow.
    pub fn new(fast: Timeframe, mid: Timeframe, slow: Timeframe) -> Option<Self> {
        (fast < mid && mid < slow).then_some(Self { fast, mid, slow })
    }

    pub fn get(&self, role: TimeframeRole) -> Timeframe {
        match role {
            TimeframeRole::Fast => self.fast,
            TimeframeRole::Mid => self.mid,
            TimeframeRole::Slow => self.slow,
        }
    }

    /// Roles in fetch order.
    pub fn roles(&self) -> [(TimeframeRole, Timeframe); 3] {
        [
            (TimeframeRole::Fast, self.fast),
            (TimeframeRole::Mid, self.mid),
            (TimeframeRole::Slow, self.slow),
        ]
    }
}

impl Default for TimeframeSet {
    fn default() -> Self {
        Self {
            fast: Timeframe::M5,
            mid: Timeframe::M30,
            slow: Timeframe::H2,
        }
    }
}

impl fmt::Display for TimeframeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.fast, self.mid, self.slow)
    }
}

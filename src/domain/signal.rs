//! Three-screen directional signal.
//!
//! BULLISH requires slow MACD histogram, mid Force Index, mid MACD histogram and
//! fast MACD histogram all strictly positive; BEARISH is the strict mirror. Any
//! disagreement, exact zero, or undefined mid Force Index is NEUTRAL.

use std::fmt;

use crate::domain::alignment::AlignedRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Bullish => f.write_str("BULLISH"),
            Signal::Bearish => f.write_str("BEARISH"),
            Signal::Neutral => f.write_str("NEUTRAL"),
        }
    }
}

pub fn evaluate(row: &AlignedRow) -> Signal {
    let Some(force) = row.mid.force_index else {
        return Signal::Neutral;
    };
    let screens = [
        row.slow.macd_histogram,
        force,
        row.mid.macd_histogram,
        row.fast.macd_histogram,
    ];

    if screens.iter().all(|&v| v > 0.0) {
        Signal::Bullish
    } else if screens.iter().all(|&v| v < 0.0) {
        Signal::Bearish
    } else {
        Signal::Neutral
    }
}

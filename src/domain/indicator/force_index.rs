//! Force Index (Elder).
//!
//! raw[t] = (close[t] - close[t-1]) * tick_volume[t], undefined at t=0
//! force[t] = EMA(span) of raw, seeded with raw[1]

use crate::domain::indicator::ema::{ema_step, smoothing_factor};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_SPAN: usize = 13;

/// Previous close plus the running EMA of raw force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceState {
    pub prev_close: f64,
    pub ema: Option<f64>,
}

impl ForceState {
    pub fn seed(bar: &Bar) -> Self {
        Self {
            prev_close: bar.close,
            ema: None,
        }
    }

    pub fn next(&self, bar: &Bar, span: usize) -> Self {
        let raw = bar.volume_weighted_change(self.prev_close);
        let ema = match self.ema {
            None => raw,
            Some(prev) => ema_step(prev, raw, smoothing_factor(span)),
        };
        Self {
            prev_close: bar.close,
            ema: Some(ema),
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.ema
    }
}

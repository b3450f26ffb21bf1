//! MACD (Moving Average Convergence Divergence) histogram.
//!
//! MACD Line = EMA(fast) - EMA(slow) of close
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=13. All three EMAs seed with their
//! first input, so every bar carries a value.

use crate::domain::indicator::ema::{ema_step, smoothing_factor};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// The three running EMAs after some bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdState {
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub signal: f64,
}

impl MacdState {
    /// State after the first close. The line starts at zero, and so does its signal.
    pub fn seed(close: f64) -> Self {
        Self {
            ema_fast: close,
            ema_slow: close,
            signal: 0.0,
        }
    }

    pub fn next(&self, close: f64, fast: usize, slow: usize, signal_period: usize) -> Self {
        let ema_fast = ema_step(self.ema_fast, close, smoothing_factor(fast));
        let ema_slow = ema_step(self.ema_slow, close, smoothing_factor(slow));
        let signal = ema_step(self.signal, ema_fast - ema_slow, smoothing_factor(signal_period));
        Self {
            ema_fast,
            ema_slow,
            signal,
        }
    }

    pub fn point(&self) -> MacdPoint {
        let line = self.ema_fast - self.ema_slow;
        MacdPoint {
            line,
            signal: self.signal,
            histogram: line - self.signal,
        }
    }
}

//! Indicator engine.
//!
//! Turns a timeframe's bar history into [`IndicatorRow`]s:
//! - MACD histogram on every timeframe
//! - Force Index only where requested (the mid screen)
//!
//! Each row depends only on bars at or before it. A history that has dropped its
//! oldest bars passes the [`IndicatorState`] of the last dropped bar as a seed, so
//! the rows it keeps come out exactly as they did before the drop. Derived columns
//! are rounded to [`ROUND_DECIMALS`] once, after everything is computed.

pub mod ema;
pub mod force_index;
pub mod macd;

use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::error::TraderError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::Timeframe;

pub use force_index::ForceState;
pub use macd::{MacdPoint, MacdState};

pub const ROUND_DECIMALS: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorParams {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub force_span: usize,
}

impl IndicatorParams {
    /// Bars a history needs before indicators are produced.
    pub fn min_bars(&self) -> usize {
        self.macd_signal
    }
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            force_span: force_index::DEFAULT_SPAN,
        }
    }
}

impl fmt::Display for IndicatorParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MACD({},{},{}) FORCE({})",
            self.macd_fast, self.macd_slow, self.macd_signal, self.force_span
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub macd_histogram: f64,
    /// `None` when not computed for this timeframe, or at the first bar of a history.
    pub force_index: Option<f64>,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Running indicator state after one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorState {
    pub macd: MacdState,
    pub force: ForceState,
}

impl IndicatorState {
    pub fn first(bar: &Bar) -> Self {
        Self {
            macd: MacdState::seed(bar.close),
            force: ForceState::seed(bar),
        }
    }

    pub fn next(&self, bar: &Bar, params: &IndicatorParams) -> Self {
        Self {
            macd: self.macd.next(
                bar.close,
                params.macd_fast,
                params.macd_slow,
                params.macd_signal,
            ),
            force: self.force.next(bar, params.force_span),
        }
    }

    fn row(&self, bar: &Bar, with_force: bool) -> IndicatorRow {
        IndicatorRow {
            timestamp: bar.timestamp,
            close: bar.close,
            macd_histogram: round_to(self.macd.point().histogram, ROUND_DECIMALS),
            force_index: self
                .force
                .value()
                .filter(|_| with_force)
                .map(|v| round_to(v, ROUND_DECIMALS)),
        }
    }
}

/// Folds `bars` into `seed`. Returns `None` only when both are empty.
pub fn advance_state(
    seed: Option<IndicatorState>,
    bars: &[Bar],
    params: &IndicatorParams,
) -> Option<IndicatorState> {
    bars.iter().fold(seed, |state, bar| {
        Some(match state {
            None => IndicatorState::first(bar),
            Some(prev) => prev.next(bar, params),
        })
    })
}

/// Computes one row per bar. `bars` must be in timestamp order.
pub fn compute_indicator_rows(
    bars: &[Bar],
    timeframe: Timeframe,
    params: &IndicatorParams,
    with_force: bool,
) -> Result<Vec<IndicatorRow>, TraderError> {
    compute_indicator_rows_from(None, bars, timeframe, params, with_force)
}

/// Like [`compute_indicator_rows`], continuing from the state of the bar just
/// before `bars[0]`.
pub fn compute_indicator_rows_from(
    seed: Option<&IndicatorState>,
    bars: &[Bar],
    timeframe: Timeframe,
    params: &IndicatorParams,
    with_force: bool,
) -> Result<Vec<IndicatorRow>, TraderError> {
    let minimum = params.min_bars().max(1);
    if bars.len() < minimum {
        return Err(TraderError::InsufficientHistory {
            timeframe,
            bars: bars.len(),
            minimum,
        });
    }

    let mut state = seed.copied();
    let rows = bars
        .iter()
        .map(|bar| {
            let next = match state {
                None => IndicatorState::first(bar),
                Some(prev) => prev.next(bar, params),
            };
            state = Some(next);
            next.row(bar, with_force)
        })
        .collect();

    Ok(rows)
}

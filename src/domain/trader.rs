//! Tick loop: fetch → merge → indicators → align → signal → transition → order.
//!
//! Instruments are processed one at a time in the order given. Each owns an
//! [`InstrumentBook`] holding its three histories, the indicator state of the bars
//! they have evicted, and its position; nothing is shared between instruments. A
//! failed or empty fetch skips the instrument for the tick before anything is mutated.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::domain::alignment::align_latest;
use crate::domain::error::TraderError;
use crate::domain::history::{MergeSummary, TimeframeHistory};
use crate::domain::indicator::{
    advance_state, compute_indicator_rows_from, IndicatorParams, IndicatorRow, IndicatorState,
};
use crate::domain::ohlcv::Bar;
use crate::domain::order::{OrderOutcome, OrderReference};
use crate::domain::position::{OrderIntent, Position};
use crate::domain::signal::{evaluate, Signal};
use crate::domain::timeframe::{Timeframe, TimeframeRole, TimeframeSet};
use crate::domain::trader_config::TraderConfig;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::order_port::OrderPort;

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentBook {
    pub instrument: String,
    pub fast: TimeframeHistory,
    pub mid: TimeframeHistory,
    pub slow: TimeframeHistory,
    pub position: Position,
    /// Indicator state after the newest evicted bar, per screen.
    seeds: HashMap<TimeframeRole, IndicatorState>,
}

impl InstrumentBook {
    pub fn new(instrument: &str, timeframes: TimeframeSet, capacity: Option<usize>) -> Self {
        let history = |tf| match capacity {
            Some(n) => TimeframeHistory::with_capacity(tf, n),
            None => TimeframeHistory::new(tf),
        };
        Self {
            instrument: instrument.to_string(),
            fast: history(timeframes.fast),
            mid: history(timeframes.mid),
            slow: history(timeframes.slow),
            position: Position::Flat,
            seeds: HashMap::new(),
        }
    }

    /// Merges `bars` into one screen, folding whatever it evicts into that
    /// screen's indicator seed.
    pub fn merge(
        &mut self,
        role: TimeframeRole,
        bars: &[Bar],
        params: &IndicatorParams,
    ) -> MergeSummary {
        let summary = self.history_mut(role).merge(bars);
        if !summary.evicted.is_empty() {
            let seed = self.seeds.get(&role).copied();
            if let Some(state) = advance_state(seed, &summary.evicted, params) {
                self.seeds.insert(role, state);
            }
        }
        summary
    }

    /// Indicator rows for the bars one screen still holds. Rows come out the
    /// same as if nothing had ever been evicted.
    pub fn indicator_rows(
        &self,
        role: TimeframeRole,
        params: &IndicatorParams,
        with_force: bool,
    ) -> Result<Vec<IndicatorRow>, TraderError> {
        let history = self.history(role);
        compute_indicator_rows_from(
            self.seeds.get(&role),
            &history.bars(),
            history.timeframe,
            params,
            with_force,
        )
    }

    pub fn history(&self, role: TimeframeRole) -> &TimeframeHistory {
        match role {
            TimeframeRole::Fast => &self.fast,
            TimeframeRole::Mid => &self.mid,
            TimeframeRole::Slow => &self.slow,
        }
    }

    fn history_mut(&mut self, role: TimeframeRole) -> &mut TimeframeHistory {
        match role {
            TimeframeRole::Fast => &mut self.fast,
            TimeframeRole::Mid => &mut self.mid,
            TimeframeRole::Slow => &mut self.slow,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    DataUnavailable { timeframe: Timeframe, reason: String },
    EmptyFetch { timeframe: Timeframe },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickAction {
    Hold,
    Filled {
        intent: OrderIntent,
        reference: OrderReference,
    },
    /// Accepted by the broker but not applicable to the position, which is kept.
    Unmatched {
        intent: OrderIntent,
        reference: OrderReference,
    },
    Rejected {
        intent: OrderIntent,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    Evaluated {
        signal: Signal,
        action: TickAction,
        /// First timeframe that could not yet produce a value, if any.
        warming_up: Option<Timeframe>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReport {
    pub instrument: String,
    pub outcome: TickOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub instruments: Vec<InstrumentReport>,
}

impl TickReport {
    pub fn get(&self, instrument: &str) -> Option<&TickOutcome> {
        self.instruments
            .iter()
            .find(|r| r.instrument == instrument)
            .map(|r| &r.outcome)
    }

    pub fn skipped(&self) -> usize {
        self.instruments
            .iter()
            .filter(|r| matches!(r.outcome, TickOutcome::Skipped(_)))
            .count()
    }

    pub fn orders_submitted(&self) -> usize {
        self.instruments
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    TickOutcome::Evaluated {
                        action: TickAction::Filled { .. }
                            | TickAction::Unmatched { .. }
                            | TickAction::Rejected { .. },
                        ..
                    }
                )
            })
            .count()
    }

    pub fn fills(&self) -> usize {
        self.instruments
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    TickOutcome::Evaluated {
                        action: TickAction::Filled { .. },
                        ..
                    }
                )
            })
            .count()
    }
}

pub struct Trader {
    config: TraderConfig,
    books: BTreeMap<String, InstrumentBook>,
}

impl Trader {
    /// Every configured instrument starts FLAT with empty histories.
    pub fn new(config: TraderConfig) -> Self {
        let books = config
            .instruments
            .iter()
            .map(|i| {
                (
                    i.clone(),
                    InstrumentBook::new(i, config.timeframes, config.history_capacity),
                )
            })
            .collect();
        Self { config, books }
    }

    pub fn config(&self) -> &TraderConfig {
        &self.config
    }

    pub fn book(&self, instrument: &str) -> Option<&InstrumentBook> {
        self.books.get(instrument)
    }

    pub fn position(&self, instrument: &str) -> Position {
        self.books
            .get(instrument)
            .map(|b| b.position)
            .unwrap_or_default()
    }

    /// Processes each instrument once. Instruments without a book get a FLAT one.
    pub fn run_tick(
        &mut self,
        market: &dyn MarketDataPort,
        orders: &mut dyn OrderPort,
        instruments: &[String],
        volumes: &HashMap<String, f64>,
    ) -> TickReport {
        let mut report = TickReport::default();

        for instrument in instruments {
            let config = &self.config;
            let book = self.books.entry(instrument.clone()).or_insert_with(|| {
                InstrumentBook::new(instrument, config.timeframes, config.history_capacity)
            });
            let volume = volumes.get(instrument).copied();

            let outcome = process_instrument(
                book,
                market,
                orders,
                config.timeframes,
                config.bar_count,
                &config.indicators,
                volume,
            );
            report.instruments.push(InstrumentReport {
                instrument: instrument.clone(),
                outcome,
            });
        }

        info!(
            instruments = report.instruments.len(),
            skipped = report.skipped(),
            orders = report.orders_submitted(),
            fills = report.fills(),
            "tick complete"
        );
        report
    }
}

fn process_instrument(
    book: &mut InstrumentBook,
    market: &dyn MarketDataPort,
    orders: &mut dyn OrderPort,
    timeframes: TimeframeSet,
    bar_count: usize,
    params: &IndicatorParams,
    volume: Option<f64>,
) -> TickOutcome {
    let instrument = book.instrument.clone();

    let batches = match fetch_all(market, &instrument, timeframes, bar_count) {
        Ok(batches) => batches,
        Err(reason) => return TickOutcome::Skipped(reason),
    };

    for (role, bars) in batches {
        let summary = book.merge(role, &bars, params);
        debug!(
            instrument = %instrument,
            timeframe = %timeframes.get(role),
            inserted = summary.inserted,
            replaced = summary.replaced,
            stale = summary.stale,
            evicted = summary.evicted.len(),
            latest = ?book.history(role).latest().map(|bar| bar.timestamp),
            "history merged"
        );
    }

    let fast = book.indicator_rows(TimeframeRole::Fast, params, false);
    let mid = book.indicator_rows(TimeframeRole::Mid, params, true);
    let slow = book.indicator_rows(TimeframeRole::Slow, params, false);

    let fast_histogram = fast
        .as_ref()
        .ok()
        .and_then(|rows| rows.last())
        .map(|row| row.macd_histogram);
    let (signal, warming_up) = read_signal(&instrument, timeframes, fast, mid, slow);

    let Some(intent) = book.position.decide(signal, fast_histogram, volume) else {
        debug!(
            instrument = %instrument,
            signal = %signal,
            state = %book.position.state(),
            "no transition"
        );
        return TickOutcome::Evaluated {
            signal,
            action: TickAction::Hold,
            warming_up,
        };
    };

    let request = intent.to_request(&instrument);
    let action = match orders.submit_order(&request) {
        OrderOutcome::Accepted { reference } => {
            apply_accepted(&mut book.position, &instrument, signal, intent, reference)
        }
        OrderOutcome::Rejected { reason } => {
            let err = TraderError::OrderRejected {
                instrument: instrument.clone(),
                reason: reason.clone(),
            };
            warn!(
                instrument = %instrument,
                intent = %intent,
                state = %book.position.state(),
                "{err}; retrying next tick"
            );
            TickAction::Rejected { intent, reason }
        }
    };

    TickOutcome::Evaluated {
        signal,
        action,
        warming_up,
    }
}

fn apply_accepted(
    position: &mut Position,
    instrument: &str,
    signal: Signal,
    intent: OrderIntent,
    reference: OrderReference,
) -> TickAction {
    let from = position.state();
    if !position.apply_fill(&intent, reference) {
        warn!(
            instrument,
            intent = %intent,
            reference = %reference,
            state = %from,
            "fill does not match position, state kept"
        );
        return TickAction::Unmatched { intent, reference };
    }
    info!(
        instrument,
        signal = %signal,
        intent = %intent,
        reference = %reference,
        from = %from,
        to = %position.state(),
        "order filled"
    );
    TickAction::Filled { intent, reference }
}

/// Fetches all three timeframes before anything is merged.
fn fetch_all(
    market: &dyn MarketDataPort,
    instrument: &str,
    timeframes: TimeframeSet,
    bar_count: usize,
) -> Result<Vec<(TimeframeRole, Vec<Bar>)>, SkipReason> {
    let mut batches = Vec::with_capacity(3);

    for (role, timeframe) in timeframes.roles() {
        match market.fetch_bars(instrument, timeframe, bar_count) {
            Ok(bars) if bars.is_empty() => {
                warn!(instrument, timeframe = %timeframe, "empty fetch, skipping instrument");
                return Err(SkipReason::EmptyFetch { timeframe });
            }
            Ok(bars) => batches.push((role, bars)),
            Err(e) => {
                warn!(instrument, timeframe = %timeframe, "{e}, skipping instrument");
                return Err(SkipReason::DataUnavailable {
                    timeframe,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(batches)
}

/// Reduces the newest aligned row to a signal. Missing history reads as NEUTRAL.
fn read_signal(
    instrument: &str,
    timeframes: TimeframeSet,
    fast: Result<Vec<IndicatorRow>, TraderError>,
    mid: Result<Vec<IndicatorRow>, TraderError>,
    slow: Result<Vec<IndicatorRow>, TraderError>,
) -> (Signal, Option<Timeframe>) {
    let (fast, mid, slow) = match (fast, mid, slow) {
        (Ok(fast), Ok(mid), Ok(slow)) => (fast, mid, slow),
        (fast, mid, slow) => {
            let err = [fast.err(), mid.err(), slow.err()]
                .into_iter()
                .flatten()
                .next();
            let timeframe = match &err {
                Some(TraderError::InsufficientHistory { timeframe, .. }) => Some(*timeframe),
                _ => None,
            };
            if let Some(err) = err {
                warn!(instrument, "{err}, signal NEUTRAL");
            }
            return (Signal::Neutral, timeframe);
        }
    };

    match align_latest(&fast, &mid, &slow) {
        Some(Ok(row)) => {
            let signal = evaluate(&row);
            debug!(
                instrument,
                timestamp = %row.timestamp,
                fast_hist = row.fast.macd_histogram,
                mid_hist = row.mid.macd_histogram,
                mid_force = ?row.mid.force_index,
                slow_hist = row.slow.macd_histogram,
                signal = %signal,
                "signal evaluated"
            );
            (signal, None)
        }
        Some(Err(gap)) => {
            warn!(instrument, "insufficient history: {gap}, signal NEUTRAL");
            (Signal::Neutral, Some(timeframes.get(gap.role)))
        }
        None => (Signal::Neutral, Some(timeframes.fast)),
    }
}

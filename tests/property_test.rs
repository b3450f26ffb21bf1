//! Property tests for loop invariants.
//!
//! Uses proptest to verify:
//! 1. Merge idempotence and newest-fetch-wins
//! 2. Indicator causality: appending bars never changes earlier rows, and
//!    evicting the oldest bars never changes the rows that are kept
//! 3. Forward-fill picks the latest slower row at or before each fast timestamp
//! 4. Signal symmetry under negation
//! 5. Position safety: one open position at most, closes carry the stored order

mod common;

use chrono::{DateTime, Duration, Utc};
use common::*;
use proptest::prelude::*;
use triplescreen::domain::alignment::{reindex_onto, AlignedRow};
use triplescreen::domain::history::TimeframeHistory;
use triplescreen::domain::indicator::{compute_indicator_rows, IndicatorParams, IndicatorRow};
use triplescreen::domain::order::OrderReference;
use triplescreen::domain::position::{OrderIntent, Position};
use triplescreen::domain::signal::{evaluate, Signal};
use triplescreen::domain::timeframe::{TimeframeRole, TimeframeSet};
use triplescreen::domain::trader::InstrumentBook;

fn base() -> DateTime<Utc> {
    ts(2024, 1, 2, 0, 0)
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_bar() -> impl Strategy<Value = Bar> {
    (0..50i64, 1.0..200.0_f64, 1..10_000u64).prop_map(|(slot, close, volume)| {
        make_bar(base() + Duration::minutes(5 * slot), close, volume)
    })
}

fn arb_closes(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(50.0..150.0_f64, len)
}

fn arb_nonzero() -> impl Strategy<Value = f64> {
    prop_oneof![0.001..100.0_f64, -100.0..-0.001_f64]
}

fn arb_signal() -> impl Strategy<Value = Signal> {
    prop_oneof![
        Just(Signal::Bullish),
        Just(Signal::Bearish),
        Just(Signal::Neutral)
    ]
}

fn row(timestamp: DateTime<Utc>, hist: f64, force: Option<f64>) -> IndicatorRow {
    IndicatorRow {
        timestamp,
        close: 1.0,
        macd_histogram: hist,
        force_index: force,
    }
}

fn negate(r: &IndicatorRow) -> IndicatorRow {
    IndicatorRow {
        macd_histogram: -r.macd_histogram,
        force_index: r.force_index.map(|f| -f),
        ..r.clone()
    }
}

// ── 1. Merge ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_is_idempotent(
        seed in prop::collection::vec(arb_bar(), 0..40),
        batch in prop::collection::vec(arb_bar(), 0..40),
    ) {
        let mut once = TimeframeHistory::new(Timeframe::M5);
        once.merge(&seed);
        once.merge(&batch);

        let mut twice = once.clone();
        twice.merge(&batch);

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_newest_fetch_wins(
        seed in prop::collection::vec(arb_bar(), 0..40),
        batch in prop::collection::vec(arb_bar(), 1..40),
    ) {
        let mut history = TimeframeHistory::new(Timeframe::M5);
        history.merge(&seed);
        history.merge(&batch);

        for bar in &batch {
            let winner = batch.iter().rev().find(|b| b.timestamp == bar.timestamp).unwrap();
            prop_assert_eq!(history.get_bar(bar.timestamp), Some(winner));
        }

        let timestamps = history.timestamps();
        prop_assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn capacity_keeps_newest(
        batch in prop::collection::vec(arb_bar(), 0..60),
        capacity in 1usize..30,
    ) {
        let mut bounded = TimeframeHistory::with_capacity(Timeframe::M5, capacity);
        let mut unbounded = TimeframeHistory::new(Timeframe::M5);
        bounded.merge(&batch);
        unbounded.merge(&batch);

        let all = unbounded.timestamps();
        let keep = all.len().min(capacity);
        prop_assert_eq!(bounded.timestamps(), all[all.len() - keep..].to_vec());
    }
}

// ── 2. Causality ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn indicator_rows_are_causal(closes in arb_closes(13..80), cut in 13usize..80) {
        let bars = series_ending(Timeframe::M30, base() + Duration::days(3), &closes);
        let cut = cut.min(bars.len());
        let params = IndicatorParams::default();

        let full = compute_indicator_rows(&bars, Timeframe::M30, &params, true).unwrap();
        let prefix = compute_indicator_rows(&bars[..cut], Timeframe::M30, &params, true).unwrap();

        prop_assert_eq!(&full[..cut], &prefix[..]);
    }

    #[test]
    fn kept_rows_survive_truncation(
        closes in arb_closes(20..90),
        capacity in 13usize..40,
        chunk in 1usize..10,
    ) {
        let bars = series_ending(Timeframe::M5, base() + Duration::days(3), &closes);
        let params = IndicatorParams::default();
        let mut bounded = InstrumentBook::new("EURUSD", TimeframeSet::default(), Some(capacity));
        let mut unbounded = InstrumentBook::new("EURUSD", TimeframeSet::default(), None);

        for batch in bars.chunks(chunk) {
            bounded.merge(TimeframeRole::Fast, batch, &params);
            unbounded.merge(TimeframeRole::Fast, batch, &params);
        }

        let kept = bounded.indicator_rows(TimeframeRole::Fast, &params, true).unwrap();
        let full = unbounded.indicator_rows(TimeframeRole::Fast, &params, true).unwrap();
        prop_assert_eq!(kept.len(), capacity.min(full.len()));
        prop_assert_eq!(&kept[..], &full[full.len() - kept.len()..]);
    }
}

// ── 3. Forward fill ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn forward_fill_uses_latest_row_at_or_before(
        slow_slots in prop::collection::btree_set(0..100i64, 0..20),
        fast_slots in prop::collection::btree_set(0..400i64, 1..50),
    ) {
        let slow: Vec<IndicatorRow> = slow_slots
            .iter()
            .map(|&s| row(base() + Duration::hours(2 * s), s as f64, None))
            .collect();
        let fast: Vec<DateTime<Utc>> = fast_slots
            .iter()
            .map(|&s| base() + Duration::minutes(5 * s))
            .collect();

        let filled = reindex_onto(&slow, &fast);
        prop_assert_eq!(filled.len(), fast.len());

        for (t, value) in fast.iter().zip(&filled) {
            let expected = slow.iter().filter(|r| r.timestamp <= *t).next_back();
            prop_assert_eq!(value.as_ref(), expected);
        }

        // Later fast timestamps never see an older slow row.
        let seen: Vec<DateTime<Utc>> = filled.iter().flatten().map(|r| r.timestamp).collect();
        prop_assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }
}

// ── 4. Signal symmetry ───────────────────────────────────────────────

proptest! {
    #[test]
    fn signal_mirrors_under_negation(
        fast in arb_nonzero(),
        mid in arb_nonzero(),
        force in arb_nonzero(),
        slow in arb_nonzero(),
    ) {
        let t = base();
        let aligned = AlignedRow {
            timestamp: t,
            fast: row(t, fast, None),
            mid: row(t, mid, Some(force)),
            slow: row(t, slow, None),
        };
        let negated = AlignedRow {
            fast: negate(&aligned.fast),
            mid: negate(&aligned.mid),
            slow: negate(&aligned.slow),
            ..aligned.clone()
        };

        let expected = match evaluate(&aligned) {
            Signal::Bullish => Signal::Bearish,
            Signal::Bearish => Signal::Bullish,
            Signal::Neutral => Signal::Neutral,
        };
        prop_assert_eq!(evaluate(&negated), expected);
    }
}

// ── 5. Position safety ───────────────────────────────────────────────

proptest! {
    #[test]
    fn position_transitions_are_safe(
        steps in prop::collection::vec(
            (arb_signal(), prop::option::of(-5.0..5.0_f64), any::<bool>()),
            1..100,
        ),
        volume in 0.01..10.0_f64,
    ) {
        let mut position = Position::Flat;
        let mut next_reference = 1u64;

        for (signal, fast_histogram, accepted) in steps {
            let before = position;
            let Some(intent) = position.decide(signal, fast_histogram, Some(volume)) else {
                continue;
            };

            match (before, intent) {
                (Position::Flat, OrderIntent::Open { volume: v, .. }) => {
                    prop_assert!((v - volume).abs() < f64::EPSILON);
                }
                (
                    Position::Long(order) | Position::Short(order),
                    OrderIntent::Close { reference, volume: v, .. },
                ) => {
                    prop_assert_eq!(reference, order.reference);
                    prop_assert!((v - order.volume).abs() < f64::EPSILON);
                }
                (state, intent) => prop_assert!(false, "{:?} produced {:?}", state, intent),
            }

            if accepted {
                let reference = OrderReference(next_reference);
                next_reference += 1;
                prop_assert!(position.apply_fill(&intent, reference));
                // Never LONG <-> SHORT without passing through FLAT.
                prop_assert!(before.is_flat() || position.is_flat());
            } else {
                prop_assert_eq!(position, before);
            }
        }
    }
}

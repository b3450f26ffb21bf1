//! Forward-fill alignment of slower timeframes onto the fast timeline.

use chrono::{DateTime, Utc};

use crate::domain::indicator::IndicatorRow;
use crate::domain::timeframe::TimeframeRole;

/// The three screens read at one fast timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub timestamp: DateTime<Utc>,
    pub fast: IndicatorRow,
    pub mid: IndicatorRow,
    pub slow: IndicatorRow,
}

/// A fast timestamp that precedes every row of a slower timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no {role} row at or before {timestamp}")]
pub struct AlignmentGap {
    pub timestamp: DateTime<Utc>,
    pub role: TimeframeRole,
}

/// For each fast timestamp: the slow row at that exact time, else the latest slow row
/// before it, else `None`. `slow_rows` must be in timestamp order.
pub fn reindex_onto(
    slow_rows: &[IndicatorRow],
    fast_timestamps: &[DateTime<Utc>],
) -> Vec<Option<IndicatorRow>> {
    fast_timestamps
        .iter()
        .map(|&t| {
            let idx = slow_rows.partition_point(|row| row.timestamp <= t);
            idx.checked_sub(1).map(|i| slow_rows[i].clone())
        })
        .collect()
}

/// One slot per fast row, with mid and slow forward-filled.
pub fn align(
    fast_rows: &[IndicatorRow],
    mid_rows: &[IndicatorRow],
    slow_rows: &[IndicatorRow],
) -> Vec<Result<AlignedRow, AlignmentGap>> {
    let timestamps: Vec<DateTime<Utc>> = fast_rows.iter().map(|r| r.timestamp).collect();
    let mids = reindex_onto(mid_rows, &timestamps);
    let slows = reindex_onto(slow_rows, &timestamps);

    fast_rows
        .iter()
        .zip(mids)
        .zip(slows)
        .map(|((fast, mid), slow)| resolve(fast, mid, slow))
        .collect()
}

/// The aligned row at the newest fast timestamp, or `None` when `fast_rows` is empty.
pub fn align_latest(
    fast_rows: &[IndicatorRow],
    mid_rows: &[IndicatorRow],
    slow_rows: &[IndicatorRow],
) -> Option<Result<AlignedRow, AlignmentGap>> {
    let fast = fast_rows.last()?;
    let mut mid = reindex_onto(mid_rows, &[fast.timestamp]);
    let mut slow = reindex_onto(slow_rows, &[fast.timestamp]);
    Some(resolve(fast, mid.pop().flatten(), slow.pop().flatten()))
}

fn resolve(
    fast: &IndicatorRow,
    mid: Option<IndicatorRow>,
    slow: Option<IndicatorRow>,
) -> Result<AlignedRow, AlignmentGap> {
    let gap = |role| AlignmentGap {
        timestamp: fast.timestamp,
        role,
    };
    let mid = mid.ok_or_else(|| gap(TimeframeRole::Mid))?;
    let slow = slow.ok_or_else(|| gap(TimeframeRole::Slow))?;
    Ok(AlignedRow {
        timestamp: fast.timestamp,
        fast: fast.clone(),
        mid,
        slow,
    })
}

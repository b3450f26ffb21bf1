//! Instrument and timeframe list parsing for the trader configuration.

use std::collections::HashSet;

use crate::domain::timeframe::{Timeframe, TimeframeSet, UnknownTimeframe};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstrumentListError {
    #[error("empty token in instrument list")]
    EmptyToken,

    #[error("duplicate instrument: {0}")]
    DuplicateInstrument(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeframeListError {
    #[error(transparent)]
    Unknown(#[from] UnknownTimeframe),

    #[error("expected 3 timeframes (fast,mid,slow), got {0}")]
    WrongCount(usize),

    #[error("timeframes must be strictly increasing: {0}")]
    NotIncreasing(String),
}

/// Comma separated, trimmed, upper-cased, unique, order preserved.
pub fn parse_instruments(input: &str) -> Result<Vec<String>, InstrumentListError> {
    let mut instruments = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(InstrumentListError::EmptyToken);
        }
        let instrument = trimmed.to_uppercase();
        if !seen.insert(instrument.clone()) {
            return Err(InstrumentListError::DuplicateInstrument(instrument));
        }
        instruments.push(instrument);
    }

    Ok(instruments)
}

/// Parses `fast,mid,slow`.
pub fn parse_timeframes(input: &str) -> Result<TimeframeSet, TimeframeListError> {
    let parsed = input
        .split(',')
        .map(str::parse::<Timeframe>)
        .collect::<Result<Vec<_>, _>>()?;

    match parsed.as_slice() {
        &[fast, mid, slow] => TimeframeSet::new(fast, mid, slow)
            .ok_or_else(|| TimeframeListError::NotIncreasing(input.trim().to_string())),
        other => Err(TimeframeListError::WrongCount(other.len())),
    }
}

//! Market data retrieval port trait.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::Timeframe;

pub trait MarketDataPort {
    /// The most recent `count` bars of `timeframe`, oldest first.
    ///
    /// `Err(TraderError::DataUnavailable)` when the source could not answer;
    /// `Ok(vec![])` when it answered with no bars.
    fn fetch_bars(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, TraderError>;
}

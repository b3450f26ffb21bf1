//! Domain error types.

use crate::domain::timeframe::Timeframe;

/// Top-level error type for triplescreen.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("market data unavailable for {instrument} {timeframe}: {reason}")]
    DataUnavailable {
        instrument: String,
        timeframe: Timeframe,
        reason: String,
    },

    #[error("order rejected for {instrument}: {reason}")]
    OrderRejected { instrument: String, reason: String },

    #[error("insufficient history on {timeframe}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        timeframe: Timeframe,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::DataUnavailable { .. } => 3,
            TraderError::OrderRejected { .. } => 4,
            TraderError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

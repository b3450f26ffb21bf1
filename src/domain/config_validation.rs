//! Configuration validation.
//!
//! Validates all config fields before the trading loop starts.

use crate::domain::error::TraderError;
use crate::domain::instruments::{parse_instruments, parse_timeframes};
use crate::domain::trader_config::DEFAULT_VOLUME;
use crate::ports::config_port::ConfigPort;

pub fn validate_trader_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_instruments(config)?;
    validate_timeframes(config)?;
    validate_indicator_spans(config)?;
    validate_bar_count(config)?;
    validate_history_capacity(config)?;
    validate_poll_interval(config)?;
    validate_volumes(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_instruments(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match config.get_string("trader", "instruments") {
        Some(s) if !s.trim().is_empty() => parse_instruments(&s)
            .map(|_| ())
            .map_err(|e| invalid("trader", "instruments", e.to_string())),
        _ => Err(TraderError::ConfigMissing {
            section: "trader".to_string(),
            key: "instruments".to_string(),
        }),
    }
}

fn validate_timeframes(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match config.get_string("trader", "timeframes") {
        None => Ok(()),
        Some(s) => parse_timeframes(&s)
            .map(|_| ())
            .map_err(|e| invalid("trader", "timeframes", e.to_string())),
    }
}

fn validate_indicator_spans(config: &dyn ConfigPort) -> Result<(), TraderError> {
    for (key, default) in [
        ("macd_fast", 12),
        ("macd_slow", 26),
        ("macd_signal", 13),
        ("force_span", 13),
    ] {
        if config.get_int("indicators", key, default) < 1 {
            return Err(invalid("indicators", key, format!("{key} must be at least 1")));
        }
    }

    let fast = config.get_int("indicators", "macd_fast", 12);
    let slow = config.get_int("indicators", "macd_slow", 26);
    if fast >= slow {
        return Err(invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be shorter than macd_slow",
        ));
    }
    Ok(())
}

fn validate_bar_count(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let value = config.get_int("trader", "bar_count", 100);
    let signal = config.get_int("indicators", "macd_signal", 13);
    if value < signal {
        return Err(invalid(
            "trader",
            "bar_count",
            format!("bar_count must be at least macd_signal ({signal})"),
        ));
    }
    Ok(())
}

fn validate_history_capacity(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let value = config.get_int("trader", "history_capacity", 1000);
    let bar_count = config.get_int("trader", "bar_count", 100);
    if value < 0 {
        return Err(invalid(
            "trader",
            "history_capacity",
            "history_capacity must be non-negative (0 = unbounded)",
        ));
    }
    if value > 0 && value < bar_count {
        return Err(invalid(
            "trader",
            "history_capacity",
            "history_capacity must hold at least bar_count bars",
        ));
    }
    Ok(())
}

fn validate_poll_interval(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let value = config.get_int("trader", "poll_interval_secs", 300);
    if value < 1 {
        return Err(invalid(
            "trader",
            "poll_interval_secs",
            "poll_interval_secs must be at least 1",
        ));
    }
    Ok(())
}

fn validate_volumes(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let default = config.get_double("trader", "default_volume", DEFAULT_VOLUME);
    if default.is_nan() || default <= 0.0 {
        return Err(invalid(
            "trader",
            "default_volume",
            "default_volume must be positive",
        ));
    }

    for key in config.keys("volumes") {
        let value = config.get_double("volumes", &key, f64::NAN);
        if value.is_nan() || value <= 0.0 {
            return Err(invalid("volumes", &key, "volume must be a positive number"));
        }
    }
    Ok(())
}

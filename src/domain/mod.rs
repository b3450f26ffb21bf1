//! Core domain types and logic.

pub mod ohlcv;
pub mod timeframe;
pub mod history;
pub mod indicator;
pub mod alignment;
pub mod signal;
pub mod order;
pub mod position;
pub mod instruments;
pub mod trader_config;
pub mod config_validation;
pub mod trader;
pub mod error;

//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapters::csv_adapter::{CsvAdapter, TIMESTAMP_FORMAT};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::config_validation::validate_trader_config;
use crate::domain::error::TraderError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::instruments::{parse_instruments, parse_timeframes};
use crate::domain::position::PositionState;
use crate::domain::timeframe::{Timeframe, TimeframeSet};
use crate::domain::trader::Trader;
use crate::domain::trader_config::{
    TraderConfig, DEFAULT_BAR_COUNT, DEFAULT_HISTORY_CAPACITY, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_VOLUME,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::order_port::OrderPort;

pub const DEFAULT_CSV_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(
    name = "triplescreen",
    about = "Multi-timeframe momentum trading loop"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the trading loop against CSV data and the paper broker
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
        /// Replay from this time ("YYYY-MM-DD HH:MM:SS", UTC) without sleeping
        #[arg(long)]
        replay_start: Option<String>,
    },
    /// Validate a configuration and print the resolved plan
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            ticks,
            replay_start,
        } => run_trader(&config, ticks, replay_start.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn get_count(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, TraderError> {
    let value = adapter.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| invalid(section, key, format!("{value} is negative")))
}

pub fn build_trader_config(adapter: &dyn ConfigPort) -> Result<TraderConfig, TraderError> {
    let instruments_str = adapter
        .get_string("trader", "instruments")
        .ok_or_else(|| TraderError::ConfigMissing {
            section: "trader".into(),
            key: "instruments".into(),
        })?;
    let instruments = parse_instruments(&instruments_str)
        .map_err(|e| invalid("trader", "instruments", e.to_string()))?;

    let timeframes = match adapter.get_string("trader", "timeframes") {
        Some(s) => {
            parse_timeframes(&s).map_err(|e| invalid("trader", "timeframes", e.to_string()))?
        }
        None => TimeframeSet::default(),
    };

    let history_capacity = match get_count(
        adapter,
        "trader",
        "history_capacity",
        DEFAULT_HISTORY_CAPACITY,
    )? {
        0 => None,
        n => Some(n),
    };

    // configparser lower-cases keys
    let volumes: HashMap<String, f64> = adapter
        .keys("volumes")
        .into_iter()
        .map(|key| {
            let volume = adapter.get_double("volumes", &key, f64::NAN);
            (key.to_uppercase(), volume)
        })
        .collect();

    let defaults = IndicatorParams::default();
    let indicators = IndicatorParams {
        macd_fast: get_count(adapter, "indicators", "macd_fast", defaults.macd_fast)?,
        macd_slow: get_count(adapter, "indicators", "macd_slow", defaults.macd_slow)?,
        macd_signal: get_count(adapter, "indicators", "macd_signal", defaults.macd_signal)?,
        force_span: get_count(adapter, "indicators", "force_span", defaults.force_span)?,
    };

    let poll_secs = get_count(
        adapter,
        "trader",
        "poll_interval_secs",
        DEFAULT_POLL_INTERVAL_SECS as usize,
    )?;

    Ok(TraderConfig {
        instruments,
        timeframes,
        bar_count: get_count(adapter, "trader", "bar_count", DEFAULT_BAR_COUNT)?,
        history_capacity,
        poll_interval: Duration::from_secs(poll_secs as u64),
        default_volume: adapter.get_double("trader", "default_volume", DEFAULT_VOLUME),
        volumes,
        indicators,
    })
}

pub fn parse_replay_start(input: &str) -> Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(input.trim(), TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|e| {
            format!(
                "invalid replay start '{}': {} (expected YYYY-MM-DD HH:MM:SS)",
                input, e
            )
        })
}

/// Runs ticks until `ticks` is reached.
///
/// When the adapter has a replay clock, the clock advances by the fast timeframe
/// after each tick and the loop never sleeps. A replay also stops once the clock
/// has reached the close of the newest fast bar on file, so it ends without a
/// tick limit. Without a replay clock the loop sleeps the poll interval between
/// ticks and only a tick limit stops it. Returns the number of ticks run.
pub fn run_loop(
    trader: &mut Trader,
    market: &mut CsvAdapter,
    orders: &mut dyn OrderPort,
    ticks: Option<u64>,
) -> u64 {
    let instruments = trader.config().instruments.clone();
    let fast = trader.config().timeframes.fast;
    let step = fast.duration();
    let poll_interval = trader.config().poll_interval;
    let replay_end = market
        .now()
        .map(|_| replay_data_end(market, &instruments, fast));
    let mut completed = 0;

    while ticks.is_none_or(|limit| completed < limit) {
        let volumes = trader.config().volumes_by_instrument();
        let report = trader.run_tick(&*market, orders, &instruments, &volumes);
        completed += 1;

        info!(
            tick = completed,
            clock = ?market.now(),
            skipped = report.skipped(),
            fills = report.fills(),
            "loop tick"
        );

        if ticks.is_some_and(|limit| completed >= limit) {
            break;
        }
        match (market.now(), replay_end) {
            (Some(now), Some(end)) if end.is_none_or(|end| now >= end) => {
                info!(clock = %now, "replay data exhausted");
                break;
            }
            (Some(now), _) => market.set_now(now + step),
            (None, _) => std::thread::sleep(poll_interval),
        }
    }

    completed
}

/// Latest close of any instrument's newest fast bar. Unreadable files count as empty.
fn replay_data_end(
    market: &CsvAdapter,
    instruments: &[String],
    timeframe: Timeframe,
) -> Option<DateTime<Utc>> {
    instruments
        .iter()
        .filter_map(|instrument| market.data_end(instrument, timeframe).ok().flatten())
        .max()
}

fn run_trader(config_path: &PathBuf, ticks: Option<u64>, replay_start: Option<&str>) -> ExitCode {
    info!(path = %config_path.display(), "loading config");
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_trader_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let trader_config = match build_trader_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let first_ticket = match u64::try_from(adapter.get_int("broker", "first_ticket", 1)) {
        Ok(n) => n,
        Err(_) => {
            let err = invalid("broker", "first_ticket", "first_ticket must be non-negative");
            eprintln!("error: {err}");
            return (&err).into();
        }
    };

    let csv_dir = adapter
        .get_string("data", "csv_dir")
        .unwrap_or_else(|| DEFAULT_CSV_DIR.to_string());
    let mut market = CsvAdapter::new(PathBuf::from(&csv_dir));
    if let Some(start) = replay_start {
        match parse_replay_start(start) {
            Ok(now) => {
                let snapped = trader_config.timeframes.fast.floor(now);
                if snapped != now {
                    warn!(from = %now, to = %snapped, "replay start snapped to bar boundary");
                }
                market.set_now(snapped);
            }
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(2);
            }
        }
    }
    let mut broker = PaperBroker::new(first_ticket);

    info!(
        instruments = %trader_config.instruments.join(","),
        timeframes = %trader_config.timeframes,
        indicators = %trader_config.indicators,
        csv_dir = %csv_dir,
        replay = replay_start.is_some(),
        "starting trader"
    );

    let mut trader = Trader::new(trader_config);
    let completed = run_loop(&mut trader, &mut market, &mut broker, ticks);

    eprintln!("\nFinished after {} ticks, {} fills", completed, broker.journal().len());
    for instrument in &trader.config().instruments {
        let position = trader.position(instrument);
        match position.open_order() {
            Some(order) => eprintln!(
                "  {}: {} {} (volume {})",
                instrument,
                position.state(),
                order.reference,
                order.volume
            ),
            None => eprintln!("  {}: {}", instrument, PositionState::Flat),
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_trader_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let config = match build_trader_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Config validated successfully");
    eprintln!("\nInstruments:");
    for instrument in &config.instruments {
        eprintln!("  {} (volume {})", instrument, config.volume_for(instrument));
    }
    eprintln!("\nTimeframes (fast,mid,slow): {}", config.timeframes);
    eprintln!("Indicators: {}", config.indicators);
    eprintln!("Bars per fetch: {}", config.bar_count);
    match config.history_capacity {
        Some(n) => eprintln!("History capacity: {} bars", n),
        None => eprintln!("History capacity: unbounded"),
    }
    eprintln!("Poll interval: {}s", config.poll_interval.as_secs());

    let csv_dir = adapter
        .get_string("data", "csv_dir")
        .unwrap_or_else(|| DEFAULT_CSV_DIR.to_string());
    eprintln!("\nData directory: {}", csv_dir);
    let market = CsvAdapter::new(PathBuf::from(&csv_dir));
    for (role, timeframe) in config.timeframes.roles() {
        match market.list_instruments(timeframe) {
            Ok(available) => {
                let missing: Vec<&str> = config
                    .instruments
                    .iter()
                    .filter(|i| !available.contains(i))
                    .map(String::as_str)
                    .collect();
                if missing.is_empty() {
                    eprintln!("  {} {}: all instruments present", role, timeframe);
                } else {
                    eprintln!("  {} {}: missing {}", role, timeframe, missing.join(", "));
                }
            }
            Err(e) => eprintln!("  {} {}: {}", role, timeframe, e),
        }
    }
    ExitCode::SUCCESS
}

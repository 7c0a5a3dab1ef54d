//! CLI definition and dispatch.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::adapters::cached_store::CachedCandleStore;
use crate::adapters::csv_candles::CsvCandleSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::coordinator::{RunCoordinator, RunRequest};
use crate::domain::analytics::summarize;
use crate::domain::candle::Timeframe;
use crate::domain::config_validation::{validate_run_config, validate_strategy_config};
use crate::domain::error::EngineError;
use crate::domain::position::Side;
use crate::domain::rule_parser;
use crate::domain::sizing::{FeeConfig, PositionSizing};
use crate::domain::strategy::Strategy;
use crate::domain::indicator::registry::registry;
use crate::ports::candle_port::CandleSource;
use crate::ports::config_port::ConfigPort;
use crate::ports::progress_port::ChannelProgressSink;

#[derive(Parser, Debug)]
#[command(name = "quantsim", about = "Trading strategy backtesting engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Directory of candle CSV files; overrides [run] data_dir
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate run and strategy configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
    },
    /// List available indicators and their parameters
    Indicators,
}

pub fn run(cli: Cli) -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Backtest {
            config,
            strategy,
            data,
            symbol,
        } => run_backtest(&config, strategy.as_ref(), data, symbol.as_deref()),
        Command::Validate { config, strategy } => run_validate(&config, strategy.as_ref()),
        Command::Indicators => run_indicators(),
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = EngineError::Io {
            reason: format!("{}: {}", path.display(), e),
        };
        eprintln!("error: {err}");
        (&err).into()
    })
}

fn run_backtest(
    config_path: &PathBuf,
    strategy_path: Option<&PathBuf>,
    data_override: Option<PathBuf>,
    symbol_override: Option<&str>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_run_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let strategy_adapter: Option<FileConfigAdapter>;
    let strategy_config: &dyn ConfigPort = if let Some(path) = strategy_path {
        strategy_adapter = Some(match load_config(path) {
            Ok(a) => a,
            Err(code) => return code,
        });
        strategy_adapter.as_ref().map(|a| a as &dyn ConfigPort).unwrap_or(&adapter)
    } else {
        &adapter
    };
    if let Err(e) = validate_strategy_config(strategy_config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let strategy = match build_strategy(&adapter, strategy_config, symbol_override) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let data_dir = data_override
        .or_else(|| adapter.get_string("run", "data_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let store = CachedCandleStore::new(CsvCandleSource::new(data_dir));

    let (start, end) = match parse_run_range(&adapter) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let candles = match store.get_range(&strategy.symbol, strategy.timeframe, start, end) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!(
        "Loaded {} candles for {} {}",
        candles.len(),
        strategy.symbol,
        strategy.timeframe
    );

    let initial_balance = adapter.get_double("run", "initial_balance", 10_000.0);
    let risk_free_rate = adapter.get_double("run", "risk_free_rate", 0.0);
    let max_concurrent = adapter.get_int("run", "max_concurrent_runs", 2).max(1) as usize;
    let run_id = adapter
        .get_string("run", "run_id")
        .unwrap_or_else(|| format!("{}-{}", strategy.symbol, strategy.timeframe));

    let (tx, rx) = mpsc::channel();
    let coordinator = RunCoordinator::new(max_concurrent, Arc::new(ChannelProgressSink::new(tx)));
    if let Err(e) = coordinator.submit(RunRequest {
        run_id: run_id.clone(),
        strategy,
        candles,
        initial_balance,
    }) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let mut last_percent = 0;
    for update in rx {
        if update.percent_complete >= last_percent + 10 {
            last_percent = update.percent_complete;
            eprintln!("{}: {}%", update.run_id, update.percent_complete);
        }
        if update.status.is_terminal() {
            break;
        }
    }

    // The terminal progress event can arrive just before the worker stores
    // the outcome; poll briefly instead of failing on the gap.
    let mut outcome = coordinator.outcome(&run_id);
    for _ in 0..100 {
        if outcome.is_some() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
        outcome = coordinator.outcome(&run_id);
    }
    let Some(outcome) = outcome else {
        eprintln!("error: run {run_id} produced no outcome");
        return ExitCode::from(6);
    };
    if let Some(e) = &outcome.error {
        eprintln!("error: {e}");
        return e.into();
    }

    let summary = summarize(
        &outcome.trades,
        &outcome.equity_curve,
        initial_balance,
        risk_free_rate,
    );
    println!("Run:            {run_id} ({:?})", outcome.status);
    println!("Trades:         {}", summary.total_trades);
    println!(
        "Wins / losses:  {} / {}",
        summary.winning_trades, summary.losing_trades
    );
    println!("Win rate:       {:.2}%", summary.win_rate * 100.0);
    println!("Profit factor:  {:.2}", summary.profit_factor);
    println!(
        "Total pnl:      {:.2} ({:.2}%)",
        summary.total_pnl, summary.total_pnl_pct
    );
    println!(
        "Max drawdown:   {:.2} ({:.2}%)",
        summary.max_drawdown, summary.max_drawdown_pct
    );
    println!("Sharpe:         {:.2}", summary.sharpe_ratio);
    println!("Sortino:        {:.2}", summary.sortino_ratio);
    println!(
        "Avg win / loss: {:.2} / {:.2}",
        summary.average_win, summary.average_loss
    );
    ExitCode::SUCCESS
}

fn parse_run_range(
    adapter: &dyn ConfigPort,
) -> Result<(DateTime<Utc>, DateTime<Utc>), EngineError> {
    let get = |key: &str| {
        adapter
            .get_string("run", key)
            .ok_or_else(|| EngineError::ConfigMissing {
                section: "run".to_string(),
                key: key.to_string(),
            })
    };
    let parse = |key: &str, value: String| {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| EngineError::ConfigInvalid {
                section: "run".to_string(),
                key: key.to_string(),
                reason: "expected RFC 3339 timestamp".to_string(),
            })
    };
    let start = parse("start", get("start")?)?;
    let end = parse("end", get("end")?)?;
    Ok((start, end))
}

pub fn build_strategy(
    run_config: &dyn ConfigPort,
    strategy_config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<Strategy, ExitCode> {
    let name = strategy_config
        .get_string("strategy", "name")
        .unwrap_or_else(|| "Unnamed".to_string());

    let symbol = match symbol_override
        .map(str::to_string)
        .or_else(|| run_config.get_string("run", "symbol"))
    {
        Some(s) => s,
        None => {
            eprintln!("error: symbol is required");
            return Err(ExitCode::from(2));
        }
    };

    let timeframe = run_config
        .get_string("run", "timeframe")
        .and_then(|s| s.parse::<Timeframe>().ok())
        .unwrap_or(Timeframe::H1);

    let side = match strategy_config
        .get_string("strategy", "side")
        .unwrap_or_else(|| "long".to_string())
        .as_str()
    {
        "long" => Side::Long,
        "short" => Side::Short,
        other => {
            eprintln!("error: invalid side '{other}', expected long or short");
            return Err(ExitCode::from(2));
        }
    };

    let parse_rules = |key: &str| {
        let text = strategy_config
            .get_string("strategy", key)
            .unwrap_or_default();
        rule_parser::parse_list(&text).map_err(|e| {
            eprintln!(
                "error: failed to parse {key}:\n{}",
                e.display_with_context(&text)
            );
            ExitCode::from(4)
        })
    };
    let entry_rules = parse_rules("entry")?;
    let exit_rules = parse_rules("exit")?;

    let pct_level = |key: &str| {
        let value = strategy_config.get_double("strategy", key, 0.0);
        (value > 0.0).then_some(value)
    };

    let sizing = match strategy_config
        .get_string("strategy", "sizing_mode")
        .unwrap_or_else(|| "fixed".to_string())
        .as_str()
    {
        "fixed" => PositionSizing::FixedFraction {
            fraction: strategy_config.get_double("strategy", "fraction", 0.25),
        },
        "risk" => PositionSizing::RiskFraction {
            risk_per_trade: strategy_config.get_double("strategy", "risk_per_trade", 0.01),
        },
        other => {
            eprintln!("error: unknown sizing_mode '{other}'");
            return Err(ExitCode::from(2));
        }
    };

    Ok(Strategy {
        name,
        symbol,
        timeframe,
        side,
        entry_rules,
        exit_rules,
        stop_loss_pct: pct_level("stop_loss_pct"),
        take_profit_pct: pct_level("take_profit_pct"),
        sizing,
        max_position_size: strategy_config.get_double("strategy", "max_position_size", 1.0),
        fees: FeeConfig {
            fee_per_trade: run_config.get_double("run", "fee_per_trade", 0.0),
            fee_pct: run_config.get_double("run", "fee_pct", 0.0),
        },
    })
}

fn run_validate(config_path: &PathBuf, strategy_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_run_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let strategy_adapter;
    let strategy_config: &dyn ConfigPort = match strategy_path {
        Some(path) => {
            strategy_adapter = match load_config(path) {
                Ok(a) => a,
                Err(code) => return code,
            };
            &strategy_adapter
        }
        None => &adapter,
    };
    if let Err(e) = validate_strategy_config(strategy_config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let strategy = match build_strategy(&adapter, strategy_config, None) {
        Ok(s) => s,
        Err(code) => return code,
    };
    println!("Configuration OK");
    println!("Strategy:   {}", strategy.name);
    println!(
        "Rules:      {} entry, {} exit",
        strategy.entry_rules.len(),
        strategy.exit_rules.len()
    );
    let indicators: Vec<String> = strategy
        .referenced_indicators()
        .iter()
        .map(|i| i.to_string())
        .collect();
    println!("Indicators: {}", indicators.join(", "));
    println!("Warm-up:    {} candles", strategy.max_lookback());
    ExitCode::SUCCESS
}

fn run_indicators() -> ExitCode {
    for spec in registry() {
        println!("{} ({}) - {}", spec.id, spec.category, spec.name);
        println!("    {}", spec.description);
        for param in spec.params {
            println!(
                "    {}: {:?} (default {}) [{}..{}]",
                param.name, param.kind, param.default, param.min, param.max
            );
        }
    }
    ExitCode::SUCCESS
}

//! Sequential simulation engine.
//!
//! Walks a candle series in ascending time with at most one open position.
//! Indicator series are precomputed for the full range but only read up to
//! the current index, so causality holds with the prefix-closed recurrences
//! used by every indicator. Runs are deterministic for fixed inputs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::candle::{check_sorted, Candle};
use crate::domain::error::EngineError;
use crate::domain::indicator::{compute, IndicatorSeries, IndicatorType};
use crate::domain::position::{Position, Trade};
use crate::domain::rule_eval::{evaluate_entry, evaluate_exit, Signal};
use crate::domain::sizing::{calculate_fee, calculate_quantity};
use crate::domain::strategy::Strategy;
use crate::ports::progress_port::{ProgressSink, ProgressUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub balance: f64,
}

/// Terminal result of a run. `trades` and `equity_curve` are preserved for
/// failed and cancelled runs up to `last_index`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub last_index: usize,
    pub error: Option<EngineError>,
}

struct OpenState {
    position: Position,
    entry_index: usize,
    entry_fee: f64,
}

fn close_position(
    state: OpenState,
    symbol: &str,
    exit_time: DateTime<Utc>,
    exit_price: f64,
    exit_reason: &str,
    fees: &crate::domain::sizing::FeeConfig,
    balance: &mut f64,
    trades: &mut Vec<Trade>,
) {
    let position = state.position;
    let exit_fee = calculate_fee(position.quantity * exit_price, fees);
    let total_fees = state.entry_fee + exit_fee;
    let gross = position.side.sign() * position.quantity * (exit_price - position.entry_price);
    let pnl = gross - total_fees;
    let pnl_pct = position.side.sign() * (exit_price - position.entry_price)
        / position.entry_price
        * 100.0;
    *balance += pnl;
    debug!(
        symbol,
        exit_reason,
        exit_price,
        pnl,
        balance = *balance,
        "closed position"
    );
    trades.push(Trade {
        symbol: symbol.to_string(),
        side: position.side,
        quantity: position.quantity,
        entry_time: position.entry_time,
        entry_price: position.entry_price,
        exit_time,
        exit_price,
        pnl,
        pnl_pct,
        fees: total_fees,
        entry_reason: position.entry_reason,
        exit_reason: exit_reason.to_string(),
    });
}

/// Execute one run over `candles`. Never panics on bad input; precondition
/// and mid-run faults surface as a `Failed` outcome with the partial trade
/// ledger and last processed index preserved.
pub fn run(
    run_id: &str,
    strategy: &Strategy,
    candles: &[Candle],
    initial_balance: f64,
    progress: &dyn ProgressSink,
    cancel: &AtomicBool,
) -> RunOutcome {
    info!(run_id, strategy = %strategy.name, candles = candles.len(), "run starting");

    let fail = |last_index: usize,
                trades: Vec<Trade>,
                equity_curve: Vec<EquityPoint>,
                error: EngineError| {
        warn!(run_id, %error, "run failed");
        progress.emit(ProgressUpdate {
            run_id: run_id.to_string(),
            status: RunStatus::Failed,
            percent_complete: percent(last_index, candles.len()),
        });
        RunOutcome {
            status: RunStatus::Failed,
            trades,
            equity_curve,
            last_index,
            error: Some(error),
        }
    };

    if let Err(err) = check_sorted(candles) {
        return fail(0, Vec::new(), Vec::new(), err);
    }
    let need = strategy.max_lookback();
    if candles.len() < need {
        // Not fatal: indicators stay undefined, every rule reports NotReady
        // and the run completes with an empty ledger.
        warn!(
            run_id,
            have = candles.len(),
            need,
            "series shorter than strategy lookback"
        );
    }

    let series: HashMap<IndicatorType, IndicatorSeries> = strategy
        .referenced_indicators()
        .into_iter()
        .map(|t| (t, compute(t, candles)))
        .collect();

    let mut balance = initial_balance;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(candles.len());
    let mut open: Option<OpenState> = None;
    let mut last_percent: u8 = 0;

    progress.emit(ProgressUpdate {
        run_id: run_id.to_string(),
        status: RunStatus::Running,
        percent_complete: 0,
    });

    for (i, candle) in candles.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            info!(run_id, index = i, "run cancelled");
            progress.emit(ProgressUpdate {
                run_id: run_id.to_string(),
                status: RunStatus::Cancelled,
                percent_complete: percent(i, candles.len()),
            });
            return RunOutcome {
                status: RunStatus::Cancelled,
                trades,
                equity_curve,
                last_index: i,
                error: None,
            };
        }

        // Exits first. Triggers apply from the candle after entry; the entry
        // candle already traded at its close. A position closed here keeps the
        // step occupied, so re-entry waits for the next candle.
        let flat_at_step_start = open.is_none();
        if let Some(state) = open.take() {
            if i > state.entry_index {
                if state.position.stop_hit(candle.high, candle.low) {
                    let stop = state.position.stop_loss.unwrap_or(candle.close);
                    close_position(
                        state,
                        &strategy.symbol,
                        candle.timestamp,
                        stop,
                        "stop_loss",
                        &strategy.fees,
                        &mut balance,
                        &mut trades,
                    );
                } else if state.position.take_profit_hit(candle.high, candle.low) {
                    let target = state.position.take_profit.unwrap_or(candle.close);
                    close_position(
                        state,
                        &strategy.symbol,
                        candle.timestamp,
                        target,
                        "take_profit",
                        &strategy.fees,
                        &mut balance,
                        &mut trades,
                    );
                } else if let Some(rule_index) =
                    evaluate_exit(&strategy.exit_rules, candles, &series, i)
                {
                    close_position(
                        state,
                        &strategy.symbol,
                        candle.timestamp,
                        candle.close,
                        &format!("exit_rule_{rule_index}"),
                        &strategy.fees,
                        &mut balance,
                        &mut trades,
                    );
                } else {
                    open = Some(state);
                }
            } else {
                open = Some(state);
            }
        }

        if flat_at_step_start
            && evaluate_entry(&strategy.entry_rules, candles, &series, i) == Signal::Fire
        {
            let entry_price = candle.close;
            let stop_loss = strategy.stop_price(entry_price);
            let take_profit = strategy.take_profit_price(entry_price);
            let quantity = calculate_quantity(
                strategy.sizing,
                balance,
                entry_price,
                stop_loss,
                strategy.max_position_size,
            );
            if !quantity.is_finite() {
                return fail(
                    i,
                    trades,
                    equity_curve,
                    EngineError::SimulationFailure {
                        run_id: run_id.to_string(),
                        last_index: i,
                        reason: format!("non-finite quantity at price {entry_price}"),
                    },
                );
            }
            if quantity > 0.0 {
                let entry_fee = calculate_fee(quantity * entry_price, &strategy.fees);
                debug!(
                    symbol = %strategy.symbol,
                    index = i,
                    entry_price,
                    quantity,
                    "opened position"
                );
                open = Some(OpenState {
                    position: Position {
                        side: strategy.side,
                        quantity,
                        entry_price,
                        entry_time: candle.timestamp,
                        stop_loss,
                        take_profit,
                        entry_reason: "entry_rules".to_string(),
                    },
                    entry_index: i,
                    entry_fee,
                });
            }
        }

        equity_curve.push(EquityPoint {
            timestamp: candle.timestamp,
            balance,
        });

        let pct = percent(i + 1, candles.len());
        if pct > last_percent {
            last_percent = pct;
            progress.emit(ProgressUpdate {
                run_id: run_id.to_string(),
                status: RunStatus::Running,
                percent_complete: pct,
            });
        }
    }

    if let Some(state) = open.take() {
        if let Some(last) = candles.last() {
            close_position(
                state,
                &strategy.symbol,
                last.timestamp,
                last.close,
                "end_of_data",
                &strategy.fees,
                &mut balance,
                &mut trades,
            );
            if let Some(point) = equity_curve.last_mut() {
                point.balance = balance;
            }
        }
    }

    info!(run_id, trades = trades.len(), balance, "run completed");
    progress.emit(ProgressUpdate {
        run_id: run_id.to_string(),
        status: RunStatus::Completed,
        percent_complete: 100,
    });
    RunOutcome {
        status: RunStatus::Completed,
        trades,
        equity_curve,
        last_index: candles.len().saturating_sub(1),
        error: None,
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100) / total).min(100) as u8
}

//! Performance analytics over a finished (or partial) trade ledger and
//! equity curve. Always recomputed from scratch; no incremental state.

use crate::domain::engine::EquityPoint;
use crate::domain::position::Trade;

/// Stand-in for an infinite profit factor when gross loss is zero.
pub const PROFIT_FACTOR_CAP: f64 = 999.99;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub total_pnl: f64,
    pub total_pnl_pct: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

/// `risk_free_rate` is per equity-curve period, and the Sharpe/Sortino ratios
/// come back per-period as well; annualizing is up to the caller since the
/// curve's periodicity depends on the run's timeframe.
pub fn summarize(
    trades: &[Trade],
    equity_curve: &[EquityPoint],
    initial_balance: f64,
    risk_free_rate: f64,
) -> PerformanceSummary {
    let mut winning_trades = 0usize;
    let mut losing_trades = 0usize;
    let mut gross_profit = 0.0_f64;
    let mut gross_loss = 0.0_f64;
    let mut largest_win = 0.0_f64;
    let mut largest_loss = 0.0_f64;

    for trade in trades {
        if trade.pnl > 0.0 {
            winning_trades += 1;
            gross_profit += trade.pnl;
            if trade.pnl > largest_win {
                largest_win = trade.pnl;
            }
        } else if trade.pnl < 0.0 {
            losing_trades += 1;
            gross_loss += trade.pnl.abs();
            if trade.pnl.abs() > largest_loss {
                largest_loss = trade.pnl.abs();
            }
        }
    }

    let total_trades = trades.len();
    let win_rate = winning_trades as f64 / (total_trades.max(1)) as f64;

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        PROFIT_FACTOR_CAP
    } else {
        0.0
    };

    let (max_drawdown, max_drawdown_pct) = compute_drawdown(equity_curve);

    let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve, risk_free_rate);

    let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let total_pnl_pct = if initial_balance > 0.0 {
        total_pnl / initial_balance * 100.0
    } else {
        0.0
    };

    let average_win = if winning_trades > 0 {
        gross_profit / winning_trades as f64
    } else {
        0.0
    };
    let average_loss = if losing_trades > 0 {
        gross_loss / losing_trades as f64
    } else {
        0.0
    };

    PerformanceSummary {
        total_trades,
        winning_trades,
        losing_trades,
        win_rate,
        profit_factor,
        max_drawdown,
        max_drawdown_pct,
        sharpe_ratio,
        sortino_ratio,
        total_pnl,
        total_pnl_pct,
        average_win,
        average_loss,
        largest_win,
        largest_loss,
    }
}

/// Largest peak-to-trough decline, absolute and as a fraction of the peak
/// expressed in percent.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, f64) {
    if equity_curve.is_empty() {
        return (0.0, 0.0);
    }
    let mut peak = equity_curve[0].balance;
    let mut max_dd = 0.0_f64;
    let mut max_dd_pct = 0.0_f64;
    for point in equity_curve {
        if point.balance > peak {
            peak = point.balance;
        } else {
            let dd = peak - point.balance;
            if dd > max_dd {
                max_dd = dd;
            }
            if peak > 0.0 {
                let dd_pct = dd / peak * 100.0;
                if dd_pct > max_dd_pct {
                    max_dd_pct = dd_pct;
                }
            }
        }
    }
    (max_dd, max_dd_pct)
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], period_rf: f64) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].balance;
            if prev > 0.0 {
                (w[1].balance - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let excess = mean - period_rf;

    let sharpe = if stddev > 0.0 { excess / stddev } else { 0.0 };

    let downside_variance: f64 = returns
        .iter()
        .filter(|&&r| r < period_rf)
        .map(|&r| (r - period_rf).powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside_variance.sqrt();

    let sortino = if downside_stddev > 0.0 {
        excess / downside_stddev
    } else {
        0.0
    };

    (sharpe, sortino)
}

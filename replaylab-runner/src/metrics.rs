//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity series in, scalar out. Degenerate
//! inputs (too few points, zero variance, non-positive peaks) give 0.0.

use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub initial_capital: f64,
    /// Cash plus holdings after the last dispatched event.
    pub final_equity: f64,
    /// `total_equity` of the last curve point; lags `final_equity` when the last
    /// bar produced fills. Equals `initial_capital` for an empty curve.
    #[serde(default)]
    pub curve_final_equity: f64,
    pub total_return: f64,
    pub sharpe: f64,
    /// Positive fraction, e.g. 0.15 = 15% below the running peak.
    pub max_drawdown: f64,
    pub fill_count: usize,
    pub total_commission: f64,
}

impl PerformanceMetrics {
    /// Compute return and risk metrics from a total-equity series.
    ///
    /// `fill_count` and `total_commission` start at zero; the runner fills them in
    /// from the portfolio ledger.
    pub fn compute(
        equity: &[f64],
        initial_capital: f64,
        final_equity: f64,
        periods_per_year: f64,
        risk_free_rate: f64,
    ) -> Self {
        let returns = periodic_returns(equity);
        Self {
            initial_capital,
            final_equity,
            curve_final_equity: equity.last().copied().unwrap_or(initial_capital),
            total_return: total_return(initial_capital, final_equity),
            sharpe: sharpe_ratio(&returns, periods_per_year, risk_free_rate),
            max_drawdown: max_drawdown(equity),
            fill_count: 0,
            total_commission: 0.0,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `final / initial - 1`.
pub fn total_return(initial_capital: f64, final_equity: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    final_equity / initial_capital - 1.0
}

/// Annualized Sharpe ratio from periodic returns.
///
/// Sharpe = mean(r - rf/ppy) / std(r - rf/ppy) * sqrt(ppy), population std.
/// Returns 0.0 with fewer than 2 returns or zero deviation.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64, risk_free_rate: f64) -> f64 {
    if returns.len() < 2 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let period_rf = risk_free_rate / periods_per_year;
    let excess: Vec<f64> = returns.iter().map(|r| r - period_rf).collect();
    let mean = mean_f64(&excess);
    let std = population_std(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * periods_per_year.sqrt()
}

/// Per-point drawdown: `(running_peak - equity) / running_peak`, never negative.
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&eq| {
            peak = peak.max(eq);
            if peak > 0.0 {
                ((peak - eq) / peak).max(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Largest value of [`drawdown_series`], 0.0 for an empty series.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    drawdown_series(equity).into_iter().fold(0.0, f64::max)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive points.
pub fn periodic_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

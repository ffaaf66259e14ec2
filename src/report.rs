//! Backtest report types, summary statistics and CSV export.

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::lp_position::AdjustmentDirection;
use crate::pricing;

/// One row of the day-by-day backtest output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: DateTime<FixedOffset>,
    pub lp_value: f64,
    pub daily_fees: f64,
    pub cumulative_fees: f64,
    pub il_pct: f64,
    pub hedge_notional: f64,
    pub leverage: f64,
    pub funding_rate: f64,
    pub cumulative_funding_cost: f64,
    pub hedge_pnl: f64,
    pub combined_pnl: f64,
    pub running_apr: f64,
}

/// Recorded hedge-notional change triggered by the adjustment signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceEvent {
    pub date: DateTime<FixedOffset>,
    pub old_notional: f64,
    pub new_notional: f64,
    pub direction: AdjustmentDirection,
    pub deviation: f64,
}

/// Complete output of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub total_return_pct: f64,
    pub lp_fees_total: f64,
    /// Net funding paid; negative means net income received.
    pub funding_costs_total: f64,
    /// `lp_fees_total - funding_costs_total`.
    pub net_fees: f64,
    pub hedge_pnl_total: f64,
    pub time_in_range_pct: f64,
    /// Fee APR annualized over the processed days.
    pub apr_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub alpha_vs_hold_pct: f64,
    pub days_processed: u32,
    pub days_skipped: u32,
    pub per_day: Vec<DailyRecord>,
    pub rebalances: Vec<RebalanceEvent>,
}

impl BacktestReport {
    /// Write the per-day rows as a CSV file.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.per_day {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Maximum peak-to-trough drawdown of an equity series, percent.
///
/// Returns 0 for empty or monotonically non-decreasing series.
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for &value in equity {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let drawdown = (peak - value) / peak * 100.0;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }

    worst
}

/// Annualized Sharpe ratio of the daily returns of an equity series.
///
/// Returns 0 for series too short or too flat to produce a meaningful ratio.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    if equity.len() < 3 {
        return 0.0;
    }

    let mut returns = Vec::with_capacity(equity.len() - 1);
    for window in equity.windows(2) {
        if window[0] != 0.0 {
            returns.push(window[1] / window[0] - 1.0);
        }
    }

    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| {
            let diff = r - mean;
            diff * diff
        })
        .sum::<f64>()
        / (returns.len() - 1) as f64;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return 0.0;
    }

    mean / std_dev * pricing::DAYS_PER_YEAR.sqrt()
}

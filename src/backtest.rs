//! Backtest orchestration over an aligned daily timeline.
//!
//! [`HedgedLpBacktest`] drives the LP and hedge models in lockstep, one pool
//! snapshot at a time. Each day the nearest price candle and the nearest
//! funding period are joined into a [`DayContext`]; days without a funding
//! match inside the tolerance window are skipped entirely (neither model is
//! updated). After the last day the combined per-day series is folded into a
//! [`BacktestReport`].

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::{FundingRatePeriod, MarketData, PoolDaySnapshot, PoolPosition, PriceCandle};
use crate::errors::{LpHedgeError, Result};
use crate::hedge_position::{HedgeConfig, HedgeDirection, HedgePositionModel};
use crate::lp_position::{LpConfig, LpPositionModel, PositionType};
use crate::report::{self, BacktestReport, DailyRecord, RebalanceEvent};

/// Parameters of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestParams {
    pub initial_capital: f64,
    pub position_type: PositionType,
    pub tick_spacing: i32,
    pub hedge_direction: HedgeDirection,
    /// Fraction of capital used as the initial hedge notional.
    pub initial_hedge_ratio: f64,
    pub initial_leverage: f64,
    /// Nearest-funding join tolerance, hours.
    pub funding_join_tolerance_hours: i64,
    pub lp_config: LpConfig,
    pub hedge_config: HedgeConfig,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            position_type: PositionType::Concentrated,
            tick_spacing: 60,
            hedge_direction: HedgeDirection::Short,
            initial_hedge_ratio: 0.5,
            initial_leverage: 1.0,
            funding_join_tolerance_hours: 8,
            lp_config: LpConfig::default(),
            hedge_config: HedgeConfig::default(),
        }
    }
}

/// One day's joined inputs, consumed identically by both models.
#[derive(Debug, Clone, Copy)]
pub struct DayContext<'a> {
    pub snapshot: &'a PoolDaySnapshot,
    pub candle: &'a PriceCandle,
    pub funding: &'a FundingRatePeriod,
}

/// Orchestrator owning both position models for the duration of one run.
#[derive(Debug)]
pub struct HedgedLpBacktest {
    market: MarketData,
    params: BacktestParams,
    lp: LpPositionModel,
    hedge: HedgePositionModel,
}

impl HedgedLpBacktest {
    /// Validate inputs and seed both models from day 0.
    ///
    /// Fatal errors (`InvalidInput`) are raised here, before any state
    /// mutation: empty snapshot or candle series, or non-positive capital.
    pub fn new(
        market: MarketData,
        pool_positions: Vec<PoolPosition>,
        params: BacktestParams,
    ) -> Result<Self> {
        market.validate()?;

        if market.snapshots.is_empty() {
            return Err(LpHedgeError::invalid_input("Pool snapshot series is empty"));
        }
        if market.candles.is_empty() {
            return Err(LpHedgeError::invalid_input("Price candle series is empty"));
        }
        if params.initial_capital <= 0.0 {
            return Err(LpHedgeError::invalid_input(format!(
                "Initial capital must be positive, got {}",
                params.initial_capital
            )));
        }

        let first = &market.snapshots[0];
        let lp = LpPositionModel::new(
            params.initial_capital,
            first,
            params.position_type,
            params.tick_spacing,
            pool_positions,
            params.lp_config.clone(),
        )?;

        let reference_price = market
            .nearest_candle(first.datetime())
            .map(|candle| candle.close)
            .ok_or_else(|| LpHedgeError::invalid_input("No candle near the first trading day"))?;

        let hedge = HedgePositionModel::new(
            params.initial_capital * params.initial_hedge_ratio,
            reference_price,
            params.hedge_direction,
            params.initial_leverage,
            params.hedge_config.clone(),
        )?;

        Ok(Self {
            market,
            params,
            lp,
            hedge,
        })
    }

    /// Process every trading day in order and produce the final report.
    ///
    /// Days are strictly sequential: the hedge's mark-to-market depends on the
    /// previous day's value and the LP counters are monotonic accumulators, so
    /// no reordering is permitted.
    pub fn run(&mut self) -> Result<BacktestReport> {
        let tolerance = Duration::hours(self.params.funding_join_tolerance_hours);
        let initial_capital = self.params.initial_capital;

        let mut per_day: Vec<DailyRecord> = Vec::with_capacity(self.market.snapshots.len());
        let mut rebalances: Vec<RebalanceEvent> = Vec::new();
        let mut equity_series: Vec<f64> = Vec::with_capacity(self.market.snapshots.len());
        let mut days_skipped: u32 = 0;
        let mut last_token0_price = None;

        for snapshot in &self.market.snapshots {
            let day = snapshot.datetime();

            let candle = match self.market.nearest_candle(day) {
                Some(candle) => candle,
                None => {
                    warn!(date = %day, "no price candle available, skipping day");
                    days_skipped += 1;
                    continue;
                }
            };
            let funding = match self.market.nearest_funding(day, tolerance) {
                Some(period) => period,
                None => {
                    warn!(
                        date = %day,
                        tolerance_hours = self.params.funding_join_tolerance_hours,
                        "no funding period within tolerance, skipping day"
                    );
                    days_skipped += 1;
                    continue;
                }
            };
            let ctx = DayContext {
                snapshot,
                candle,
                funding,
            };

            let daily_fees = self.lp.update_daily(ctx.snapshot);
            let il_pct = self.lp.impermanent_loss(ctx.snapshot.token0_price);

            let old_notional = self.hedge.notional();
            self.hedge.update_daily(
                ctx.candle.close,
                ctx.funding.funding_rate,
                self.lp.value(),
                il_pct,
            );

            let decision = self.lp.should_adjust_hedge(ctx.snapshot);
            if decision.should_adjust {
                info!(
                    date = %day,
                    old_notional,
                    new_notional = self.hedge.notional(),
                    deviation = decision.deviation,
                    "hedge adjustment signalled"
                );
                rebalances.push(RebalanceEvent {
                    date: day,
                    old_notional,
                    new_notional: self.hedge.notional(),
                    direction: decision.direction,
                    deviation: decision.deviation,
                });
            }

            if self.hedge.check_risk_limits(self.lp.value()) {
                warn!(
                    date = %day,
                    leverage = self.hedge.leverage(),
                    notional = self.hedge.notional(),
                    lp_value = self.lp.value(),
                    "risk limit tripped, de-levering"
                );
                self.hedge.apply_risk_limit_adjustments();
            }

            let equity = self.lp.value() + self.lp.fees() + self.hedge.cumulative_hedge_pnl()
                - self.hedge.cumulative_funding_cost();
            equity_series.push(equity);
            last_token0_price = Some(ctx.snapshot.token0_price);

            debug!(
                date = %day,
                lp_value = self.lp.value(),
                fees = self.lp.fees(),
                il_pct,
                hedge_notional = self.hedge.notional(),
                equity,
                "processed trading day"
            );

            per_day.push(DailyRecord {
                date: day,
                lp_value: self.lp.value(),
                daily_fees,
                cumulative_fees: self.lp.fees(),
                il_pct,
                hedge_notional: self.hedge.notional(),
                leverage: self.hedge.leverage(),
                funding_rate: ctx.funding.funding_rate,
                cumulative_funding_cost: self.hedge.cumulative_funding_cost(),
                hedge_pnl: self.hedge.cumulative_hedge_pnl(),
                combined_pnl: equity - initial_capital,
                running_apr: self.lp.running_apr(),
            });
        }

        let days_processed = self.lp.total_days();
        let total_return_pct = match equity_series.last() {
            Some(final_equity) => (final_equity - initial_capital) / initial_capital * 100.0,
            None => 0.0,
        };

        // Benchmark: holding the entry capital split 50/50 between token0 and
        // the quote asset instead of LPing.
        let alpha_vs_hold_pct = match last_token0_price {
            Some(price) => {
                let initial = self.market.snapshots[0].token0_price;
                let hold_return_pct = if initial > 0.0 {
                    0.5 * (price / initial - 1.0) * 100.0
                } else {
                    0.0
                };
                total_return_pct - hold_return_pct
            }
            None => 0.0,
        };

        let lp_fees_total = self.lp.fees();
        let funding_costs_total = self.hedge.cumulative_funding_cost();

        Ok(BacktestReport {
            total_return_pct,
            lp_fees_total,
            funding_costs_total,
            net_fees: lp_fees_total - funding_costs_total,
            hedge_pnl_total: self.hedge.cumulative_hedge_pnl(),
            time_in_range_pct: self.lp.time_in_range_pct(),
            apr_pct: self.lp.running_apr(),
            max_drawdown_pct: report::max_drawdown_pct(&equity_series),
            sharpe_ratio: report::sharpe_ratio(&equity_series),
            alpha_vs_hold_pct,
            days_processed,
            days_skipped,
            per_day,
            rebalances,
        })
    }

    /// The LP position model owned by this run.
    pub fn lp(&self) -> &LpPositionModel {
        &self.lp
    }

    /// The hedge position model owned by this run.
    pub fn hedge(&self) -> &HedgePositionModel {
        &self.hedge
    }
}

/// Run one backtest end to end.
pub fn run_backtest(
    market: MarketData,
    pool_positions: Vec<PoolPosition>,
    params: BacktestParams,
) -> Result<BacktestReport> {
    HedgedLpBacktest::new(market, pool_positions, params)?.run()
}

//! Concentrated-liquidity position simulation.
//!
//! [`LpPositionModel`] tracks one LP position's value, fee accrual, in-range
//! time and hedge-adjustment signal over a sequence of daily pool snapshots.
//! The position's claim on pool TVL is fixed at entry
//! (`initial_investment / first_snapshot.tvl_usd`) and does not change as TVL
//! grows or shrinks from other LPs' activity.

use serde::{Deserialize, Serialize};

use crate::data::{PoolDaySnapshot, PoolPosition};
use crate::errors::{LpHedgeError, Result};
use crate::pricing;

/// Smallest active-liquidity fraction used when boosting concentrated fees,
/// so a near-empty tick cannot blow the fee share up unboundedly.
const MIN_ACTIVE_FRACTION: f64 = 0.01;

/// Range style of an LP position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionType {
    /// Unbounded range; always in range, earns the plain proportional share.
    FullRange,
    /// Band centered on the entry tick, sized by the pool's tick spacing.
    Concentrated,
}

/// Configuration values used by [`LpPositionModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpConfig {
    /// Fraction of daily volume the pool collects as trading fees.
    pub pool_fee_rate: f64,
    /// Target token0 value fraction the strategy rebalances toward.
    pub target_token_ratio: f64,
    /// Deviation from the target ratio that triggers a hedge adjustment.
    pub ratio_deviation_threshold: f64,
}

impl Default for LpConfig {
    fn default() -> Self {
        Self {
            pool_fee_rate: 0.003,
            target_token_ratio: 0.5,
            ratio_deviation_threshold: 0.05,
        }
    }
}

/// Direction of a signalled hedge adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentDirection {
    Increase,
    Decrease,
}

/// Decision record produced by [`LpPositionModel::should_adjust_hedge`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeAdjustmentDecision {
    pub should_adjust: bool,
    pub direction: AdjustmentDirection,
    /// Absolute deviation of the token ratio from the configured target.
    pub deviation: f64,
    /// Current token0 value fraction of the position.
    pub token_ratio: f64,
}

/// Stateful model of one concentrated-liquidity position.
#[derive(Debug, Clone)]
pub struct LpPositionModel {
    initial_investment: f64,
    lp_share_percentage: f64,
    current_value: f64,
    cumulative_fees: f64,
    days_in_range: u32,
    total_days: u32,
    initial_token0_price: f64,
    position_type: PositionType,
    /// Inclusive tick band; `None` for full-range positions.
    band: Option<(i32, i32)>,
    pool_positions: Vec<PoolPosition>,
    config: LpConfig,
}

impl LpPositionModel {
    /// Create a model seeded from the first pool snapshot.
    ///
    /// Fails with `InvalidInput` when the investment, the snapshot TVL or the
    /// tick spacing is non-positive; nothing is mutated on failure.
    pub fn new(
        initial_investment: f64,
        first_snapshot: &PoolDaySnapshot,
        position_type: PositionType,
        tick_spacing: i32,
        pool_positions: Vec<PoolPosition>,
        config: LpConfig,
    ) -> Result<Self> {
        if initial_investment <= 0.0 {
            return Err(LpHedgeError::invalid_input(format!(
                "Initial investment must be positive, got {}",
                initial_investment
            )));
        }
        if first_snapshot.tvl_usd <= 0.0 {
            return Err(LpHedgeError::invalid_input(format!(
                "First snapshot TVL must be positive, got {}",
                first_snapshot.tvl_usd
            )));
        }
        if tick_spacing <= 0 {
            return Err(LpHedgeError::invalid_input(format!(
                "Tick spacing must be a positive integer, got {}",
                tick_spacing
            )));
        }

        let band = match position_type {
            PositionType::FullRange => None,
            PositionType::Concentrated => Some((
                first_snapshot.tick - tick_spacing,
                first_snapshot.tick + tick_spacing,
            )),
        };

        Ok(Self {
            initial_investment,
            lp_share_percentage: initial_investment / first_snapshot.tvl_usd,
            current_value: initial_investment,
            cumulative_fees: 0.0,
            days_in_range: 0,
            total_days: 0,
            initial_token0_price: first_snapshot.token0_price,
            position_type,
            band,
            pool_positions,
            config,
        })
    }

    /// Advance the position by one day and return the fees earned that day.
    pub fn update_daily(&mut self, snapshot: &PoolDaySnapshot) -> f64 {
        self.total_days += 1;
        self.current_value = snapshot.tvl_usd * self.lp_share_percentage;

        let in_range = self.is_in_range(snapshot.tick);
        let daily_fees = self.daily_fees(snapshot, in_range);
        self.cumulative_fees += daily_fees;

        if in_range {
            self.days_in_range += 1;
        }
        debug_assert!(self.days_in_range <= self.total_days);

        daily_fees
    }

    /// Whether the given tick falls within the position's band.
    pub fn is_in_range(&self, tick: i32) -> bool {
        match self.band {
            None => true,
            Some((lower, upper)) => tick >= lower && tick <= upper,
        }
    }

    /// Fees earned for one day.
    ///
    /// Pool fee revenue is `volume_usd * pool_fee_rate`. A full-range position
    /// earns its plain TVL share of that revenue. A concentrated position
    /// earns a boosted share while in range, scaled by how much of the pool's
    /// competing liquidity is active at the day's tick, and nothing out of
    /// range.
    fn daily_fees(&self, snapshot: &PoolDaySnapshot, in_range: bool) -> f64 {
        let pool_fee_revenue = snapshot.volume_usd * self.config.pool_fee_rate;

        match self.position_type {
            PositionType::FullRange => pool_fee_revenue * self.lp_share_percentage,
            PositionType::Concentrated => {
                if !in_range {
                    return 0.0;
                }
                let active = self.active_liquidity_fraction(snapshot.tick);
                pool_fee_revenue * self.lp_share_percentage / active
            }
        }
    }

    /// Fraction of competing pool liquidity whose band covers `tick`.
    ///
    /// Floored at [`MIN_ACTIVE_FRACTION`]; 1.0 when no competing positions are
    /// known (no boost without data to justify it).
    fn active_liquidity_fraction(&self, tick: i32) -> f64 {
        let total: f64 = self.pool_positions.iter().map(|p| p.liquidity).sum();
        if total <= 0.0 {
            return 1.0;
        }
        let active: f64 = self
            .pool_positions
            .iter()
            .filter(|p| p.covers(tick))
            .map(|p| p.liquidity)
            .sum();
        (active / total).max(MIN_ACTIVE_FRACTION)
    }

    /// Impermanent loss of the position at the given token0 price, percent.
    pub fn impermanent_loss(&self, current_token0_price: f64) -> f64 {
        pricing::impermanent_loss_pct(self.initial_token0_price, current_token0_price)
    }

    /// Evaluate whether the hedge should be adjusted for the current day.
    ///
    /// Triggers whenever the position is out of range, or when the token value
    /// ratio has drifted from the configured target beyond the threshold.
    pub fn should_adjust_hedge(&self, snapshot: &PoolDaySnapshot) -> HedgeAdjustmentDecision {
        let token_ratio = self.token_ratio(snapshot.token0_price);
        let deviation = (token_ratio - self.config.target_token_ratio).abs();
        let out_of_range = !self.is_in_range(snapshot.tick);

        let direction = if token_ratio >= self.config.target_token_ratio {
            AdjustmentDirection::Increase
        } else {
            AdjustmentDirection::Decrease
        };

        HedgeAdjustmentDecision {
            should_adjust: out_of_range || deviation > self.config.ratio_deviation_threshold,
            direction,
            deviation,
            token_ratio,
        }
    }

    /// Token0 value fraction of the position at the given price.
    ///
    /// `sqrt(r) / (1 + sqrt(r))` with `r = current / initial`; exactly the
    /// configured 50/50 split at the entry price.
    pub fn token_ratio(&self, current_token0_price: f64) -> f64 {
        if self.initial_token0_price <= 0.0 || current_token0_price <= 0.0 {
            return self.config.target_token_ratio;
        }
        let sqrt_r = (current_token0_price / self.initial_token0_price).sqrt();
        sqrt_r / (1.0 + sqrt_r)
    }

    /// Current position value, USD.
    pub fn value(&self) -> f64 {
        self.current_value
    }

    /// Fees accumulated so far, USD.
    pub fn fees(&self) -> f64 {
        self.cumulative_fees
    }

    /// Initial investment, USD.
    pub fn initial_investment(&self) -> f64 {
        self.initial_investment
    }

    /// Fixed share of pool TVL claimed at entry.
    pub fn lp_share_percentage(&self) -> f64 {
        self.lp_share_percentage
    }

    /// Total return including fees, percent of initial investment.
    pub fn total_return_pct(&self) -> f64 {
        (self.current_value + self.cumulative_fees - self.initial_investment)
            / self.initial_investment
            * 100.0
    }

    /// Share of processed days spent in range, percent. Zero before any day.
    pub fn time_in_range_pct(&self) -> f64 {
        if self.total_days == 0 {
            return 0.0;
        }
        self.days_in_range as f64 / self.total_days as f64 * 100.0
    }

    /// Fee APR annualized over the processed days, percent. Zero before any day.
    pub fn running_apr(&self) -> f64 {
        if self.total_days == 0 {
            return 0.0;
        }
        (self.cumulative_fees / self.initial_investment)
            * (pricing::DAYS_PER_YEAR / self.total_days as f64)
            * 100.0
    }

    /// Number of processed days spent in range.
    pub fn days_in_range(&self) -> u32 {
        self.days_in_range
    }

    /// Total number of processed days.
    pub fn total_days(&self) -> u32 {
        self.total_days
    }
}

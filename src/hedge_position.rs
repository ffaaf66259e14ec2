//! Perpetual-futures hedge simulation.
//!
//! [`HedgePositionModel`] tracks one perp hedge's notional, leverage, funding
//! cost and mark-to-market PnL over a sequence of daily price/funding
//! observations, and enforces the leverage and hedge-ratio risk limits after
//! every adjustment.

use serde::{Deserialize, Serialize};

use crate::errors::{LpHedgeError, Result};

/// Side of the hedge. Fixed after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HedgeDirection {
    Long,
    Short,
}

/// Risk limits and adjustment knobs used by [`HedgePositionModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeConfig {
    pub max_leverage: f64,
    pub min_leverage: f64,
    /// Upper bound on `notional / lp_position_value`.
    pub max_hedge_ratio: f64,
    /// Funding rate above which the position is de-risked.
    pub max_funding_rate: f64,
    /// Cap on the per-day IL-driven notional adjustment factor.
    pub max_position_adjustment: f64,
    /// `leverage * notional / lp_position_value` threshold that trips the
    /// risk-limit check.
    pub liquidation_buffer: f64,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            max_leverage: 2.0,
            min_leverage: 0.5,
            max_hedge_ratio: 0.75,
            max_funding_rate: 0.001,
            max_position_adjustment: 0.10,
            liquidation_buffer: 0.85,
        }
    }
}

/// Stateful model of one perpetual hedge position.
#[derive(Debug, Clone)]
pub struct HedgePositionModel {
    notional: f64,
    leverage: f64,
    direction: HedgeDirection,
    cumulative_funding_cost: f64,
    cumulative_hedge_pnl: f64,
    previous_hedge_mark_value: f64,
    initial_reference_price: f64,
    config: HedgeConfig,
}

impl HedgePositionModel {
    /// Create a hedge seeded at the given notional and reference price.
    ///
    /// The initial leverage is clamped into the configured bounds. Fails with
    /// `InvalidInput` on non-positive notional or reference price.
    pub fn new(
        initial_notional: f64,
        initial_reference_price: f64,
        direction: HedgeDirection,
        initial_leverage: f64,
        config: HedgeConfig,
    ) -> Result<Self> {
        if initial_notional <= 0.0 {
            return Err(LpHedgeError::invalid_input(format!(
                "Initial notional must be positive, got {}",
                initial_notional
            )));
        }
        if initial_reference_price <= 0.0 {
            return Err(LpHedgeError::invalid_input(format!(
                "Initial reference price must be positive, got {}",
                initial_reference_price
            )));
        }

        let leverage = initial_leverage.clamp(config.min_leverage, config.max_leverage);

        Ok(Self {
            notional: initial_notional,
            leverage,
            direction,
            cumulative_funding_cost: 0.0,
            cumulative_hedge_pnl: 0.0,
            previous_hedge_mark_value: 0.0,
            initial_reference_price,
            config,
        })
    }

    /// Advance the hedge by one day.
    ///
    /// Funding sign convention: for a short hedge a positive funding rate is
    /// income, for a long hedge it is a cost. Mark-to-market uses the exposure
    /// as of the start of the day; condition-based adjustments run last.
    pub fn update_daily(
        &mut self,
        current_price: f64,
        funding_rate: f64,
        lp_position_value: f64,
        impermanent_loss_pct: f64,
    ) {
        let exposure = self.notional * self.leverage;

        let funding_flow = match self.direction {
            HedgeDirection::Short => -funding_rate * exposure,
            HedgeDirection::Long => funding_rate * exposure,
        };
        self.cumulative_funding_cost += funding_flow;

        let price_change =
            (current_price - self.initial_reference_price) / self.initial_reference_price;
        let hedge_value = match self.direction {
            HedgeDirection::Short => -exposure * price_change,
            HedgeDirection::Long => exposure * price_change,
        };
        self.cumulative_hedge_pnl += hedge_value - self.previous_hedge_mark_value;
        self.previous_hedge_mark_value = hedge_value;

        self.adjust_position_based_on_conditions(
            impermanent_loss_pct,
            funding_rate,
            lp_position_value,
        );

        debug_assert!(
            self.leverage >= self.config.min_leverage
                && self.leverage <= self.config.max_leverage
        );
    }

    /// Adjust notional and leverage from the day's IL and funding conditions.
    ///
    /// The IL-driven step runs first and may already have moved the notional
    /// before the funding-driven step adjusts it further; both apply in the
    /// same call.
    fn adjust_position_based_on_conditions(
        &mut self,
        impermanent_loss_pct: f64,
        funding_rate: f64,
        lp_position_value: f64,
    ) {
        let hedge_cap = lp_position_value * self.config.max_hedge_ratio;

        if impermanent_loss_pct.abs() > 1.0 {
            let factor = (impermanent_loss_pct.abs() / 100.0)
                .min(self.config.max_position_adjustment);
            if impermanent_loss_pct < 0.0 {
                // LP underperforming hold: hedge harder.
                self.notional *= 1.0 + factor;
                self.leverage = (self.leverage * 1.1).min(self.config.max_leverage);
            } else {
                self.notional *= 1.0 - factor;
                self.leverage = (self.leverage * 0.9).max(self.config.min_leverage);
            }
            self.notional = self.notional.min(hedge_cap);
        }

        if funding_rate > self.config.max_funding_rate {
            // Expensive funding: de-risk.
            self.notional *= 0.95;
        } else if funding_rate < 0.0 {
            self.notional = (self.notional * 1.05).min(hedge_cap);
        }

        // The LP value may have fallen with no adjustment firing; the hedge
        // ratio bound still holds on return.
        self.notional = self.notional.min(hedge_cap);
    }

    /// Whether the position breaches the liquidation buffer.
    pub fn check_risk_limits(&self, lp_position_value: f64) -> bool {
        if lp_position_value <= 0.0 {
            return true;
        }
        self.leverage * self.notional / lp_position_value > self.config.liquidation_buffer
    }

    /// De-lever after a risk-limit trip.
    pub fn apply_risk_limit_adjustments(&mut self) {
        self.leverage = (self.leverage * 0.7).max(self.config.min_leverage);
    }

    /// Current hedge notional, USD.
    pub fn notional(&self) -> f64 {
        self.notional
    }

    /// Current leverage.
    pub fn leverage(&self) -> f64 {
        self.leverage
    }

    /// Hedge side.
    pub fn direction(&self) -> HedgeDirection {
        self.direction
    }

    /// Net funding paid so far; negative means net income received.
    pub fn cumulative_funding_cost(&self) -> f64 {
        self.cumulative_funding_cost
    }

    /// Mark-to-market hedge PnL accumulated so far.
    pub fn cumulative_hedge_pnl(&self) -> f64 {
        self.cumulative_hedge_pnl
    }

    /// Entry price the hedge marks against.
    pub fn initial_reference_price(&self) -> f64 {
        self.initial_reference_price
    }

    /// Current notional times leverage.
    pub fn exposure(&self) -> f64 {
        self.notional * self.leverage
    }
}

//! Live strategy loop: the backtest decision logic applied to polled data.
//!
//! The control state is an explicit [`StrategyState`] value passed through
//! every tick rather than ambient fields, so the loop can be tested
//! deterministically without timers. Collaborators push
//! [`LiveObservation`]s in and consume [`StrategyAction`]s out; external side
//! effects (order submission, liquidity removal) stay on their side of the
//! channel with at-most-one-in-flight-command discipline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::hedge_position::HedgeConfig;
use crate::lp_position::{AdjustmentDirection, LpConfig};
use crate::pricing;

/// Configuration of the live loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Poll interval the external scheduler should use, seconds.
    pub poll_interval_secs: u64,
    /// Out-of-range duration after which the position is fully exited, hours.
    pub out_of_range_exit_hours: i64,
    pub lp_config: LpConfig,
    pub hedge_config: HedgeConfig,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            out_of_range_exit_hours: 24,
            lp_config: LpConfig::default(),
            hedge_config: HedgeConfig::default(),
        }
    }
}

/// Explicit control-loop state, owned by the scheduler and threaded through
/// every tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyState {
    /// When the position first left its range; cleared on re-entry.
    pub out_of_range_since: Option<DateTime<FixedOffset>>,
    /// Last time an adjustment was signalled.
    pub last_rebalance_at: Option<DateTime<FixedOffset>>,
    /// Whether a position is currently deployed.
    pub active: bool,
}

impl StrategyState {
    /// Fresh state for a newly deployed position.
    pub fn deployed() -> Self {
        Self {
            out_of_range_since: None,
            last_rebalance_at: None,
            active: true,
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One polled view of the live position, built by collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveObservation {
    pub timestamp: DateTime<FixedOffset>,
    pub lp_value: f64,
    pub current_price: f64,
    pub tick: i32,
    pub in_range: bool,
    pub funding_rate: f64,
}

/// Command issued to the external trading collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrategyAction {
    /// Adjust the hedge notional in the given direction.
    AdjustHedge {
        direction: AdjustmentDirection,
        deviation: f64,
    },
    /// Remove liquidity and close the hedge.
    ExitAll,
    /// Nothing to do this tick.
    Hold,
}

/// Decision engine shared by the live loop and its tests.
#[derive(Debug, Clone)]
pub struct StrategyEngine {
    config: LiveConfig,
    /// Token0 price at position entry, the IL reference.
    entry_price: f64,
}

impl StrategyEngine {
    pub fn new(config: LiveConfig, entry_price: f64) -> Self {
        Self {
            config,
            entry_price,
        }
    }

    /// Evaluate one tick of the strategy against a live observation.
    ///
    /// Mirrors the per-day logic of the backtest orchestrator: range and
    /// ratio checks drive hedge adjustments, and an out-of-range spell longer
    /// than the configured duration triggers a full exit and a state reset.
    pub fn tick(
        &self,
        state: &mut StrategyState,
        observation: &LiveObservation,
    ) -> Result<Vec<StrategyAction>> {
        if !state.active {
            debug!("no active position, holding");
            return Ok(vec![StrategyAction::Hold]);
        }

        let mut actions = Vec::new();

        if observation.in_range {
            state.out_of_range_since = None;
        } else {
            let since = *state
                .out_of_range_since
                .get_or_insert(observation.timestamp);
            let out_for = observation.timestamp - since;
            if out_for >= Duration::hours(self.config.out_of_range_exit_hours) {
                warn!(
                    out_of_range_hours = out_for.num_hours(),
                    "position out of range beyond exit threshold, exiting"
                );
                state.reset();
                return Ok(vec![StrategyAction::ExitAll]);
            }
        }

        let token_ratio = self.token_ratio(observation.current_price);
        let target = self.config.lp_config.target_token_ratio;
        let deviation = (token_ratio - target).abs();
        let ratio_breached = deviation > self.config.lp_config.ratio_deviation_threshold;

        if !observation.in_range || ratio_breached {
            let direction = if token_ratio >= target {
                AdjustmentDirection::Increase
            } else {
                AdjustmentDirection::Decrease
            };
            info!(
                deviation,
                token_ratio,
                in_range = observation.in_range,
                "hedge adjustment signalled"
            );
            state.last_rebalance_at = Some(observation.timestamp);
            actions.push(StrategyAction::AdjustHedge {
                direction,
                deviation,
            });
        }

        if observation.funding_rate > self.config.hedge_config.max_funding_rate {
            info!(
                funding_rate = observation.funding_rate,
                "funding above threshold, trimming hedge"
            );
            actions.push(StrategyAction::AdjustHedge {
                direction: AdjustmentDirection::Decrease,
                deviation: 0.0,
            });
        }

        if actions.is_empty() {
            actions.push(StrategyAction::Hold);
        }

        Ok(actions)
    }

    /// Impermanent loss at the observed price, percent.
    pub fn impermanent_loss(&self, current_price: f64) -> f64 {
        pricing::impermanent_loss_pct(self.entry_price, current_price)
    }

    fn token_ratio(&self, current_price: f64) -> f64 {
        if self.entry_price <= 0.0 || current_price <= 0.0 {
            return self.config.lp_config.target_token_ratio;
        }
        let sqrt_r = (current_price / self.entry_price).sqrt();
        sqrt_r / (1.0 + sqrt_r)
    }
}

/// Channel-driven runner around [`StrategyEngine`].
///
/// Ticks are processed strictly sequentially, so overlapping evaluation is
/// impossible by construction. On shutdown the loop stops consuming further
/// observations; the in-flight tick always completes.
pub struct LiveStrategyLoop {
    engine: StrategyEngine,
    state: StrategyState,
}

impl LiveStrategyLoop {
    pub fn new(engine: StrategyEngine, state: StrategyState) -> Self {
        Self { engine, state }
    }

    /// Evaluate a single observation against the held state.
    pub fn tick(&mut self, observation: &LiveObservation) -> Result<Vec<StrategyAction>> {
        self.engine.tick(&mut self.state, observation)
    }

    /// Current control state.
    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    /// Consume observations until shutdown or channel close, forwarding the
    /// resulting actions to the execution collaborator.
    pub async fn run(
        mut self,
        mut observations: Receiver<LiveObservation>,
        actions: Sender<StrategyAction>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<StrategyState> {
        info!("live strategy loop started");

        while !shutdown.load(Ordering::SeqCst) {
            let observation = match observations.recv().await {
                Some(observation) => observation,
                None => break,
            };

            for action in self.tick(&observation)? {
                if action != StrategyAction::Hold && actions.send(action).await.is_err() {
                    warn!("action receiver dropped, stopping live loop");
                    return Ok(self.state);
                }
            }
        }

        info!("live strategy loop stopped");
        Ok(self.state)
    }
}

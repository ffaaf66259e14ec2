//! Delta-neutral LP + perp-hedge backtesting toolkit.
//!
//! This crate simulates a strategy that pairs a concentrated-liquidity AMM
//! position with a perpetual-futures hedge. The core is a pair of stateful
//! models ([`lp_position::LpPositionModel`] and
//! [`hedge_position::HedgePositionModel`]) driven day by day over historical
//! pool, price and funding data by the [`backtest`] orchestrator, plus a thin
//! [`live`] loop that re-evaluates the same decision logic against polled
//! external data.

pub mod backtest;
pub mod data;
pub mod errors;
pub mod hedge_position;
pub mod live;
pub mod lp_position;
pub mod pricing;
pub mod report;


/// Convenient re-export of the most common items used when writing examples or tests.
pub mod prelude {
    pub use crate::backtest::{run_backtest, BacktestParams, DayContext, HedgedLpBacktest};
    pub use crate::data::{
        aggregate_eight_hour, FundingRatePeriod, MarketData, PerpDataFetcher, PoolDaySnapshot,
        PoolPosition, PriceCandle,
    };
    pub use crate::errors::{LpHedgeError, Result};
    pub use crate::hedge_position::{HedgeConfig, HedgeDirection, HedgePositionModel};
    pub use crate::live::{
        LiveConfig, LiveObservation, LiveStrategyLoop, StrategyAction, StrategyEngine,
        StrategyState,
    };
    pub use crate::lp_position::{
        AdjustmentDirection, HedgeAdjustmentDecision, LpConfig, LpPositionModel, PositionType,
    };
    pub use crate::report::{BacktestReport, DailyRecord, RebalanceEvent};
}

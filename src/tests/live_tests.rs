use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::mpsc;

use super::mock_data::ts;
use crate::live::{
    LiveConfig, LiveObservation, LiveStrategyLoop, StrategyAction, StrategyEngine, StrategyState,
};
use crate::lp_position::AdjustmentDirection;

fn engine() -> StrategyEngine {
    StrategyEngine::new(LiveConfig::default(), 2_000.0)
}

fn observation(offset_secs: i64, price: f64, in_range: bool) -> LiveObservation {
    LiveObservation {
        timestamp: ts(offset_secs),
        lp_value: 10_000.0,
        current_price: price,
        tick: if in_range { 0 } else { 10_000 },
        in_range,
        funding_rate: 0.0001,
    }
}

#[test]
fn inactive_state_holds() {
    let engine = engine();
    let mut state = StrategyState::default();

    let actions = engine.tick(&mut state, &observation(0, 2_000.0, true)).unwrap();
    assert_eq!(actions, vec![StrategyAction::Hold]);
}

#[test]
fn quiet_tick_holds_and_clears_out_of_range_marker() {
    let engine = engine();
    let mut state = StrategyState::deployed();
    state.out_of_range_since = Some(ts(0));

    let actions = engine.tick(&mut state, &observation(300, 2_000.0, true)).unwrap();
    assert_eq!(actions, vec![StrategyAction::Hold]);
    assert!(state.out_of_range_since.is_none());
}

#[test]
fn out_of_range_signals_adjustment_and_stamps_state() {
    let engine = engine();
    let mut state = StrategyState::deployed();

    let actions = engine.tick(&mut state, &observation(0, 2_000.0, false)).unwrap();
    assert!(actions
        .iter()
        .any(|a| matches!(a, StrategyAction::AdjustHedge { .. })));
    assert_eq!(state.out_of_range_since, Some(ts(0)));
    assert_eq!(state.last_rebalance_at, Some(ts(0)));
}

#[test]
fn sustained_out_of_range_exits_and_resets_state() {
    let engine = engine();
    let mut state = StrategyState::deployed();

    engine.tick(&mut state, &observation(0, 2_000.0, false)).unwrap();

    // Still within the 24h window: no exit yet.
    let later = Duration::hours(23).num_seconds();
    let actions = engine.tick(&mut state, &observation(later, 2_000.0, false)).unwrap();
    assert!(!actions.contains(&StrategyAction::ExitAll));

    // Past the window: full exit and reset.
    let past = Duration::hours(25).num_seconds();
    let actions = engine.tick(&mut state, &observation(past, 2_000.0, false)).unwrap();
    assert_eq!(actions, vec![StrategyAction::ExitAll]);
    assert!(!state.active);
    assert!(state.out_of_range_since.is_none());
}

#[test]
fn ratio_deviation_triggers_directional_adjustment() {
    let engine = engine();
    let mut state = StrategyState::deployed();

    // Price up 50% versus the 2000 entry: token ratio well above target.
    let actions = engine.tick(&mut state, &observation(0, 3_000.0, true)).unwrap();
    assert!(actions.iter().any(|a| matches!(
        a,
        StrategyAction::AdjustHedge {
            direction: AdjustmentDirection::Increase,
            ..
        }
    )));

    let actions = engine.tick(&mut state, &observation(300, 1_000.0, true)).unwrap();
    assert!(actions.iter().any(|a| matches!(
        a,
        StrategyAction::AdjustHedge {
            direction: AdjustmentDirection::Decrease,
            ..
        }
    )));
}

#[test]
fn expensive_funding_trims_hedge() {
    let engine = engine();
    let mut state = StrategyState::deployed();

    let mut obs = observation(0, 2_000.0, true);
    obs.funding_rate = 0.002;

    let actions = engine.tick(&mut state, &obs).unwrap();
    assert_eq!(
        actions,
        vec![StrategyAction::AdjustHedge {
            direction: AdjustmentDirection::Decrease,
            deviation: 0.0,
        }]
    );
}

#[test]
fn engine_impermanent_loss_matches_closed_form() {
    let engine = engine();
    assert_eq!(engine.impermanent_loss(2_000.0), 0.0);
    assert!(engine.impermanent_loss(2_400.0) < 0.0);
}

#[tokio::test]
async fn loop_forwards_actions_until_channel_closes() {
    let (obs_tx, obs_rx) = mpsc::channel(8);
    let (action_tx, mut action_rx) = mpsc::channel(8);
    let shutdown = Arc::new(AtomicBool::new(false));

    let live = LiveStrategyLoop::new(engine(), StrategyState::deployed());
    let handle = tokio::spawn(live.run(obs_rx, action_tx, Arc::clone(&shutdown)));

    obs_tx.send(observation(0, 2_000.0, false)).await.unwrap();
    let action = action_rx.recv().await.unwrap();
    assert!(matches!(action, StrategyAction::AdjustHedge { .. }));

    drop(obs_tx);
    let state = handle.await.unwrap().unwrap();
    assert!(state.active);
}

#[tokio::test]
async fn shutdown_stops_scheduling_further_ticks() {
    let (obs_tx, obs_rx) = mpsc::channel(8);
    let (action_tx, _action_rx) = mpsc::channel(8);
    let shutdown = Arc::new(AtomicBool::new(true));

    let live = LiveStrategyLoop::new(engine(), StrategyState::deployed());
    let state = live.run(obs_rx, action_tx, shutdown).await.unwrap();

    // Loop exits immediately without consuming observations.
    assert!(state.active);
    drop(obs_tx);
}

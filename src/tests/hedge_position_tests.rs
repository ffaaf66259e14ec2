use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::LpHedgeError;
use crate::hedge_position::{HedgeConfig, HedgeDirection, HedgePositionModel};

fn short_hedge(notional: f64, leverage: f64) -> HedgePositionModel {
    HedgePositionModel::new(
        notional,
        2_000.0,
        HedgeDirection::Short,
        leverage,
        HedgeConfig::default(),
    )
    .expect("valid hedge")
}

#[test]
fn construction_rejects_bad_inputs() {
    let err = HedgePositionModel::new(
        0.0,
        2_000.0,
        HedgeDirection::Short,
        1.0,
        HedgeConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LpHedgeError::InvalidInput(_)));

    let err = HedgePositionModel::new(
        1_000.0,
        -1.0,
        HedgeDirection::Short,
        1.0,
        HedgeConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LpHedgeError::InvalidInput(_)));
}

#[test]
fn initial_leverage_is_clamped_into_bounds() {
    let high = short_hedge(1_000.0, 10.0);
    assert_eq!(high.leverage(), 2.0);

    let low = short_hedge(1_000.0, 0.01);
    assert_eq!(low.leverage(), 0.5);
}

#[test]
fn funding_sign_convention_short_earns_positive_rate() {
    let mut short = short_hedge(1_000.0, 1.0);
    let mut long = HedgePositionModel::new(
        1_000.0,
        2_000.0,
        HedgeDirection::Long,
        1.0,
        HedgeConfig::default(),
    )
    .unwrap();

    // Flat price and tiny IL so only funding moves.
    short.update_daily(2_000.0, 0.001, 10_000.0, 0.0);
    long.update_daily(2_000.0, 0.001, 10_000.0, 0.0);

    assert!(short.cumulative_funding_cost() < 0.0, "short receives income");
    assert!(long.cumulative_funding_cost() > 0.0, "long pays the rate");
    assert!(
        (short.cumulative_funding_cost() + long.cumulative_funding_cost()).abs() < 1e-12,
        "identical exposure, opposite flows"
    );
}

#[test]
fn short_hedge_profits_when_price_falls() {
    let mut hedge = short_hedge(1_000.0, 1.0);

    hedge.update_daily(1_800.0, 0.0, 10_000.0, 0.0);
    // Price fell 10%, exposure 1000: +100 mark value.
    assert!((hedge.cumulative_hedge_pnl() - 100.0).abs() < 1e-9);

    hedge.update_daily(1_900.0, 0.0, 10_000.0, 0.0);
    // Mark value back to +50: daily delta -50.
    assert!((hedge.cumulative_hedge_pnl() - 50.0).abs() < 1.0);
}

#[test]
fn pnl_is_a_delta_against_previous_mark() {
    let mut hedge = short_hedge(1_000.0, 1.0);

    hedge.update_daily(2_200.0, 0.0, 100_000.0, 0.0);
    let after_first = hedge.cumulative_hedge_pnl();
    assert!((after_first - -100.0).abs() < 1e-9);

    // Same price again: no further PnL.
    hedge.update_daily(2_200.0, 0.0, 100_000.0, 0.0);
    assert!((hedge.cumulative_hedge_pnl() - after_first).abs() < 1e-9);
}

#[test]
fn negative_il_increases_hedge_and_leverage() {
    let mut hedge = short_hedge(1_000.0, 1.0);

    hedge.update_daily(2_000.0, 0.0, 100_000.0, -5.0);

    // |IL| = 5% => factor 0.05, leverage scaled by 1.1.
    assert!((hedge.notional() - 1_050.0).abs() < 1e-9);
    assert!((hedge.leverage() - 1.1).abs() < 1e-9);
}

#[test]
fn positive_il_decreases_hedge_and_leverage() {
    let mut hedge = short_hedge(1_000.0, 1.0);

    hedge.update_daily(2_000.0, 0.0, 100_000.0, 5.0);

    assert!((hedge.notional() - 950.0).abs() < 1e-9);
    assert!((hedge.leverage() - 0.9).abs() < 1e-9);
}

#[test]
fn il_adjustment_factor_is_capped() {
    let mut hedge = short_hedge(1_000.0, 1.0);

    // |IL| = 50% would mean factor 0.5; cap is 0.10.
    hedge.update_daily(2_000.0, 0.0, 100_000.0, -50.0);
    assert!((hedge.notional() - 1_100.0).abs() < 1e-9);
}

#[test]
fn expensive_funding_shrinks_notional() {
    let mut hedge = short_hedge(1_000.0, 1.0);

    hedge.update_daily(2_000.0, 0.002, 100_000.0, 0.0);
    assert!((hedge.notional() - 950.0).abs() < 1e-9);
}

#[test]
fn negative_funding_grows_notional_up_to_cap() {
    let mut hedge = short_hedge(1_000.0, 1.0);

    hedge.update_daily(2_000.0, -0.0005, 100_000.0, 0.0);
    assert!((hedge.notional() - 1_050.0).abs() < 1e-9);

    // With a tiny LP value the hedge ratio cap binds instead.
    let mut capped = short_hedge(1_000.0, 1.0);
    capped.update_daily(2_000.0, -0.0005, 1_000.0, 0.0);
    assert!((capped.notional() - 750.0).abs() < 1e-9);
}

#[test]
fn il_and_funding_adjustments_compose_in_order() {
    let mut hedge = short_hedge(1_000.0, 1.0);

    // IL step first (+5%), then negative funding (+5%) on the moved notional.
    hedge.update_daily(2_000.0, -0.0005, 100_000.0, -5.0);
    assert!((hedge.notional() - 1_050.0 * 1.05).abs() < 1e-9);
}

#[test]
fn notional_never_exceeds_hedge_ratio_after_update() {
    let mut hedge = short_hedge(5_000.0, 1.0);

    // LP value collapses with no adjustment condition firing.
    hedge.update_daily(2_000.0, 0.0005, 1_000.0, 0.0);
    assert!(hedge.notional() <= 1_000.0 * 0.75 + 1e-9);
}

#[test]
fn leverage_stays_bounded_over_random_sequences() {
    let mut rng = StdRng::seed_from_u64(42);
    let config = HedgeConfig::default();
    let mut hedge = short_hedge(1_000.0, 1.0);

    for _ in 0..500 {
        let price = rng.gen_range(500.0..5_000.0);
        let rate = rng.gen_range(-0.002..0.002);
        let lp_value = rng.gen_range(100.0..50_000.0);
        let il = rng.gen_range(-30.0..5.0);

        hedge.update_daily(price, rate, lp_value, il);

        assert!(hedge.leverage() >= config.min_leverage - 1e-12);
        assert!(hedge.leverage() <= config.max_leverage + 1e-12);
        assert!(hedge.notional() <= lp_value * config.max_hedge_ratio + 1e-9);
    }
}

#[test]
fn risk_limit_trips_above_liquidation_buffer() {
    let hedge = short_hedge(1_000.0, 2.0);

    // exposure 2000 against lp value 2000: ratio 1.0 > 0.85.
    assert!(hedge.check_risk_limits(2_000.0));
    // ratio 2000 / 10000 = 0.2: fine.
    assert!(!hedge.check_risk_limits(10_000.0));
}

#[test]
fn risk_limit_adjustment_delevers_with_floor() {
    let mut hedge = short_hedge(1_000.0, 2.0);

    hedge.apply_risk_limit_adjustments();
    assert!((hedge.leverage() - 1.4).abs() < 1e-9);

    for _ in 0..10 {
        hedge.apply_risk_limit_adjustments();
    }
    assert_eq!(hedge.leverage(), 0.5);
}

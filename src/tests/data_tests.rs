use chrono::Duration;

use super::mock_data::{generate_candles, generate_market_data, ts};
use crate::data::{aggregate_eight_hour, FundingRatePeriod, MarketData, PoolDaySnapshot, PoolPosition, PriceCandle};

fn hourly_funding(count: usize, rate: f64) -> Vec<FundingRatePeriod> {
    (0..count)
        .map(|i| FundingRatePeriod {
            coin: "ETH".to_string(),
            time: ts(i as i64 * 3_600),
            funding_rate: rate,
            premium: 0.0001 * (i as f64 + 1.0),
        })
        .collect()
}

#[test]
fn eight_hour_aggregation_sums_rates() {
    let hourly = hourly_funding(8, 0.0001);
    let aggregated = aggregate_eight_hour(&hourly);

    assert_eq!(aggregated.len(), 1);
    let period = &aggregated[0];
    assert!((period.funding_rate - 0.0008).abs() < 1e-12);
    assert_eq!(period.time, hourly[0].time);
    assert_eq!(period.coin, "ETH");
    assert_eq!(period.premium, hourly[0].premium);
}

#[test]
fn eight_hour_aggregation_emits_partial_trailing_group() {
    let hourly = hourly_funding(11, 0.0001);
    let aggregated = aggregate_eight_hour(&hourly);

    assert_eq!(aggregated.len(), 2);
    assert!((aggregated[0].funding_rate - 0.0008).abs() < 1e-12);
    assert!((aggregated[1].funding_rate - 0.0003).abs() < 1e-12);
    assert_eq!(aggregated[1].time, hourly[8].time);
}

#[test]
fn eight_hour_aggregation_of_empty_input_is_empty() {
    assert!(aggregate_eight_hour(&[]).is_empty());
}

#[test]
fn nearest_candle_picks_minimal_time_difference() {
    let market = generate_market_data(3);

    // 30 minutes past the first hour: first two candles tie at 30 minutes,
    // the first encountered wins.
    let nearest = market.nearest_candle(ts(1_800)).unwrap();
    assert_eq!(nearest.timestamp, ts(0));

    // 31 minutes past: the second candle is strictly closer.
    let nearest = market.nearest_candle(ts(1_860)).unwrap();
    assert_eq!(nearest.timestamp, ts(3_600));
}

#[test]
fn nearest_candle_of_empty_series_is_none() {
    let market = MarketData {
        snapshots: Vec::new(),
        candles: Vec::new(),
        funding: Vec::new(),
    };
    assert!(market.nearest_candle(ts(0)).is_none());
}

#[test]
fn nearest_funding_respects_tolerance_window() {
    let market = MarketData {
        snapshots: Vec::new(),
        candles: Vec::new(),
        funding: hourly_funding(1, 0.0001),
    };

    let within = market.nearest_funding(ts(7 * 3_600), Duration::hours(8));
    assert!(within.is_some());

    let outside = market.nearest_funding(ts(9 * 3_600), Duration::hours(8));
    assert!(outside.is_none());
}

#[test]
fn validation_rejects_unordered_candles() {
    let mut candles = generate_candles(1);
    candles.swap(0, 1);

    let market = MarketData {
        snapshots: Vec::new(),
        candles,
        funding: Vec::new(),
    };
    assert!(market.validate().is_err());
}

#[test]
fn validation_rejects_inverted_candle() {
    let market = MarketData {
        snapshots: Vec::new(),
        candles: vec![PriceCandle {
            timestamp: ts(0),
            open: 100.0,
            high: 90.0,
            low: 110.0,
            close: 100.0,
            volume: 1.0,
        }],
        funding: Vec::new(),
    };
    assert!(market.validate().is_err());
}

#[test]
fn validation_rejects_negative_tvl() {
    let market = MarketData {
        snapshots: vec![PoolDaySnapshot {
            date: 0,
            tvl_usd: -1.0,
            token0_price: 2_000.0,
            tick: 0,
            volume_usd: 0.0,
        }],
        candles: Vec::new(),
        funding: Vec::new(),
    };
    assert!(market.validate().is_err());
}

#[test]
fn validation_rejects_non_finite_funding_rate() {
    let market = MarketData {
        snapshots: Vec::new(),
        candles: Vec::new(),
        funding: vec![FundingRatePeriod {
            coin: "ETH".to_string(),
            time: ts(0),
            funding_rate: f64::NAN,
            premium: 0.0,
        }],
    };
    assert!(market.validate().is_err());
}

#[test]
fn generated_mock_data_is_valid() {
    let market = generate_market_data(10);
    assert!(market.validate().is_ok());
    assert_eq!(market.snapshots.len(), 10);
    assert_eq!(market.candles.len(), 240);
}

#[test]
fn pool_position_band_cover_is_inclusive() {
    let position = PoolPosition {
        tick_lower: -10,
        tick_upper: 10,
        liquidity: 1.0,
    };
    assert!(position.covers(-10));
    assert!(position.covers(0));
    assert!(position.covers(10));
    assert!(!position.covers(11));
    assert!(!position.covers(-11));
}

//! # Data Structures and Utilities for Pool and Perp Market Data
//!
//! This module provides the core data structures consumed by the position
//! models and the backtest orchestrator: daily pool snapshots, perp price
//! candles and funding-rate periods, along with the nearest-timestamp join
//! helpers and the 8-hour funding aggregation step.
//!
//! ## Key Features
//!
//! - **Typed collaborator boundary**: collaborators hand over validated
//!   structs, never positional tuples
//! - **Nearest-neighbor joins**: deterministic candle/funding lookup used by
//!   the day loop
//! - **Funding Aggregation**: hourly funding entries can be compacted into
//!   8-hour periods
//! - **Async Data Fetching**: perp price and funding history retrieval from
//!   the Hyperliquid API
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use lp_hedge_backtest::data::PerpDataFetcher;
//! use lp_hedge_backtest::errors::LpHedgeError;
//! use chrono::Utc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LpHedgeError> {
//!     let end_time = Utc::now().timestamp_millis() as u64;
//!     let start_time = end_time - 7 * 24 * 3600 * 1000;
//!
//!     let fetcher = PerpDataFetcher::new().await?;
//!     let candles = fetcher.fetch_price_history("ETH", "1h", start_time, end_time).await?;
//!     let funding = fetcher.fetch_funding_history("ETH", start_time, end_time).await?;
//!
//!     println!("Fetched {} candles, {} funding periods", candles.len(), funding.len());
//!     Ok(())
//! }
//! ```

use crate::errors::{LpHedgeError, Result};
use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

/// One day of pool activity, produced externally and consumed once per day by
/// the LP position model. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDaySnapshot {
    /// Unix day timestamp in seconds (start of the day, UTC)
    pub date: i64,
    /// Total value locked in the pool, USD
    pub tvl_usd: f64,
    /// Price of token0 in quote terms
    pub token0_price: f64,
    /// Current pool tick
    pub tick: i32,
    /// Trading volume for the day, USD
    pub volume_usd: f64,
}

impl PoolDaySnapshot {
    /// Timestamp of the snapshot as a timezone-aware instant.
    pub fn datetime(&self) -> DateTime<FixedOffset> {
        DateTime::from_timestamp(self.date, 0)
            .unwrap_or_default()
            .with_timezone(&utc_offset())
    }
}

/// OHLCV candle used to locate the hedge's mark price nearest a given instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCandle {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One funding period of a perpetual contract. Granularity may be hourly or
/// 8-hourly depending on whether [`aggregate_eight_hour`] has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRatePeriod {
    pub coin: String,
    pub time: DateTime<FixedOffset>,
    /// Fractional rate, e.g. 0.0008 = 0.08%
    pub funding_rate: f64,
    pub premium: f64,
}

/// A competing concentrated-liquidity position in the pool.
///
/// Named, validated replacement for the positional tuples returned by raw
/// position-manager contract calls; the core never consumes untyped data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolPosition {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: f64,
}

impl PoolPosition {
    /// Whether the position's band covers the given tick.
    pub fn covers(&self, tick: i32) -> bool {
        tick >= self.tick_lower && tick <= self.tick_upper
    }
}

/// Aligned market data for one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    /// Daily pool snapshots, ascending by date, no gaps assumed
    pub snapshots: Vec<PoolDaySnapshot>,
    /// Perp price candles, ascending by timestamp
    pub candles: Vec<PriceCandle>,
    /// Funding periods, ascending by time
    pub funding: Vec<FundingRatePeriod>,
}

impl MarketData {
    /// Create a container and validate internal consistency.
    pub fn new(
        snapshots: Vec<PoolDaySnapshot>,
        candles: Vec<PriceCandle>,
        funding: Vec<FundingRatePeriod>,
    ) -> Result<Self> {
        let data = Self {
            snapshots,
            candles,
            funding,
        };
        data.validate()?;
        Ok(data)
    }

    /// Validate ordering and sanity of all three series.
    pub fn validate(&self) -> Result<()> {
        for i in 1..self.snapshots.len() {
            if self.snapshots[i].date <= self.snapshots[i - 1].date {
                return Err(LpHedgeError::validation(format!(
                    "Pool snapshots not in chronological order at indices {} and {}",
                    i - 1,
                    i
                )));
            }
        }

        for (i, snapshot) in self.snapshots.iter().enumerate() {
            if snapshot.tvl_usd < 0.0 || snapshot.volume_usd < 0.0 {
                return Err(LpHedgeError::validation(format!(
                    "Negative TVL or volume in snapshot at index {}",
                    i
                )));
            }
        }

        for (i, candle) in self.candles.iter().enumerate() {
            if candle.high < candle.low {
                return Err(LpHedgeError::validation(format!(
                    "High price {} is less than low price {} at index {}",
                    candle.high, candle.low, i
                )));
            }
        }

        for i in 1..self.candles.len() {
            if self.candles[i].timestamp <= self.candles[i - 1].timestamp {
                return Err(LpHedgeError::validation(format!(
                    "Candles not in chronological order at indices {} and {}",
                    i - 1,
                    i
                )));
            }
        }

        for i in 1..self.funding.len() {
            if self.funding[i].time <= self.funding[i - 1].time {
                return Err(LpHedgeError::validation(format!(
                    "Funding history not in chronological order at indices {} and {}",
                    i - 1,
                    i
                )));
            }
        }

        for (i, period) in self.funding.iter().enumerate() {
            if !period.funding_rate.is_finite() {
                return Err(LpHedgeError::validation(format!(
                    "Invalid funding rate at index {}: {}",
                    i, period.funding_rate
                )));
            }
        }

        Ok(())
    }

    /// Find the candle with the minimal absolute time difference to `instant`.
    ///
    /// Ties are broken by the first candle encountered in iteration order, so
    /// the result is deterministic for a fixed input ordering. No tolerance is
    /// enforced.
    pub fn nearest_candle(&self, instant: DateTime<FixedOffset>) -> Option<&PriceCandle> {
        let mut best: Option<&PriceCandle> = None;
        let mut min_diff = i64::MAX;

        for candle in &self.candles {
            let diff = (candle.timestamp.timestamp() - instant.timestamp()).abs();
            if diff < min_diff {
                min_diff = diff;
                best = Some(candle);
            }
        }

        best
    }

    /// Find the funding period nearest to `instant` within `tolerance`.
    ///
    /// Returns `None` when no period falls inside the window; the caller skips
    /// the day in that case.
    pub fn nearest_funding(
        &self,
        instant: DateTime<FixedOffset>,
        tolerance: Duration,
    ) -> Option<&FundingRatePeriod> {
        let mut best: Option<&FundingRatePeriod> = None;
        let mut min_diff = i64::MAX;

        for period in &self.funding {
            let diff = (period.time.timestamp() - instant.timestamp()).abs();
            if diff < min_diff {
                min_diff = diff;
                best = Some(period);
            }
        }

        match best {
            Some(period) if min_diff <= tolerance.num_seconds() => Some(period),
            _ => None,
        }
    }
}

/// Aggregate consecutive hourly funding entries into 8-hour periods.
///
/// Each run of up to 8 entries becomes one period carrying the first entry's
/// `coin`, `premium` and `time`, with the funding rates summed. A partial
/// trailing group (< 8 items) is still emitted as one period.
pub fn aggregate_eight_hour(hourly: &[FundingRatePeriod]) -> Vec<FundingRatePeriod> {
    hourly
        .chunks(8)
        .map(|chunk| {
            let first = &chunk[0];
            FundingRatePeriod {
                coin: first.coin.clone(),
                time: first.time,
                funding_rate: chunk.iter().map(|p| p.funding_rate).sum(),
                premium: first.premium,
            }
        })
        .collect()
}

fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is always valid")
}

/// Async fetcher for perp price and funding history from the Hyperliquid API.
///
/// Network concerns stay inside this type; the simulation core only sees the
/// final merged, time-sorted arrays.
pub struct PerpDataFetcher {
    info_client: hyperliquid_rust_sdk::InfoClient,
}

impl PerpDataFetcher {
    /// Maximum number of funding entries returned per API request.
    const FUNDING_PAGE_LIMIT: usize = 500;

    /// Create a new fetcher backed by the mainnet info endpoint.
    pub async fn new() -> Result<Self> {
        let info_client = hyperliquid_rust_sdk::InfoClient::new(
            None,
            Some(hyperliquid_rust_sdk::BaseUrl::Mainnet),
        )
        .await
        .map_err(LpHedgeError::from)?;

        Ok(Self { info_client })
    }

    /// Get supported candle intervals
    pub fn supported_intervals() -> &'static [&'static str] {
        &["1m", "5m", "15m", "1h", "4h", "1d"]
    }

    /// Check if a candle interval is supported
    pub fn is_interval_supported(interval: &str) -> bool {
        Self::supported_intervals().contains(&interval)
    }

    /// Fetch OHLC price history for a coin.
    ///
    /// `start_time` and `end_time` are Unix milliseconds. Returns candles in
    /// chronological order.
    pub async fn fetch_price_history(
        &self,
        coin: &str,
        interval: &str,
        start_time: u64,
        end_time: u64,
    ) -> Result<Vec<PriceCandle>> {
        if coin.is_empty() {
            return Err(LpHedgeError::validation("Coin cannot be empty"));
        }
        if !Self::is_interval_supported(interval) {
            return Err(LpHedgeError::validation(format!(
                "Unsupported interval: {}",
                interval
            )));
        }
        if start_time >= end_time {
            return Err(LpHedgeError::invalid_time_range(start_time, end_time));
        }

        let candles = self
            .info_client
            .candles_snapshot(coin.to_string(), interval.to_string(), start_time, end_time)
            .await
            .map_err(LpHedgeError::from)?;

        let mut result = Vec::with_capacity(candles.len());
        for (i, candle) in candles.iter().enumerate() {
            let timestamp = millis_to_datetime(candle.time_open)?;
            let parsed = PriceCandle {
                timestamp,
                open: candle.open.parse::<f64>().map_err(|_| {
                    LpHedgeError::data_conversion(format!(
                        "Invalid open price '{}' at index {}",
                        candle.open, i
                    ))
                })?,
                high: candle.high.parse::<f64>().map_err(|_| {
                    LpHedgeError::data_conversion(format!(
                        "Invalid high price '{}' at index {}",
                        candle.high, i
                    ))
                })?,
                low: candle.low.parse::<f64>().map_err(|_| {
                    LpHedgeError::data_conversion(format!(
                        "Invalid low price '{}' at index {}",
                        candle.low, i
                    ))
                })?,
                close: candle.close.parse::<f64>().map_err(|_| {
                    LpHedgeError::data_conversion(format!(
                        "Invalid close price '{}' at index {}",
                        candle.close, i
                    ))
                })?,
                volume: candle.vlm.parse::<f64>().map_err(|_| {
                    LpHedgeError::data_conversion(format!(
                        "Invalid volume '{}' at index {}",
                        candle.vlm, i
                    ))
                })?,
            };
            result.push(parsed);
        }

        for i in 1..result.len() {
            if result[i].timestamp <= result[i - 1].timestamp {
                return Err(LpHedgeError::validation(format!(
                    "Candles not in chronological order at indices {} and {}",
                    i - 1,
                    i
                )));
            }
        }

        Ok(result)
    }

    /// Fetch funding history for a coin, chunking requests for long ranges.
    ///
    /// The API caps each response; this method pages through the range and
    /// returns one merged, time-sorted array.
    pub async fn fetch_funding_history(
        &self,
        coin: &str,
        start_time: u64,
        end_time: u64,
    ) -> Result<Vec<FundingRatePeriod>> {
        if coin.is_empty() {
            return Err(LpHedgeError::validation("Coin cannot be empty"));
        }
        if start_time >= end_time {
            return Err(LpHedgeError::invalid_time_range(start_time, end_time));
        }

        let mut merged: Vec<FundingRatePeriod> = Vec::new();
        let mut cursor = start_time;

        loop {
            let page = self
                .info_client
                .funding_history(coin.to_string(), cursor, Some(end_time))
                .await
                .map_err(LpHedgeError::from)?;

            if page.is_empty() {
                break;
            }

            let page_len = page.len();
            let mut last_time = cursor;
            for (i, entry) in page.iter().enumerate() {
                let funding_rate = entry.funding_rate.parse::<f64>().map_err(|_| {
                    LpHedgeError::data_conversion(format!(
                        "Invalid funding rate '{}' at index {}",
                        entry.funding_rate, i
                    ))
                })?;
                let premium = entry.premium.parse::<f64>().map_err(|_| {
                    LpHedgeError::data_conversion(format!(
                        "Invalid premium '{}' at index {}",
                        entry.premium, i
                    ))
                })?;

                last_time = entry.time;
                merged.push(FundingRatePeriod {
                    coin: entry.coin.clone(),
                    time: millis_to_datetime(entry.time)?,
                    funding_rate,
                    premium,
                });
            }

            if page_len < Self::FUNDING_PAGE_LIMIT || last_time >= end_time {
                break;
            }
            cursor = last_time + 1;
        }

        merged.sort_by_key(|period| period.time);
        merged.dedup_by_key(|period| period.time);

        Ok(merged)
    }
}

fn millis_to_datetime(millis: u64) -> Result<DateTime<FixedOffset>> {
    DateTime::from_timestamp_millis(millis as i64)
        .map(|dt| dt.with_timezone(&utc_offset()))
        .ok_or_else(|| LpHedgeError::data_conversion(format!("Invalid timestamp {}", millis)))
}

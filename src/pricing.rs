//! Pure pricing math: impermanent loss, historical volatility and
//! Black-Scholes utilities.
//!
//! Everything in this module is a stateless function of its inputs so it can
//! be tested in isolation from the position models.

use std::f64::consts::PI;

/// Number of trading days used when annualizing daily statistics.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Closed-form two-asset constant-product impermanent loss, in percent.
///
/// `IL = (2 * sqrt(r) / (1 + r) - 1) * 100` with `r = current / initial`.
/// Returns exactly 0 at `r = 1` and is negative for every other ratio,
/// approaching -100% as the ratio goes to zero or infinity.
pub fn impermanent_loss_pct(initial_price: f64, current_price: f64) -> f64 {
    if initial_price <= 0.0 || current_price <= 0.0 {
        return 0.0;
    }
    let r = current_price / initial_price;
    (2.0 * r.sqrt() / (1.0 + r) - 1.0) * 100.0
}

/// Annualized historical volatility from a series of closes.
///
/// Uses the sample standard deviation of log returns scaled by
/// `sqrt(periods_per_year)`. Returns 0 for degenerate series.
pub fn historical_volatility(closes: &[f64], periods_per_year: f64) -> f64 {
    if closes.len() < 3 {
        return 0.0;
    }

    let mut log_returns = Vec::with_capacity(closes.len() - 1);
    for window in closes.windows(2) {
        if window[0] > 0.0 && window[1] > 0.0 {
            log_returns.push((window[1] / window[0]).ln());
        }
    }

    if log_returns.len() < 2 {
        return 0.0;
    }

    let mean = log_returns.iter().sum::<f64>() / log_returns.len() as f64;
    let variance = log_returns
        .iter()
        .map(|r| {
            let diff = r - mean;
            diff * diff
        })
        .sum::<f64>()
        / (log_returns.len() - 1) as f64;

    variance.sqrt() * periods_per_year.sqrt()
}

/// Standard normal CDF approximation (Abramowitz and Stegun)
pub fn norm_cdf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let z = x.abs() / 2.0_f64.sqrt();

    let t = 1.0 / (1.0 + p * z);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-z * z).exp();

    0.5 * (1.0 + sign * y)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-x * x / 2.0).exp() / (2.0 * PI).sqrt()
}

/// Option style for Black-Scholes pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Call,
    Put,
}

/// Black-Scholes greeks for a European option.
#[derive(Debug, Clone, Copy)]
pub struct Greeks {
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    /// Per-day theta.
    pub theta: f64,
}

fn d1_d2(spot: f64, strike: f64, t: f64, rate: f64, sigma: f64) -> (f64, f64) {
    let d1 = ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt());
    (d1, d1 - sigma * t.sqrt())
}

/// Black-Scholes price of a European option.
///
/// `t` is the time to expiry in years, `rate` the continuously compounded
/// risk-free rate and `sigma` the annualized volatility. Degenerate inputs
/// (zero time or volatility) collapse to intrinsic value.
pub fn bs_price(spot: f64, strike: f64, t: f64, rate: f64, sigma: f64, kind: OptionKind) -> f64 {
    if t <= 0.0 || sigma <= 0.0 {
        return match kind {
            OptionKind::Call => (spot - strike).max(0.0),
            OptionKind::Put => (strike - spot).max(0.0),
        };
    }

    let (d1, d2) = d1_d2(spot, strike, t, rate, sigma);
    let discount = (-rate * t).exp();
    match kind {
        OptionKind::Call => spot * norm_cdf(d1) - strike * discount * norm_cdf(d2),
        OptionKind::Put => strike * discount * norm_cdf(-d2) - spot * norm_cdf(-d1),
    }
}

/// Black-Scholes greeks of a European option.
pub fn bs_greeks(spot: f64, strike: f64, t: f64, rate: f64, sigma: f64, kind: OptionKind) -> Greeks {
    if t <= 0.0 || sigma <= 0.0 {
        return Greeks {
            price: bs_price(spot, strike, t, rate, sigma, kind),
            delta: match kind {
                OptionKind::Call => {
                    if spot > strike {
                        1.0
                    } else {
                        0.0
                    }
                }
                OptionKind::Put => {
                    if spot < strike {
                        -1.0
                    } else {
                        0.0
                    }
                }
            },
            gamma: 0.0,
            vega: 0.0,
            theta: 0.0,
        };
    }

    let (d1, d2) = d1_d2(spot, strike, t, rate, sigma);
    let discount = (-rate * t).exp();

    let delta = match kind {
        OptionKind::Call => norm_cdf(d1),
        OptionKind::Put => norm_cdf(d1) - 1.0,
    };
    let gamma = norm_pdf(d1) / (spot * sigma * t.sqrt());
    let vega = spot * norm_pdf(d1) * t.sqrt() / 100.0;

    let decay = -spot * norm_pdf(d1) * sigma / (2.0 * t.sqrt());
    let carry = match kind {
        OptionKind::Call => -rate * strike * discount * norm_cdf(d2),
        OptionKind::Put => rate * strike * discount * norm_cdf(-d2),
    };
    let theta = (decay + carry) / DAYS_PER_YEAR;

    Greeks {
        price: bs_price(spot, strike, t, rate, sigma, kind),
        delta,
        gamma,
        vega,
        theta,
    }
}

// src/analytics/bs_analytic.rs
//! Analytical Black-Scholes formulas for European options
//!
//! # Mathematical Foundation
//!
//! Under the Black-Scholes model the risk-neutral pricing formula
//! ```text
//! V(S,t) = e^(-r(T-t)) * E^Q[payoff(S_T) | S_t = S]
//! ```
//! has closed-form solutions for European calls and puts involving the
//! cumulative normal distribution Φ(x). The hedged Monte Carlo estimate is
//! validated against these formulas when the simulated drift equals the
//! risk-free rate.

use crate::math_utils::norm_cdf;

fn d1_d2(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> (f64, f64) {
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt());
    (d1, d1 - sigma * t.sqrt())
}

/// Black-Scholes European call option price
///
/// ```text
/// C(S,K,r,σ,T) = S*Φ(d₁) - K*e^(-rT)*Φ(d₂)
/// ```
pub fn bs_call_price(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    let (d1, d2) = d1_d2(s, k, r, sigma, t);
    s * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2)
}

/// Black-Scholes European put option price
///
/// ```text
/// P(S,K,r,σ,T) = K*e^(-rT)*Φ(-d₂) - S*Φ(-d₁)
/// ```
pub fn bs_put_price(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    let (d1, d2) = d1_d2(s, k, r, sigma, t);
    k * (-r * t).exp() * norm_cdf(-d2) - s * norm_cdf(-d1)
}

/// Black-Scholes Delta for a European call: Φ(d₁), in [0, 1]
pub fn bs_call_delta(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(s, k, r, sigma, t);
    norm_cdf(d1)
}

/// Black-Scholes Delta for a European put: Φ(d₁) - 1, in [-1, 0]
pub fn bs_put_delta(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(s, k, r, sigma, t);
    norm_cdf(d1) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bs_put_price_reference_value() {
        // Hull-style reference point: S=K=100, r=5%, sigma=20%, T=1
        let price = bs_put_price(100.0, 100.0, 0.05, 0.2, 1.0);
        assert!(
            (price - 5.573526022).abs() < 1e-6,
            "put price off: {}",
            price
        );
    }

    #[test]
    fn test_put_call_parity() {
        let (s, k, r, sigma, t) = (100.0, 95.0, 0.03, 0.25, 0.75);
        let call = bs_call_price(s, k, r, sigma, t);
        let put = bs_put_price(s, k, r, sigma, t);
        let parity = call - put - (s - k * (-r * t).exp());
        assert!(parity.abs() < 1e-10, "parity violated by {}", parity);
    }

    #[test]
    fn test_delta_relationship() {
        let (s, k, r, sigma, t) = (100.0, 100.0, 0.05, 0.2, 1.0);
        let dc = bs_call_delta(s, k, r, sigma, t);
        let dp = bs_put_delta(s, k, r, sigma, t);
        assert!((dc - dp - 1.0).abs() < 1e-12);
        assert!(dc > 0.0 && dc < 1.0);
        assert!(dp > -1.0 && dp < 0.0);
    }
}

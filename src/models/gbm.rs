// src/models/gbm.rs
//! Geometric Brownian motion under the real-world drift
//!
//! The ensemble is simulated under the physical measure, so the drift here
//! is the asset's real-world drift `mu`, not the risk-free rate.

use std::f64;

pub struct Gbm {
    pub mu: f64,
    pub sigma: f64,
}

impl Gbm {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Gbm { mu, sigma }
    }

    /// Exact one-step transition: S(t+dt) = S(t) * exp((mu - sigma^2/2) dt + sigma sqrt(dt) Z)
    pub fn exact_step(&self, s_t: f64, dt: f64, normal_draw: f64) -> f64 {
        s_t * ((self.mu - 0.5 * self.sigma * self.sigma) * dt
            + self.sigma * dt.sqrt() * normal_draw)
            .exp()
    }

    /// Cumulative deterministic drift correction at elapsed time `t`, used to
    /// turn the log-price into the regression state variable
    pub fn log_drift(&self, t: f64) -> f64 {
        (self.mu - 0.5 * self.sigma * self.sigma) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_step_zero_vol_is_deterministic() {
        let gbm = Gbm::new(0.05, 0.0);
        let s1 = gbm.exact_step(100.0, 1.0, 1.7);
        assert!((s1 - 100.0 * (0.05f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_exact_step_martingale_correction() {
        // E[S(t+dt)] = S(t) e^{mu dt}; the -sigma^2/2 term compensates the
        // lognormal convexity, checked here at Z = 0
        let gbm = Gbm::new(0.0, 0.2);
        let s1 = gbm.exact_step(100.0, 1.0, 0.0);
        assert!((s1 - 100.0 * (-0.02f64).exp()).abs() < 1e-12);
    }
}

// src/mc/paths.rs
//! Monte Carlo path simulation under the real-world measure
//!
//! # Simulated series
//!
//! `PathSet::generate` produces three coupled arrays, all indexed by
//! `[path, time step]`:
//!
//! - `s_vals`, shape `(paths, steps + 1)`: the price ensemble. Column 0 is
//!   the initial seeding (all spot by default).
//! - `delta_s_hat`, shape `(paths, steps)`: discounted price increments
//!   `S(t+1) - e^{r dt} S(t)`, demeaned across paths at each step. These are
//!   the regression weights of the hedging recursion.
//! - `x_vals`, shape `(paths, steps + 1)`: the state variable
//!   `ln S - (mu - sigma^2/2) t`, the regression covariate. It is a
//!   drift-corrected log-price, not itself a price.
//!
//! Paths are simulated in parallel; each path owns its seeded stream so the
//! ensemble is bit-identical for a fixed seed regardless of thread count.

use crate::basis::BasisConfig;
use crate::error::{validation::*, QlbsResult};
use crate::models::gbm::Gbm;
use crate::rng::{self, RngFactory};
use ndarray::Array2;
use rayon::prelude::*;
use std::f64;

/// Initial-price seeding strategy for the ensemble
///
/// `Spot` starts every path at the configured spot. `Grid` spreads the first
/// half of the paths evenly over `[lo_frac * s0, hi_frac * s0]` and starts
/// the rest at spot, which widens the cross-sectional support of the
/// regression at early time steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSeeding {
    Spot,
    Grid { lo_frac: f64, hi_frac: f64 },
}

impl PathSeeding {
    pub(crate) fn initial_prices(&self, s0: f64, paths: usize) -> Vec<f64> {
        match *self {
            PathSeeding::Spot => vec![s0; paths],
            PathSeeding::Grid { lo_frac, hi_frac } => {
                let half = paths / 2;
                let mut prices = Vec::with_capacity(paths);
                if half == 1 {
                    prices.push(lo_frac * s0);
                } else if half > 1 {
                    let h = (hi_frac - lo_frac) * s0 / (half - 1) as f64;
                    for i in 0..half {
                        prices.push(lo_frac * s0 + h * i as f64);
                    }
                }
                prices.resize(paths, s0);
                prices
            }
        }
    }
}

/// Immutable simulation parameters
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Initial price of the underlying
    pub s0: f64,
    /// Option strike
    pub strike: f64,
    /// Volatility
    pub vol: f64,
    /// Time to maturity, in years
    pub maturity: f64,
    /// Risk-free rate
    pub rate: f64,
    /// Real-world asset drift
    pub drift: f64,
    /// Number of time steps
    pub steps: usize,
    /// Number of Monte Carlo paths
    pub paths: usize,
    /// Risk-adjustment coefficient; 0 recovers the pure hedge
    pub risk_coef: f64,
    /// Regularization strength for the step regressions
    pub reg_param: f64,
    /// RNG seed
    pub seed: u64,
    /// Initial-price seeding strategy
    pub seeding: PathSeeding,
    /// Function-basis configuration
    pub basis: BasisConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            s0: 100.0,
            strike: 100.0,
            vol: 0.2,
            maturity: 1.0,
            rate: 0.05,
            drift: 0.05,
            steps: 52,
            paths: 10_000,
            risk_coef: 0.0,
            reg_param: 1e-3,
            seed: 42,
            seeding: PathSeeding::Spot,
            basis: BasisConfig::default(),
        }
    }
}

impl SimConfig {
    /// Validate the simulation configuration
    pub fn validate(&self) -> QlbsResult<()> {
        validate_positive("s0", self.s0)?;
        validate_positive("strike", self.strike)?;
        validate_non_negative("vol", self.vol)?;
        validate_positive("maturity", self.maturity)?;
        validate_finite("rate", self.rate)?;
        validate_finite("drift", self.drift)?;
        validate_finite("risk_coef", self.risk_coef)?;
        validate_non_negative("reg_param", self.reg_param)?;
        validate_steps(self.steps)?;
        validate_paths(self.paths)?;
        self.basis.validate()?;
        Ok(())
    }

    /// Time-step size; positive for any valid configuration
    pub fn dt(&self) -> f64 {
        self.maturity / self.steps as f64
    }

    /// Per-step discount factor e^{-r dt}
    pub fn gamma(&self) -> f64 {
        (-self.rate * self.dt()).exp()
    }
}

/// The simulated ensemble and its derived series
#[derive(Debug, Clone)]
pub struct PathSet {
    pub(crate) s_vals: Array2<f64>,
    pub(crate) delta_s_hat: Array2<f64>,
    pub(crate) x_vals: Array2<f64>,
}

impl PathSet {
    /// Simulate the ensemble and compute the derived series
    pub fn generate(cfg: &SimConfig) -> QlbsResult<PathSet> {
        cfg.validate()?;

        let n_paths = cfg.paths;
        let n_steps = cfg.steps;
        let dt = cfg.dt();
        let gbm = Gbm::new(cfg.drift, cfg.vol);
        let factory = RngFactory::new(cfg.seed);
        let init = cfg.seeding.initial_prices(cfg.s0, n_paths);

        let rows: Vec<Vec<f64>> = (0..n_paths)
            .into_par_iter()
            .map(|p| {
                let mut stream = factory.path_stream(p as u64);
                let mut row = Vec::with_capacity(n_steps + 1);
                let mut s = init[p];
                row.push(s);
                for _ in 0..n_steps {
                    let z = rng::get_normal_draw(&mut stream);
                    s = gbm.exact_step(s, dt, z);
                    row.push(s);
                }
                row
            })
            .collect();

        let mut s_vals = Array2::zeros((n_paths, n_steps + 1));
        for (p, row) in rows.iter().enumerate() {
            for (t, &v) in row.iter().enumerate() {
                s_vals[[p, t]] = v;
            }
        }

        // discounted increments, demeaned across paths at each step
        let growth = (cfg.rate * dt).exp();
        let mut delta_s_hat = Array2::zeros((n_paths, n_steps));
        for t in 0..n_steps {
            let mut mean = 0.0;
            for p in 0..n_paths {
                let d = s_vals[[p, t + 1]] - growth * s_vals[[p, t]];
                delta_s_hat[[p, t]] = d;
                mean += d;
            }
            mean /= n_paths as f64;
            for p in 0..n_paths {
                delta_s_hat[[p, t]] -= mean;
            }
        }

        // drift-corrected log-price state variable
        let mut x_vals = Array2::zeros((n_paths, n_steps + 1));
        for t in 0..=n_steps {
            let correction = gbm.log_drift(t as f64 * dt);
            for p in 0..n_paths {
                x_vals[[p, t]] = s_vals[[p, t]].ln() - correction;
            }
        }

        Ok(PathSet {
            s_vals,
            delta_s_hat,
            x_vals,
        })
    }

    pub fn n_paths(&self) -> usize {
        self.s_vals.nrows()
    }

    pub fn n_steps(&self) -> usize {
        self.s_vals.ncols() - 1
    }

    /// Range of the state variable over the whole ensemble
    pub fn state_range(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &x in self.x_vals.iter() {
            lo = lo.min(x);
            hi = hi.max(x);
        }
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QlbsError;

    fn small_cfg() -> SimConfig {
        SimConfig {
            paths: 500,
            steps: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_fixed_seed_is_bit_identical() {
        let cfg = small_cfg();
        let a = PathSet::generate(&cfg).expect("valid config");
        let b = PathSet::generate(&cfg).expect("valid config");

        assert_eq!(a.s_vals, b.s_vals);
        assert_eq!(a.delta_s_hat, b.delta_s_hat);
        assert_eq!(a.x_vals, b.x_vals);
    }

    #[test]
    fn test_different_seeds_differ() {
        let cfg = small_cfg();
        let other = SimConfig { seed: 43, ..cfg.clone() };

        let a = PathSet::generate(&cfg).expect("valid config");
        let b = PathSet::generate(&other).expect("valid config");
        assert_ne!(a.s_vals, b.s_vals);
    }

    #[test]
    fn test_increments_are_demeaned() {
        let paths = PathSet::generate(&small_cfg()).expect("valid config");

        for t in 0..paths.n_steps() {
            let col = paths.delta_s_hat.column(t);
            let mean = col.sum() / col.len() as f64;
            assert!(
                mean.abs() < 1e-9,
                "column {} has cross-sectional mean {}",
                t,
                mean
            );
        }
    }

    #[test]
    fn test_spot_seeding_fills_first_column() {
        let cfg = small_cfg();
        let paths = PathSet::generate(&cfg).expect("valid config");
        assert!(paths.s_vals.column(0).iter().all(|&s| s == cfg.s0));
    }

    #[test]
    fn test_grid_seeding_spreads_first_half() {
        let cfg = SimConfig {
            paths: 100,
            steps: 4,
            seeding: PathSeeding::Grid {
                lo_frac: 0.5,
                hi_frac: 1.5,
            },
            ..Default::default()
        };
        let paths = PathSet::generate(&cfg).expect("valid config");

        let col0 = paths.s_vals.column(0);
        assert!((col0[0] - 50.0).abs() < 1e-12);
        assert!((col0[49] - 150.0).abs() < 1e-12);
        assert!(col0.iter().skip(50).all(|&s| s == cfg.s0));
    }

    #[test]
    fn test_zero_vol_paths_are_deterministic() {
        let cfg = SimConfig {
            vol: 0.0,
            paths: 10,
            steps: 4,
            ..Default::default()
        };
        let paths = PathSet::generate(&cfg).expect("valid config");

        let dt = cfg.dt();
        for t in 0..=4 {
            let expected = cfg.s0 * (cfg.drift * dt * t as f64).exp();
            for p in 0..10 {
                assert!((paths.s_vals[[p, t]] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_too_few_paths_rejected() {
        let cfg = SimConfig {
            paths: 1,
            ..Default::default()
        };
        match PathSet::generate(&cfg) {
            Err(QlbsError::InvalidConfiguration { field, .. }) => assert_eq!(field, "paths"),
            other => panic!("expected InvalidConfiguration, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_zero_steps_rejected() {
        let cfg = SimConfig {
            steps: 0,
            ..Default::default()
        };
        assert!(PathSet::generate(&cfg).is_err());
    }
}

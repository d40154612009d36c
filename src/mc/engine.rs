// src/mc/engine.rs
//! QLBS backward-induction pricing and hedging engine
//!
//! # Math Framework
//!
//! Paths are simulated under the real-world drift; at each time step the
//! optimal hedge is fitted cross-sectionally as a linear combination of
//! basis activations of the state variable, and the cash account rolls back
//! through the self-financing identity
//! ```text
//! b(t) = e^{-r dt} ( b(t+1) + (a(t+1) - a(t)) S(t+1) )
//! ```
//! where `a` is the hedge position. After the recursion reaches t = 0 the
//! option value is the cross-sectional mean of the initial portfolio value
//! `b(0) + a(0) S(0)`, its Monte Carlo dispersion is the cross-sectional
//! standard deviation, and the initial hedge ratio is the mean of `a(0)`.
//!
//! # Phases
//!
//! The pricer is a three-phase state machine: `generate_paths` builds the
//! ensemble and the basis design tensor, `seed_payoff` fixes the contract,
//! `roll_backward` runs the recursion strictly from maturity to time zero.
//! Calling a phase before its prerequisite raises `UninitializedState`.

use crate::basis::{apt_knots, collocation_sites, BsplineBasis, ClampPolicy};
use crate::error::{QlbsError, QlbsResult};
use crate::mc::paths::{PathSet, SimConfig};
use crate::mc::payoffs::{OptionType, PayoffState};
use crate::mc::regression;
use ndarray::{Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rayon::prelude::*;
use std::f64;

/// Basis activations for the whole ensemble, `[time step, path, basis index]`
#[derive(Debug, Clone)]
pub struct BasisDesign {
    data: Array3<f64>,
    basis: BsplineBasis,
    clamped: usize,
}

impl BasisDesign {
    /// Expand the state variable of every node into its activation vector
    ///
    /// The covariate domain is taken over the entire state tensor, so with
    /// the `Clamp` policy interior data never clamps; the policy governs
    /// probe points supplied from outside the fitted range.
    pub fn expand(paths: &PathSet, cfg: &SimConfig) -> QlbsResult<BasisDesign> {
        let (mut lo, mut hi) = paths.state_range();
        if !lo.is_finite() || !hi.is_finite() {
            return Err(QlbsError::NumericalInstability {
                method: "basis expansion".to_string(),
                reason: format!("state variable range [{}, {}] is not finite", lo, hi),
            });
        }
        // zero-width domain (e.g. zero volatility): pad so the knots stay valid
        if hi - lo < 1e-10 {
            let pad = lo.abs().max(1.0) * 1e-8;
            lo -= pad;
            hi += pad;
        }

        let sites = collocation_sites(lo, hi, cfg.basis.ncolloc);
        let knots = apt_knots(&sites, cfg.basis.order)?;
        let basis = BsplineBasis::new(knots, cfg.basis.order)?;
        let (d_lo, d_hi) = basis.domain();

        let n_paths = paths.n_paths();
        let n_steps = paths.n_steps();
        let n_basis = basis.n_basis();

        // independent across time steps
        let slabs: QlbsResult<Vec<(Vec<f64>, usize)>> = (0..=n_steps)
            .into_par_iter()
            .map(|t| {
                let mut slab = Vec::with_capacity(n_paths * n_basis);
                let mut clamped = 0usize;
                for p in 0..n_paths {
                    let x = paths.x_vals[[p, t]];
                    if x < d_lo || x > d_hi {
                        match cfg.basis.policy {
                            ClampPolicy::Fail => {
                                return Err(QlbsError::DomainExtrapolation {
                                    value: x,
                                    lo: d_lo,
                                    hi: d_hi,
                                })
                            }
                            ClampPolicy::Clamp => clamped += 1,
                        }
                    }
                    slab.extend(basis.eval(x));
                }
                Ok((slab, clamped))
            })
            .collect();
        let slabs = slabs?;

        let mut data = Array3::zeros((n_steps + 1, n_paths, n_basis));
        let mut clamped = 0;
        for (t, (slab, n_clamped)) in slabs.iter().enumerate() {
            clamped += n_clamped;
            for p in 0..n_paths {
                for i in 0..n_basis {
                    data[[t, p, i]] = slab[p * n_basis + i];
                }
            }
        }

        Ok(BasisDesign {
            data,
            basis,
            clamped,
        })
    }

    pub fn n_basis(&self) -> usize {
        self.basis.n_basis()
    }

    /// How many node states fell outside the fitted domain and were clamped
    pub fn clamped(&self) -> usize {
        self.clamped
    }

    /// Activation vector at an arbitrary state value, honoring the policy
    pub fn activations_at(&self, x: f64, policy: ClampPolicy) -> QlbsResult<Vec<f64>> {
        let (lo, hi) = self.basis.domain();
        if (x < lo || x > hi) && policy == ClampPolicy::Fail {
            return Err(QlbsError::DomainExtrapolation { value: x, lo, hi });
        }
        Ok(self.basis.eval(x))
    }
}

/// Cash account and hedge positions written by the backward recursion
#[derive(Debug, Clone)]
struct PortfolioState {
    b_vals: Array2<f64>,
    opt_hedge: Array2<f64>,
}

/// Result of the backward induction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HedgeReport {
    /// Cross-sectional mean of the initial portfolio value
    pub option_value: f64,
    /// Cross-sectional mean of the initial hedge position
    pub delta: f64,
    /// Cross-sectional (population) standard deviation of the initial
    /// portfolio value
    pub std_dev: f64,
}

/// Least-squares Monte Carlo pricer and hedger for a European option
pub struct QlbsPricer {
    cfg: SimConfig,
    paths: Option<PathSet>,
    design: Option<BasisDesign>,
    payoff: Option<PayoffState>,
    portfolio: Option<PortfolioState>,
}

impl QlbsPricer {
    pub fn new(cfg: SimConfig) -> QlbsResult<Self> {
        cfg.validate()?;
        Ok(QlbsPricer {
            cfg,
            paths: None,
            design: None,
            payoff: None,
            portfolio: None,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    /// Simulate the ensemble and expand the basis design tensor
    ///
    /// Invalidates any previously seeded payoff and rolled-back portfolio.
    pub fn generate_paths(&mut self) -> QlbsResult<()> {
        let paths = PathSet::generate(&self.cfg)?;
        let design = BasisDesign::expand(&paths, &self.cfg)?;
        self.paths = Some(paths);
        self.design = Some(design);
        self.payoff = None;
        self.portfolio = None;
        Ok(())
    }

    /// Seed intrinsic and terminal option values for the contract
    ///
    /// `strike` overrides the configured strike when given, as in the
    /// underlying method this mirrors.
    pub fn seed_payoff(&mut self, strike: Option<f64>, option_type: OptionType) -> QlbsResult<()> {
        let paths = self.paths.as_ref().ok_or_else(|| QlbsError::UninitializedState {
            operation: "seed_payoff".to_string(),
            missing: "generate_paths".to_string(),
        })?;
        let strike = strike.unwrap_or(self.cfg.strike);
        self.payoff = Some(PayoffState::seed(&paths.s_vals, strike, option_type)?);
        self.portfolio = None;
        Ok(())
    }

    /// Roll the optimal hedge and the cash account back from maturity
    ///
    /// Visits the time steps in strictly decreasing order; each portfolio
    /// column is written exactly once. The terminal cash column is seeded
    /// with the terminal intrinsic value, all maturity hedges are zero.
    pub fn roll_backward(&mut self) -> QlbsResult<HedgeReport> {
        let paths = self.paths.as_ref().ok_or_else(|| QlbsError::UninitializedState {
            operation: "roll_backward".to_string(),
            missing: "generate_paths".to_string(),
        })?;
        let design = self.design.as_ref().ok_or_else(|| QlbsError::UninitializedState {
            operation: "roll_backward".to_string(),
            missing: "generate_paths".to_string(),
        })?;
        let payoff = self.payoff.as_ref().ok_or_else(|| QlbsError::UninitializedState {
            operation: "roll_backward".to_string(),
            missing: "seed_payoff".to_string(),
        })?;

        let n = paths.n_paths();
        let t_max = paths.n_steps();
        let n_basis = design.n_basis();
        let dt = self.cfg.dt();
        let gamma = self.cfg.gamma();
        let carry = self.cfg.risk_coef * ((self.cfg.drift - self.cfg.rate) * dt).exp();
        let s_vals = &paths.s_vals;

        let mut b_vals = Array2::zeros((n, t_max + 1));
        let mut opt_hedge = Array2::<f64>::zeros((n, t_max + 1));
        for p in 0..n {
            b_vals[[p, t_max]] = payoff.option_vals[p];
        }

        let mut pi_next = vec![0.0; n];
        let mut residual = vec![0.0; n];
        for t in (0..t_max).rev() {
            // expected next-step portfolio value per path, demeaned
            let mut mean = 0.0;
            for p in 0..n {
                pi_next[p] = b_vals[[p, t + 1]] + opt_hedge[[p, t + 1]] * s_vals[[p, t + 1]];
                mean += pi_next[p];
            }
            mean /= n as f64;

            let d_hat = paths.delta_s_hat.column(t);
            for p in 0..n {
                residual[p] = (pi_next[p] - mean) * d_hat[p] + carry * s_vals[[p, t]];
            }

            let phi_t = design.data.index_axis(Axis(0), t);
            let coeffs = regression::solve_hedge_coefficients(
                design.data.index_axis(Axis(0), t),
                paths.delta_s_hat.column(t),
                &residual,
                self.cfg.reg_param,
                t,
            )?;

            for p in 0..n {
                let mut h = 0.0;
                for i in 0..n_basis {
                    h += phi_t[[p, i]] * coeffs[i];
                }
                opt_hedge[[p, t]] = h;
            }
            // self-financing rollback of the cash account
            for p in 0..n {
                b_vals[[p, t]] = gamma
                    * (b_vals[[p, t + 1]]
                        + (opt_hedge[[p, t + 1]] - opt_hedge[[p, t]]) * s_vals[[p, t + 1]]);
            }
        }

        let mut mean_pv = 0.0;
        let mut mean_delta = 0.0;
        for p in 0..n {
            mean_pv += b_vals[[p, 0]] + opt_hedge[[p, 0]] * s_vals[[p, 0]];
            mean_delta += opt_hedge[[p, 0]];
        }
        mean_pv /= n as f64;
        mean_delta /= n as f64;

        let mut var = 0.0;
        for p in 0..n {
            let pv = b_vals[[p, 0]] + opt_hedge[[p, 0]] * s_vals[[p, 0]];
            var += (pv - mean_pv) * (pv - mean_pv);
        }
        let std_dev = (var / n as f64).sqrt();

        let report = HedgeReport {
            option_value: mean_pv,
            delta: mean_delta,
            std_dev,
        };
        if !mean_pv.is_finite() || !mean_delta.is_finite() || !std_dev.is_finite() {
            return Err(QlbsError::NumericalInstability {
                method: "backward induction".to_string(),
                reason: format!(
                    "non-finite estimate: value {}, delta {}, std {}",
                    mean_pv, mean_delta, std_dev
                ),
            });
        }

        self.portfolio = Some(PortfolioState { b_vals, opt_hedge });
        Ok(report)
    }

    // Read-only views over the per-phase artifacts; `None` until the
    // producing phase has run.

    pub fn s_vals(&self) -> Option<ArrayView2<f64>> {
        self.paths.as_ref().map(|p| p.s_vals.view())
    }

    pub fn delta_s_hat(&self) -> Option<ArrayView2<f64>> {
        self.paths.as_ref().map(|p| p.delta_s_hat.view())
    }

    pub fn state_variable(&self) -> Option<ArrayView2<f64>> {
        self.paths.as_ref().map(|p| p.x_vals.view())
    }

    pub fn basis_design(&self) -> Option<ArrayView3<f64>> {
        self.design.as_ref().map(|d| d.data.view())
    }

    pub fn n_basis(&self) -> Option<usize> {
        self.design.as_ref().map(|d| d.n_basis())
    }

    /// Number of node states clamped to the basis domain edge
    pub fn clamped_states(&self) -> Option<usize> {
        self.design.as_ref().map(|d| d.clamped())
    }

    /// Activation vector at an arbitrary state value under the configured
    /// out-of-domain policy
    pub fn basis_activations(&self, x: f64) -> QlbsResult<Vec<f64>> {
        let design = self.design.as_ref().ok_or_else(|| QlbsError::UninitializedState {
            operation: "basis_activations".to_string(),
            missing: "generate_paths".to_string(),
        })?;
        design.activations_at(x, self.cfg.basis.policy)
    }

    pub fn intrinsic_vals(&self) -> Option<ArrayView2<f64>> {
        self.payoff.as_ref().map(|p| p.intrinsic_vals.view())
    }

    pub fn terminal_payoff(&self) -> Option<ArrayView1<f64>> {
        self.payoff.as_ref().map(|p| p.option_vals.view())
    }

    pub fn cash_account(&self) -> Option<ArrayView2<f64>> {
        self.portfolio.as_ref().map(|p| p.b_vals.view())
    }

    pub fn hedges(&self) -> Option<ArrayView2<f64>> {
        self.portfolio.as_ref().map(|p| p.opt_hedge.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mc::paths::SimConfig;

    fn small_cfg() -> SimConfig {
        SimConfig {
            paths: 400,
            steps: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_seed_payoff_requires_paths() {
        let mut pricer = QlbsPricer::new(small_cfg()).expect("valid config");
        match pricer.seed_payoff(None, OptionType::Put) {
            Err(QlbsError::UninitializedState { missing, .. }) => {
                assert_eq!(missing, "generate_paths")
            }
            other => panic!("expected UninitializedState, got {:?}", other),
        }
    }

    #[test]
    fn test_roll_backward_requires_payoff() {
        let mut pricer = QlbsPricer::new(small_cfg()).expect("valid config");
        pricer.generate_paths().expect("simulation");
        match pricer.roll_backward() {
            Err(QlbsError::UninitializedState { missing, .. }) => {
                assert_eq!(missing, "seed_payoff")
            }
            other => panic!("expected UninitializedState, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_basis_design_shape() {
        let cfg = small_cfg();
        let mut pricer = QlbsPricer::new(cfg.clone()).expect("valid config");
        pricer.generate_paths().expect("simulation");

        let design = pricer.basis_design().expect("design exists");
        assert_eq!(
            design.dim(),
            (cfg.steps + 1, cfg.paths, cfg.basis.ncolloc)
        );
        // within the fitted domain nothing strictly exceeds the range
        assert_eq!(pricer.clamped_states(), Some(0));
    }

    #[test]
    fn test_activation_rows_sum_to_one() {
        let mut pricer = QlbsPricer::new(small_cfg()).expect("valid config");
        pricer.generate_paths().expect("simulation");

        let design = pricer.basis_design().expect("design exists");
        for t in [0, 4, 8] {
            for p in [0, 100, 399] {
                let sum: f64 = design.index_axis(Axis(0), t).row(p).sum();
                assert!(
                    (sum - 1.0).abs() < 1e-9,
                    "activations at [{}, {}] sum to {}",
                    t,
                    p,
                    sum
                );
            }
        }
    }

    #[test]
    fn test_clamp_policy_on_probe_points() {
        let mut pricer = QlbsPricer::new(small_cfg()).expect("valid config");
        pricer.generate_paths().expect("simulation");

        let (lo, _) = {
            let x = pricer.state_variable().expect("states exist");
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &v in x.iter() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
            (lo, hi)
        };

        // default policy clamps: far-out probe equals the edge activations
        let outside = pricer.basis_activations(lo - 10.0).expect("clamped eval");
        let edge = pricer.basis_activations(lo).expect("edge eval");
        assert_eq!(outside, edge);
    }

    #[test]
    fn test_fail_policy_on_probe_points() {
        let cfg = SimConfig {
            basis: crate::basis::BasisConfig {
                policy: ClampPolicy::Fail,
                ..Default::default()
            },
            ..small_cfg()
        };
        let mut pricer = QlbsPricer::new(cfg).expect("valid config");
        pricer.generate_paths().expect("simulation");

        match pricer.basis_activations(1e6) {
            Err(QlbsError::DomainExtrapolation { .. }) => {}
            other => panic!("expected DomainExtrapolation, got {:?}", other),
        }
    }

    #[test]
    fn test_regenerating_paths_invalidates_payoff() {
        let mut pricer = QlbsPricer::new(small_cfg()).expect("valid config");
        pricer.generate_paths().expect("simulation");
        pricer.seed_payoff(None, OptionType::Put).expect("payoff");
        pricer.generate_paths().expect("simulation");
        assert!(pricer.roll_backward().is_err());
    }

    #[test]
    fn test_strike_override() {
        let mut pricer = QlbsPricer::new(small_cfg()).expect("valid config");
        pricer.generate_paths().expect("simulation");
        pricer
            .seed_payoff(Some(120.0), OptionType::Put)
            .expect("payoff");

        // intrinsic at t = 0 must reflect the overridden strike
        let intrinsic = pricer.intrinsic_vals().expect("payoff seeded");
        assert!((intrinsic[[0, 0]] - 20.0).abs() < 1e-12);
    }
}

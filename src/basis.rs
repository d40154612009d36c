// src/basis.rs
//! B-spline function basis over the regression state variable
//!
//! # Role in the engine
//!
//! The backward regression approximates the optimal hedge at each time step
//! as a linear combination of a fixed set of basis functions of the state
//! variable. This module owns that basis: it builds a clamped knot vector
//! from evenly spaced collocation sites and evaluates all B-spline
//! activations at a scalar state value with the Cox-de Boor recursion.
//!
//! # Knot construction
//!
//! For `n` collocation sites and spline order `p` the knot vector has
//! `n + p + 1` entries: the first and last site each repeated `p + 1` times,
//! with the `n - p - 1` interior knots placed at sliding averages of `p`
//! consecutive sites. This yields exactly `n` basis functions that form a
//! partition of unity on `[sites[0], sites[n-1]]`.

use crate::error::{QlbsError, QlbsResult};

/// What to do when a state value falls outside the fitted basis domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampPolicy {
    /// Evaluate at the nearest domain edge and count the event (non-fatal)
    Clamp,
    /// Surface a `DomainExtrapolation` error
    Fail,
}

/// Basis configuration: spline order and collocation-point count
#[derive(Debug, Clone, Copy)]
pub struct BasisConfig {
    /// Spline order (polynomial degree of the pieces)
    pub order: usize,
    /// Number of collocation sites; equals the number of basis functions
    pub ncolloc: usize,
    /// Out-of-domain evaluation policy
    pub policy: ClampPolicy,
}

impl Default for BasisConfig {
    fn default() -> Self {
        BasisConfig {
            order: 4,
            ncolloc: 12,
            policy: ClampPolicy::Clamp,
        }
    }
}

impl BasisConfig {
    pub fn validate(&self) -> QlbsResult<()> {
        if self.order == 0 {
            return Err(QlbsError::InvalidConfiguration {
                field: "basis.order".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.ncolloc < self.order + 1 {
            return Err(QlbsError::InvalidConfiguration {
                field: "basis.ncolloc".to_string(),
                reason: format!("must be at least order + 1 = {}", self.order + 1),
            });
        }
        Ok(())
    }
}

/// Evenly spaced collocation sites across `[lo, hi]`
pub fn collocation_sites(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![lo];
    }
    let h = (hi - lo) / (n - 1) as f64;
    // both endpoints land exactly, so the fitted domain covers the data range
    (0..n)
        .map(|i| if i == n - 1 { hi } else { lo + h * i as f64 })
        .collect()
}

/// Build a clamped knot vector for a basis of the given order anchored at
/// the given sites
///
/// The sites must be nondecreasing with at least `order + 1` entries.
pub fn apt_knots(sites: &[f64], order: usize) -> QlbsResult<Vec<f64>> {
    let n = sites.len();
    let p = order;
    if n < p + 1 {
        return Err(QlbsError::InvalidConfiguration {
            field: "basis.sites".to_string(),
            reason: format!("need at least order + 1 = {} sites, got {}", p + 1, n),
        });
    }
    if sites.windows(2).any(|w| w[1] < w[0]) {
        return Err(QlbsError::InvalidConfiguration {
            field: "basis.sites".to_string(),
            reason: "collocation sites must be nondecreasing".to_string(),
        });
    }

    let mut knots = Vec::with_capacity(n + p + 1);
    knots.extend(std::iter::repeat(sites[0]).take(p + 1));
    for j in 0..n - p - 1 {
        let window = &sites[j + 1..j + 1 + p];
        knots.push(window.iter().sum::<f64>() / p as f64);
    }
    knots.extend(std::iter::repeat(sites[n - 1]).take(p + 1));
    Ok(knots)
}

/// B-spline basis evaluator over a fixed knot vector
#[derive(Debug, Clone)]
pub struct BsplineBasis {
    knots: Vec<f64>,
    order: usize,
    n_basis: usize,
}

impl BsplineBasis {
    pub fn new(knots: Vec<f64>, order: usize) -> QlbsResult<Self> {
        if knots.len() < 2 * (order + 1) {
            return Err(QlbsError::InvalidConfiguration {
                field: "basis.knots".to_string(),
                reason: format!(
                    "knot vector of length {} too short for order {}",
                    knots.len(),
                    order
                ),
            });
        }
        if knots.windows(2).any(|w| w[1] < w[0]) {
            return Err(QlbsError::InvalidConfiguration {
                field: "basis.knots".to_string(),
                reason: "knot vector must be nondecreasing".to_string(),
            });
        }
        let n_basis = knots.len() - order - 1;
        Ok(BsplineBasis {
            knots,
            order,
            n_basis,
        })
    }

    /// Number of basis functions (length of every activation vector)
    pub fn n_basis(&self) -> usize {
        self.n_basis
    }

    /// Interval on which the basis forms a partition of unity
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.order], self.knots[self.n_basis])
    }

    /// Evaluate all basis activations at `x` via the Cox-de Boor recursion
    ///
    /// Values outside the knot range are evaluated at the nearest domain
    /// edge; the out-of-domain policy itself is enforced by the caller.
    pub fn eval(&self, x: f64) -> Vec<f64> {
        let p = self.order;
        let t = &self.knots;
        let m = t.len() - 1;
        let (lo, hi) = self.domain();
        let x = x.max(lo).min(hi);

        // order-zero seed: indicator of the containing knot interval
        let mut b = vec![0.0; m];
        for i in 0..m {
            if t[i] <= x && x < t[i + 1] {
                b[i] = 1.0;
            }
        }
        if x >= hi {
            // right endpoint belongs to the last nonempty interval
            for i in (0..m).rev() {
                if t[i] < t[i + 1] {
                    b[i] = 1.0;
                    break;
                }
            }
        }

        for d in 1..=p {
            for i in 0..m - d {
                let mut v = 0.0;
                let den_l = t[i + d] - t[i];
                if den_l > 0.0 {
                    v += (x - t[i]) / den_l * b[i];
                }
                let den_r = t[i + d + 1] - t[i + 1];
                if den_r > 0.0 {
                    v += (t[i + d + 1] - x) / den_r * b[i + 1];
                }
                b[i] = v;
            }
        }

        b.truncate(self.n_basis);
        b
    }
}

// src/mc/regression.rs
//! Regularized cross-sectional regression for one time step
//!
//! # Mathematical Framework
//!
//! At a fixed time step t the optimal hedge is fitted as a linear
//! combination of basis activations by solving
//! ```text
//! A φ = B
//! A = Φᵀ diag(d²) Φ + λ I
//! B = Φᵀ (π̂ ⊙ d + risk term)
//! ```
//! where Φ is the `[paths × basis]` activation matrix at t, `d` the centered
//! discounted increment vector at t and `π̂` the demeaned next-step
//! portfolio value. The ridge term λI is mandatory in practice: when many
//! increments are near zero, Φᵀ diag(d²) Φ is close to singular.
//!
//! The system is solved directly (Cholesky, with a full-pivot LU fallback),
//! never by forming an explicit inverse.

use crate::error::{QlbsError, QlbsResult};
use nalgebra::{DMatrix, DVector};
use ndarray::{ArrayView1, ArrayView2};

/// Regularized Gram matrix `Φᵀ diag(d²) Φ + λ I`
///
/// Symmetric by construction and positive definite for `reg_param > 0`.
pub fn gram_matrix(
    phi: ArrayView2<f64>,
    d_hat: ArrayView1<f64>,
    reg_param: f64,
) -> DMatrix<f64> {
    let (n_paths, n_basis) = phi.dim();
    let mut a = DMatrix::zeros(n_basis, n_basis);

    for p in 0..n_paths {
        let w = d_hat[p] * d_hat[p];
        if w == 0.0 {
            continue;
        }
        for i in 0..n_basis {
            let w_phi_i = w * phi[[p, i]];
            if w_phi_i == 0.0 {
                continue;
            }
            for j in i..n_basis {
                a[(i, j)] += w_phi_i * phi[[p, j]];
            }
        }
    }

    // mirror the upper triangle, then add the ridge
    for i in 0..n_basis {
        for j in 0..i {
            a[(i, j)] = a[(j, i)];
        }
        a[(i, i)] += reg_param;
    }
    a
}

/// Target vector `Φᵀ residual`
pub fn target_vector(phi: ArrayView2<f64>, residual: &[f64]) -> DVector<f64> {
    let (n_paths, n_basis) = phi.dim();
    let mut b = DVector::zeros(n_basis);
    for p in 0..n_paths {
        let r = residual[p];
        if r == 0.0 {
            continue;
        }
        for i in 0..n_basis {
            b[i] += phi[[p, i]] * r;
        }
    }
    b
}

/// Solve `A φ = B` for the hedge coefficients at time step `step`
///
/// Cholesky first (A is SPD whenever the ridge is active), full-pivot LU as
/// a fallback. A system that cannot be solved, or that produces non-finite
/// coefficients, surfaces `SingularSystem` rather than propagating NaNs
/// into the recursion.
pub fn solve_step(a: DMatrix<f64>, b: DVector<f64>, step: usize) -> QlbsResult<DVector<f64>> {
    let phi = match a.clone().cholesky() {
        Some(chol) => chol.solve(&b),
        None => a
            .full_piv_lu()
            .solve(&b)
            .ok_or_else(|| QlbsError::SingularSystem {
                step,
                reason: "Gram matrix is singular; increase reg_param".to_string(),
            })?,
    };

    if phi.iter().any(|c| !c.is_finite()) {
        return Err(QlbsError::SingularSystem {
            step,
            reason: "solve produced non-finite coefficients".to_string(),
        });
    }
    Ok(phi)
}

/// Fit the hedge coefficients for one time step from raw inputs
pub fn solve_hedge_coefficients(
    phi: ArrayView2<f64>,
    d_hat: ArrayView1<f64>,
    residual: &[f64],
    reg_param: f64,
    step: usize,
) -> QlbsResult<DVector<f64>> {
    let a = gram_matrix(phi, d_hat, reg_param);
    let b = target_vector(phi, residual);
    solve_step(a, b, step)
}

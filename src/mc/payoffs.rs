// src/mc/payoffs.rs
//! Option payoff seeding
//!
//! The option type is a closed variant set: the engine prices European puts
//! and calls only, and any other token is rejected eagerly. Intrinsic values
//! are computed path-wise at every time slice; the terminal column doubles
//! as the payoff at maturity and seeds the terminal cash account of the
//! backward recursion.

use crate::error::{QlbsError, QlbsResult};
use ndarray::{Array1, Array2};
use std::f64;
use std::fmt;
use std::str::FromStr;

/// Supported European option types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    /// max(K - S, 0)
    Put,
    /// max(S - K, 0)
    Call,
}

impl OptionType {
    /// Intrinsic value at price `s` for strike `k`
    pub fn intrinsic(&self, s: f64, k: f64) -> f64 {
        match self {
            OptionType::Put => (k - s).max(0.0),
            OptionType::Call => (s - k).max(0.0),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Put => write!(f, "Put"),
            OptionType::Call => write!(f, "Call"),
        }
    }
}

impl FromStr for OptionType {
    type Err = QlbsError;

    /// Accepts the conventional single-letter tokens "P"/"C" as well as
    /// "put"/"call", case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p" | "put" => Ok(OptionType::Put),
            "c" | "call" => Ok(OptionType::Call),
            _ => Err(QlbsError::InvalidOptionType {
                token: s.to_string(),
            }),
        }
    }
}

/// Intrinsic values at every node plus the terminal payoff vector
#[derive(Debug, Clone)]
pub struct PayoffState {
    pub(crate) option_type: OptionType,
    pub(crate) strike: f64,
    pub(crate) intrinsic_vals: Array2<f64>,
    pub(crate) option_vals: Array1<f64>,
}

impl PayoffState {
    /// Seed intrinsic and terminal option values from the price ensemble
    pub fn seed(s_vals: &Array2<f64>, strike: f64, option_type: OptionType) -> QlbsResult<Self> {
        crate::error::validation::validate_positive("strike", strike)?;

        let (n_paths, n_cols) = s_vals.dim();
        let mut intrinsic_vals = Array2::zeros((n_paths, n_cols));
        for p in 0..n_paths {
            for t in 0..n_cols {
                intrinsic_vals[[p, t]] = option_type.intrinsic(s_vals[[p, t]], strike);
            }
        }
        let option_vals = intrinsic_vals.column(n_cols - 1).to_owned();

        Ok(PayoffState {
            option_type,
            strike,
            intrinsic_vals,
            option_vals,
        })
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }
}

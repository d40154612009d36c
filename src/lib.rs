//! # qlbs-hedge: Least-Squares Monte Carlo Hedging
//!
//! A Rust library for pricing and hedging European options under the
//! real-world probability measure with the QLBS (Q-Learning Black-Scholes)
//! least-squares Monte Carlo method.
//!
//! ## Key Features
//!
//! - **Real-world measure**: paths simulated under the physical drift, not
//!   the risk-neutral one
//! - **Function-basis regression**: the optimal hedge at each time step is a
//!   linear combination of B-spline activations of a drift-corrected
//!   log-price state variable
//! - **Regularized numerics**: ridge-regularized Gram matrix, direct
//!   Cholesky/LU solve, no explicit inverses
//! - **Self-financing bookkeeping**: exact backward rollback of the cash
//!   account against hedge rebalancing
//! - **Reproducible**: fixed seed gives bit-identical ensembles and results
//!
//! ## Quick Start
//!
//! ```rust
//! use qlbs_hedge::mc::engine::QlbsPricer;
//! use qlbs_hedge::mc::paths::SimConfig;
//! use qlbs_hedge::mc::payoffs::OptionType;
//!
//! // European put, spot 100, strike 100, 20% vol, one year
//! let cfg = SimConfig {
//!     paths: 2_000,
//!     steps: 12,
//!     ..Default::default()
//! };
//!
//! let mut pricer = QlbsPricer::new(cfg).expect("valid configuration");
//! pricer.generate_paths().expect("simulation");
//! pricer.seed_payoff(None, OptionType::Put).expect("payoff seeding");
//! let report = pricer.roll_backward().expect("backward induction");
//!
//! println!(
//!     "option value: {:.4} ± {:.4}, delta: {:.4}",
//!     report.option_value, report.std_dev, report.delta
//! );
//! ```
//!
//! ## Mathematical Foundation
//!
//! The backward recursion fits, at every time step t, the hedge that
//! minimizes the variance of the one-step hedged portfolio change across
//! the Monte Carlo cross-section, then rolls the cash account back through
//! the self-financing identity. With zero risk-adjustment coefficient and
//! drift equal to the risk-free rate, the time-zero portfolio value
//! converges to the Black-Scholes price as paths and steps grow.

// Module declarations
pub mod analytics;
pub mod basis;
pub mod error;
pub mod math_utils;
pub mod mc;
pub mod models;
pub mod rng;

// Re-export commonly used types for convenience
pub use basis::{BasisConfig, ClampPolicy};
pub use error::{QlbsError, QlbsResult};
pub use mc::engine::{HedgeReport, QlbsPricer};
pub use mc::paths::{PathSeeding, SimConfig};
pub use mc::payoffs::OptionType;

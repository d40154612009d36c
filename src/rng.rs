// src/rng.rs
//! Random Number Generation for the Monte Carlo ensemble
//!
//! # Design Philosophy
//!
//! The path simulator needs random numbers with two hard properties:
//! 1. **Reproducibility**: the same seed must produce bit-identical path
//!    ensembles, run after run. The backward regression is validated against
//!    fixed-seed fixtures, so this is non-negotiable.
//! 2. **Parallel safety**: paths are simulated concurrently, so each path
//!    owns an independent stream with no shared mutable state.
//!
//! Each path derives its stream from `base_seed + path_id`. The mapping is
//! independent of thread count and scheduling, so an ensemble generated on
//! one machine matches one generated on another.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Factory handing out one independent random stream per path
pub struct RngFactory {
    base_seed: u64,
}

impl RngFactory {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    /// Create the seeded stream for a specific path
    pub fn path_stream(&self, path_id: u64) -> StdRng {
        StdRng::seed_from_u64(self.base_seed.wrapping_add(path_id))
    }
}

/// Seed a standalone RNG from a u64
pub fn seed_rng_from_u64(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Draw a standard-normal variate
pub fn get_normal_draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

//! Exponential Natural Evolution Strategies (xNES) for bound-constrained,
//! single-objective continuous optimization.
//!
//! The search distribution `N(mean, A Aᵗ)` is adapted by natural-gradient ascent
//! on rank-based utilities; the transform `A` is updated through the matrix
//! exponential, which keeps it invertible. Candidates that leave the box are
//! repaired coordinate-wise with uniform draws.
//!
//! ```rust
//! use fastxnes::{FnProblem, Population, Xnes, XnesConfigBuilder};
//!
//! let problem = FnProblem::new(vec![-5.0; 2], vec![5.0; 2], |x: &[f64]| {
//!     x.iter().map(|v| v * v).sum()
//! });
//! let mut pop = Population::random(problem, 8, 1).expect("valid bounds");
//! let config = XnesConfigBuilder::new()
//!     .gen(200)
//!     .sigma0(0.3)
//!     .build()
//!     .expect("valid config");
//! let mut algo = Xnes::new_with_seed(config, 42).expect("valid config");
//! algo.evolve(&mut pop).expect("unconstrained single-objective problem");
//! let (_x, f) = pop.champion().expect("non-empty population");
//! assert!(f < 1e-3);
//! ```

// Layout: `config`, `weights` and `distribution` hold what the algorithm knows
// before a generation; `sampling` and `update` are one generation; `log` holds
// what is observed about it; `xnes` drives the loop.

pub mod config;
pub mod distribution;
pub mod error;
pub mod ffi;
pub mod log;
pub mod population;
pub mod problem;
pub mod sampling;
pub mod update;
pub mod weights;
pub mod xnes;

pub use config::{LearningRate, XnesConfig, XnesConfigBuilder};
pub use distribution::SearchDistribution;
pub use error::{Result, XnesError};
pub use log::{LogLine, StopReason};
pub use nalgebra::{DMatrix, DVector};
pub use population::Population;
pub use problem::{FnProblem, Problem};
pub use weights::utility_weights;
pub use xnes::Xnes;

/// Minimize `objective` inside `[lb, ub]` from a uniformly drawn population.
///
/// Returns the best decision vector of the final population, its fitness, and
/// the algorithm (whose distribution and log can be inspected or reused).
pub fn minimize<F>(
    lb: Vec<f64>,
    ub: Vec<f64>,
    pop_size: usize,
    config: XnesConfig,
    seed: u64,
    objective: F,
) -> Result<(Vec<f64>, f64, Xnes)>
where
    F: Fn(&[f64]) -> f64,
{
    let mut pop = Population::random(FnProblem::new(lb, ub, objective), pop_size, seed)?;
    let mut algo = Xnes::new_with_seed(config, seed)?;
    algo.evolve(&mut pop)?;
    let best = pop.best_idx();
    Ok((pop.get_x()[best].clone(), pop.get_f()[best][0], algo))
}

/// Helpers for deterministic runs from integration tests and benchmarks.
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils {
    use super::{Population, Xnes, XnesConfigBuilder};
    use crate::problem::FnProblem;

    pub fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    /// Axis-aligned ellipsoid with condition number `1e6`.
    pub fn ellipsoid(x: &[f64]) -> f64 {
        let n = x.len();
        if n < 2 {
            return sphere(x);
        }
        x.iter()
            .enumerate()
            .map(|(i, v)| 10f64.powf(6.0 * (i as f64) / ((n - 1) as f64)) * v * v)
            .sum()
    }

    pub fn rosenbrock(x: &[f64]) -> f64 {
        x.windows(2)
            .map(|w| 100.0 * (w[0] * w[0] - w[1]).powi(2) + (w[0] - 1.0).powi(2))
            .sum()
    }

    pub fn rastrigin(x: &[f64]) -> f64 {
        let n = x.len() as f64;
        10.0 * n
            + x.iter()
                .map(|v| v * v - 10.0 * (2.0 * std::f64::consts::PI * v).cos())
                .sum::<f64>()
    }

    pub fn ackley(x: &[f64]) -> f64 {
        let n = x.len() as f64;
        let sum_sq = x.iter().map(|v| v * v).sum::<f64>();
        let sum_cos = x
            .iter()
            .map(|v| (2.0 * std::f64::consts::PI * v).cos())
            .sum::<f64>();
        -20.0 * (-0.2 * (sum_sq / n).sqrt()).exp() - (sum_cos / n).exp()
            + 20.0
            + std::f64::consts::E
    }

    /// Seeded run on the box `[lb, ub]^dim` with `sigma0 = 0.3`; returns the
    /// best fitness of the final population.
    pub fn run_seeded(
        dim: usize,
        lb: f64,
        ub: f64,
        pop_size: usize,
        gen: u32,
        seed: u64,
        objective: impl Fn(&[f64]) -> f64,
    ) -> f64 {
        let problem = FnProblem::new(vec![lb; dim], vec![ub; dim], objective);
        let mut pop = Population::random(problem, pop_size, seed).expect("valid box");
        let config = XnesConfigBuilder::new()
            .gen(gen)
            .sigma0(0.3)
            .ftol(1e-14)
            .xtol(1e-14)
            .build()
            .expect("valid config");
        let mut algo = Xnes::new_with_seed(config, seed).expect("valid config");
        algo.evolve(&mut pop).expect("valid population");
        let best = pop.best_idx();
        pop.get_f()[best][0]
    }

    /// Independent seeded runs evaluated in parallel; returns the best result.
    #[cfg(feature = "test_utils")]
    pub fn run_multiseed(
        dim: usize,
        lb: f64,
        ub: f64,
        pop_size: usize,
        gen: u32,
        seeds: &[u64],
        objective: &(dyn Fn(&[f64]) -> f64 + Sync),
    ) -> f64 {
        use rayon::prelude::*;

        seeds
            .par_iter()
            .map(|&seed| run_seeded(dim, lb, ub, pop_size, gen, seed, objective))
            .reduce(|| f64::INFINITY, f64::min)
    }
}

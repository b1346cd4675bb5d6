//! Per-generation log lines, population flatness and the stopping checks.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::population::Population;
use crate::problem::Problem;

/// Convergence checks run on generations that are multiples of this.
pub const CHECK_PERIOD: u32 = 10;

/// One line of the algorithm log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    /// Generation number, starting at 1.
    pub gen: u32,
    /// Fitness evaluations used since the start of the call.
    pub fevals: u64,
    /// Best fitness seen so far in the call, not the best of the current
    /// population, so it never increases along the log.
    pub best: f64,
    /// Length of the transformed noise `A z` of the first sample.
    pub dx: f64,
    /// Fitness gap between the best and worst individual.
    pub df: f64,
    /// Current global step size.
    pub sigma: f64,
}

impl LogLine {
    /// `(gen, fevals, best, dx, df, sigma)`
    pub fn to_tuple(&self) -> (u32, u64, f64, f64, f64, f64) {
        (self.gen, self.fevals, self.best, self.dx, self.df, self.sigma)
    }
}

/// Why an `evolve` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StopReason {
    /// The generation budget was used up (or was zero).
    Generations(u32),
    /// `‖A z_0‖` fell below `xtol`.
    Xtol(f64),
    /// The best/worst fitness gap fell below `ftol`.
    Ftol(f64),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Generations(g) => write!(f, "generations = {g}"),
            StopReason::Xtol(t) => write!(f, "xtol < {t}"),
            StopReason::Ftol(t) => write!(f, "ftol < {t}"),
        }
    }
}

/// Flatness of the current generation in decision and fitness space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flatness {
    pub dx: f64,
    pub df: f64,
}

impl Flatness {
    /// `dx` is the norm of `A z_0` (the first sample only, not the best one);
    /// `df` is `|f_best - f_worst|` over the population.
    pub fn measure<P: Problem>(a: &DMatrix<f64>, z0: &DVector<f64>, pop: &Population<P>) -> Self {
        let dx = (a * z0).norm();
        let fs = pop.get_f();
        let df = (fs[pop.best_idx()][0] - fs[pop.worst_idx()][0]).abs();
        Self { dx, df }
    }

    /// Stopping check, only active on every `CHECK_PERIOD`-th generation.
    /// `xtol` is tested before `ftol`.
    pub fn stop_reason(&self, gen: u32, xtol: f64, ftol: f64) -> Option<StopReason> {
        if gen % CHECK_PERIOD != 0 {
            return None;
        }
        if self.dx < xtol {
            return Some(StopReason::Xtol(xtol));
        }
        if self.df < ftol {
            return Some(StopReason::Ftol(ftol));
        }
        None
    }
}

/// Whether generation `gen` gets a log line at verbosity `level`.
pub fn should_log(gen: u32, level: u32) -> bool {
    level > 0 && (level == 1 || gen % level == 1)
}

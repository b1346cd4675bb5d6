//! The adapted search distribution `N(mean, A Aᵗ)` and its reset/retain policy.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::config::LearningRate;

/// Mean, covariance transform and global step size of the search distribution.
///
/// Owned by one [`Xnes`](crate::Xnes) instance and only mutated inside `evolve`.
/// A freshly constructed distribution is empty (dimension 0), so the first
/// `evolve` call always initializes it from the problem at hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDistribution {
    pub(crate) mean: DVector<f64>,
    pub(crate) a: DMatrix<f64>,
    pub(crate) sigma: f64,
}

impl SearchDistribution {
    pub(crate) fn empty(sigma0: LearningRate) -> Self {
        Self {
            mean: DVector::zeros(0),
            a: DMatrix::zeros(0, 0),
            sigma: sigma0.resolve(1.0),
        }
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Covariance transform: samples are `mean + A z` with `z ~ N(0, I)`.
    pub fn transform(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Reinitializes the distribution unless `memory` is set and the stored
    /// dimension matches `best_x`. Returns `true` when it reinitialized.
    ///
    /// On reset the mean is the best individual, `sigma` is `sigma0` (or 1 when
    /// automatic) and `A` is diagonal with entries `max(ub - lb, 1e-6) * sigma`.
    pub(crate) fn reset_or_retain(
        &mut self,
        lb: &[f64],
        ub: &[f64],
        best_x: &[f64],
        sigma0: LearningRate,
        memory: bool,
    ) -> bool {
        let dim = best_x.len();
        if memory && self.mean.len() == dim {
            return false;
        }
        self.sigma = sigma0.resolve(1.0);
        let sigma = self.sigma;
        let diag = DVector::from_iterator(
            dim,
            lb.iter().zip(ub).map(|(&l, &u)| (u - l).max(1e-6) * sigma),
        );
        self.a = DMatrix::from_diagonal(&diag);
        self.mean = DVector::from_column_slice(best_x);
        true
    }
}

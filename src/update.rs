//! Natural-gradient update of mean, transform and step size.

use nalgebra::{DMatrix, DVector};

use crate::distribution::SearchDistribution;

/// Learning rates in effect for one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    pub eta_mu: f64,
    pub eta_sigma: f64,
    pub eta_b: f64,
}

/// Gradients of one generation in natural coordinates.
#[derive(Debug, Clone)]
pub struct NaturalGradient {
    /// `Σ u_i z_i`
    pub d_center: DVector<f64>,
    /// Traceless part of `Σ u_i (z_i z_iᵗ - I)`
    pub cov_grad: DMatrix<f64>,
    /// Trace of `Σ u_i (z_i z_iᵗ - I)`
    pub trace: f64,
}

impl NaturalGradient {
    /// Builds the gradient from noise vectors ordered best first, paired with
    /// utilities in the same order.
    pub fn from_ranked(ranked_z: &[&DVector<f64>], weights: &[f64], n: usize) -> Self {
        let identity = DMatrix::<f64>::identity(n, n);
        let mut d_center = DVector::zeros(n);
        let mut cov_grad = DMatrix::zeros(n, n);
        for (&z, &u) in ranked_z.iter().zip(weights) {
            d_center.axpy(u, z, 1.0);
            cov_grad += (z * z.transpose() - &identity) * u;
        }
        let trace = cov_grad.trace();
        cov_grad -= &identity * (trace / n as f64);
        Self {
            d_center,
            cov_grad,
            trace,
        }
    }

    /// Log-space step of the transform:
    /// `0.5 * (eta_sigma * trace/n * I + eta_b * cov_grad)`.
    pub fn log_step(&self, rates: Rates) -> DMatrix<f64> {
        let n = self.cov_grad.nrows();
        let iso = rates.eta_sigma * self.trace / n as f64;
        (DMatrix::<f64>::identity(n, n) * iso + &self.cov_grad * rates.eta_b) * 0.5
    }
}

/// Advances the distribution by one natural-gradient step and returns the
/// gradient that was applied.
///
/// `mean += eta_mu * A d_center`, `A = A expm(d_A)` and
/// `sigma *= exp(eta_sigma / 2 * trace / n)`. `sigma` is kept for reporting
/// only; it does not rescale `A`.
pub fn natural_gradient_step(
    dist: &mut SearchDistribution,
    ranked_z: &[&DVector<f64>],
    weights: &[f64],
    rates: Rates,
) -> NaturalGradient {
    let n = dist.mean.len();
    let grad = NaturalGradient::from_ranked(ranked_z, weights, n);
    let d_a = grad.log_step(rates);
    let shift = &dist.a * &grad.d_center * rates.eta_mu;
    dist.mean += shift;
    dist.a = &dist.a * d_a.exp();
    dist.sigma *= (rates.eta_sigma / 2.0 * grad.trace / n as f64).exp();
    grad
}

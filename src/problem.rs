//! The optimization problem seen by the algorithm.

use std::fmt;

/// A box-bounded optimization problem.
///
/// Only `bounds` and `fitness` are required. The defaults describe an
/// unconstrained, single-objective, deterministic problem, which is the only
/// shape xNES accepts; the introspection methods exist so that callers can hand
/// in richer problems and get a clear error back.
pub trait Problem {
    /// Lower and upper bounds, both of length equal to the dimension.
    fn bounds(&self) -> (Vec<f64>, Vec<f64>);

    /// Fitness vector of a decision vector (objectives followed by constraints).
    fn fitness(&self, x: &[f64]) -> Vec<f64>;

    fn dimension(&self) -> usize {
        self.bounds().0.len()
    }

    /// Number of objectives.
    fn nobj(&self) -> usize {
        1
    }

    /// Number of nonlinear constraints.
    fn nc(&self) -> usize {
        0
    }

    fn is_stochastic(&self) -> bool {
        false
    }

    /// Reseeds a stochastic problem. No-op for deterministic problems.
    fn set_seed(&mut self, _seed: u64) {}

    fn name(&self) -> String {
        "unnamed problem".to_string()
    }
}

/// Adapts a plain closure and a box into a [`Problem`].
#[derive(Clone)]
pub struct FnProblem<F> {
    lb: Vec<f64>,
    ub: Vec<f64>,
    objective: F,
}

impl<F> FnProblem<F>
where
    F: Fn(&[f64]) -> f64,
{
    pub fn new(lb: Vec<f64>, ub: Vec<f64>, objective: F) -> Self {
        Self { lb, ub, objective }
    }
}

impl<F> fmt::Debug for FnProblem<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProblem")
            .field("lb", &self.lb)
            .field("ub", &self.ub)
            .finish_non_exhaustive()
    }
}

impl<F> Problem for FnProblem<F>
where
    F: Fn(&[f64]) -> f64,
{
    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (self.lb.clone(), self.ub.clone())
    }

    fn fitness(&self, x: &[f64]) -> Vec<f64> {
        vec![(self.objective)(x)]
    }

    fn dimension(&self) -> usize {
        self.lb.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_problem_defaults() {
        let p = FnProblem::new(vec![-1.0; 3], vec![1.0; 3], |x: &[f64]| x.iter().sum());
        assert_eq!(p.dimension(), 3);
        assert_eq!(p.nobj(), 1);
        assert_eq!(p.nc(), 0);
        assert!(!p.is_stochastic());
        assert_eq!(p.fitness(&[0.5, 0.25, 0.25]), vec![1.0]);
        assert_eq!(p.name(), "unnamed problem");
    }

    #[test]
    fn debug_shows_the_box_of_any_closure() {
        let offset = 2.0;
        let p = FnProblem::new(vec![-1.0], vec![3.0], move |x: &[f64]| x[0] + offset);
        let text = format!("{p:?}");
        assert!(text.starts_with("FnProblem"), "{text}");
        assert!(text.contains("lb: [-1.0]") && text.contains("ub: [3.0]"), "{text}");
    }
}

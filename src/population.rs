//! Population container: decision vectors, their fitness, and an evaluation counter.

use std::cmp::Ordering;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Result, XnesError};
use crate::problem::Problem;

/// Orders fitness values ascending with NaN last.
pub(crate) fn cmp_fitness(a: f64, b: f64) -> Ordering {
    match (a.partial_cmp(&b), a.is_nan(), b.is_nan()) {
        (Some(ord), false, false) => ord,
        (_, true, false) => Ordering::Greater,
        (_, false, true) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// A set of individuals of one problem.
///
/// Every decision vector written through [`Population::push`] or
/// [`Population::set_x`] is evaluated immediately and counted in
/// [`Population::fevals`].
#[derive(Debug, Clone)]
pub struct Population<P> {
    problem: P,
    xs: Vec<Vec<f64>>,
    fs: Vec<Vec<f64>>,
    fevals: u64,
}

impl<P: Problem> Population<P> {
    /// Empty population. Fails if the problem bounds are inconsistent.
    pub fn new(problem: P) -> Result<Self> {
        check_bounds(&problem)?;
        Ok(Self {
            problem,
            xs: Vec::new(),
            fs: Vec::new(),
            fevals: 0,
        })
    }

    /// `size` individuals drawn uniformly inside the bounds.
    pub fn random(problem: P, size: usize, seed: u64) -> Result<Self> {
        let mut pop = Self::new(problem)?;
        let (lb, ub) = pop.problem.bounds();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for _ in 0..size {
            let x: Vec<f64> = lb
                .iter()
                .zip(&ub)
                .map(|(&l, &u)| l + rng.gen::<f64>() * (u - l))
                .collect();
            pop.push_unchecked(x);
        }
        Ok(pop)
    }

    /// Population made of the given decision vectors.
    pub fn from_decisions(problem: P, xs: Vec<Vec<f64>>) -> Result<Self> {
        let mut pop = Self::new(problem)?;
        for x in xs {
            pop.push(x)?;
        }
        Ok(pop)
    }

    /// Appends and evaluates a decision vector.
    pub fn push(&mut self, x: Vec<f64>) -> Result<()> {
        self.check_len(&x)?;
        self.push_unchecked(x);
        Ok(())
    }

    /// Overwrites the decision vector of individual `i` and re-evaluates it.
    ///
    /// # Panics
    /// If `i` is out of range.
    pub fn set_x(&mut self, i: usize, x: Vec<f64>) -> Result<()> {
        self.check_len(&x)?;
        self.replace_x(i, x);
        Ok(())
    }

    pub(crate) fn replace_x(&mut self, i: usize, x: Vec<f64>) {
        self.fs[i] = self.evaluate(&x);
        self.xs[i] = x;
    }

    fn push_unchecked(&mut self, x: Vec<f64>) {
        let f = self.evaluate(&x);
        self.xs.push(x);
        self.fs.push(f);
    }

    fn evaluate(&mut self, x: &[f64]) -> Vec<f64> {
        self.fevals += 1;
        self.problem.fitness(x)
    }

    fn check_len(&self, x: &[f64]) -> Result<()> {
        let expected = self.problem.dimension();
        if x.len() != expected {
            return Err(XnesError::DimensionMismatch {
                expected,
                got: x.len(),
            });
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn get_x(&self) -> &[Vec<f64>] {
        &self.xs
    }

    pub fn get_f(&self) -> &[Vec<f64>] {
        &self.fs
    }

    /// Total number of fitness evaluations made through this population.
    pub fn fevals(&self) -> u64 {
        self.fevals
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn problem_mut(&mut self) -> &mut P {
        &mut self.problem
    }

    /// Index of the individual with the lowest first objective.
    ///
    /// # Panics
    /// If the population is empty.
    pub fn best_idx(&self) -> usize {
        (0..self.fs.len())
            .min_by(|&a, &b| cmp_fitness(self.fs[a][0], self.fs[b][0]))
            .expect("best_idx called on an empty population")
    }

    /// Index of the individual with the highest first objective.
    ///
    /// # Panics
    /// If the population is empty.
    pub fn worst_idx(&self) -> usize {
        (0..self.fs.len())
            .max_by(|&a, &b| cmp_fitness(self.fs[a][0], self.fs[b][0]))
            .expect("worst_idx called on an empty population")
    }

    /// Best decision vector and its first objective, if any individual exists.
    pub fn champion(&self) -> Option<(&[f64], f64)> {
        if self.is_empty() {
            return None;
        }
        let i = self.best_idx();
        Some((self.xs[i].as_slice(), self.fs[i][0]))
    }
}

fn check_bounds<P: Problem>(problem: &P) -> Result<()> {
    let (lb, ub) = problem.bounds();
    if lb.len() != ub.len() {
        return Err(XnesError::BoundsMismatch {
            lower_len: lb.len(),
            upper_len: ub.len(),
        });
    }
    for (index, (&lower, &upper)) in lb.iter().zip(&ub).enumerate() {
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            return Err(XnesError::InvalidBounds {
                index,
                lower,
                upper,
            });
        }
    }
    Ok(())
}

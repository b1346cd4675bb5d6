//! The xNES algorithm object and its `evolve` loop.

use std::fmt;

use nalgebra::DVector;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{XnesConfig, XnesParameters};
use crate::distribution::SearchDistribution;
use crate::error::{Result, XnesError};
use crate::log::{should_log, Flatness, LogLine, StopReason};
use crate::population::{cmp_fitness, Population};
use crate::problem::Problem;
use crate::sampling::sample_generation;
use crate::update::{natural_gradient_step, Rates};

/// Smallest population xNES accepts.
pub const MIN_POPULATION: usize = 5;

/// Exponential Natural Evolution Strategies.
///
/// Each call to [`Xnes::evolve`] replaces the whole population with samples of
/// an adapted Gaussian `N(mean, A Aᵗ)` once per generation and moves the
/// distribution along the natural gradient of the expected rank-based utility.
/// Decision vectors drawn outside the box are repaired coordinate-wise with a
/// uniform draw. The algorithm is not elitist.
///
/// The instance owns its random engine and its distribution; with
/// `memory = true` the distribution carries over to the next call as long as
/// the problem dimension stays the same. `evolve` takes `&mut self`, so an
/// instance can serve one call at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Xnes {
    config: XnesConfig,
    distribution: SearchDistribution,
    rng: ChaCha8Rng,
    seed: u64,
    verbosity: u32,
    log: Vec<LogLine>,
}

impl Xnes {
    /// Seeds the random engine from entropy.
    pub fn new(config: XnesConfig) -> Result<Self> {
        Self::new_with_seed(config, rand::random())
    }

    pub fn new_with_seed(config: XnesConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            distribution: SearchDistribution::empty(config.sigma0),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            verbosity: 0,
            log: Vec::new(),
        })
    }

    /// Evolves `pop` for at most `gen` generations.
    ///
    /// Fails, without touching `pop` or `self`, if the problem is constrained or
    /// multi-objective or if the population has fewer than five individuals.
    /// A budget of zero generations leaves the population as it is.
    pub fn evolve<P: Problem>(&mut self, pop: &mut Population<P>) -> Result<StopReason> {
        let prob = pop.problem();
        if prob.nc() != 0 {
            return Err(XnesError::ConstrainedProblem { nc: prob.nc() });
        }
        if prob.nobj() != 1 {
            return Err(XnesError::MultiObjective { nf: prob.nobj() });
        }
        let lam = pop.size();
        if lam < MIN_POPULATION {
            return Err(XnesError::PopulationTooSmall { size: lam });
        }

        self.log.clear();
        if self.config.gen == 0 {
            return Ok(StopReason::Generations(0));
        }

        let dim = prob.dimension();
        let (lb, ub) = prob.bounds();
        let fevals0 = pop.fevals();
        let params = XnesParameters::new(dim, lam, &self.config);
        let rates = Rates {
            eta_mu: params.eta_mu,
            eta_sigma: params.eta_sigma,
            eta_b: params.eta_b,
        };

        let reset = self.distribution.reset_or_retain(
            &lb,
            &ub,
            &pop.get_x()[pop.best_idx()],
            self.config.sigma0,
            self.config.memory,
        );
        if self.verbosity > 0 {
            info!(
                problem = %pop.problem().name(),
                dimension = params.dimension,
                lam = params.lam,
                eta_mu = rates.eta_mu,
                eta_sigma = rates.eta_sigma,
                eta_b = rates.eta_b,
                sigma = self.distribution.sigma,
                reset,
                utilities = ?params.weights,
                "xNES started"
            );
        }

        let mut best_so_far = f64::INFINITY;
        for gen in 1..=self.config.gen {
            if pop.problem().is_stochastic() {
                let s: u64 = self.rng.gen();
                pop.problem_mut().set_seed(s);
            }

            let generation = sample_generation(
                &self.distribution.mean,
                &self.distribution.a,
                &lb,
                &ub,
                params.lam,
                &mut self.rng,
            );
            for (i, x) in generation.x.iter().enumerate() {
                pop.replace_x(i, x.as_slice().to_vec());
            }

            let flat = Flatness::measure(&self.distribution.a, &generation.z[0], pop);
            let current_best = pop.get_f()[pop.best_idx()][0];
            if cmp_fitness(current_best, best_so_far).is_lt() {
                best_so_far = current_best;
            }

            if should_log(gen, self.verbosity) {
                let line = LogLine {
                    gen,
                    fevals: pop.fevals() - fevals0,
                    best: best_so_far,
                    dx: flat.dx,
                    df: flat.df,
                    sigma: self.distribution.sigma,
                };
                info!(
                    gen,
                    fevals = line.fevals,
                    best = line.best,
                    dx = line.dx,
                    df = line.df,
                    sigma = line.sigma,
                    "xNES generation"
                );
                self.log.push(line);
            }

            if let Some(reason) = flat.stop_reason(gen, self.config.xtol, self.config.ftol) {
                if self.verbosity > 0 {
                    info!(gen, "Exit condition -- {reason}");
                }
                return Ok(reason);
            }

            let fs = pop.get_f();
            let mut idx: Vec<usize> = (0..lam).collect();
            idx.sort_by(|&i, &j| cmp_fitness(fs[i][0], fs[j][0]));
            let ranked: Vec<&DVector<f64>> = idx.iter().map(|&i| &generation.z[i]).collect();
            let grad = natural_gradient_step(&mut self.distribution, &ranked, &params.weights, rates);
            debug!(
                gen,
                trace = grad.trace,
                sigma = self.distribution.sigma,
                "distribution updated"
            );
        }

        let reason = StopReason::Generations(self.config.gen);
        if self.verbosity > 0 {
            info!("Exit condition -- {reason}");
        }
        Ok(reason)
    }

    pub fn name(&self) -> &'static str {
        "xNES: Exponential Natural Evolution Strategies"
    }

    pub fn config(&self) -> &XnesConfig {
        &self.config
    }

    /// Generations per `evolve` call.
    pub fn gen(&self) -> u32 {
        self.config.gen
    }

    /// Current search distribution (empty before the first `evolve`).
    pub fn distribution(&self) -> &SearchDistribution {
        &self.distribution
    }

    /// Reseeds the random engine.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.seed = seed;
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 0 keeps quiet; `n > 0` records (and traces) a log line every `n`
    /// generations.
    pub fn set_verbosity(&mut self, level: u32) {
        self.verbosity = level;
    }

    pub fn verbosity(&self) -> u32 {
        self.verbosity
    }

    /// Log of the last `evolve` call.
    pub fn log(&self) -> &[LogLine] {
        &self.log
    }

    /// Serializes configuration, distribution, random engine and log.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for Xnes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        writeln!(f, "{}", self.name())?;
        writeln!(f, "\tGenerations: {}", c.gen)?;
        writeln!(f, "\teta_mu: {}", c.eta_mu)?;
        writeln!(f, "\teta_sigma: {}", c.eta_sigma)?;
        writeln!(f, "\teta_b: {}", c.eta_b)?;
        writeln!(f, "\tsigma0: {}", c.sigma0)?;
        writeln!(f, "\tStopping xtol: {}", c.xtol)?;
        writeln!(f, "\tStopping ftol: {}", c.ftol)?;
        writeln!(f, "\tMemory: {}", c.memory)?;
        writeln!(f, "\tVerbosity: {}", self.verbosity)?;
        write!(f, "\tSeed: {}", self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LearningRate, XnesConfigBuilder};
    use crate::problem::FnProblem;

    type Objective = fn(&[f64]) -> f64;

    fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    fn sphere_pop(size: usize, seed: u64) -> Population<FnProblem<Objective>> {
        let p = FnProblem::new(vec![-5.0; 2], vec![5.0; 2], sphere as Objective);
        Population::random(p, size, seed).unwrap()
    }

    fn xnes(gen: u32, memory: bool, seed: u64) -> Xnes {
        let cfg = XnesConfigBuilder::new()
            .gen(gen)
            .memory(memory)
            .build()
            .unwrap();
        Xnes::new_with_seed(cfg, seed).unwrap()
    }

    struct Shaped {
        nobj: usize,
        nc: usize,
    }

    impl Problem for Shaped {
        fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![-1.0; 2], vec![1.0; 2])
        }
        fn fitness(&self, x: &[f64]) -> Vec<f64> {
            vec![x[0]; self.nobj + self.nc]
        }
        fn nobj(&self) -> usize {
            self.nobj
        }
        fn nc(&self) -> usize {
            self.nc
        }
    }

    #[derive(Default)]
    struct Noisy {
        seeds: Vec<u64>,
    }

    impl Problem for Noisy {
        fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![-1.0; 3], vec![1.0; 3])
        }
        fn fitness(&self, x: &[f64]) -> Vec<f64> {
            vec![sphere(x) + self.seeds.len() as f64 * 1e-3]
        }
        fn is_stochastic(&self) -> bool {
            true
        }
        fn set_seed(&mut self, seed: u64) {
            self.seeds.push(seed);
        }
        fn name(&self) -> String {
            "noisy 3-d sphere".to_string()
        }
    }

    fn snapshot<P: Problem>(pop: &Population<P>) -> (Vec<Vec<f64>>, Vec<Vec<f64>>, u64) {
        (pop.get_x().to_vec(), pop.get_f().to_vec(), pop.fevals())
    }

    #[test]
    fn zero_generations_is_a_no_op() {
        let mut pop = sphere_pop(10, 1);
        let before = snapshot(&pop);
        let mut algo = xnes(0, false, 3);
        assert_eq!(algo.evolve(&mut pop).unwrap(), StopReason::Generations(0));
        assert_eq!(snapshot(&pop), before);
        assert_eq!(algo.distribution().dimension(), 0);
    }

    #[test]
    fn constrained_and_multi_objective_are_rejected() {
        let mut algo = xnes(5, false, 3);
        for (nobj, nc) in [(1, 1), (2, 0), (0, 0)] {
            let mut pop = Population::random(Shaped { nobj, nc }, 8, 0).unwrap();
            let before = snapshot(&pop);
            let err = algo.evolve(&mut pop).unwrap_err();
            assert!(err.is_precondition_error(), "{err}");
            assert_eq!(snapshot(&pop), before);
        }
        assert_eq!(algo.distribution().dimension(), 0);
    }

    #[test]
    fn population_of_four_is_rejected_five_is_accepted() {
        // the documented minimum is five individuals, four is the boundary
        let mut algo = xnes(3, false, 3);
        let mut small = sphere_pop(4, 1);
        let before = snapshot(&small);
        assert_eq!(
            algo.evolve(&mut small).unwrap_err(),
            XnesError::PopulationTooSmall { size: 4 }
        );
        assert_eq!(snapshot(&small), before);

        let mut ok = sphere_pop(5, 1);
        assert!(algo.evolve(&mut ok).is_ok());
    }

    #[test]
    fn population_is_replaced_inside_the_box() {
        let mut pop = sphere_pop(8, 4);
        let mut algo = xnes(7, false, 11);
        algo.evolve(&mut pop).unwrap();
        assert_eq!(pop.size(), 8);
        assert_eq!(pop.fevals(), 8 + 7 * 8);
        for x in pop.get_x() {
            assert!(x.iter().all(|v| (-5.0..=5.0).contains(v)));
        }
    }

    #[test]
    fn same_seed_same_run() {
        let mut p1 = sphere_pop(8, 4);
        let mut p2 = sphere_pop(8, 4);
        let mut a1 = xnes(20, false, 77);
        let mut a2 = xnes(20, false, 77);
        a1.evolve(&mut p1).unwrap();
        a2.evolve(&mut p2).unwrap();
        assert_eq!(p1.get_x(), p2.get_x());
        assert_eq!(a1.distribution(), a2.distribution());
    }

    #[test]
    fn memory_continues_the_distribution() {
        // with memory, two calls of five generations follow the same path as one
        // call of ten: sampling only depends on the distribution and the engine
        let mut split_pop = sphere_pop(8, 4);
        let mut split = xnes(5, true, 21);
        split.evolve(&mut split_pop).unwrap();
        let after_first = split.distribution().clone();
        split.evolve(&mut split_pop).unwrap();
        assert_ne!(split.distribution(), &after_first);

        let mut whole_pop = sphere_pop(8, 4);
        let mut whole = xnes(10, true, 21);
        assert_eq!(
            whole.evolve(&mut whole_pop).unwrap(),
            StopReason::Generations(10)
        );
        assert_eq!(split.distribution(), whole.distribution());
        assert_eq!(split_pop.get_x(), whole_pop.get_x());
    }

    #[test]
    fn no_memory_reinitializes_each_call() {
        let mut pop = sphere_pop(8, 4);
        let mut algo = xnes(1, false, 5);
        algo.evolve(&mut pop).unwrap();
        algo.distribution.sigma = 1e6;
        algo.evolve(&mut pop).unwrap();
        assert!(algo.distribution().sigma() < 1e3);

        let mut keep = xnes(1, true, 5);
        let mut pop = sphere_pop(8, 4);
        keep.evolve(&mut pop).unwrap();
        keep.distribution.sigma = 1e6;
        keep.evolve(&mut pop).unwrap();
        assert!(keep.distribution().sigma() > 1e3);
    }

    #[test]
    fn memory_resets_on_dimension_change() {
        let mut algo = xnes(3, true, 5);
        let mut pop2 = sphere_pop(8, 4);
        algo.evolve(&mut pop2).unwrap();
        assert_eq!(algo.distribution().dimension(), 2);

        let p3 = FnProblem::new(vec![-1.0; 3], vec![1.0; 3], sphere as Objective);
        let mut pop3 = Population::random(p3, 8, 4).unwrap();
        algo.evolve(&mut pop3).unwrap();
        assert_eq!(algo.distribution().dimension(), 3);
        assert_eq!(algo.distribution().transform().nrows(), 3);
    }

    #[test]
    fn fixed_mean_rate_is_honored() {
        let cfg = XnesConfigBuilder::new()
            .gen(1)
            .eta_mu(1e-12)
            .build()
            .unwrap();
        let mut algo = Xnes::new_with_seed(cfg, 9).unwrap();
        let mut pop = sphere_pop(8, 4);
        let start = pop.get_x()[pop.best_idx()].clone();
        algo.evolve(&mut pop).unwrap();
        for (m, s) in algo.distribution().mean().iter().zip(&start) {
            assert!((m - s).abs() < 1e-9);
        }
    }

    #[test]
    fn sigma0_scales_initial_transform() {
        let cfg = XnesConfigBuilder::new()
            .gen(1)
            .eta_sigma(1e-12)
            .eta_b(1e-12)
            .sigma0(0.1)
            .build()
            .unwrap();
        let mut algo = Xnes::new_with_seed(cfg, 9).unwrap();
        let mut pop = sphere_pop(8, 4);
        algo.evolve(&mut pop).unwrap();
        assert!((algo.distribution().sigma() - 0.1).abs() < 1e-9);
        assert!((algo.distribution().transform()[(0, 0)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_problem_is_reseeded_every_generation() {
        let cfg = XnesConfigBuilder::new().gen(6).build().unwrap();
        let mut a1 = Xnes::new_with_seed(cfg.clone(), 13).unwrap();
        let mut a2 = Xnes::new_with_seed(cfg, 13).unwrap();
        let mut p1 = Population::random(Noisy::default(), 6, 0).unwrap();
        let mut p2 = Population::random(Noisy::default(), 6, 0).unwrap();
        a1.evolve(&mut p1).unwrap();
        a2.evolve(&mut p2).unwrap();
        assert_eq!(p1.problem().seeds.len(), 6);
        assert_eq!(p1.problem().seeds, p2.problem().seeds);
    }

    #[test]
    fn verbose_header_names_the_problem() {
        let mut pop = Population::random(Noisy::default(), 6, 0).unwrap();
        let mut algo = xnes(3, false, 13);
        algo.set_verbosity(1);
        assert_eq!(algo.evolve(&mut pop).unwrap(), StopReason::Generations(3));
        assert_eq!(pop.problem().name(), "noisy 3-d sphere");
        assert_eq!(algo.log().len(), 3);
    }

    #[test]
    fn log_is_cleared_every_call() {
        let mut pop = sphere_pop(8, 4);
        let mut algo = xnes(5, false, 1);
        algo.evolve(&mut pop).unwrap();
        assert!(algo.log().is_empty());

        algo.set_verbosity(1);
        algo.evolve(&mut pop).unwrap();
        assert_eq!(algo.log().len(), 5);
        algo.evolve(&mut pop).unwrap();
        assert_eq!(algo.log().len(), 5);
        let gens: Vec<u32> = algo.log().iter().map(|l| l.gen).collect();
        assert_eq!(gens, vec![1, 2, 3, 4, 5]);
        assert_eq!(algo.log()[4].fevals, 40);

        algo.set_verbosity(0);
        algo.evolve(&mut pop).unwrap();
        assert!(algo.log().is_empty());
    }

    #[test]
    fn verbosity_sets_log_cadence() {
        let mut pop = sphere_pop(8, 4);
        let mut algo = xnes(9, false, 1);
        algo.set_verbosity(4);
        algo.evolve(&mut pop).unwrap();
        let gens: Vec<u32> = algo.log().iter().map(|l| l.gen).collect();
        assert_eq!(gens, vec![1, 5, 9]);
    }

    #[test]
    fn flat_fitness_stops_at_tenth_generation() {
        let p = FnProblem::new(vec![-1.0; 2], vec![1.0; 2], (|_: &[f64]| 1.0) as Objective);
        let mut pop = Population::random(p, 6, 0).unwrap();
        let mut algo = xnes(100, false, 2);
        algo.set_verbosity(1);
        assert_eq!(algo.evolve(&mut pop).unwrap(), StopReason::Ftol(1e-6));
        assert_eq!(algo.log().len(), 10);
        assert_eq!(pop.fevals(), 6 + 10 * 6);
    }

    #[test]
    fn seed_accessors() {
        let mut algo = xnes(1, false, 5);
        assert_eq!(algo.seed(), 5);
        algo.set_seed(8);
        assert_eq!(algo.seed(), 8);
        let mut twin = xnes(1, false, 8);
        let mut p1 = sphere_pop(6, 0);
        let mut p2 = sphere_pop(6, 0);
        algo.evolve(&mut p1).unwrap();
        twin.evolve(&mut p2).unwrap();
        assert_eq!(p1.get_x(), p2.get_x());
    }

    #[test]
    fn invalid_hand_built_config_is_rejected() {
        let cfg = XnesConfig {
            eta_sigma: LearningRate::Fixed(1.5),
            ..XnesConfig::default()
        };
        assert!(Xnes::new_with_seed(cfg.clone(), 0).unwrap_err().is_config_error());
        assert!(matches!(
            Xnes::new(cfg).unwrap_err(),
            XnesError::InvalidParameter { name: "eta_sigma", .. }
        ));
        assert!(Xnes::new(XnesConfig::default()).is_ok());
    }

    #[test]
    fn summary_lists_configuration() {
        let cfg = XnesConfigBuilder::new().gen(12).eta_b(0.3).build().unwrap();
        let mut algo = Xnes::new_with_seed(cfg, 42).unwrap();
        algo.set_verbosity(2);
        let text = algo.to_string();
        assert!(text.starts_with("xNES: Exponential Natural Evolution Strategies"));
        assert!(text.contains("Generations: 12"));
        assert!(text.contains("eta_mu: auto"));
        assert!(text.contains("eta_b: 0.3"));
        assert!(text.contains("Verbosity: 2"));
        assert!(text.contains("Seed: 42"));
        assert_eq!(algo.gen(), 12);
    }

    #[test]
    fn json_round_trip_continues_the_run() {
        let mut pop = sphere_pop(8, 4);
        let mut algo = xnes(4, true, 31);
        algo.set_verbosity(1);
        algo.evolve(&mut pop).unwrap();

        let mut restored = Xnes::from_json(&algo.to_json().unwrap()).unwrap();
        assert_eq!(restored.distribution(), algo.distribution());
        assert_eq!(restored.log(), algo.log());
        assert_eq!(restored.verbosity(), 1);
        assert_eq!(restored.config(), algo.config());

        let mut pop_copy = pop.clone();
        algo.evolve(&mut pop).unwrap();
        restored.evolve(&mut pop_copy).unwrap();
        assert_eq!(pop.get_x(), pop_copy.get_x());
        assert_eq!(restored.distribution(), algo.distribution());
    }
}

//! Construction parameters for [`Xnes`](crate::Xnes).
//!
//! Learning rates and the initial scale are either a fixed value in `(0, 1]` or
//! [`LearningRate::Auto`], in which case they are derived from the problem
//! dimension at the start of each `evolve` call.

use serde::{Deserialize, Serialize};

use crate::error::{Result, XnesError};
use crate::weights::utility_weights;

/// A learning rate (or initial scale) that is either fixed or derived automatically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum LearningRate {
    /// Derive the value from dimension and population size.
    #[default]
    Auto,
    /// Use this value as given. Must be in `(0, 1]`.
    Fixed(f64),
}

impl LearningRate {
    /// Rejects fixed values outside `(0, 1]`. `Auto` always passes.
    pub fn validate(self, name: &'static str) -> Result<Self> {
        match self {
            LearningRate::Auto => Ok(self),
            LearningRate::Fixed(v) if v > 0.0 && v <= 1.0 => Ok(self),
            LearningRate::Fixed(value) => Err(XnesError::InvalidParameter { name, value }),
        }
    }

    /// The fixed value, or `default` when automatic.
    pub fn resolve(self, default: f64) -> f64 {
        match self {
            LearningRate::Auto => default,
            LearningRate::Fixed(v) => v,
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, LearningRate::Auto)
    }
}

impl From<f64> for LearningRate {
    fn from(v: f64) -> Self {
        LearningRate::Fixed(v)
    }
}

impl std::fmt::Display for LearningRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearningRate::Auto => write!(f, "auto"),
            LearningRate::Fixed(v) => write!(f, "{v}"),
        }
    }
}

/// Immutable xNES configuration. Build it with [`XnesConfigBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XnesConfig {
    /// Number of generations per `evolve` call.
    pub gen: u32,
    /// Learning rate of the mean.
    pub eta_mu: LearningRate,
    /// Learning rate of the global step size.
    pub eta_sigma: LearningRate,
    /// Learning rate of the covariance transform.
    pub eta_b: LearningRate,
    /// Initial search width as a fraction of the box width.
    pub sigma0: LearningRate,
    /// Stop when the fitness gap between best and worst falls below this.
    pub ftol: f64,
    /// Stop when the sampled step length falls below this.
    pub xtol: f64,
    /// Keep mean, transform and scale between `evolve` calls.
    pub memory: bool,
}

impl Default for XnesConfig {
    fn default() -> Self {
        Self {
            gen: 1,
            eta_mu: LearningRate::Auto,
            eta_sigma: LearningRate::Auto,
            eta_b: LearningRate::Auto,
            sigma0: LearningRate::Auto,
            ftol: 1e-6,
            xtol: 1e-6,
            memory: false,
        }
    }
}

impl XnesConfig {
    /// Checks the four rate/scale parameters.
    pub fn validate(&self) -> Result<()> {
        self.eta_mu.validate("eta_mu")?;
        self.eta_sigma.validate("eta_sigma")?;
        self.eta_b.validate("eta_b")?;
        self.sigma0.validate("sigma0")?;
        Ok(())
    }
}

/// Builder for [`XnesConfig`].
///
/// ```rust
/// use fastxnes::XnesConfigBuilder;
///
/// let config = XnesConfigBuilder::new()
///     .gen(200)
///     .eta_mu(0.8)
///     .memory(true)
///     .build()
///     .expect("valid config");
/// assert_eq!(config.gen, 200);
/// ```
#[derive(Debug, Clone, Default)]
pub struct XnesConfigBuilder {
    cfg: XnesConfig,
}

impl XnesConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn gen(mut self, gen: u32) -> Self {
        self.cfg.gen = gen;
        self
    }
    pub fn eta_mu(mut self, rate: impl Into<LearningRate>) -> Self {
        self.cfg.eta_mu = rate.into();
        self
    }
    pub fn eta_sigma(mut self, rate: impl Into<LearningRate>) -> Self {
        self.cfg.eta_sigma = rate.into();
        self
    }
    pub fn eta_b(mut self, rate: impl Into<LearningRate>) -> Self {
        self.cfg.eta_b = rate.into();
        self
    }
    pub fn sigma0(mut self, scale: impl Into<LearningRate>) -> Self {
        self.cfg.sigma0 = scale.into();
        self
    }
    pub fn ftol(mut self, ftol: f64) -> Self {
        self.cfg.ftol = ftol;
        self
    }
    pub fn xtol(mut self, xtol: f64) -> Self {
        self.cfg.xtol = xtol;
        self
    }
    pub fn memory(mut self, memory: bool) -> Self {
        self.cfg.memory = memory;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<XnesConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Per-call strategy parameters, resolved from the configuration, the problem
/// dimension and the population size.
#[derive(Debug, Clone)]
pub(crate) struct XnesParameters {
    pub dimension: usize,
    pub lam: usize,
    pub weights: Vec<f64>,
    pub eta_mu: f64,
    pub eta_sigma: f64,
    pub eta_b: f64,
}

impl XnesParameters {
    pub fn new(n: usize, lam: usize, cfg: &XnesConfig) -> Self {
        let n_f = n as f64;
        let common_default = 0.6 * (3.0 + n_f.ln()) / (n_f * n_f.sqrt());
        Self {
            dimension: n,
            lam,
            weights: utility_weights(lam),
            eta_mu: cfg.eta_mu.resolve(1.0),
            eta_sigma: cfg.eta_sigma.resolve(common_default),
            eta_b: cfg.eta_b.resolve(common_default),
        }
    }
}

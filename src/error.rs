//! Error types for the xNES optimizer.
//!
//! Construction problems (bad learning rates, bad bounds) surface as soon as the
//! offending value is seen. Problem-shape mismatches surface at the start of an
//! `evolve` call, before anything is mutated. Once the generation loop runs it
//! cannot fail.

use thiserror::Error;

/// Errors that can occur while configuring or running xNES.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XnesError {
    /// A learning rate or the initial scale is outside `(0, 1]`.
    #[error("{name} must be in ]0,1] or auto, a value of {value} was detected")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// The rejected value
        value: f64,
    },

    /// The problem declares nonlinear constraints.
    #[error("{nc} nonlinear constraints detected, xNES cannot deal with them")]
    ConstrainedProblem {
        /// Number of constraints reported by the problem
        nc: usize,
    },

    /// The problem has more (or fewer) than one objective.
    #[error("{nf} objectives detected, xNES needs exactly one")]
    MultiObjective {
        /// Number of objectives reported by the problem
        nf: usize,
    },

    /// Population has four or fewer individuals.
    #[error("xNES needs at least 5 individuals in the population, {size} detected")]
    PopulationTooSmall {
        /// The rejected population size
        size: usize,
    },

    /// Lower and upper bounds have different lengths.
    #[error("bounds mismatch: lower has {lower_len} elements, upper has {upper_len}")]
    BoundsMismatch {
        /// Length of the lower bounds vector
        lower_len: usize,
        /// Length of the upper bounds vector
        upper_len: usize,
    },

    /// A lower bound exceeds its upper bound, or one of them is not finite.
    #[error("invalid bounds at index {index}: lower ({lower}) > upper ({upper})")]
    InvalidBounds {
        /// Index of the invalid bound pair
        index: usize,
        /// The lower bound value
        lower: f64,
        /// The upper bound value
        upper: f64,
    },

    /// A decision vector does not match the problem dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Problem dimension
        expected: usize,
        /// Length of the supplied vector
        got: usize,
    },
}

/// A specialized `Result` type for xNES operations.
pub type Result<T> = std::result::Result<T, XnesError>;

impl XnesError {
    /// Returns `true` for errors raised while building the algorithm configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(self, XnesError::InvalidParameter { .. })
    }

    /// Returns `true` for problem/population shapes that `evolve` refuses.
    pub fn is_precondition_error(&self) -> bool {
        matches!(
            self,
            XnesError::ConstrainedProblem { .. }
                | XnesError::MultiObjective { .. }
                | XnesError::PopulationTooSmall { .. }
        )
    }

    /// Returns `true` if this is a bounds-related error.
    pub fn is_bounds_error(&self) -> bool {
        matches!(
            self,
            XnesError::BoundsMismatch { .. } | XnesError::InvalidBounds { .. }
        )
    }
}

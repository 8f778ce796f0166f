//! Interpolator design solver.
//!
//! The design alternates two steps until no further progress is possible:
//!
//! 1. [`optimizer`] poses a generalised eigenproblem $A v = \lambda B v$ from
//!    the current spectral weighting and takes the eigenvector of smallest
//!    $|\lambda|$ as the proposed interpolator.
//! 2. [`step`] line-searches between the previous and proposed interpolator,
//!    accepting only a strict decrease of the error computed by
//!    [`evaluator`].

pub mod eigen;
pub mod evaluator;
pub mod optimizer;
pub mod step;

pub use evaluator::KernelEvaluator;
pub use optimizer::InterpolatorOptimizer;
pub use step::select_step;

use thiserror::Error;

/// Errors that can occur during an interpolator design.
#[derive(Debug, Error)]
pub enum DesignError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Shape mismatch for {what}: expected length {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Oversampling factor must be odd for a well-defined central tile, got {0}")]
    EvenOversampling(usize),

    #[error("Ill-conditioned design: {quantity} denominator is {value:.3e} at frequency index {index}")]
    IllConditioned {
        quantity: &'static str,
        index: usize,
        value: f64,
    },

    #[error("Reference matrix B is singular or not finite")]
    SingularReference,

    #[error("Eigenvector entries sum to {sum:.3e}; cannot normalise")]
    DegenerateEigenvector { sum: f64 },

    #[error("Eigen-decomposition failed: {0}")]
    EigenFailure(String),
}

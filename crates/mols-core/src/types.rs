//! Core types shared across the MOLS design pipeline.
//!
//! This module defines the grid parameters, the per-candidate evaluation
//! artefacts, and the result container returned by [`crate::design`].

use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::solver::DesignError;

/// Grid geometry for a single design run.
///
/// All sizes are fixed for the duration of an optimisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridParams {
    /// Interpolator support width `J`, in coarse grid units.
    pub support: usize,
    /// Image (output) size `N`.
    pub image_size: usize,
    /// Oversampled image size `K`.
    pub oversampled_size: usize,
    /// Oversampling factor of the interpolator samples. Must be odd.
    pub oversampling: usize,
}

impl GridParams {
    /// Length of the full oversampled frequency grid, $M = \text{Ofactor} \cdot K$.
    pub fn total_samples(&self) -> usize {
        self.oversampling * self.oversampled_size
    }

    /// Start of the central (canonical) K-tile within the oversampled grid.
    pub fn central_tile_start(&self) -> usize {
        (self.oversampling - 1) / 2 * self.oversampled_size
    }

    /// Inclusive index window `[K/2 − N/2, K/2 + N/2]` kept in the kernel.
    pub fn support_window(&self) -> (usize, usize) {
        let half_k = self.oversampled_size / 2;
        let half_n = self.image_size / 2;
        (half_k - half_n, half_k + half_n)
    }

    /// Number of interpolator samples, $2\lfloor J \cdot \text{Ofactor} / 2 \rfloor + 1$.
    pub fn interpolator_len(&self) -> usize {
        2 * (self.support * self.oversampling / 2) + 1
    }

    /// Check the structural preconditions of the grid.
    ///
    /// `K` and `N` must be even so the centred windows are integral, `N < K`,
    /// and the oversampling factor must be odd so the central tile is
    /// well defined.
    pub fn validate(&self) -> Result<(), DesignError> {
        if self.support == 0 {
            return Err(DesignError::InvalidParameter(
                "support width J must be positive".into(),
            ));
        }
        if self.image_size == 0 || self.image_size % 2 != 0 {
            return Err(DesignError::InvalidParameter(format!(
                "image size N must be positive and even, got {}",
                self.image_size
            )));
        }
        if self.oversampled_size % 2 != 0 || self.oversampled_size <= self.image_size {
            return Err(DesignError::InvalidParameter(format!(
                "oversampled size K must be even and larger than N={}, got {}",
                self.image_size, self.oversampled_size
            )));
        }
        if self.oversampling == 0 {
            return Err(DesignError::InvalidParameter(
                "oversampling factor must be positive".into(),
            ));
        }
        if self.oversampling % 2 == 0 {
            return Err(DesignError::EvenOversampling(self.oversampling));
        }
        Ok(())
    }
}

/// Full parameter set for [`crate::design`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignParams {
    pub grid: GridParams,
    /// Order of the B-spline reference window.
    pub order: usize,
    /// Degree of the seed B-spline interpolator. Defaults to `J − 1`.
    pub degree: Option<usize>,
    /// Energy prior `H` over the `N` image frequencies. Defaults to all ones.
    pub energy: Option<Vec<f64>>,
}

impl DesignParams {
    /// Parameters with the default order, degree and uniform energy.
    pub fn new(grid: GridParams) -> Self {
        Self {
            grid,
            order: 2,
            degree: None,
            energy: None,
        }
    }

    pub fn seed_degree(&self) -> usize {
        self.degree
            .unwrap_or_else(|| self.grid.support.saturating_sub(1))
    }

    pub fn energy_prior(&self) -> Vec<f64> {
        self.energy
            .clone()
            .unwrap_or_else(|| vec![1.0; self.grid.image_size])
    }

    /// Validate every parameter before any computation begins.
    pub fn validate(&self) -> Result<(), DesignError> {
        self.grid.validate()?;
        if self.order == 0 {
            return Err(DesignError::InvalidParameter(
                "spline order must be at least 1".into(),
            ));
        }
        if let Some(energy) = &self.energy {
            if energy.len() != self.grid.image_size {
                return Err(DesignError::ShapeMismatch {
                    what: "energy prior H",
                    expected: self.grid.image_size,
                    actual: energy.len(),
                });
            }
            if let Some(bad) = energy.iter().position(|h| !h.is_finite() || *h < 0.0) {
                return Err(DesignError::InvalidParameter(format!(
                    "energy prior H must be finite and non-negative (index {})",
                    bad
                )));
            }
        }
        Ok(())
    }
}

/// The three artefacts produced by evaluating one candidate interpolator.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelEvaluation {
    /// Folded frequency-domain kernel response (length `K`).
    pub kernel: Array1<Complex64>,
    /// Feedback weighting for the next eigenproblem (length `Ofactor·K`).
    pub weight: Array1<Complex64>,
    /// Energy-weighted mean residual magnitude.
    pub error: f64,
}

/// Result of one backtracking line search.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub evaluation: KernelEvaluation,
    /// The accepted interpolator, $t \cdot f_{\text{new}} + (1-t) \cdot f_{\text{old}}$.
    pub interpolator: Array1<Complex64>,
    /// Accepted step size; zero means no improving step exists.
    pub step: f64,
}

/// How the optimiser stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The line search found no improving step in the given round.
    Converged { round: usize },
    /// The round cap was reached while steps were still improving.
    IterationLimit { rounds: usize },
}

impl Termination {
    pub fn is_converged(&self) -> bool {
        matches!(self, Termination::Converged { .. })
    }
}

/// Converged interpolator together with its kernel response.
#[derive(Debug, Clone)]
pub struct OptimizedInterpolator {
    /// Sample positions of the interpolator, in coarse grid units.
    pub positions: Array1<f64>,
    pub interpolator: Array1<Complex64>,
    pub kernel: Array1<Complex64>,
    pub error: f64,
    /// Error of the unoptimised B-spline seed.
    pub seed_error: f64,
    /// Error after the seed and after every round, in order.
    pub error_history: Vec<f64>,
    /// Accepted step size of every round.
    pub step_history: Vec<f64>,
    /// Number of rounds executed.
    pub rounds: usize,
    pub termination: Termination,
}

/// Complete output of [`crate::design`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignOutput {
    pub params: DesignParams,
    /// Sample positions of the interpolator, in coarse grid units.
    pub positions: Vec<f64>,
    /// Optimised interpolator coefficients.
    pub interpolator: Vec<Complex64>,
    /// Folded kernel response of the optimised interpolator (length `K`).
    pub kernel: Vec<Complex64>,
    /// Scale factors (length `K`).
    pub prefilter: Vec<f64>,
    pub error: f64,
    pub seed_error: f64,
    pub error_history: Vec<f64>,
    pub step_history: Vec<f64>,
    pub rounds: usize,
    pub termination: Termination,
}

impl DesignOutput {
    /// Assemble the output from an optimised interpolator and its prefilter.
    pub fn new(params: DesignParams, optimized: OptimizedInterpolator, prefilter: Array1<f64>) -> Self {
        Self {
            params,
            positions: optimized.positions.to_vec(),
            interpolator: optimized.interpolator.to_vec(),
            kernel: optimized.kernel.to_vec(),
            prefilter: prefilter.to_vec(),
            error: optimized.error,
            seed_error: optimized.seed_error,
            error_history: optimized.error_history,
            step_history: optimized.step_history,
            rounds: optimized.rounds,
            termination: optimized.termination,
        }
    }
}

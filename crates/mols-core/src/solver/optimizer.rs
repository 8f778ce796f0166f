//! Fixed-point design of the interpolator.
//!
//! Starting from a B-spline seed, every round
//!
//! 1. forms $A = D^H \operatorname{diag}(w) D$ from the feedback weight of the
//!    last accepted candidate,
//! 2. solves $A v = \lambda B v$ against the fixed reference
//!    $B = D^H \operatorname{diag}(\hat\beta_3) D$ and keeps the eigenvector of
//!    smallest $|\lambda|$, scaled so its entries sum to one,
//! 3. line-searches from the current interpolator towards that eigenvector.
//!
//! The loop stops when the line search can no longer decrease the error, or
//! after [`MAX_ROUNDS`] rounds.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::eigen::min_magnitude_eigenvector;
use super::{select_step, DesignError, KernelEvaluator};
use crate::dft::{dft_matrix, sample_positions, weighted_gram};
use crate::spectral::{bspline, seed_reference_weight};
use crate::types::{DesignParams, GridParams, OptimizedInterpolator, Termination};

/// Upper bound on optimisation rounds.
pub const MAX_ROUNDS: usize = 100;

/// Eigenvectors whose entries sum to less than this (relative to their
/// 1-norm) cannot be normalised.
const NORMALISATION_TOLERANCE: f64 = 1e-12;

/// B-spline seed of the given degree sampled on the interpolator grid.
///
/// Exactly symmetric about the centre sample.
pub fn seed_interpolator(grid: &GridParams, degree: usize) -> Array1<Complex64> {
    sample_positions(grid.support, grid.oversampling).mapv(|x| Complex64::from(bspline(x, degree)))
}

fn normalise_to_unit_sum(v: Array1<Complex64>) -> Result<Array1<Complex64>, DesignError> {
    let sum: Complex64 = v.iter().sum();
    let scale: f64 = v.iter().map(|z| z.norm()).sum();
    if !(sum.norm() > NORMALISATION_TOLERANCE * scale) {
        return Err(DesignError::DegenerateEigenvector { sum: sum.norm() });
    }
    Ok(v.mapv(|z| z / sum))
}

/// Holds the run-constant artefacts of one design: the DFT operator, the
/// reference matrix `B` and the kernel evaluator.
pub struct InterpolatorOptimizer {
    evaluator: KernelEvaluator,
    positions: Array1<f64>,
    dft: Array2<Complex64>,
    reference_gram: Array2<Complex64>,
    degree: usize,
    max_rounds: usize,
}

impl InterpolatorOptimizer {
    /// Validate the parameters and build the run-constant matrices.
    pub fn new(params: &DesignParams) -> Result<Self, DesignError> {
        params.validate()?;
        let grid = params.grid;

        let evaluator = KernelEvaluator::new(grid, params.order, &params.energy_prior())?;
        let positions = sample_positions(grid.support, grid.oversampling);
        let dft = dft_matrix(&grid, &positions);
        let reference_gram = weighted_gram(&dft, &seed_reference_weight(&grid))?;

        Ok(Self {
            evaluator,
            positions,
            dft,
            reference_gram,
            degree: params.seed_degree(),
            max_rounds: MAX_ROUNDS,
        })
    }

    /// Lower the round cap. Values above [`MAX_ROUNDS`] are clamped.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.min(MAX_ROUNDS);
        self
    }

    pub fn evaluator(&self) -> &KernelEvaluator {
        &self.evaluator
    }

    pub fn dft(&self) -> &Array2<Complex64> {
        &self.dft
    }

    pub fn positions(&self) -> &Array1<f64> {
        &self.positions
    }

    pub fn seed(&self) -> Array1<Complex64> {
        seed_interpolator(self.evaluator.grid(), self.degree)
    }

    /// Propose the next interpolator for a feedback weight.
    ///
    /// Returns the minimum-magnitude generalised eigenvector, normalised so
    /// that its entries sum to one. `weight` has one entry per DFT row.
    pub fn propose(&self, weight: &Array1<Complex64>) -> Result<Array1<Complex64>, DesignError> {
        let a = weighted_gram(&self.dft, weight)?;
        let (lambda, eigenvector) = min_magnitude_eigenvector(&a, &self.reference_gram)?;
        log::trace!("eigenvalue {:.6e}{:+.6e}i", lambda.re, lambda.im);

        normalise_to_unit_sum(eigenvector)
    }

    /// Run the design to convergence or to the round cap.
    pub fn run(&self) -> Result<OptimizedInterpolator, DesignError> {
        let mut interpolator = self.seed();
        let mut current = self.evaluator.evaluate(&self.dft, &interpolator)?;
        let seed_error = current.error;
        log::debug!("seed (degree {}) error {:.6e}", self.degree, seed_error);

        let mut error_history = vec![seed_error];
        let mut step_history = Vec::new();
        let mut termination = Termination::IterationLimit {
            rounds: self.max_rounds,
        };

        for round in 0..self.max_rounds {
            let proposal = self.propose(&current.weight)?;
            let outcome = select_step(
                &self.evaluator,
                &self.dft,
                current.error,
                &interpolator,
                &proposal,
            )?;

            log::debug!(
                "round {}: step {:.3e}, error {:.6e}",
                round,
                outcome.step,
                outcome.evaluation.error
            );

            interpolator = outcome.interpolator;
            current = outcome.evaluation;
            error_history.push(current.error);
            step_history.push(outcome.step);

            if outcome.step == 0.0 {
                termination = Termination::Converged { round };
                break;
            }
        }

        if !termination.is_converged() {
            log::warn!(
                "interpolator design hit the {}-round limit with error {:.6e}",
                self.max_rounds,
                current.error
            );
        }

        Ok(OptimizedInterpolator {
            positions: self.positions.clone(),
            interpolator,
            kernel: current.kernel,
            error: current.error,
            seed_error,
            rounds: step_history.len(),
            error_history,
            step_history,
            termination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params() -> DesignParams {
        DesignParams::new(GridParams {
            support: 6,
            image_size: 16,
            oversampled_size: 20,
            oversampling: 3,
        })
    }

    #[test]
    fn test_seed_is_symmetric() {
        let seed = seed_interpolator(&params().grid, 5);
        let len = seed.len();
        assert_eq!(len, 19);
        for i in 0..len {
            assert_eq!(seed[i], seed[len - 1 - i]);
        }
        // Centre sample of the quintic spline.
        assert_abs_diff_eq!(seed[9].re, 11.0 / 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_proposal_sums_to_one() {
        let optimizer = InterpolatorOptimizer::new(&params()).unwrap();
        let seed = optimizer.seed();
        let eval = optimizer.evaluator().evaluate(optimizer.dft(), &seed).unwrap();
        let proposal = optimizer.propose(&eval.weight).unwrap();
        let sum: Complex64 = proposal.iter().sum();
        assert_abs_diff_eq!(sum.re, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(sum.im, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_zero_rounds_returns_seed() {
        let optimizer = InterpolatorOptimizer::new(&params()).unwrap().with_max_rounds(0);
        let result = optimizer.run().unwrap();
        assert_eq!(result.rounds, 0);
        assert_eq!(result.error, result.seed_error);
        assert_eq!(result.interpolator, optimizer.seed());
        assert_eq!(result.termination, Termination::IterationLimit { rounds: 0 });
    }

    #[test]
    fn test_error_history_is_monotone() {
        let optimizer = InterpolatorOptimizer::new(&params()).unwrap().with_max_rounds(10);
        let result = optimizer.run().unwrap();
        assert_eq!(result.error_history.len(), result.rounds + 1);
        for pair in result.error_history.windows(2) {
            assert!(pair[1] <= pair[0], "error increased: {:?}", pair);
        }
        for (&step, pair) in result.step_history.iter().zip(result.error_history.windows(2)) {
            if step > 0.0 {
                assert!(pair[0] - pair[1] > 0.0);
            }
        }
    }

    #[test]
    fn test_invalid_params_rejected_before_work() {
        let mut bad = params();
        bad.grid.oversampling = 2;
        assert!(matches!(
            InterpolatorOptimizer::new(&bad),
            Err(DesignError::EvenOversampling(2))
        ));
    }

    #[test]
    fn test_propose_rejects_wrong_weight_length() {
        let optimizer = InterpolatorOptimizer::new(&params()).unwrap();
        let short = Array1::<Complex64>::zeros(5);
        match optimizer.propose(&short) {
            Err(DesignError::ShapeMismatch { expected, actual, .. }) => {
                assert_eq!(expected, optimizer.dft().nrows());
                assert_eq!(actual, 5);
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_cancelling_entries_cannot_be_normalised() {
        let c = |re: f64| Complex64::new(re, 0.0);

        let exact = Array1::from(vec![c(1.0), c(-1.0), c(0.0)]);
        assert!(matches!(
            normalise_to_unit_sum(exact),
            Err(DesignError::DegenerateEigenvector { .. })
        ));

        let near = Array1::from(vec![c(1.0), c(-1.0 + 1e-14)]);
        assert!(matches!(
            normalise_to_unit_sum(near),
            Err(DesignError::DegenerateEigenvector { .. })
        ));

        let empty = Array1::<Complex64>::zeros(0);
        assert!(normalise_to_unit_sum(empty).is_err());
    }

    #[test]
    fn test_well_conditioned_vector_sums_to_one() {
        let v = Array1::from(vec![
            Complex64::new(2.0, 1.0),
            Complex64::new(0.5, -0.25),
            Complex64::new(1.5, 0.0),
        ]);
        let normalised = normalise_to_unit_sum(v.clone()).unwrap();
        let sum: Complex64 = normalised.iter().sum();
        assert_abs_diff_eq!(sum.re, 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(sum.im, 0.0, epsilon = 1e-14);
        // Direction is preserved.
        let ratio = normalised[0] / v[0];
        for (n, z) in normalised.iter().zip(v.iter()) {
            assert!((n / z - ratio).norm() < 1e-14);
        }
    }
}

//! Backtracking step selection between consecutive interpolators.
//!
//! Steps are tried on the fixed schedule $1, 2^{-1}, \dots, 2^{-30}, 0$ and the
//! first one giving any strict decrease of the error is taken. The schedule
//! is deterministic; there is no sufficient-decrease test.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::{DesignError, KernelEvaluator};
use crate::types::StepOutcome;

/// Number of halvings tried after the full step.
pub const MAX_HALVINGS: i32 = 30;

/// The step sizes tried, in order.
pub fn step_schedule() -> impl Iterator<Item = f64> {
    (0..=MAX_HALVINGS)
        .map(|i| 0.5_f64.powi(i))
        .chain(std::iter::once(0.0))
}

/// Search the segment from `previous` to `proposed` for an improving step.
///
/// Returns the first candidate $t \cdot \text{proposed} + (1 - t) \cdot \text{previous}$
/// whose error is strictly below `previous_error`. If no $t > 0$ improves,
/// the $t = 0$ candidate is evaluated and returned with `step == 0.0`.
///
/// A trial with $t > 0$ whose denominator vanishes is treated as
/// non-improving; only the final $t = 0$ evaluation propagates errors.
pub fn select_step(
    evaluator: &KernelEvaluator,
    dft: &Array2<Complex64>,
    previous_error: f64,
    previous: &Array1<Complex64>,
    proposed: &Array1<Complex64>,
) -> Result<StepOutcome, DesignError> {
    if previous.len() != proposed.len() {
        return Err(DesignError::ShapeMismatch {
            what: "proposed interpolator",
            expected: previous.len(),
            actual: proposed.len(),
        });
    }

    for step in step_schedule().filter(|&t| t > 0.0) {
        let candidate = blend(step, proposed, previous);
        let evaluation = match evaluator.evaluate(dft, &candidate) {
            Ok(evaluation) => evaluation,
            Err(DesignError::IllConditioned { index, .. }) => {
                log::trace!("step {:.3e} rejected: vanishing denominator at {}", step, index);
                continue;
            }
            Err(e) => return Err(e),
        };

        log::trace!("step {:.3e}: error {:.6e}", step, evaluation.error);
        if previous_error - evaluation.error > 0.0 {
            return Ok(StepOutcome {
                evaluation,
                interpolator: candidate,
                step,
            });
        }
    }

    let candidate = blend(0.0, proposed, previous);
    let evaluation = evaluator.evaluate(dft, &candidate)?;
    log::trace!("no improving step, error stays at {:.6e}", evaluation.error);
    Ok(StepOutcome {
        evaluation,
        interpolator: candidate,
        step: 0.0,
    })
}

fn blend(step: f64, proposed: &Array1<Complex64>, previous: &Array1<Complex64>) -> Array1<Complex64> {
    proposed.mapv(|z| z * step) + &previous.mapv(|z| z * (1.0 - step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dft::{dft_matrix, sample_positions};
    use crate::solver::optimizer::seed_interpolator;
    use crate::types::GridParams;

    fn grid() -> GridParams {
        GridParams {
            support: 6,
            image_size: 16,
            oversampled_size: 20,
            oversampling: 3,
        }
    }

    fn setup() -> (KernelEvaluator, Array2<Complex64>, Array1<Complex64>) {
        let g = grid();
        let evaluator = KernelEvaluator::new(g, 2, &vec![1.0; g.image_size]).unwrap();
        let dft = dft_matrix(&g, &sample_positions(g.support, g.oversampling));
        (evaluator, dft, seed_interpolator(&g, 5))
    }

    #[test]
    fn test_schedule_is_fixed() {
        let steps: Vec<f64> = step_schedule().collect();
        assert_eq!(steps.len(), 32);
        assert_eq!(steps[0], 1.0);
        assert_eq!(steps[1], 0.5);
        assert_eq!(steps[30], 2.0_f64.powi(-30));
        assert_eq!(steps[31], 0.0);
    }

    #[test]
    fn test_unbeatable_error_falls_back_to_zero_step() {
        let (evaluator, dft, seed) = setup();
        let base = evaluator.evaluate(&dft, &seed).unwrap();
        let wider = seed_interpolator(&grid(), 3);
        // No candidate can go below zero error.
        let outcome = select_step(&evaluator, &dft, 0.0, &seed, &wider).unwrap();
        assert_eq!(outcome.step, 0.0);
        assert_eq!(outcome.interpolator, seed);
        assert_eq!(outcome.evaluation.error, base.error);
    }

    #[test]
    fn test_accepts_full_step_when_it_improves() {
        let (evaluator, dft, seed) = setup();
        let base = evaluator.evaluate(&dft, &seed).unwrap();
        // Pretend the previous error was much worse: the full step must win.
        let outcome =
            select_step(&evaluator, &dft, base.error * 2.0 + 1.0, &seed, &seed).unwrap();
        assert_eq!(outcome.step, 1.0);
        assert!(outcome.evaluation.error < base.error * 2.0 + 1.0);
    }

    #[test]
    fn test_accepted_step_strictly_improves() {
        let (evaluator, dft, seed) = setup();
        let base = evaluator.evaluate(&dft, &seed).unwrap();
        let wider = seed_interpolator(&grid(), 3);
        let outcome = select_step(&evaluator, &dft, base.error, &seed, &wider).unwrap();
        if outcome.step > 0.0 {
            assert!(base.error - outcome.evaluation.error > 0.0);
        } else {
            assert_eq!(outcome.interpolator, seed);
        }
    }

    #[test]
    fn test_zero_proposal_is_skipped_not_fatal() {
        let (evaluator, dft, seed) = setup();
        let base = evaluator.evaluate(&dft, &seed).unwrap();
        let zero = Array1::<Complex64>::zeros(seed.len());
        // t = 1 lands on the zero interpolator, which is ill-conditioned.
        let outcome = select_step(&evaluator, &dft, base.error, &seed, &zero).unwrap();
        assert!(outcome.step < 1.0);
    }
}

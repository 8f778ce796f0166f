//! Discretised error and weighting of a candidate interpolator.
//!
//! For a candidate $f$ with oversampled spectrum $F = D f$, the evaluator
//! folds the `Ofactor` periodic replicas of $|F|^2 \hat\beta$ and
//! $|F|^2 (\hat\beta - \mathcal{B})$ onto one base period:
//! $$\text{Den}_j = \sum_{i} |F_{iK+j}|^2\, \hat\beta_{iK+j}, \qquad
//!   \text{Num}_j = \sum_{i} |F_{iK+j}|^2\, b_{iK+j}$$
//! The kernel is $\text{Num}/\text{Den}$ over the passband, the error is the
//! energy-weighted mean kernel magnitude, and the feedback weight
//! $H/\text{Den}$ re-poses the next eigenproblem.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::DesignError;
use crate::spectral::SplineReference;
use crate::types::{GridParams, KernelEvaluation};

/// Evaluates candidate interpolators on a fixed grid.
///
/// The spline reference and the zero-padded energy prior are computed once
/// at construction; [`KernelEvaluator::evaluate`] is then a pure function of
/// the DFT matrix and the candidate.
#[derive(Debug, Clone)]
pub struct KernelEvaluator {
    grid: GridParams,
    reference: SplineReference,
    /// Energy prior `H` embedded at `[K/2 − N/2, K/2 + N/2)`.
    padded_energy: Array1<Complex64>,
}

impl KernelEvaluator {
    /// Create an evaluator for the given grid, spline order and energy prior.
    pub fn new(grid: GridParams, order: usize, energy: &[f64]) -> Result<Self, DesignError> {
        grid.validate()?;
        if order == 0 {
            return Err(DesignError::InvalidParameter(
                "spline order must be at least 1".into(),
            ));
        }
        if energy.len() != grid.image_size {
            return Err(DesignError::ShapeMismatch {
                what: "energy prior H",
                expected: grid.image_size,
                actual: energy.len(),
            });
        }

        let mut padded_energy = Array1::<Complex64>::zeros(grid.oversampled_size);
        let (start, _) = grid.support_window();
        for (i, &h) in energy.iter().enumerate() {
            padded_energy[start + i] = Complex64::from(h);
        }

        Ok(Self {
            grid,
            reference: SplineReference::new(&grid, order)?,
            padded_energy,
        })
    }

    pub fn grid(&self) -> &GridParams {
        &self.grid
    }

    pub fn reference(&self) -> &SplineReference {
        &self.reference
    }

    /// Compute the kernel, feedback weight and error of one candidate.
    ///
    /// # Errors
    /// [`DesignError::ShapeMismatch`] if the DFT matrix does not match the
    /// grid or the candidate, and [`DesignError::IllConditioned`] if the
    /// folded denominator vanishes anywhere in the passband.
    pub fn evaluate(
        &self,
        dft: &Array2<Complex64>,
        interpolator: &Array1<Complex64>,
    ) -> Result<KernelEvaluation, DesignError> {
        let k = self.grid.oversampled_size;
        let m = self.grid.total_samples();
        if dft.nrows() != m {
            return Err(DesignError::ShapeMismatch {
                what: "DFT matrix rows",
                expected: m,
                actual: dft.nrows(),
            });
        }
        if dft.ncols() != interpolator.len() {
            return Err(DesignError::ShapeMismatch {
                what: "interpolator",
                expected: dft.ncols(),
                actual: interpolator.len(),
            });
        }

        let spectrum = dft.dot(interpolator);

        // Fold the Ofactor replicas onto one period
        let mut den = Array1::<Complex64>::zeros(k);
        let mut num = Array1::<Complex64>::zeros(k);
        for (i, f) in spectrum.iter().enumerate() {
            let power = f.norm_sqr();
            den[i % k] += self.reference.abeta[i] * power;
            num[i % k] += self.reference.bbeta[i] * power;
        }

        // Everything outside the passband stays exactly zero
        let (lo, hi) = self.grid.support_window();
        let mut kernel = Array1::<Complex64>::zeros(k);
        let mut base_weight = Array1::<Complex64>::zeros(k);
        for j in lo..=hi {
            let d = den[j];
            if !d.is_finite() || d.norm() < f64::MIN_POSITIVE {
                return Err(DesignError::IllConditioned {
                    quantity: "kernel",
                    index: j,
                    value: d.norm(),
                });
            }
            kernel[j] = num[j] / d;
            base_weight[j] = self.padded_energy[j] / d;
        }

        let residual: Complex64 = self
            .padded_energy
            .iter()
            .zip(kernel.iter())
            .map(|(h, q)| h * q)
            .sum();
        let error = (residual / k as f64).norm();

        // Tile the weight over every replica except the canonical one
        let central = self.grid.central_tile_start();
        let weight = Array1::from_shape_fn(m, |i| {
            if (central..central + k).contains(&i) {
                Complex64::from(0.0)
            } else {
                base_weight[i % k]
            }
        });

        Ok(KernelEvaluation {
            kernel,
            weight,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dft::{dft_matrix, sample_positions};
    use crate::solver::optimizer::seed_interpolator;

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
        let seed = seed_interpolator(&g, 5);
        (evaluator, dft, seed)
    }

    #[test]
    fn test_error_is_finite_and_non_negative() {
        let (evaluator, dft, seed) = setup();
        let eval = evaluator.evaluate(&dft, &seed).unwrap();
        assert!(eval.error.is_finite());
        assert!(eval.error >= 0.0);
        assert_eq!(eval.kernel.len(), 20);
        assert_eq!(eval.weight.len(), 60);
    }

    #[test]
    fn test_out_of_band_entries_are_exactly_zero() {
        let (evaluator, dft, seed) = setup();
        let eval = evaluator.evaluate(&dft, &seed).unwrap();
        let zero = Complex64::from(0.0);

        // Window is [2, 18]; indices 0, 1 and 19 are out of band.
        for &j in &[0usize, 1, 19] {
            assert_eq!(eval.kernel[j], zero, "kernel[{}] not zeroed", j);
            for tile in 0..3 {
                assert_eq!(eval.weight[tile * 20 + j], zero, "weight[{}] not zeroed", tile * 20 + j);
            }
        }
        // Central replica is fully suppressed.
        for i in 20..40 {
            assert_eq!(eval.weight[i], zero);
        }
        // The outer replicas carry the in-band weight.
        assert!(eval.weight[5].norm() > 0.0);
        assert_eq!(eval.weight[5], eval.weight[45]);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let (evaluator, dft, seed) = setup();
        let first = evaluator.evaluate(&dft, &seed).unwrap();
        let second = evaluator.evaluate(&dft, &seed).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_interpolator_is_ill_conditioned() {
        let (evaluator, dft, seed) = setup();
        let zero = Array1::<Complex64>::zeros(seed.len());
        match evaluator.evaluate(&dft, &zero) {
            Err(DesignError::IllConditioned { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected ill-conditioned error, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let (evaluator, dft, _) = setup();
        let short = Array1::<Complex64>::zeros(5);
        assert!(matches!(
            evaluator.evaluate(&dft, &short),
            Err(DesignError::ShapeMismatch { expected: 19, actual: 5, .. })
        ));
    }

    #[test]
    fn test_energy_prior_length_is_checked() {
        let g = grid();
        assert!(matches!(
            KernelEvaluator::new(g, 2, &[1.0; 3]),
            Err(DesignError::ShapeMismatch { .. })
        ));
    }
}

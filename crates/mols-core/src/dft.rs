//! Discrete Fourier operator between interpolator samples and the
//! oversampled frequency grid.
//!
//! The interpolator is sampled at spacing `1/Ofactor` over `[−J/2, J/2]`.
//! The operator maps those samples onto the `Ofactor·K` frequencies
//! $k \in [-\text{Ofactor}\,K/2,\ \text{Ofactor}\,K/2)$:
//! $$D_{k,x} = \exp(-2\pi i\, k x / K)$$

use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;
use std::f64::consts::PI;

use crate::solver::DesignError;
use crate::types::GridParams;

/// Symmetric sample positions of the interpolator, in coarse grid units.
///
/// The one-sided grid `{0, 1/Ofactor, 2/Ofactor, …}` is truncated to
/// `[0, J/2]` and reflected about zero, so the result always has odd length
/// with `0` at the centre.
pub fn sample_positions(support: usize, oversampling: usize) -> Array1<f64> {
    // i / Ofactor <= J / 2  <=>  2 i <= J · Ofactor
    let one_sided = support * oversampling / 2;
    let step = 1.0 / oversampling as f64;
    let len = 2 * one_sided + 1;
    Array1::from_shape_fn(len, |i| (i as f64 - one_sided as f64) * step)
}

/// Index of the zero position inside [`sample_positions`].
pub fn centre_index(support: usize, oversampling: usize) -> usize {
    support * oversampling / 2
}

/// Build the `(Ofactor·K) × L` DFT matrix for the given sample positions.
pub fn dft_matrix(grid: &GridParams, positions: &Array1<f64>) -> Array2<Complex64> {
    let rows = grid.total_samples();
    let half = (rows / 2) as f64;
    let k = grid.oversampled_size as f64;
    Array2::from_shape_fn((rows, positions.len()), |(r, c)| {
        let freq = r as f64 - half;
        Complex64::from_polar(1.0, -2.0 * PI * freq * positions[c] / k)
    })
}

/// Weighted Gram matrix $D^H \operatorname{diag}(w)\, D$.
///
/// Hermitian whenever `w` is real. `w` needs one entry per DFT row.
pub fn weighted_gram(
    dft: &Array2<Complex64>,
    weight: &Array1<Complex64>,
) -> Result<Array2<Complex64>, DesignError> {
    if weight.len() != dft.nrows() {
        return Err(DesignError::ShapeMismatch {
            what: "feedback weight",
            expected: dft.nrows(),
            actual: weight.len(),
        });
    }
    let mut scaled = dft.clone();
    for (mut row, &w) in scaled.axis_iter_mut(Axis(0)).zip(weight.iter()) {
        row.mapv_inplace(|z| z * w);
    }
    let adjoint = dft.t().mapv(|z| z.conj());
    Ok(adjoint.dot(&scaled))
}

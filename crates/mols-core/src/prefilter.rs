//! Closed-form scale factors (prefilter) for a designed interpolator.
//!
//! The interpolator's passband is not flat, so the image is pre-scaled by
//! $$s_k = \frac{\operatorname{Re} F_k\, \mathcal{B}_k}
//!   {\sum_{i} \bigl|C_{iK+k}\, |F_{iK+k}|^2\bigr|}$$
//! over the central tile, where $F = D f$, $\mathcal{B}$ is the spline
//! spectrum and $C$ accumulates the squared spline spectrum over
//! [`CORRECTION_REPLICAS`] periodic replicas.

use ndarray::Array1;
use num_complex::Complex64;

use crate::dft::{dft_matrix, sample_positions};
use crate::solver::DesignError;
use crate::spectral::normalized_sinc;
use crate::types::GridParams;

/// Number of spline spectrum replicas summed into the correction term.
pub const CORRECTION_REPLICAS: usize = 49;

/// Spline spectrum at frequency `k` of an `m`-sample grid.
fn spline_spectrum(k: f64, m: f64, order: i32, oversampling: f64) -> f64 {
    normalized_sinc(std::f64::consts::PI * k / m).powi(order) / oversampling
}

/// Compute the length-`K` prefilter for an interpolator.
///
/// # Errors
/// [`DesignError::ShapeMismatch`] if the interpolator length does not match
/// the grid, and [`DesignError::IllConditioned`] if a denominator vanishes.
pub fn compute_prefilter(
    interpolator: &Array1<Complex64>,
    grid: &GridParams,
    order: usize,
) -> Result<Array1<f64>, DesignError> {
    grid.validate()?;
    let positions = sample_positions(grid.support, grid.oversampling);
    if interpolator.len() != positions.len() {
        return Err(DesignError::ShapeMismatch {
            what: "interpolator",
            expected: positions.len(),
            actual: interpolator.len(),
        });
    }

    let k_size = grid.oversampled_size;
    let m = grid.total_samples();
    let m_f = m as f64;
    let order = order as i32;
    let oversampling = grid.oversampling as f64;

    let spectrum = dft_matrix(grid, &positions).dot(interpolator);

    // Squared spline spectrum summed over the replicas
    let wide_half = (CORRECTION_REPLICAS * m / 2) as f64;
    let mut correction = Array1::<f64>::zeros(m);
    for replica in 0..CORRECTION_REPLICAS {
        for (i, c) in correction.iter_mut().enumerate() {
            let k = (replica * m + i) as f64 - wide_half;
            *c += spline_spectrum(k, m_f, order, oversampling).powi(2);
        }
    }

    let mut den = Array1::<f64>::zeros(k_size);
    for (i, (c, f)) in correction.iter().zip(spectrum.iter()).enumerate() {
        den[i % k_size] += (c * f.norm_sqr()).abs();
    }

    let start = grid.central_tile_start();
    let half = (m / 2) as f64;
    let mut prefilter = Array1::<f64>::zeros(k_size);
    for j in 0..k_size {
        let d = den[j];
        if !d.is_finite() || d < f64::MIN_POSITIVE {
            return Err(DesignError::IllConditioned {
                quantity: "prefilter",
                index: j,
                value: d,
            });
        }
        let i = start + j;
        let reference = spline_spectrum(i as f64 - half, m_f, order, oversampling);
        prefilter[j] = spectrum[i].re * reference / d;
    }

    Ok(prefilter)
}

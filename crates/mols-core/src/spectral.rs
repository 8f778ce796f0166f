//! B-spline spectral reference.
//!
//! The design error is measured against the Fourier transform of a B-spline
//! window. Two flavours are needed: the discrete transform of the spline
//! sampled at the integers (which contains every periodic replica), and the
//! continuous transform $\mathrm{sinc}^{2p}(\omega/2)$ of the central replica
//! alone. Their difference over the central band isolates the aliasing
//! contribution that the interpolator has to suppress.

use ndarray::Array1;
use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

use crate::solver::DesignError;
use crate::types::GridParams;

/// Below this magnitude `sinc` returns exactly one.
const SINC_ZERO_TOLERANCE: f64 = 1e-6;

/// Unnormalised sinc, $\sin(x)/x$.
pub fn sinc(x: f64) -> f64 {
    if x.abs() < SINC_ZERO_TOLERANCE {
        1.0
    } else {
        x.sin() / x
    }
}

/// Normalised sinc, $\sin(\pi x)/(\pi x)$.
pub fn normalized_sinc(x: f64) -> f64 {
    sinc(PI * x)
}

/// Centred cardinal B-spline of the given degree.
///
/// Evaluated with the truncated-power formula
/// $$\beta^n(x) = \frac{1}{n!}\sum_{k=0}^{n+1} (-1)^k \binom{n+1}{k}
///   \left(x + \tfrac{n+1}{2} - k\right)_+^n$$
/// on $|x|$, so the result is exactly even and exactly zero outside the
/// support $[-(n+1)/2, (n+1)/2]$.
pub fn bspline(x: f64, degree: usize) -> f64 {
    let ax = x.abs();
    let half_width = (degree as f64 + 1.0) / 2.0;
    if ax > half_width {
        return 0.0;
    }
    if degree == 0 {
        return if ax < half_width { 1.0 } else { 0.5 };
    }
    if ax == half_width {
        return 0.0;
    }

    let n = degree as i32;
    let mut sum = 0.0;
    let mut binom = 1.0;
    let mut sign = 1.0;
    for k in 0..=degree + 1 {
        let t = ax + half_width - k as f64;
        if t > 0.0 {
            sum += sign * binom * t.powi(n);
        }
        binom = binom * (degree + 1 - k) as f64 / (k + 1) as f64;
        sign = -sign;
    }

    let factorial: f64 = (1..=degree).map(|i| i as f64).product();
    sum / factorial
}

/// Move the zero-frequency sample to the centre (`numpy.fft.fftshift`).
pub fn fftshift<T: Clone>(data: &[T]) -> Vec<T> {
    let mut out = data.to_vec();
    let len = out.len();
    out.rotate_right(len / 2);
    out
}

/// Inverse of [`fftshift`].
pub fn ifftshift<T: Clone>(data: &[T]) -> Vec<T> {
    let mut out = data.to_vec();
    let len = out.len();
    out.rotate_left(len / 2);
    out
}

/// Centred forward DFT (unnormalised).
///
/// Input sample `i` sits at position `i − M/2`, output bin `i` at frequency
/// `i − M/2`.
pub fn centered_dft(samples: &[Complex64]) -> Vec<Complex64> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut buffer = ifftshift(samples);
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(&mut buffer);
    fftshift(&buffer)
}

/// Centred DFT of a B-spline of the given degree sampled at the integers of
/// the oversampled grid.
fn sampled_spline_spectrum(grid: &GridParams, degree: usize) -> Array1<Complex64> {
    let m = grid.total_samples();
    let half = (m / 2) as f64;
    let samples: Vec<Complex64> = (0..m)
        .map(|i| Complex64::from(bspline(i as f64 - half, degree)))
        .collect();
    Array1::from_vec(centered_dft(&samples))
}

/// Weighting of the fixed reference matrix $B = D^H \operatorname{diag}(w) D$:
/// the centred DFT of the cubic B-spline, $\tfrac23 + \tfrac13\cos(2\pi k/M)$.
pub fn seed_reference_weight(grid: &GridParams) -> Array1<Complex64> {
    sampled_spline_spectrum(grid, 3)
}

/// Spectral reference used by the kernel evaluator.
#[derive(Debug, Clone)]
pub struct SplineReference {
    /// Discrete spline spectrum, all replicas (length `Ofactor·K`).
    pub abeta: Array1<Complex64>,
    /// Continuous spline spectrum $\mathrm{sinc}^{2p}(\omega / 2\,\text{Ofactor})$.
    pub bspline_fourier: Array1<f64>,
    /// `abeta` with the continuous spectrum removed from the central tile.
    pub bbeta: Array1<Complex64>,
}

impl SplineReference {
    /// Build the reference for a grid and spline order `p`; the sampled
    /// spline has degree `2p − 1`, so `p` must be at least 1.
    pub fn new(grid: &GridParams, order: usize) -> Result<Self, DesignError> {
        if order == 0 {
            return Err(DesignError::InvalidParameter(
                "spline order must be at least 1".into(),
            ));
        }
        let m = grid.total_samples();
        let half = (m / 2) as f64;
        let k = grid.oversampled_size as f64;
        let abeta = sampled_spline_spectrum(grid, 2 * order - 1);

        let power = (2 * order) as i32;
        let bspline_fourier = Array1::from_shape_fn(m, |i| {
            let omega = 2.0 * PI * (i as f64 - half) / k;
            sinc(omega / (2.0 * grid.oversampling as f64)).powi(power)
        });

        let mut bbeta = abeta.clone();
        let start = grid.central_tile_start();
        for i in start..start + grid.oversampled_size {
            bbeta[i] -= bspline_fourier[i];
        }

        Ok(Self {
            abeta,
            bspline_fourier,
            bbeta,
        })
    }
}

//! # MOLS Core
//!
//! Design of mean-square optimal interpolators and scale factors for the
//! non-uniform fast Fourier transform. Given a support width, an
//! oversampling factor, the grid sizes and an expected energy distribution
//! of the signal, [`design`] finds the finite-support interpolator that
//! minimises the mean-square error between the exact and the discretised,
//! windowed frequency response, then derives the matching prefilter.
//!
//! ## Modules
//!
//! - [`types`] — Grid parameters, evaluation artefacts, design output.
//! - [`spectral`] — B-spline reference spectra and centred DFT helpers.
//! - [`dft`] — Interpolator sample grid and DFT operator.
//! - [`solver`] — Kernel evaluator, step selector and optimiser.
//! - [`prefilter`] — Closed-form scale factors.
//!
//! ## References
//!
//! - Z. Yang, M. Jacob, "Mean square optimal NUFFT approximation for
//!   non-Cartesian MRI reconstruction", *J. Magn. Reson.* **242**, 126–135 (2014).
//! - M. Jacob, "Optimized least-square nonuniform fast Fourier transform",
//!   *IEEE Trans. Signal Process.* **57**, 2165–2177 (2009).

pub mod dft;
pub mod prefilter;
pub mod solver;
pub mod spectral;
pub mod types;

use solver::optimizer::MAX_ROUNDS;
use solver::{DesignError, InterpolatorOptimizer};
use types::{DesignOutput, DesignParams};

/// Design an interpolator and its prefilter.
///
/// Validates `params`, runs the optimiser to convergence (or the round cap),
/// and computes the scale factors of the result. Hitting the round cap is
/// not an error; check [`DesignOutput::termination`].
pub fn design(params: &DesignParams) -> Result<DesignOutput, DesignError> {
    design_with_max_rounds(params, None)
}

/// [`design`] with the optimiser's round cap lowered to `max_rounds`.
///
/// `None` keeps the default of [`MAX_ROUNDS`]; larger values are clamped to it.
pub fn design_with_max_rounds(
    params: &DesignParams,
    max_rounds: Option<usize>,
) -> Result<DesignOutput, DesignError> {
    log::info!(
        "designing interpolator: J={}, N={}, K={}, Ofactor={}, order={}",
        params.grid.support,
        params.grid.image_size,
        params.grid.oversampled_size,
        params.grid.oversampling,
        params.order
    );

    let optimizer = InterpolatorOptimizer::new(params)?
        .with_max_rounds(max_rounds.unwrap_or(MAX_ROUNDS));
    let optimized = optimizer.run()?;
    let prefilter =
        prefilter::compute_prefilter(&optimized.interpolator, &params.grid, params.order)?;

    log::info!(
        "design finished after {} rounds: error {:.6e} (seed {:.6e})",
        optimized.rounds,
        optimized.error,
        optimized.seed_error
    );

    Ok(DesignOutput::new(params.clone(), optimized, prefilter))
}

//! Dense generalised eigensolver for the interpolator update.
//!
//! Solves $A v = \lambda B v$ by reducing it to the standard problem
//! $B^{-1} A v = \lambda v$: `B` is factorised once per call with a
//! partially pivoted LU via `faer`, and the complex eigendecomposition of
//! $B^{-1}A$ yields the generalised eigenpairs.
//!
//! The matrices are `L × L` with `L` the interpolator length, so the cost is
//! negligible next to forming them.

use faer::complex_native::c64;
use faer::linalg::solvers::SpSolver;
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::DesignError;

fn to_faer(matrix: &Array2<Complex64>) -> faer::Mat<c64> {
    faer::Mat::<c64>::from_fn(matrix.nrows(), matrix.ncols(), |i, j| {
        let c = matrix[[i, j]];
        c64::new(c.re, c.im)
    })
}

/// Eigenvector of the pencil `(A, B)` whose eigenvalue has the smallest
/// magnitude, together with that eigenvalue.
///
/// Complex eigenvalues are ranked by $|\lambda|$, not by real part.
pub fn min_magnitude_eigenvector(
    a: &Array2<Complex64>,
    b: &Array2<Complex64>,
) -> Result<(Complex64, Array1<Complex64>), DesignError> {
    let dim = a.nrows();
    if a.ncols() != dim || b.dim() != a.dim() {
        return Err(DesignError::EigenFailure(format!(
            "pencil shapes differ or are not square: A is {:?}, B is {:?}",
            a.dim(),
            b.dim()
        )));
    }
    if dim == 0 {
        return Err(DesignError::EigenFailure("empty matrix pencil".into()));
    }

    // B^{-1} A, one column at a time
    let lu = to_faer(b).partial_piv_lu();
    let mut reduced = faer::Mat::<c64>::zeros(dim, dim);
    for j in 0..dim {
        let column = faer::Col::<c64>::from_fn(dim, |i| {
            let c = a[[i, j]];
            c64::new(c.re, c.im)
        });
        let solved = lu.solve(&column);
        for i in 0..dim {
            let c = solved[i];
            if !(c.re.is_finite() && c.im.is_finite()) {
                return Err(DesignError::SingularReference);
            }
            reduced.write(i, j, c);
        }
    }

    let evd = reduced.eigendecomposition::<c64>();
    let values = evd.s().column_vector();
    let vectors = evd.u();

    let mut best: Option<(usize, f64)> = None;
    for i in 0..dim {
        let lambda = values.read(i);
        let magnitude = Complex64::new(lambda.re, lambda.im).norm();
        if !magnitude.is_finite() {
            return Err(DesignError::EigenFailure(format!(
                "non-finite eigenvalue at position {}",
                i
            )));
        }
        if best.map_or(true, |(_, m)| magnitude < m) {
            best = Some((i, magnitude));
        }
    }
    let (index, _) = best.ok_or_else(|| DesignError::EigenFailure("no eigenvalues".into()))?;

    let lambda = values.read(index);
    let eigenvector = Array1::from_shape_fn(dim, |i| {
        let c = vectors.read(i, index);
        Complex64::new(c.re, c.im)
    });
    if eigenvector.iter().any(|z| !z.is_finite()) {
        return Err(DesignError::EigenFailure(
            "eigenvector contains non-finite entries".into(),
        ));
    }

    Ok((Complex64::new(lambda.re, lambda.im), eigenvector))
}

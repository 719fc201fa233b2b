//! Least squares solver.
//!
//! The only regression in this project is a straight line through recent
//! price observations (the trend). It is small, but price series are often
//! flat or have repeated dates, so the solve has to survive a rank-deficient
//! design matrix.
//!
//! Implementation choices:
//! - SVD instead of QR: `QR::solve` is meant for square systems and panics
//!   on tall ones.
//! - Progressively looser tolerances before giving up.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// A fitted line `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
}

/// Fit a straight line through `(xs[i], ys[i])`.
///
/// Needs at least two distinct `x` values; otherwise the slope is undefined
/// and `None` is returned.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Option<LineFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let first = xs[0];
    if xs[..n].iter().all(|x| (x - first).abs() < f64::EPSILON) {
        return None;
    }

    // Center x so the two columns stay well conditioned for day offsets.
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let x = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { xs[r] - mean_x });
    let y = DVector::from_column_slice(&ys[..n]);

    let beta = solve_least_squares(&x, &y)?;
    Some(LineFit {
        intercept: beta[0] - beta[1] * mean_x,
        slope: beta[1],
    })
}

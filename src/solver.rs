use nalgebra::DVector;
use rsparse::data::Sprs;
use rsparse::lusol;
use tracing::{info, warn};

use crate::error::SimulationError;

// Solutions whose relative residual exceeds this are treated as the
// factorization silently failing on a rank-deficient system.
const RESIDUAL_TOLERANCE: f64 = 1e-8;

/// Solve `A x = b` with a sparse direct LU factorization.
///
/// The factorization alone is not trusted: a rank-deficient system can
/// come back as a nominally successful solve full of garbage, so the
/// solution is rejected unless it is finite and
/// `||A x - b|| <= tol * ||b||`.
pub fn solve_direct(a: &Sprs<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SimulationError> {
    if a.m != a.n || a.m != b.len() {
        return Err(SimulationError::InvalidArgument(format!(
            "System shape mismatch: matrix is {}x{}, right-hand side has length {}",
            a.m,
            a.n,
            b.len()
        )));
    }

    let mut x: Vec<f64> = b.iter().copied().collect();
    match lusol(a, &mut x, 1, 1e-10) {
        Ok(()) => {}
        Err(error_code) => {
            let error_msg = format!(
                "Sparse LU factorization failed with error code: {}",
                error_code
            );
            warn!(%error_msg, "Direct solve rejected");
            return Err(SimulationError::SingularSystem(error_msg));
        }
    }

    if x.iter().any(|v| !v.is_finite()) {
        let error_msg = "Direct solve produced non-finite entries".to_string();
        warn!(%error_msg, "Direct solve rejected");
        return Err(SimulationError::SingularSystem(error_msg));
    }

    let residual = residual_norm(a, &x, b);
    let scale = b.norm().max(f64::MIN_POSITIVE);
    if !(residual / scale <= RESIDUAL_TOLERANCE) {
        let error_msg = format!(
            "Direct solve returned a degenerate solution (relative residual {:.3e})",
            residual / scale
        );
        warn!(%error_msg, "Direct solve rejected");
        return Err(SimulationError::SingularSystem(error_msg));
    }

    info!(
        "Direct solve accepted: n={}, relative residual {:.3e}",
        a.n,
        residual / scale
    );
    Ok(DVector::from_vec(x))
}

/// `||A x - b||` over the CSC storage of `A`.
pub fn residual_norm(a: &Sprs<f64>, x: &[f64], b: &DVector<f64>) -> f64 {
    let mut r: Vec<f64> = b.iter().map(|v| -v).collect();
    for col in 0..a.n {
        for idx in a.p[col] as usize..a.p[col + 1] as usize {
            r[a.i[idx]] += a.x[idx] * x[col];
        }
    }
    r.iter().map(|v| v * v).sum::<f64>().sqrt()
}

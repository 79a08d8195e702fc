//! Linear-solve strategies for constraint systems.
//!
//! Every constraint solver ends in a dense square system. The strategy is a
//! closed enum so the choice can be stored in a [`ConstraintSet`] and
//! switched at run time, with one solve contract for all variants.
//!
//! [`ConstraintSet`]: crate::ConstraintSet

use std::fmt;

use nalgebra::{DMatrix, DVector};
use sim_core::linalg::{
    cholesky_in_place, cholesky_solve_in_place, gauss_elim_pivot, lu_factor_in_place, lu_solve_factored,
};
use tracing::{trace, warn};

use crate::error::ConstraintError;

/// Dense linear-solve strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinearSolver {
    /// LU with partial (row) pivoting.
    PartialPivLu,
    /// Householder QR with column pivoting. Rank revealing.
    #[default]
    ColPivHouseholderQr,
    /// Householder QR without pivoting.
    HouseholderQr,
    /// Cholesky (LLᵀ). Symmetric positive definite systems only.
    Llt,
    /// Gaussian elimination with complete pivoting.
    GaussElimPivot,
}

impl LinearSolver {
    /// All strategies, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::PartialPivLu,
        Self::ColPivHouseholderQr,
        Self::HouseholderQr,
        Self::Llt,
        Self::GaussElimPivot,
    ];

    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::PartialPivLu => "PartialPivLU",
            Self::ColPivHouseholderQr => "ColPivHouseholderQR",
            Self::HouseholderQr => "HouseholderQR",
            Self::Llt => "LLT",
            Self::GaussElimPivot => "GaussElimPivot",
        }
    }

    /// Whether the strategy requires a symmetric positive definite matrix.
    #[must_use]
    pub fn requires_positive_definite(self) -> bool {
        matches!(self, Self::Llt)
    }

    /// Solve `a · x = b`.
    ///
    /// `tolerance` is relative: a pivot (LU, elimination), `|R_kk|` (QR) or
    /// squared Cholesky diagonal below `tolerance × max magnitude` rejects the
    /// system as singular. `a` and `b` are not modified; `x` is written only
    /// on success.
    ///
    /// # Errors
    ///
    /// - [`ConstraintError::SingularSystem`] for singular or ill-conditioned `a`
    /// - [`ConstraintError::NotPositiveDefinite`] when Cholesky fails
    /// - [`ConstraintError::NonFinite`] when the solution contains NaN or ±∞
    ///
    /// # Panics
    ///
    /// Panics if `a` is not square or `b`, `x` do not match its size.
    pub fn solve(
        self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        x: &mut DVector<f64>,
        tolerance: f64,
    ) -> Result<(), ConstraintError> {
        let n = a.nrows();
        assert!(a.is_square(), "system matrix must be square");
        assert_eq!(b.len(), n, "right-hand side length mismatch");
        assert_eq!(x.len(), n, "solution length mismatch");
        if n == 0 {
            return Ok(());
        }

        let sol = match self {
            Self::PartialPivLu => {
                let mut lu = a.clone();
                let mut piv = vec![0; n];
                lu_factor_in_place(&mut lu, &mut piv, tolerance).map_err(|_| self.singular(n))?;
                let mut sol = b.clone();
                lu_solve_factored(&lu, &piv, &mut sol);
                sol
            }
            Self::ColPivHouseholderQr => {
                let qr = a.clone().col_piv_qr();
                check_r_diagonal(&qr.r(), tolerance).map_err(|()| self.singular(n))?;
                qr.solve(b).ok_or_else(|| self.singular(n))?
            }
            Self::HouseholderQr => {
                let qr = a.clone().qr();
                check_r_diagonal(&qr.r(), tolerance).map_err(|()| self.singular(n))?;
                qr.solve(b).ok_or_else(|| self.singular(n))?
            }
            Self::Llt => {
                let mut l = a.clone();
                cholesky_in_place(&mut l).map_err(|_| {
                    warn!(solver = %self, size = n, "Cholesky factorization failed");
                    ConstraintError::NotPositiveDefinite { solver: self }
                })?;
                // L_jj² are the pivots of the equivalent LDLᵀ elimination.
                let pivots = l.diagonal().map(|d| d * d);
                if pivots.min() < tolerance * pivots.max() {
                    return Err(self.singular(n));
                }
                let mut sol = b.clone();
                cholesky_solve_in_place(&l, &mut sol);
                sol
            }
            Self::GaussElimPivot => {
                let mut work = a.clone();
                let mut rhs = b.clone();
                let mut sol = DVector::zeros(n);
                gauss_elim_pivot(&mut work, &mut rhs, &mut sol, tolerance).map_err(|_| self.singular(n))?;
                sol
            }
        };

        if sol.iter().any(|v| !v.is_finite()) {
            warn!(solver = %self, size = n, "non-finite solution");
            return Err(ConstraintError::NonFinite { solver: self });
        }
        trace!(solver = %self, x = ?sol.as_slice(), "linear solve");
        x.copy_from(&sol);
        Ok(())
    }

    fn singular(self, size: usize) -> ConstraintError {
        warn!(solver = %self, size, "singular constraint system");
        ConstraintError::SingularSystem { solver: self, size }
    }
}

impl fmt::Display for LinearSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reject an upper-triangular factor whose smallest diagonal magnitude falls
/// below `tolerance` times the largest.
fn check_r_diagonal(r: &DMatrix<f64>, tolerance: f64) -> Result<(), ()> {
    let diag = r.diagonal().abs();
    let max = diag.max();
    if max > 0.0 && diag.min() >= tolerance * max {
        Ok(())
    } else {
        Err(())
    }
}

//! Linear algebra utilities: Cholesky, LU, Gaussian elimination, sparse solve.
//!
//! Pure math routines on dense nalgebra storage, plus the tree-sparse
//! triangular solves that consume the factor written by
//! [`factor_ltdl`](crate::factor_ltdl). The dense routines back the
//! contact solvers' linear-solve strategies.

use nalgebra::{DMatrix, DVector};

use crate::types::{Data, Model, StepError};

// ============================================================================
// Dense Cholesky
// ============================================================================

/// In-place Cholesky (LL^T) factorization. Overwrites the lower triangle of `m` with L.
/// The upper triangle is left unchanged. Returns `Err(StepError::CholeskyFailed)` if
/// the matrix is not positive definite.
///
/// Zero allocations, operates entirely on borrowed data.
pub fn cholesky_in_place(m: &mut DMatrix<f64>) -> Result<(), StepError> {
    let n = m.nrows();
    for j in 0..n {
        // L[j,j] = sqrt(M[j,j] - Σ L[j,k]²)
        let mut diag = m[(j, j)];
        for k in 0..j {
            diag -= m[(j, k)] * m[(j, k)];
        }
        if !(diag > 0.0) {
            return Err(StepError::CholeskyFailed);
        }
        let ljj = diag.sqrt();
        m[(j, j)] = ljj;

        // L[i,j] = (M[i,j] - Σ L[i,k]·L[j,k]) / L[j,j]
        for i in (j + 1)..n {
            let mut sum = m[(i, j)];
            for k in 0..j {
                sum -= m[(i, k)] * m[(j, k)];
            }
            m[(i, j)] = sum / ljj;
        }
    }
    Ok(())
}

/// Solve L·L^T·x = b in place, where L is stored in the lower triangle of `l`.
/// On entry `x` contains b; on exit `x` contains the solution.
pub fn cholesky_solve_in_place(l: &DMatrix<f64>, x: &mut DVector<f64>) {
    let n = l.nrows();

    // Forward substitution: L·y = b
    for j in 0..n {
        for k in 0..j {
            x[j] -= l[(j, k)] * x[k];
        }
        x[j] /= l[(j, j)];
    }

    // Back substitution: L^T·z = y
    for j in (0..n).rev() {
        for k in (j + 1)..n {
            x[j] -= l[(k, j)] * x[k];
        }
        x[j] /= l[(j, j)];
    }
}

// ============================================================================
// LU Factorization
// ============================================================================

/// Factor A = P·L·U in place with partial pivoting. Stores L (unit lower) and
/// U (upper) in `a` and the row swaps in `piv`. O(n³/3).
///
/// # Errors
///
/// Returns `Err(StepError::SingularMatrix)` if a pivot magnitude is not above
/// `rel_tol` times the largest entry magnitude of `a`.
pub fn lu_factor_in_place(a: &mut DMatrix<f64>, piv: &mut [usize], rel_tol: f64) -> Result<(), StepError> {
    let n = a.nrows();
    let threshold = rel_tol * a.amax();
    for k in 0..n {
        // Partial pivot: max |a[i,k]| for i in k..n
        let mut max_val = a[(k, k)].abs();
        let mut max_row = k;
        for i in (k + 1)..n {
            let v = a[(i, k)].abs();
            if v > max_val {
                max_val = v;
                max_row = i;
            }
        }
        if !(max_val > threshold) {
            return Err(StepError::SingularMatrix);
        }
        piv[k] = max_row;

        if max_row != k {
            a.swap_rows(k, max_row);
        }

        for i in (k + 1)..n {
            a[(i, k)] /= a[(k, k)];
            for j in (k + 1)..n {
                a[(i, j)] -= a[(i, k)] * a[(k, j)];
            }
        }
    }
    Ok(())
}

/// Solve P·L·U·x = b using pre-computed factors. Non-destructive on `a`/`piv`.
#[allow(clippy::needless_range_loop)]
pub fn lu_solve_factored(a: &DMatrix<f64>, piv: &[usize], x: &mut DVector<f64>) {
    let n = a.nrows();

    for k in 0..n {
        if piv[k] != k {
            x.swap_rows(k, piv[k]);
        }
    }

    // Forward substitution (L·y = Pb)
    for i in 1..n {
        for k in 0..i {
            x[i] -= a[(i, k)] * x[k];
        }
    }

    // Back substitution (U·x = y)
    for i in (0..n).rev() {
        for k in (i + 1)..n {
            x[i] -= a[(i, k)] * x[k];
        }
        x[i] /= a[(i, i)];
    }
}

// ============================================================================
// Gaussian elimination with complete pivoting
// ============================================================================

/// Solve `A x = b` by Gaussian elimination with complete pivoting.
///
/// `a` and `b` are used as workspace and destroyed. `x` receives the solution.
///
/// # Errors
///
/// Returns `Err(StepError::SingularMatrix)` if the largest remaining pivot is
/// not above `rel_tol` times the largest entry magnitude of `a`.
///
/// # Panics
///
/// Panics if the dimensions of `a`, `b` and `x` disagree.
pub fn gauss_elim_pivot(
    a: &mut DMatrix<f64>,
    b: &mut DVector<f64>,
    x: &mut DVector<f64>,
    rel_tol: f64,
) -> Result<(), StepError> {
    let n = a.nrows();
    assert!(a.is_square(), "elimination requires a square matrix");
    assert_eq!(b.len(), n, "right-hand side length mismatch");
    assert_eq!(x.len(), n, "solution length mismatch");

    let threshold = rel_tol * a.amax();
    let mut col_perm: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let (mut pivot_row, mut pivot_col, mut max_val) = (k, k, 0.0);
        for j in k..n {
            for i in k..n {
                let v = a[(i, j)].abs();
                if v > max_val {
                    max_val = v;
                    pivot_row = i;
                    pivot_col = j;
                }
            }
        }
        if !(max_val > threshold) {
            return Err(StepError::SingularMatrix);
        }

        a.swap_rows(k, pivot_row);
        b.swap_rows(k, pivot_row);
        a.swap_columns(k, pivot_col);
        col_perm.swap(k, pivot_col);

        for i in (k + 1)..n {
            let factor = a[(i, k)] / a[(k, k)];
            a[(i, k)] = 0.0;
            for j in (k + 1)..n {
                a[(i, j)] -= factor * a[(k, j)];
            }
            b[i] -= factor * b[k];
        }
    }

    // Back substitution in permuted column order
    for k in (0..n).rev() {
        let mut sum = b[k];
        for j in (k + 1)..n {
            sum -= a[(k, j)] * b[j];
        }
        b[k] = sum / a[(k, k)];
    }
    for k in 0..n {
        x[col_perm[k]] = b[k];
    }
    Ok(())
}

// ============================================================================
// Sparse Triangular Solve
// ============================================================================

fn assert_factored(model: &Model, data: &Data, len: usize) {
    assert!(data.qld_valid, "L^T D L factor is not valid; call factor_ltdl first");
    assert_eq!(len, model.nv, "vector must have nv rows");
}

/// Solve `Lᵀ y = b` in place (scatter: propagate each DOF to its ancestors).
pub fn solve_lt(model: &Model, data: &Data, x: &mut DVector<f64>) {
    assert_factored(model, data, x.len());
    let (rowadr, rownnz, colind) = model.qld_csr();
    for i in (0..model.nv).rev() {
        let nnz_offdiag = rownnz[i] - 1;
        let xi = x[i];
        if nnz_offdiag == 0 || xi == 0.0 {
            continue;
        }
        let start = rowadr[i];
        for k in 0..nnz_offdiag {
            x[colind[start + k]] -= data.qld_data[start + k] * xi;
        }
    }
}

/// Solve `D z = y` in place.
pub fn solve_d(model: &Model, data: &Data, x: &mut DVector<f64>) {
    assert_factored(model, data, x.len());
    for i in 0..model.nv {
        x[i] *= data.qld_diag_inv[i];
    }
}

/// Solve `L w = z` in place (gather from ancestors).
pub fn solve_l(model: &Model, data: &Data, x: &mut DVector<f64>) {
    assert_factored(model, data, x.len());
    let (rowadr, rownnz, colind) = model.qld_csr();
    for i in 0..model.nv {
        let start = rowadr[i];
        for k in 0..rownnz[i] - 1 {
            x[i] -= data.qld_data[start + k] * x[colind[start + k]];
        }
    }
}

/// Solve `Lᵀ D L x = b` in place.
pub fn solve_ltdl(model: &Model, data: &Data, x: &mut DVector<f64>) {
    solve_lt(model, data, x);
    solve_d(model, data, x);
    solve_l(model, data, x);
}

/// Batch `Lᵀ Y = B` for every column of `x` (nv × n), sweeping the CSR rows once.
pub fn solve_lt_batch(model: &Model, data: &Data, x: &mut DMatrix<f64>) {
    assert_factored(model, data, x.nrows());
    let (rowadr, rownnz, colind) = model.qld_csr();
    for i in (0..model.nv).rev() {
        let nnz_offdiag = rownnz[i] - 1;
        if nnz_offdiag == 0 {
            continue;
        }
        let start = rowadr[i];
        for v in 0..x.ncols() {
            let xi = x[(i, v)];
            if xi == 0.0 {
                continue;
            }
            for k in 0..nnz_offdiag {
                x[(colind[start + k], v)] -= data.qld_data[start + k] * xi;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

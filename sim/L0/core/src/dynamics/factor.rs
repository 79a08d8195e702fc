//! Sparse L^T D L factorization of the joint-space inertia matrix.
//!
//! Exploits the tree sparsity structure (from `dof_parent` chains) for O(n)
//! factorization and solve. `H = Lᵀ D L` with `L` unit lower-triangular and
//! non-zero only at `(i, j)` where `j` is an ancestor DOF of `i`. Also includes
//! the CSR metadata precomputation for that sparse layout.

use nalgebra::DMatrix;
use tracing::warn;

use crate::types::{Data, Model, StepError};

impl Model {
    /// Compute CSR metadata for the sparse LDL factorization from `dof_parent` chains.
    ///
    /// Called by [`Model::add_body`] after every append, so the layout always
    /// matches the current tree.
    ///
    /// Each row stores off-diagonal entries (ancestors) followed by the diagonal
    /// (self-index) as the last element. `rownnz[i]` includes the diagonal, so
    /// `rownnz[i] - 1` is the off-diagonal count.
    pub fn compute_qld_csr_metadata(&mut self) {
        let nv = self.nv;
        self.qld_rownnz = vec![0; nv];
        self.qld_rowadr = vec![0; nv];

        // Pass 1: count entries per row (ancestors + diagonal)
        for i in 0..nv {
            let mut count = 0;
            let mut p = self.dof_parent[i];
            while let Some(j) = p {
                count += 1;
                p = self.dof_parent[j];
            }
            self.qld_rownnz[i] = count + 1;
        }

        // Pass 2: row addresses (prefix sum)
        let mut offset = 0;
        for i in 0..nv {
            self.qld_rowadr[i] = offset;
            offset += self.qld_rownnz[i];
        }
        self.qld_nnz = offset;

        // Pass 3: column indices, root ancestor first, diagonal last
        self.qld_colind = vec![0; self.qld_nnz];
        for i in 0..nv {
            let start = self.qld_rowadr[i];
            let n_anc = self.qld_rownnz[i] - 1;
            let mut k = n_anc;
            let mut p = self.dof_parent[i];
            while let Some(j) = p {
                k -= 1;
                self.qld_colind[start + k] = j;
                p = self.dof_parent[j];
            }
            self.qld_colind[start + n_anc] = i;
        }
    }
}

/// Sparse L^T D L factorization of the joint-space inertia matrix `h`.
///
/// Reads only the entries of `h` inside the tree sparsity pattern. The
/// elimination runs leaves-to-root, writing `L` (unit diagonal implied) and
/// `D` into `data.qld_data` and `1/D` into `data.qld_diag_inv`.
///
/// Row `i`'s off-diagonal entries at positions `0..a` (where `a` is the
/// position of ancestor `j` in row `i`) have exactly the column indices of
/// row `j`'s off-diagonals, so the rank-1 update is an element-wise scaled
/// addition.
///
/// # Errors
///
/// [`StepError::MassMatrixNotPositiveDefinite`] when a pivot is not strictly
/// positive. `data.qld_valid` is left `false` in that case.
///
/// # Panics
///
/// Panics if `h` is not `nv × nv`.
pub fn factor_ltdl(model: &Model, data: &mut Data, h: &DMatrix<f64>) -> Result<(), StepError> {
    let nv = model.nv;
    assert_eq!(h.shape(), (nv, nv), "mass matrix must be nv × nv");
    let (rowadr, rownnz, colind) = model.qld_csr();
    data.qld_valid = false;

    // Phase 1: copy H's sparse entries into flat CSR.
    for i in 0..nv {
        let start = rowadr[i];
        for k in 0..rownnz[i] {
            data.qld_data[start + k] = h[(i, colind[start + k])];
        }
    }

    // Phase 2: eliminate from leaves to root.
    for i in (0..nv).rev() {
        let start_i = rowadr[i];
        let nnz_offdiag = rownnz[i] - 1;
        let di = data.qld_data[start_i + nnz_offdiag];

        if !(di > 0.0) {
            warn!(dof = i, pivot = di, "non-positive pivot in L^T D L factorization");
            return Err(StepError::MassMatrixNotPositiveDefinite { dof: i });
        }
        let inv_di = 1.0 / di;
        data.qld_diag_inv[i] = inv_di;

        if nnz_offdiag == 0 {
            continue;
        }

        for k in 0..nnz_offdiag {
            data.qld_data[start_i + k] *= inv_di;
        }

        // Deep-to-shallow over ancestors j of i:
        //   D[j] -= L[i,j]^2 * D[i]
        //   row_j[0..a] -= L[i,j] * D[i] * row_i[0..a]
        for a in (0..nnz_offdiag).rev() {
            let j = colind[start_i + a];
            let lij = data.qld_data[start_i + a];

            let j_diag_pos = rowadr[j] + rownnz[j] - 1;
            data.qld_data[j_diag_pos] -= lij * lij * di;

            debug_assert_eq!(a, rownnz[j] - 1, "ancestor row superset property violated at DOF {i}");
            let scale = -lij * di;

            // j < i, so row j ends before row i starts.
            let start_j = rowadr[j];
            let (lo, hi) = data.qld_data.split_at_mut(start_i);
            let dst = &mut lo[start_j..start_j + a];
            for (d, s) in dst.iter_mut().zip(&hi[..a]) {
                *d += scale * s;
            }
        }
    }

    data.qld_valid = true;
    Ok(())
}

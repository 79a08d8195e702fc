//! Error types for constraint solving.

use sim_core::StepError;
use thiserror::Error;

use crate::linear_solver::LinearSolver;

/// Numerical failures reported by the contact solvers.
///
/// Contract violations (solving an unbound set, rebinding, mismatched
/// dimensions) are not represented here; they panic.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConstraintError {
    /// The linear system is singular or too ill-conditioned for the tolerance.
    #[error("{solver}: {size}×{size} system is singular to the configured tolerance")]
    SingularSystem {
        /// Strategy that detected the failure.
        solver: LinearSolver,
        /// System dimension.
        size: usize,
    },

    /// Cholesky factorization failed.
    #[error("{solver}: system matrix is not positive definite")]
    NotPositiveDefinite {
        /// Strategy that detected the failure.
        solver: LinearSolver,
    },

    /// The strategy cannot be used for this kind of system.
    #[error("{solver} is not supported for the {system}")]
    UnsupportedSolver {
        /// Rejected strategy.
        solver: LinearSolver,
        /// System description.
        system: &'static str,
    },

    /// The solve completed but produced NaN or infinite values.
    #[error("{solver}: solution is not finite")]
    NonFinite {
        /// Strategy that produced the solution.
        solver: LinearSolver,
    },

    /// Invalid solver configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The articulated-body recursion or mass-matrix factorization failed.
    #[error("dynamics failed: {0}")]
    Dynamics(#[from] StepError),
}

impl ConstraintError {
    /// Create an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the error stems from the constraint system itself rather than
    /// the configuration or the unconstrained dynamics.
    #[must_use]
    pub fn is_solver_failure(&self) -> bool {
        matches!(
            self,
            Self::SingularSystem { .. } | Self::NotPositiveDefinite { .. } | Self::NonFinite { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_solver() {
        let err = ConstraintError::SingularSystem {
            solver: LinearSolver::HouseholderQr,
            size: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("HouseholderQR"));
        assert!(msg.contains("4×4"));
        assert!(err.is_solver_failure());
    }

    #[test]
    fn step_errors_convert() {
        let err: ConstraintError = StepError::SingularArticulatedInertia { body: 2 }.into();
        assert!(matches!(err, ConstraintError::Dynamics(_)));
        assert!(!err.is_solver_failure());
    }
}

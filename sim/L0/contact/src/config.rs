//! Configuration for the contact solvers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::linear_solver::LinearSolver;

/// Settings shared by every solver operating on a [`ConstraintSet`].
///
/// [`ConstraintSet`]: crate::ConstraintSet
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactSolverConfig {
    /// Strategy for the final dense solve.
    pub linear_solver: LinearSolver,
    /// Relative pivot threshold below which a system counts as singular.
    pub singular_tolerance: f64,
}

impl Default for ContactSolverConfig {
    fn default() -> Self {
        Self {
            linear_solver: LinearSolver::ColPivHouseholderQr,
            singular_tolerance: 1e-12,
        }
    }
}

impl ContactSolverConfig {
    /// Configuration using partial-pivot LU, the cheapest general strategy.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            linear_solver: LinearSolver::PartialPivLu,
            ..Default::default()
        }
    }

    /// Set the linear-solve strategy.
    #[must_use]
    pub fn linear_solver(mut self, solver: LinearSolver) -> Self {
        self.linear_solver = solver;
        self
    }

    /// Set the relative singularity threshold.
    #[must_use]
    pub fn singular_tolerance(mut self, tolerance: f64) -> Self {
        self.singular_tolerance = tolerance;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// [`ConstraintError::InvalidConfig`] if the tolerance is not finite or
    /// lies outside `(0, 1)`.
    pub fn validate(&self) -> Result<(), ConstraintError> {
        if !self.singular_tolerance.is_finite() {
            return Err(ConstraintError::invalid_config("singular_tolerance must be finite"));
        }

        if self.singular_tolerance <= 0.0 || self.singular_tolerance >= 1.0 {
            return Err(ConstraintError::invalid_config(format!(
                "singular_tolerance must lie in (0, 1), got {}",
                self.singular_tolerance
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ContactSolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.linear_solver, LinearSolver::ColPivHouseholderQr);
        assert!(ContactSolverConfig::fast().validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let config = ContactSolverConfig::default()
            .linear_solver(LinearSolver::GaussElimPivot)
            .singular_tolerance(1e-9);
        assert_eq!(config.linear_solver, LinearSolver::GaussElimPivot);
        assert_eq!(config.singular_tolerance, 1e-9);
    }

    #[test]
    fn out_of_range_tolerance_rejected() {
        for tol in [0.0, -1e-6, 1.0, f64::NAN, f64::INFINITY] {
            let config = ContactSolverConfig::default().singular_tolerance(tol);
            assert!(matches!(config.validate(), Err(ConstraintError::InvalidConfig(_))), "{tol}");
        }
    }
}

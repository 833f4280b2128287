//! Error types for the solver kernel.
//!
//! Hard numerical failures (singular systems, exhausted iteration budgets) and
//! configuration mistakes (unknown parameter names) are reported through
//! [`SolverError`]. A Newton run that stops on a spurious minimum is not an
//! error; see [`crate::newton::RootStatus`].

use thiserror::Error;

/// Result type alias using [`SolverError`].
pub type Result<T> = std::result::Result<T, SolverError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    // ============ Linear Algebra ============
    /// A row of the matrix is identically zero.
    #[error("Singular system: row {row} is identically zero")]
    Singular { row: usize },

    // ============ Iteration Limits ============
    #[error("Newton-Raphson found no root in {iterations} iterations (|F|^2 = {residual:e})")]
    NoConvergence { iterations: usize, residual: f64 },

    /// The QR iteration exceeded its budget while isolating one eigenvalue.
    #[error("Eigenvalue iteration did not converge for index {index} after {iterations} iterations")]
    EigenNoConvergence { index: usize, iterations: usize },

    // ============ Line Search ============
    #[error("Line search received a non-finite direction or slope")]
    NonFiniteDirection,

    // ============ Configuration ============
    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },
}

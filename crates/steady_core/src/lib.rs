//! The `steady_core` crate finds the stationary points of parameterized systems
//! `du/dt = F(u; p)` with a fixed state dimension `N`, classifies their stability
//! and follows them over a sweep of one parameter.
//!
//! Key components:
//! - **Traits**: `VectorFunction` (the vector field), `Parameterized` and `Parameters`
//!   (named scalar parameters), `ParametricFn` (closure-backed systems).
//! - **LU**: scaled partial pivoting Crout decomposition for dense `N x N` systems.
//! - **Jacobian**: one-sided and centered finite differences.
//! - **Line Search / Newton**: globally convergent Newton-Raphson with spurious
//!   minimum detection.
//! - **Eigen**: balancing, Hessenberg reduction and shifted QR for nonsymmetric matrices.
//! - **Bump / Scan**: repulsion of known zeros, parameter scans, selection and
//!   branch-stitched reports.
pub mod bump;
pub mod eigen;
pub mod error;
pub mod jacobian;
pub mod line_search;
pub mod lu;
pub mod newton;
pub mod scan;
pub mod traits;

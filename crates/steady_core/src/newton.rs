//! Globally convergent Newton-Raphson for `F(u) = 0`.
//!
//! Each iteration takes the Newton direction from a finite-difference Jacobian
//! and an LU solve, then hands it to a [`LineSearch`] on `0.5 |F|^2`, which
//! backtracks until the merit decreases enough. Far from a root this keeps
//! the iteration from diverging; near a root full Newton steps are accepted
//! and convergence is quadratic.

use crate::error::{Result, SolverError};
use crate::jacobian::{Jacobian, JacobianSettings};
use crate::line_search::{LineSearch, LineSearchSettings};
use crate::lu::LuDecomposition;
use crate::traits::{Vector, VectorFunction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_iterations: usize,
    /// A point is a root once `|F|^2 < tolerance_f^2`.
    pub tolerance_f: f64,
    /// A stalled line search is a spurious minimum when the scaled merit
    /// gradient is below this.
    pub tolerance_min: f64,
    /// Relative step size that counts as convergence in `u`.
    pub tolerance_x: f64,
    /// Step length limit, relative to `max(|u|, N)` at the start.
    pub max_step: f64,
    pub jacobian: JacobianSettings,
    pub line_search: LineSearchSettings,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance_f: 1e-8,
            tolerance_min: 1e-6,
            tolerance_x: 1e-8,
            max_step: 100.0,
            jacobian: JacobianSettings::default(),
            line_search: LineSearchSettings::default(),
        }
    }
}

/// How a successful [`NewtonRoot::find_root`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootStatus {
    /// `|F|^2` fell below the residual tolerance.
    Root,
    /// The iterate stopped moving. Usually a root, but not guaranteed.
    StepConverged,
    /// The line search stalled where the merit gradient vanishes but `F` does not.
    SpuriousMinimum,
}

impl RootStatus {
    pub fn is_root(self) -> bool {
        matches!(self, RootStatus::Root | RootStatus::StepConverged)
    }

    pub fn is_wrong_min(self) -> bool {
        self == RootStatus::SpuriousMinimum
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResult<const N: usize> {
    pub point: Vector<N>,
    /// `|F(point)|^2`.
    pub residual: f64,
    pub iterations: usize,
    pub status: RootStatus,
}

pub struct NewtonRoot<F, const N: usize> {
    search: LineSearch<F, N>,
    settings: NewtonSettings,
    wrong_min: bool,
    no_root: bool,
}

impl<'a, F: VectorFunction<N> + ?Sized, const N: usize> NewtonRoot<&'a F, N> {
    pub fn borrowed(function: &'a F) -> Self {
        Self::owned(function)
    }
}

impl<F: VectorFunction<N>, const N: usize> NewtonRoot<F, N> {
    pub fn owned(function: F) -> Self {
        let settings = NewtonSettings::default();
        Self {
            search: LineSearch::owned(function).with_settings(settings.line_search),
            settings,
            wrong_min: false,
            no_root: false,
        }
    }

    pub fn with_settings(mut self, settings: NewtonSettings) -> Self {
        self.search = self.search.with_settings(settings.line_search);
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &NewtonSettings {
        &self.settings
    }

    pub fn function(&self) -> &F {
        self.search.merit().function()
    }

    pub fn into_function(self) -> F {
        self.search.into_function()
    }

    /// The last call stopped where the line search could not make progress.
    pub fn wrong_min(&self) -> bool {
        self.wrong_min
    }

    /// The last call exhausted `max_iterations`.
    pub fn no_root(&self) -> bool {
        self.no_root
    }

    pub fn find_root(&mut self, start: &Vector<N>) -> Result<RootResult<N>> {
        self.wrong_min = false;
        self.no_root = false;

        let NewtonSettings {
            max_iterations,
            tolerance_f,
            tolerance_min,
            tolerance_x,
            max_step,
            jacobian,
            ..
        } = self.settings;
        let tol_f_sq = tolerance_f * tolerance_f;

        let mut u = *start;
        let mut f = self.search.merit_mut().evaluate(&u);
        let mut fvec = *self.search.merit().last_value();

        if fvec.norm_squared() < 0.01 * tol_f_sq {
            return Ok(self.finish(u, &fvec, 0, RootStatus::Root));
        }

        let step_limit = max_step * u.norm().max(N as f64);

        for iteration in 1..=max_iterations {
            let jac = Jacobian::borrowed(self.search.merit().function())
                .with_settings(jacobian)
                .calculate_with_value(&u, &fvec);
            let gradient = jac.transpose() * fvec;

            let mut direction = -fvec;
            LuDecomposition::decompose(jac)?.solve(&mut direction);

            let u_old = u;
            let step = self
                .search
                .search(&u_old, f, &gradient, &direction, step_limit)?;
            u = step.point;
            f = step.merit;
            fvec = step.value;

            let residual = fvec.norm_squared();
            tracing::trace!(
                "newton iteration {} |F|^2={:e} lambda={:e} too_close={}",
                iteration,
                residual,
                step.lambda,
                step.too_close
            );

            if residual < tol_f_sq {
                return Ok(self.finish(u, &fvec, iteration, RootStatus::Root));
            }

            if step.too_close {
                let denominator = f.max(0.5 * N as f64);
                let gradient_test = gradient
                    .iter()
                    .zip(u.iter())
                    .fold(0.0f64, |acc, (g, ui)| {
                        acc.max(g.abs() * ui.abs().max(1.0) / denominator)
                    });
                if gradient_test < tolerance_min {
                    return Ok(self.finish(u, &fvec, iteration, RootStatus::SpuriousMinimum));
                }
                // Otherwise `u == u_old` and the step test below accepts it.
            }

            let step_test = u
                .iter()
                .zip(u_old.iter())
                .fold(0.0f64, |acc, (ui, oi)| {
                    acc.max((ui - oi).abs() / ui.abs().max(1.0))
                });
            if step_test < tolerance_x {
                return Ok(self.finish(u, &fvec, iteration, RootStatus::StepConverged));
            }
        }

        self.no_root = true;
        Err(SolverError::NoConvergence {
            iterations: max_iterations,
            residual: fvec.norm_squared(),
        })
    }

    fn finish(
        &mut self,
        point: Vector<N>,
        fvec: &Vector<N>,
        iterations: usize,
        status: RootStatus,
    ) -> RootResult<N> {
        self.wrong_min = status.is_wrong_min();
        RootResult {
            point,
            residual: fvec.norm_squared(),
            iterations,
            status,
        }
    }
}

//! Backtracking line search on the merit function `0.5 |F|^2`.

use crate::error::{Result, SolverError};
use crate::traits::{Vector, VectorFunction};
use serde::{Deserialize, Serialize};

/// `scale * |F(u)|^2`, remembering the last `F(u)` it computed.
#[derive(Debug, Clone)]
pub struct MeritFunction<F, const N: usize> {
    function: F,
    scale: f64,
    last_value: Vector<N>,
}

impl<F: VectorFunction<N>, const N: usize> MeritFunction<F, N> {
    pub fn new(function: F) -> Self {
        Self {
            function,
            scale: 0.5,
            last_value: Vector::<N>::zeros(),
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn evaluate(&mut self, u: &Vector<N>) -> f64 {
        self.last_value = self.function.evaluate(u);
        self.scale * self.last_value.norm_squared()
    }

    /// `F` at the point of the most recent [`MeritFunction::evaluate`] call.
    pub fn last_value(&self) -> &Vector<N> {
        &self.last_value
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    pub fn into_function(self) -> F {
        self.function
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineSearchSettings {
    /// Sufficient decrease constant of the Armijo test.
    pub alpha: f64,
    /// Relative step below which the search gives up.
    pub tolerance: f64,
    /// Smallest factor by which lambda shrinks per backtrack.
    pub min_factor: f64,
    /// Largest factor by which lambda shrinks per backtrack.
    pub max_factor: f64,
}

impl Default for LineSearchSettings {
    fn default() -> Self {
        Self {
            alpha: 1e-4,
            tolerance: 1e-7,
            min_factor: 0.1,
            max_factor: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineSearchStep<const N: usize> {
    pub point: Vector<N>,
    /// Merit at `point`.
    pub merit: f64,
    /// `F(point)`.
    pub value: Vector<N>,
    /// The step shrank below the tolerance; `point` is the previous point.
    pub too_close: bool,
    pub lambda: f64,
}

#[derive(Debug, Clone)]
pub struct LineSearch<F, const N: usize> {
    merit: MeritFunction<F, N>,
    settings: LineSearchSettings,
}

impl<'a, F: VectorFunction<N> + ?Sized, const N: usize> LineSearch<&'a F, N> {
    pub fn borrowed(function: &'a F) -> Self {
        Self::owned(function)
    }
}

impl<F: VectorFunction<N>, const N: usize> LineSearch<F, N> {
    pub fn owned(function: F) -> Self {
        Self {
            merit: MeritFunction::new(function),
            settings: LineSearchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: LineSearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn merit(&self) -> &MeritFunction<F, N> {
        &self.merit
    }

    pub fn merit_mut(&mut self) -> &mut MeritFunction<F, N> {
        &mut self.merit
    }

    pub fn into_function(self) -> F {
        self.merit.into_function()
    }

    /// Moves from `u_old` along `direction` until the merit decreases enough.
    ///
    /// `f_old` is the merit at `u_old` and `gradient` its gradient there.
    /// `direction` is shortened to `max_step` when longer. The first backtrack
    /// minimizes a quadratic model of the merit along the line, later ones a
    /// cubic through the last two trial points. When lambda falls under
    /// `tolerance / max_i(|p_i| / max(|u_old_i|, 1))` the search stops with
    /// `too_close` set and returns `u_old`.
    pub fn search(
        &mut self,
        u_old: &Vector<N>,
        f_old: f64,
        gradient: &Vector<N>,
        direction: &Vector<N>,
        max_step: f64,
    ) -> Result<LineSearchStep<N>> {
        let LineSearchSettings {
            alpha,
            tolerance,
            min_factor,
            max_factor,
        } = self.settings;

        let mut p = *direction;
        let length = p.norm();
        if length > max_step {
            p *= max_step / length;
        }

        let slope = gradient.dot(&p);
        if !slope.is_finite() || p.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFiniteDirection);
        }

        let lambda_scale = p
            .iter()
            .zip(u_old.iter())
            .fold(0.0f64, |acc, (pi, ui)| acc.max(pi.abs() / ui.abs().max(1.0)));
        let lambda_min = tolerance / lambda_scale;

        let mut lambda = 1.0f64;
        let mut lambda_prev = 0.0f64;
        let mut f_prev = 0.0f64;
        loop {
            let u = u_old + p * lambda;
            let f = self.merit.evaluate(&u);

            if lambda < lambda_min {
                let value = self.merit.function().evaluate(u_old);
                return Ok(LineSearchStep {
                    point: *u_old,
                    merit: f_old,
                    value,
                    too_close: true,
                    lambda,
                });
            }
            if f <= f_old + alpha * lambda * slope {
                return Ok(LineSearchStep {
                    point: u,
                    merit: f,
                    value: *self.merit.last_value(),
                    too_close: false,
                    lambda,
                });
            }

            let candidate = if lambda == 1.0 {
                -slope / (2.0 * (f - f_old - slope))
            } else {
                let rhs1 = f - f_old - lambda * slope;
                let rhs2 = f_prev - f_old - lambda_prev * slope;
                let l1 = lambda * lambda;
                let l2 = lambda_prev * lambda_prev;
                let a = (rhs1 / l1 - rhs2 / l2) / (lambda - lambda_prev);
                let b = (-lambda_prev * rhs1 / l1 + lambda * rhs2 / l2) / (lambda - lambda_prev);
                let cubic = if a == 0.0 {
                    -slope / (2.0 * b)
                } else {
                    let disc = b * b - 3.0 * a * slope;
                    if disc < 0.0 {
                        max_factor * lambda
                    } else if b <= 0.0 {
                        (-b + disc.sqrt()) / (3.0 * a)
                    } else {
                        -slope / (b + disc.sqrt())
                    }
                };
                cubic.min(max_factor * lambda)
            };

            lambda_prev = lambda;
            f_prev = f;
            // f64::max drops a NaN candidate in favour of the lower bound.
            lambda = candidate.max(min_factor * lambda);
        }
    }
}

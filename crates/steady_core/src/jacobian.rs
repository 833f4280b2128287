//! Finite-difference Jacobians of a [`VectorFunction`].
//!
//! `J[(i, j)] = dF_i / du_j`, so row `i` holds every derivative of component `i`.

use crate::traits::{Matrix, Vector, VectorFunction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JacobianSettings {
    /// Relative step size. Halved for centered differences.
    pub epsilon: f64,
}

impl Default for JacobianSettings {
    fn default() -> Self {
        Self { epsilon: 1e-4 }
    }
}

#[derive(Debug, Clone)]
pub struct Jacobian<F> {
    function: F,
    settings: JacobianSettings,
}

impl<'a, F: ?Sized> Jacobian<&'a F> {
    /// Differentiates a function the caller keeps ownership of.
    pub fn borrowed(function: &'a F) -> Self {
        Self {
            function,
            settings: JacobianSettings::default(),
        }
    }
}

impl<F> Jacobian<F> {
    /// Takes ownership of `function`.
    pub fn owned(function: F) -> Self {
        Self {
            function,
            settings: JacobianSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: JacobianSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.settings.epsilon = epsilon;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.settings.epsilon
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    pub fn into_function(self) -> F {
        self.function
    }

    /// One-sided differences: `N + 1` evaluations.
    pub fn calculate<const N: usize>(&self, u: &Vector<N>) -> Matrix<N>
    where
        F: VectorFunction<N>,
    {
        let fu = self.function.evaluate(u);
        self.calculate_with_value(u, &fu)
    }

    /// One-sided differences reusing a known `fu = F(u)`: `N` evaluations.
    pub fn calculate_with_value<const N: usize>(&self, u: &Vector<N>, fu: &Vector<N>) -> Matrix<N>
    where
        F: VectorFunction<N>,
    {
        let mut jac = Matrix::<N>::zeros();
        for j in 0..N {
            let mut shifted = *u;
            shifted[j] += self.step(u[j], self.settings.epsilon);
            // Exactly representable step.
            let du = shifted[j] - u[j];
            let f_shifted = self.function.evaluate(&shifted);
            jac.set_column(j, &((f_shifted - fu) / du));
        }
        jac
    }

    /// Centered differences: `2N` evaluations, second order accurate.
    pub fn calculate_accurate<const N: usize>(&self, u: &Vector<N>) -> Matrix<N>
    where
        F: VectorFunction<N>,
    {
        let mut jac = Matrix::<N>::zeros();
        for j in 0..N {
            let du = self.step(u[j], self.settings.epsilon / 2.0);
            let mut forward = *u;
            let mut backward = *u;
            forward[j] += du;
            backward[j] -= du;
            let du_forward = forward[j] - u[j];
            let du_backward = u[j] - backward[j];
            let diff = self.function.evaluate(&forward) - self.function.evaluate(&backward);
            jac.set_column(j, &(diff / (du_forward + du_backward)));
        }
        jac
    }

    fn step(&self, uj: f64, epsilon: f64) -> f64 {
        let du = epsilon * uj.abs();
        if du == 0.0 {
            epsilon
        } else {
            du
        }
    }
}

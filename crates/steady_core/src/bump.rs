//! Repulsion of already known zeros.
//!
//! [`BumpedFunction`] wraps a vector function and multiplies it by a scalar
//! factor that depends on the distance to a list of known zeros. Running
//! Newton-Raphson on the wrapped function from a start that previously
//! converged to one of those zeros then leads somewhere else.

use crate::traits::{Vector, VectorFunction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BumpProfile {
    /// `F(u) * (1 + prod_b d_b / |d_b - radius|)` with `d_b = |u - b|`.
    ///
    /// The factor is singular on a thin sphere of `radius` around each
    /// bump, walling in the known zero.
    Shell { radius: f64 },
    /// `F(u) * prod_b (d_b^-power + shift)`.
    ///
    /// Every known zero becomes a pole while far from all bumps the
    /// function is only rescaled by `shift^count`.
    Deflation { power: i32, shift: f64 },
}

impl BumpProfile {
    /// The hypersphere used by the classic scanner: 1.5 times the Newton step tolerance.
    pub fn shell_for_tolerance(tolerance_x: f64) -> Self {
        BumpProfile::Shell {
            radius: 1.5 * tolerance_x,
        }
    }
}

impl Default for BumpProfile {
    fn default() -> Self {
        BumpProfile::Deflation {
            power: 2,
            shift: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BumpedFunction<F, const N: usize> {
    function: F,
    bumps: Vec<Vector<N>>,
    profile: BumpProfile,
}

impl<'a, F: VectorFunction<N> + ?Sized, const N: usize> BumpedFunction<&'a F, N> {
    pub fn borrowed(function: &'a F) -> Self {
        Self::owned(function)
    }
}

impl<F: VectorFunction<N>, const N: usize> BumpedFunction<F, N> {
    pub fn owned(function: F) -> Self {
        Self {
            function,
            bumps: Vec::new(),
            profile: BumpProfile::default(),
        }
    }

    pub fn with_profile(mut self, profile: BumpProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn add_bump(&mut self, position: Vector<N>) {
        self.bumps.push(position);
    }

    pub fn clear_bumps(&mut self) {
        self.bumps.clear();
    }

    pub fn bumps(&self) -> &[Vector<N>] {
        &self.bumps
    }

    pub fn profile(&self) -> BumpProfile {
        self.profile
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    /// Scalar multiplying `F(u)`; exactly 1 without bumps.
    pub fn factor(&self, u: &Vector<N>) -> f64 {
        if self.bumps.is_empty() {
            return 1.0;
        }
        match self.profile {
            BumpProfile::Shell { radius } => {
                let product = self.bumps.iter().fold(1.0, |acc, b| {
                    let d = (u - b).norm();
                    acc * d / (d - radius).abs()
                });
                1.0 + product
            }
            BumpProfile::Deflation { power, shift } => self.bumps.iter().fold(1.0, |acc, b| {
                let d = (u - b).norm();
                acc * (d.powi(-power) + shift)
            }),
        }
    }
}

impl<F: VectorFunction<N>, const N: usize> VectorFunction<N> for BumpedFunction<F, N> {
    fn evaluate(&self, u: &Vector<N>) -> Vector<N> {
        let value = self.function.evaluate(u);
        if self.bumps.is_empty() {
            value
        } else {
            value * self.factor(u)
        }
    }
}

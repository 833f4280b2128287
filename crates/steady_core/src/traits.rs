use crate::error::{Result, SolverError};
use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// State vector of a system with `N` components.
pub type Vector<const N: usize> = SVector<f64, N>;

/// Square `N x N` matrix, indexed `(row, column)`.
pub type Matrix<const N: usize> = SMatrix<f64, N, N>;

/// A vector field `F: R^N -> R^N`, usually the right-hand side of `du/dt = F(u; p)`.
///
/// Implementations must be pure with respect to `u` and their named parameters:
/// the solvers call `evaluate` many times and rely on equal inputs giving equal
/// outputs.
pub trait VectorFunction<const N: usize> {
    fn evaluate(&self, u: &Vector<N>) -> Vector<N>;
}

/// Access to the named scalar parameters of a system.
pub trait Parameterized {
    fn parameters(&self) -> &Parameters;

    fn parameters_mut(&mut self) -> &mut Parameters;

    fn get_parameter(&self, name: &str) -> Result<f64> {
        self.parameters().get(name)
    }

    fn parameter_mut(&mut self, name: &str) -> Result<&mut f64> {
        self.parameters_mut().get_mut(name)
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        *self.parameter_mut(name)? = value;
        Ok(())
    }

    /// Adds `name` to the table, or overwrites its value when it already exists.
    fn define_parameter(&mut self, name: &str, value: f64) -> ParamId {
        self.parameters_mut().define(name, value)
    }
}

/// Index of a parameter inside a [`Parameters`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamId(pub usize);

/// Name to value table for system parameters.
///
/// Lookup by name is linear; systems that read a parameter on every evaluation
/// should hold on to the [`ParamId`] returned by [`Parameters::define`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    names: Vec<String>,
    values: Vec<f64>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, value: f64) -> ParamId {
        if let Some(id) = self.position(name) {
            self.values[id.0] = value;
            return id;
        }
        self.names.push(name.to_string());
        self.values.push(value);
        ParamId(self.values.len() - 1)
    }

    pub fn id(&self, name: &str) -> Result<ParamId> {
        self.position(name)
            .ok_or_else(|| SolverError::ParameterNotFound {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        Ok(self[self.id(name)?])
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut f64> {
        let id = self.id(name)?;
        Ok(&mut self[id])
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        *self.get_mut(name)? = value;
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn position(&self, name: &str) -> Option<ParamId> {
        self.names.iter().position(|n| n == name).map(ParamId)
    }
}

impl Index<ParamId> for Parameters {
    type Output = f64;

    fn index(&self, id: ParamId) -> &f64 {
        &self.values[id.0]
    }
}

impl IndexMut<ParamId> for Parameters {
    fn index_mut(&mut self, id: ParamId) -> &mut f64 {
        &mut self.values[id.0]
    }
}

/// A system assembled from a closure and a parameter table.
///
/// The closure receives the state and the current parameters:
///
/// ```
/// use steady_core::traits::{ParametricFn, Parameters, Vector, VectorFunction};
///
/// let mut params = Parameters::new();
/// let p = params.define("p", 0.5);
/// let f = ParametricFn::new(params, move |u: &Vector<1>, par: &Parameters| {
///     Vector::<1>::new(par[p] - u[0])
/// });
/// assert_eq!(f.evaluate(&Vector::<1>::new(0.5))[0], 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct ParametricFn<G> {
    params: Parameters,
    f: G,
}

impl<G> ParametricFn<G> {
    pub fn new(params: Parameters, f: G) -> Self {
        Self { params, f }
    }
}

impl<const N: usize, G> VectorFunction<N> for ParametricFn<G>
where
    G: Fn(&Vector<N>, &Parameters) -> Vector<N>,
{
    fn evaluate(&self, u: &Vector<N>) -> Vector<N> {
        (self.f)(u, &self.params)
    }
}

impl<G> Parameterized for ParametricFn<G> {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }
}

impl<const N: usize, F: VectorFunction<N> + ?Sized> VectorFunction<N> for &F {
    fn evaluate(&self, u: &Vector<N>) -> Vector<N> {
        (**self).evaluate(u)
    }
}

impl<const N: usize, F: VectorFunction<N> + ?Sized> VectorFunction<N> for &mut F {
    fn evaluate(&self, u: &Vector<N>) -> Vector<N> {
        (**self).evaluate(u)
    }
}

impl<const N: usize, F: VectorFunction<N> + ?Sized> VectorFunction<N> for Box<F> {
    fn evaluate(&self, u: &Vector<N>) -> Vector<N> {
        (**self).evaluate(u)
    }
}

impl<F: Parameterized + ?Sized> Parameterized for &mut F {
    fn parameters(&self) -> &Parameters {
        (**self).parameters()
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        (**self).parameters_mut()
    }
}

impl<F: Parameterized + ?Sized> Parameterized for Box<F> {
    fn parameters(&self) -> &Parameters {
        (**self).parameters()
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        (**self).parameters_mut()
    }
}

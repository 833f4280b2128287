//! Built-in systems available from the command line.

use steady_core::traits::{ParamId, Parameterized, Parameters, Vector, VectorFunction};

/// Single-mode semiconductor laser rate equations for photon density `p` and
/// carrier density `n`, pumped by `current`.
pub struct SingleMode {
    params: Parameters,
    rho: ParamId,
    gain: ParamId,
    spontaneous: ParamId,
    current: ParamId,
}

impl SingleMode {
    pub fn new() -> Self {
        let mut params = Parameters::new();
        let rho = params.define("rho", 1e-3);
        let gain = params.define("gain", 1.1);
        let spontaneous = params.define("spontaneous", 1e-9);
        let current = params.define("current", 0.0);
        Self {
            params,
            rho,
            gain,
            spontaneous,
            current,
        }
    }

    /// Initial guesses on the lasing and the non-lasing side of threshold.
    pub fn default_starts() -> Vec<Vector<2>> {
        vec![Vector::<2>::new(1.0, 1.0), Vector::<2>::new(1.0, 2.0)]
    }
}

impl Default for SingleMode {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorFunction<2> for SingleMode {
    fn evaluate(&self, u: &Vector<2>) -> Vector<2> {
        let p = &self.params;
        let (photons, carriers) = (u[0], u[1]);
        Vector::<2>::new(
            (p[self.gain] * (carriers - 1.0) * photons - photons) / p[self.rho]
                + p[self.spontaneous],
            p[self.current] - carriers - carriers * photons,
        )
    }
}

impl Parameterized for SingleMode {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }
}

/// `du/dt = p - u + u^3`: three equilibria between the two folds at
/// `p = +-2 / (3 sqrt 3)`, one outside.
pub struct Bistable {
    params: Parameters,
    p: ParamId,
}

impl Bistable {
    pub fn new() -> Self {
        let mut params = Parameters::new();
        let p = params.define("p", 0.0);
        Self { params, p }
    }

    pub fn default_starts() -> Vec<Vector<1>> {
        vec![
            Vector::<1>::new(-1.5),
            Vector::<1>::new(0.0),
            Vector::<1>::new(1.5),
        ]
    }
}

impl Default for Bistable {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorFunction<1> for Bistable {
    fn evaluate(&self, u: &Vector<1>) -> Vector<1> {
        Vector::<1>::new(self.params[self.p] - u[0] + u[0].powi(3))
    }
}

impl Parameterized for Bistable {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }
}

//! Parameter scan of a single-mode semiconductor laser.
//!
//! Rate equations for photon density `p` and carrier density `n`, pumped by
//! the current `j`:
//!
//! ```text
//! dp/dt = (g (n - 1) p - p) / rho + beta
//! dn/dt = j - n - n p
//! ```
//!
//! Above threshold the carriers clamp at `n = 1 + 1/g` and the light output
//! grows linearly with the current.

use steady_core::scan::{criteria, RootScanner};
use steady_core::traits::{ParamId, Parameterized, Parameters, Vector, VectorFunction};

const RHO: f64 = 1e-3;
const GAIN: f64 = 1.1;
const BETA: f64 = 1e-9;

struct SingleMode {
    params: Parameters,
    current: ParamId,
}

impl SingleMode {
    fn new(current: f64) -> Self {
        let mut params = Parameters::new();
        let current = params.define("current", current);
        Self { params, current }
    }
}

impl VectorFunction<2> for SingleMode {
    fn evaluate(&self, u: &Vector<2>) -> Vector<2> {
        let (p, n) = (u[0], u[1]);
        let j = self.params[self.current];
        Vector::<2>::new(
            (GAIN * (n - 1.0) * p - p) / RHO + BETA,
            j - n - n * p,
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

fn threshold_density() -> f64 {
    1.0 + 1.0 / GAIN
}

#[test]
fn lasing_branch_is_found_and_stable() {
    let mut laser = SingleMode::new(0.0);
    let mut scanner = RootScanner::borrowed(&mut laser, "current", Vector::<2>::new(1.0, 1.0))
        .expect("current is defined");
    scanner.add_start(Vector::<2>::new(1.0, 2.0));
    let roots = scanner.scan(2.5, 4.0, 7).expect("valid scan").clone();
    drop(scanner);

    assert_eq!(laser.get_parameter("current").expect("current"), 0.0);
    assert_eq!(roots.samples().len(), 7);

    let n_th = threshold_density();
    let stable = roots.select(criteria::stable);
    assert_eq!(stable.samples().len(), 7);
    for sample in stable.samples() {
        let j = sample.param;
        let lasing = sample
            .points
            .iter()
            .find(|point| point.solution().map_or(false, |u| u[0] > 1e-3))
            .unwrap_or_else(|| panic!("no lasing solution at j = {j}"));
        let u = lasing.solution().expect("solution");
        assert!((u[1] - n_th).abs() < 1e-5 * n_th, "n = {} at j = {j}", u[1]);
        let expected_p = (j - n_th) / n_th;
        assert!(
            (u[0] - expected_p).abs() < 1e-5 * expected_p,
            "p = {} vs {expected_p} at j = {j}",
            u[0]
        );

        // Damped relaxation oscillations: a complex pair with negative real part.
        let re = lasing.eigen_real().expect("eigenvalues");
        let im = lasing.eigen_imag().expect("eigenvalues");
        assert!(re.iter().all(|&v| v < 0.0));
        assert!(im.iter().all(|&v| v != 0.0));
        assert!((re[0] + re[1] + 1.0 + u[0]).abs() < 1e-3, "trace mismatch");
    }

    assert!(roots.select(criteria::positive).len() >= 7);
}

#[test]
fn below_threshold_only_spontaneous_emission() {
    let laser = SingleMode::new(1.0);
    let mut scanner = RootScanner::<_, 2>::at_current(laser);
    scanner.add_start(Vector::<2>::new(0.0, 1.0));
    let points = scanner.stationary_points();
    let stable: Vec<_> = points.iter().filter(|p| criteria::stable(p)).collect();
    assert_eq!(stable.len(), 1);
    let u = stable[0].solution().expect("solution");
    assert!(u[0].abs() < 1e-6, "p = {}", u[0]);
    assert!((u[1] - 1.0).abs() < 1e-6, "n = {}", u[1]);
}

#[test]
fn stable_branch_report() {
    let mut scanner =
        RootScanner::owned(SingleMode::new(0.0), "current", Vector::<2>::new(1.0, 2.0))
            .expect("current is defined");
    scanner.scan(2.0, 3.0, 5).expect("valid scan");
    let stable = scanner.roots().select(criteria::stable);

    let mut out = Vec::new();
    let pieces = stable.print_list(&mut out, 1.0).expect("write to vec");
    let report = String::from_utf8(out).expect("utf8");
    assert!(pieces >= 1);
    assert!(report.contains("Start of list starting at 2"));
    assert!(report.ends_with(&format!("# Number of distinct pieces: {pieces}\n")));
    let data_lines = report
        .lines()
        .filter(|line| !line.starts_with('#') && !line.is_empty())
        .count();
    assert_eq!(data_lines, stable.len());
}

#[test]
fn tutorial_range_keeps_converged_roots() {
    let mut scanner =
        RootScanner::owned(SingleMode::new(0.0), "current", Vector::<2>::repeat(1.0))
            .expect("current is defined");
    let roots = scanner.scan(0.0, 6.0, 100).expect("valid scan");
    let stable = roots.select(criteria::stable);
    assert!(roots.samples().len() >= 98, "{} samples", roots.samples().len());
    assert!(stable.len() >= 97, "{} stable points", stable.len());
}

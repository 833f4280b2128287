//! Parameter scans: stationary points and their stability over a range of
//! one named parameter.
//!
//! [`RootScanner`] sweeps the parameter and collects every zero it can find
//! into a [`ScanList`], together with the eigenvalues of the Jacobian at that
//! zero. The list can be filtered with [`ScanList::select`] and the
//! [`criteria`] functions, dumped with [`ScanList::print_raw`], or stitched
//! into continuous branches with [`ScanList::print_list`].

use crate::bump::{BumpProfile, BumpedFunction};
use crate::eigen::{EigenSettings, Eigenvalues};
use crate::jacobian::Jacobian;
use crate::newton::{NewtonRoot, NewtonSettings};
use crate::traits::{Parameterized, Vector, VectorFunction};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::{self, Write};
use std::ops::AddAssign;

/// Everything recorded about one stationary point: conventionally the
/// solution, the real parts and the imaginary parts of the eigenvalues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParPoint<const N: usize> {
    pub vectors: Vec<Vector<N>>,
}

impl<const N: usize> ParPoint<N> {
    pub fn new(vectors: Vec<Vector<N>>) -> Self {
        Self { vectors }
    }

    pub fn stationary(solution: Vector<N>, eigenvalues: &Eigenvalues<N>) -> Self {
        Self {
            vectors: vec![solution, *eigenvalues.real(), *eigenvalues.imag()],
        }
    }

    pub fn solution(&self) -> Option<&Vector<N>> {
        self.vectors.first()
    }

    pub fn eigen_real(&self) -> Option<&Vector<N>> {
        self.vectors.get(1)
    }

    pub fn eigen_imag(&self) -> Option<&Vector<N>> {
        self.vectors.get(2)
    }

    fn write_fields<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for vector in &self.vectors {
            for value in vector.iter() {
                write!(out, "\t{}", value)?;
            }
        }
        Ok(())
    }
}

/// Selection predicates for [`ScanList::select`].
pub mod criteria {
    use super::ParPoint;

    /// Solution components above this count as non-negative.
    pub const SIGN_TOLERANCE: f64 = 1e-4;

    pub fn all<const N: usize>(_point: &ParPoint<N>) -> bool {
        true
    }

    /// Every eigenvalue has a negative real part.
    pub fn stable<const N: usize>(point: &ParPoint<N>) -> bool {
        point
            .eigen_real()
            .map_or(false, |re| re.iter().all(|&v| v < 0.0))
    }

    pub fn unstable<const N: usize>(point: &ParPoint<N>) -> bool {
        !stable(point)
    }

    /// Every solution component is above `-SIGN_TOLERANCE`.
    pub fn positive<const N: usize>(point: &ParPoint<N>) -> bool {
        point
            .solution()
            .map_or(false, |u| u.iter().all(|&v| v > -SIGN_TOLERANCE))
    }

    pub fn negative<const N: usize>(point: &ParPoint<N>) -> bool {
        !positive(point)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSample<const N: usize> {
    pub param: f64,
    pub points: Vec<ParPoint<N>>,
}

/// Stationary points keyed by parameter value, in ascending parameter order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanList<const N: usize> {
    samples: Vec<ScanSample<N>>,
}

/// A run of points judged to lie on one continuous solution branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch<const N: usize> {
    pub points: Vec<(f64, ParPoint<N>)>,
}

impl<const N: usize> Branch<N> {
    pub fn start(&self) -> f64 {
        self.points.first().map_or(f64::NAN, |(param, _)| *param)
    }
}

impl<const N: usize> ScanList<N> {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Adds `point` to the sample at `param`, creating it if needed.
    pub fn push(&mut self, param: f64, point: ParPoint<N>) {
        match self
            .samples
            .binary_search_by(|sample| sample.param.total_cmp(&param))
        {
            Ok(idx) => self.samples[idx].points.push(point),
            Err(idx) => self.samples.insert(
                idx,
                ScanSample {
                    param,
                    points: vec![point],
                },
            ),
        }
    }

    pub fn samples(&self) -> &[ScanSample<N>] {
        &self.samples
    }

    /// Number of recorded points over all parameter values.
    pub fn len(&self) -> usize {
        self.samples.iter().map(|s| s.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn points_at(&self, param: f64) -> Option<&[ParPoint<N>]> {
        self.samples
            .binary_search_by(|sample| sample.param.total_cmp(&param))
            .ok()
            .map(|idx| self.samples[idx].points.as_slice())
    }

    /// The sample whose parameter is closest to `param`.
    pub fn nearest(&self, param: f64) -> Option<&ScanSample<N>> {
        self.samples.iter().min_by(|a, b| {
            (a.param - param)
                .abs()
                .partial_cmp(&(b.param - param).abs())
                .unwrap_or(Ordering::Equal)
        })
    }

    /// A copy holding only the points for which `predicate` holds. Parameter
    /// values left without points are dropped.
    pub fn select<P>(&self, predicate: P) -> Self
    where
        P: Fn(&ParPoint<N>) -> bool,
    {
        let samples = self
            .samples
            .iter()
            .filter_map(|sample| {
                let points: Vec<_> = sample
                    .points
                    .iter()
                    .filter(|p| predicate(p))
                    .cloned()
                    .collect();
                (!points.is_empty()).then(|| ScanSample {
                    param: sample.param,
                    points,
                })
            })
            .collect();
        Self { samples }
    }

    /// Merges every point of `other` into this list.
    pub fn extend(&mut self, other: &ScanList<N>) {
        for sample in &other.samples {
            for point in &sample.points {
                self.push(sample.param, point.clone());
            }
        }
    }

    /// One line per point: the parameter, then every vector component, tab separated.
    pub fn print_raw<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "# Raw data -----------------------")?;
        for sample in &self.samples {
            for point in &sample.points {
                write!(out, "{}", sample.param)?;
                point.write_fields(out)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }

    /// Groups the points into branches by walking the parameter values upwards.
    ///
    /// A branch starts at the first unclaimed point of a sample. At each later
    /// sample the first unclaimed point whose every vector differs from the
    /// branch's last point by a relative amount below
    /// `accuracy * |param_next / param_prev|` is claimed and becomes the new
    /// last point. Samples without a match are skipped and the branch goes on.
    ///
    /// The matching is greedy: the first acceptable candidate is taken, not the
    /// closest one, so crossing branches can be mixed up.
    pub fn branches(&self, accuracy: f64) -> Vec<Branch<N>> {
        let mut remaining: Vec<(f64, Vec<ParPoint<N>>)> = self
            .samples
            .iter()
            .map(|s| (s.param, s.points.clone()))
            .collect();
        let mut branches = Vec::new();

        for s in 0..remaining.len() {
            while !remaining[s].1.is_empty() {
                let start_param = remaining[s].0;
                let first = remaining[s].1.remove(0);
                let mut points = vec![(start_param, first)];
                let mut previous_param = start_param;

                for t in (s + 1)..remaining.len() {
                    let next_param = remaining[t].0;
                    let window = match_window(accuracy, previous_param, next_param);
                    let previous = match points.last() {
                        Some((_, point)) => point,
                        None => break,
                    };
                    if let Some(idx) = remaining[t]
                        .1
                        .iter()
                        .position(|candidate| same_branch(previous, candidate, window))
                    {
                        let claimed = remaining[t].1.remove(idx);
                        points.push((next_param, claimed));
                    }
                    previous_param = next_param;
                }

                branches.push(Branch { points });
            }
        }
        branches
    }

    /// Writes [`ScanList::branches`] in a gnuplot friendly layout and returns
    /// the number of branches.
    pub fn print_list<W: Write>(&self, out: &mut W, accuracy: f64) -> io::Result<usize> {
        let branches = self.branches(accuracy);
        writeln!(out, "# Scanlist output --------------------")?;
        for branch in &branches {
            let start = branch.start();
            writeln!(
                out,
                "# ------------------------------- Start of list starting at {}",
                start
            )?;
            for (param, point) in &branch.points {
                write!(out, "{}", param)?;
                point.write_fields(out)?;
                writeln!(out)?;
            }
            writeln!(
                out,
                "# ------------------------------- End of list starting at {}",
                start
            )?;
            writeln!(out)?;
            writeln!(out)?;
        }
        writeln!(out, "# Number of distinct pieces: {}", branches.len())?;
        Ok(branches.len())
    }
}

impl<const N: usize> AddAssign<&ScanList<N>> for ScanList<N> {
    fn add_assign(&mut self, other: &ScanList<N>) {
        self.extend(other);
    }
}

fn match_window(accuracy: f64, previous_param: f64, next_param: f64) -> f64 {
    if previous_param != 0.0 && next_param != 0.0 {
        accuracy * (next_param / previous_param).abs()
    } else {
        accuracy
    }
}

fn same_branch<const N: usize>(previous: &ParPoint<N>, candidate: &ParPoint<N>, window: f64) -> bool {
    previous.vectors.len() == candidate.vectors.len()
        && previous
            .vectors
            .iter()
            .zip(candidate.vectors.iter())
            .all(|(prev, cand)| {
                let scale = prev.norm();
                let scale = if scale > 0.0 { scale } else { 1.0 };
                (prev - cand).norm() / scale < window
            })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanSettings {
    pub newton: NewtonSettings,
    pub eigen: EigenSettings,
    /// Step of the Jacobian used for the stability eigenvalues.
    pub eigen_jacobian_epsilon: f64,
    pub bump: BumpProfile,
    /// Retries from one start after each new root, at most.
    pub max_roots_per_start: usize,
    /// Roots closer than `dedup_tolerance * max(|r|, 1)` to a known root are duplicates.
    pub dedup_tolerance: f64,
    /// Largest `|F|^2` of the unbumped function for a point to count as a root.
    pub acceptance_residual: f64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            newton: NewtonSettings::default(),
            eigen: EigenSettings::default(),
            eigen_jacobian_epsilon: 1e-6,
            bump: BumpProfile::default(),
            max_roots_per_start: 16,
            dedup_tolerance: 1e-6,
            acceptance_residual: 1e-8,
        }
    }
}

/// Finds the stationary points of a parameterized system, optionally over a
/// sweep of one parameter.
pub struct RootScanner<F, const N: usize> {
    function: F,
    parameter: Option<String>,
    starters: Vec<Vector<N>>,
    settings: ScanSettings,
    roots: ScanList<N>,
}

impl<'a, F, const N: usize> RootScanner<&'a mut F, N>
where
    F: VectorFunction<N> + Parameterized + ?Sized,
{
    /// Scans `parameter` of a system the caller keeps ownership of.
    pub fn borrowed(function: &'a mut F, parameter: &str, starter: Vector<N>) -> Result<Self> {
        Self::owned(function, parameter, starter)
    }
}

impl<F, const N: usize> RootScanner<F, N>
where
    F: VectorFunction<N> + Parameterized,
{
    /// Scans `parameter` of `function`, starting Newton-Raphson from `starter`
    /// (and from any point added with [`RootScanner::add_start`]).
    pub fn owned(function: F, parameter: &str, starter: Vector<N>) -> Result<Self> {
        function
            .get_parameter(parameter)
            .with_context(|| format!("Cannot scan parameter '{}'.", parameter))?;
        Ok(Self {
            function,
            parameter: Some(parameter.to_string()),
            starters: vec![starter],
            settings: ScanSettings::default(),
            roots: ScanList::new(),
        })
    }

    /// A scanner without a sweep parameter, for [`RootScanner::stationary_points`].
    /// Starts from the vector of ones.
    pub fn at_current(function: F) -> Self {
        Self {
            function,
            parameter: None,
            starters: vec![Vector::<N>::repeat(1.0)],
            settings: ScanSettings::default(),
            roots: ScanList::new(),
        }
    }

    pub fn with_settings(mut self, settings: ScanSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn add_start(&mut self, start: Vector<N>) {
        self.starters.push(start);
    }

    pub fn starters(&self) -> &[Vector<N>] {
        &self.starters
    }

    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    pub fn function_mut(&mut self) -> &mut F {
        &mut self.function
    }

    pub fn into_function(self) -> F {
        self.function
    }

    /// Result of the last [`RootScanner::scan`].
    pub fn roots(&self) -> &ScanList<N> {
        &self.roots
    }

    pub fn into_roots(self) -> ScanList<N> {
        self.roots
    }

    /// Sweeps the parameter over `samples` evenly spaced values from `from` to
    /// `to` inclusive. At each value every starter, plus every root found at the
    /// previous value, seeds Newton-Raphson on a copy of the system whose known
    /// zeros are bumped away. Each start is retried until it stops yielding new
    /// roots. Starts that fail are dropped for that value only.
    ///
    /// The parameter is restored to its previous value afterwards.
    pub fn scan(&mut self, from: f64, to: f64, samples: usize) -> Result<&ScanList<N>> {
        let name = match &self.parameter {
            Some(name) => name.clone(),
            None => bail!("Scanner has no sweep parameter; use stationary_points instead."),
        };
        if samples == 0 {
            bail!("A scan needs at least one sample.");
        }
        if !from.is_finite() || !to.is_finite() {
            bail!("Scan range must be finite, got [{}, {}].", from, to);
        }

        let original = self
            .function
            .get_parameter(&name)
            .with_context(|| format!("Cannot scan parameter '{}'.", name))?;
        let delta = if samples > 1 {
            (to - from) / (samples - 1) as f64
        } else {
            0.0
        };

        self.roots.clear();
        let mut starts = self.starters.clone();
        for i in 0..samples {
            let value = from + i as f64 * delta;
            self.function
                .set_parameter(&name, value)
                .with_context(|| format!("Failed to set '{}' to {}.", name, value))?;

            let points = self.solve_current(&starts);
            tracing::debug!("{} = {}: {} stationary points", name, value, points.len());

            starts = self.starters.clone();
            starts.extend(points.iter().filter_map(|p| p.solution().copied()));
            for point in points {
                self.roots.push(value, point);
            }
        }

        self.function
            .set_parameter(&name, original)
            .with_context(|| format!("Failed to restore '{}'.", name))?;
        tracing::info!(
            "Scan of {} over [{}, {}] with {} samples found {} stationary points",
            name,
            from,
            to,
            samples,
            self.roots.len()
        );
        Ok(&self.roots)
    }

    /// Stationary points at the current parameter values, from the starters only.
    pub fn stationary_points(&self) -> Vec<ParPoint<N>> {
        self.solve_current(&self.starters)
    }

    fn solve_current(&self, starts: &[Vector<N>]) -> Vec<ParPoint<N>> {
        let settings = &self.settings;
        let jacobian = Jacobian::borrowed(&self.function).with_epsilon(settings.eigen_jacobian_epsilon);
        let mut bumped = BumpedFunction::borrowed(&self.function).with_profile(settings.bump);
        let mut found: Vec<ParPoint<N>> = Vec::new();

        for start in starts {
            for _ in 0..settings.max_roots_per_start {
                let mut newton = NewtonRoot::borrowed(&bumped).with_settings(settings.newton);
                let result = match newton.find_root(start) {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::debug!("start {:?} dropped: {}", start.as_slice(), err);
                        break;
                    }
                };
                if !result.status.is_root() {
                    tracing::debug!("start {:?} dropped: {:?}", start.as_slice(), result.status);
                    break;
                }

                let root = result.point;
                let residual = self.function.evaluate(&root).norm_squared();
                if !(residual < settings.acceptance_residual) {
                    tracing::debug!(
                        "start {:?} dropped: residual {:e} at {:?}",
                        start.as_slice(),
                        residual,
                        root.as_slice()
                    );
                    break;
                }
                let duplicate = found.iter().filter_map(|p| p.solution()).any(|known| {
                    (known - root).norm() <= settings.dedup_tolerance * known.norm().max(1.0)
                });
                if duplicate {
                    break;
                }

                let eigenvalues =
                    match Eigenvalues::compute_with(&jacobian.calculate(&root), settings.eigen) {
                        Ok(eigenvalues) => eigenvalues,
                        Err(err) => {
                            tracing::warn!("No eigenvalues at {:?}: {}", root.as_slice(), err);
                            break;
                        }
                    };
                tracing::debug!(
                    "stationary point {:?} after {} iterations, Re(lambda) = {:?}",
                    root.as_slice(),
                    result.iterations,
                    eigenvalues.real().as_slice()
                );

                bumped.add_bump(root);
                found.push(ParPoint::stationary(root, &eigenvalues));
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ParametricFn, Parameters};
    use approx::assert_relative_eq;

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn bistable() -> ParametricFn<impl Fn(&Vector<1>, &Parameters) -> Vector<1>> {
        let mut params = Parameters::new();
        let p = params.define("p", 0.0);
        ParametricFn::new(params, move |u: &Vector<1>, par: &Parameters| {
            Vector::<1>::new(par[p] - u[0] + u[0].powi(3))
        })
    }

    fn point(values: &[f64]) -> ParPoint<1> {
        ParPoint::new(values.iter().map(|&v| Vector::<1>::new(v)).collect())
    }

    fn scan_bistable() -> ScanList<1> {
        let mut scanner =
            RootScanner::owned(bistable(), "p", Vector::<1>::new(-1.5)).expect("p is defined");
        scanner.add_start(Vector::<1>::new(0.0));
        scanner.add_start(Vector::<1>::new(1.5));
        scanner.scan(-0.8, 0.8, 17).expect("valid scan").clone()
    }

    #[test]
    fn bistable_scan_matches_fold_structure() {
        let roots = scan_bistable();
        assert_eq!(roots.samples().len(), 17);
        let fold = 2.0 / (3.0 * 3f64.sqrt());
        for sample in roots.samples() {
            let expected = if sample.param.abs() < fold { 3 } else { 1 };
            assert_eq!(
                sample.points.len(),
                expected,
                "p = {}: {:?}",
                sample.param,
                sample.points
            );
            for point in &sample.points {
                let u = point.solution().expect("solution")[0];
                assert!((sample.param - u + u.powi(3)).abs() < 1e-6);
                // In 1-D the eigenvalue is the derivative itself.
                let re = point.eigen_real().expect("eigenvalues")[0];
                assert_relative_eq!(re, 3.0 * u * u - 1.0, epsilon = 1e-4);
                assert_eq!(point.eigen_imag().expect("eigenvalues")[0], 0.0);
            }
        }
    }

    #[test]
    fn stable_selection_keeps_only_negative_eigenvalues() {
        let roots = scan_bistable();
        let stable = roots.select(criteria::stable);
        assert_eq!(stable.len(), 7);
        for sample in stable.samples() {
            assert!(sample.param.abs() < 0.35);
            for point in &sample.points {
                assert!(point.eigen_real().expect("eigenvalues")[0] < 0.0);
                assert!(point.solution().expect("solution")[0].abs() < 1.0 / 3f64.sqrt());
            }
        }
        let unstable = roots.select(criteria::unstable);
        assert_eq!(stable.len() + unstable.len(), roots.len());
        assert_eq!(stable.select(criteria::stable), stable);
        assert_eq!(roots.select(criteria::all), roots);
    }

    #[test]
    fn scan_restores_the_parameter() {
        let mut f = bistable();
        f.set_parameter("p", 0.125).expect("p exists");
        let mut scanner =
            RootScanner::borrowed(&mut f, "p", Vector::<1>::new(-2.0)).expect("p is defined");
        scanner.scan(0.5, 1.0, 3).expect("valid scan");
        assert_eq!(scanner.roots().samples().len(), 3);
        drop(scanner);
        assert_eq!(f.get_parameter("p").expect("p exists"), 0.125);
    }

    #[test]
    fn single_sample_scan_uses_from() {
        let mut scanner =
            RootScanner::owned(bistable(), "p", Vector::<1>::new(-2.0)).expect("p is defined");
        let roots = scanner.scan(0.6, 99.0, 1).expect("valid scan");
        assert_eq!(roots.samples().len(), 1);
        assert_eq!(roots.samples()[0].param, 0.6);
    }

    #[test]
    fn scanner_rejects_bad_configuration() {
        assert_err_contains(
            RootScanner::owned(bistable(), "q", Vector::<1>::new(0.0)).map(|_| ()),
            "Cannot scan parameter 'q'",
        );
        let mut scanner =
            RootScanner::owned(bistable(), "p", Vector::<1>::new(0.0)).expect("p is defined");
        assert_err_contains(scanner.scan(0.0, 1.0, 0).map(|_| ()), "at least one sample");
        assert_err_contains(scanner.scan(0.0, f64::INFINITY, 3).map(|_| ()), "finite");
        let mut fixed = RootScanner::<_, 1>::at_current(bistable());
        assert_err_contains(fixed.scan(0.0, 1.0, 3).map(|_| ()), "no sweep parameter");
    }

    #[test]
    fn stationary_points_at_current_parameters() {
        let mut scanner = RootScanner::<_, 1>::at_current(bistable());
        scanner.add_start(Vector::<1>::new(-1.2));
        scanner.add_start(Vector::<1>::new(0.1));
        let points = scanner.stationary_points();
        let mut roots: Vec<f64> = points
            .iter()
            .map(|p| p.solution().expect("solution")[0])
            .collect();
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots.len(), 3);
        assert_relative_eq!(roots[0], -1.0, epsilon = 1e-6);
        assert_relative_eq!(roots[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(roots[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn acceptance_residual_filters_roots() {
        let strict = ScanSettings {
            acceptance_residual: 0.0,
            ..ScanSettings::default()
        };
        let mut scanner = RootScanner::<_, 1>::at_current(bistable()).with_settings(strict);
        scanner.add_start(Vector::<1>::new(0.1));
        assert!(scanner.stationary_points().is_empty());

        let scanner = scanner.with_settings(ScanSettings::default());
        assert!(!scanner.stationary_points().is_empty());
    }

    #[test]
    fn push_keeps_parameters_sorted_and_merges_equal_keys() {
        let mut list = ScanList::new();
        list.push(2.0, point(&[1.0]));
        list.push(-1.0, point(&[2.0]));
        list.push(2.0, point(&[3.0]));
        let params: Vec<f64> = list.samples().iter().map(|s| s.param).collect();
        assert_eq!(params, vec![-1.0, 2.0]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.points_at(2.0).map(|p| p.len()), Some(2));
        assert!(list.points_at(0.0).is_none());
        assert_eq!(list.nearest(0.9).map(|s| s.param), Some(2.0));
        assert_eq!(list.nearest(0.1).map(|s| s.param), Some(-1.0));

        list.clear();
        assert!(list.is_empty());
        assert!(list.nearest(0.0).is_none());
    }

    #[test]
    fn merging_lists() {
        let mut a = ScanList::new();
        a.push(1.0, point(&[1.0]));
        let mut b = ScanList::new();
        b.push(1.0, point(&[5.0]));
        b.push(0.5, point(&[7.0]));
        a += &b;
        assert_eq!(a.len(), 3);
        assert_eq!(a.samples()[0].param, 0.5);
        assert_eq!(a.points_at(1.0).map(|p| p.len()), Some(2));
    }

    #[test]
    fn predicates_use_solution_and_real_parts() {
        let stable_positive = point(&[0.5, -1.0, 0.0]);
        let unstable_negative = point(&[-0.5, 1.0, 0.0]);
        let tiny_negative = point(&[-5e-5, -1.0, 0.0]);
        assert!(criteria::stable(&stable_positive));
        assert!(criteria::positive(&stable_positive));
        assert!(criteria::unstable(&unstable_negative));
        assert!(criteria::negative(&unstable_negative));
        assert!(criteria::positive(&tiny_negative));
        assert!(!criteria::stable(&point(&[1.0])));
    }

    #[test]
    fn branches_follow_nearby_points() {
        let mut list = ScanList::new();
        for (param, low, high) in [(1.0, 1.0, 10.0), (2.0, 1.1, 10.5), (3.0, 1.2, 11.0)] {
            list.push(param, point(&[high, 1.0]));
            list.push(param, point(&[low, -1.0]));
        }
        let branches = list.branches(1.0);
        assert_eq!(branches.len(), 2);
        for branch in &branches {
            assert_eq!(branch.points.len(), 3);
            assert_eq!(branch.start(), 1.0);
            let first = branch.points[0].1.solution().expect("solution")[0];
            for (_, p) in &branch.points {
                assert!((p.solution().expect("solution")[0] - first).abs() < 1.5);
            }
        }
    }

    #[test]
    fn branches_skip_gaps_and_split_on_jumps() {
        let mut list = ScanList::new();
        list.push(1.0, point(&[1.0]));
        list.push(2.0, point(&[100.0]));
        list.push(3.0, point(&[1.1]));
        let branches = list.branches(1.0);
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].points.len(), 2);
        assert_eq!(branches[0].points[1].0, 3.0);
        assert_eq!(branches[1].start(), 2.0);
    }

    #[test]
    fn print_list_and_raw_layout() {
        let mut list = ScanList::new();
        list.push(1.0, point(&[1.0, -2.0]));
        list.push(2.0, point(&[1.5, -2.5]));

        let mut raw = Vec::new();
        list.print_raw(&mut raw).expect("write to vec");
        let raw = String::from_utf8(raw).expect("utf8");
        assert_eq!(raw, "# Raw data -----------------------\n1\t1\t-2\n2\t1.5\t-2.5\n");

        let mut out = Vec::new();
        let pieces = list.print_list(&mut out, 1.0).expect("write to vec");
        let out = String::from_utf8(out).expect("utf8");
        assert_eq!(pieces, 1);
        assert!(out.starts_with("# Scanlist output"));
        assert!(out.contains("Start of list starting at 1\n1\t1\t-2\n2\t1.5\t-2.5\n"));
        assert!(out.contains("End of list starting at 1\n\n\n"));
        assert!(out.ends_with("# Number of distinct pieces: 1\n"));
    }
}

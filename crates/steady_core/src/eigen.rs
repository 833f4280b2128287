//! Eigenvalues of small dense nonsymmetric matrices.
//!
//! The matrix is balanced, reduced to upper Hessenberg form by stabilized
//! elementary similarity transforms, and then deflated one or two eigenvalues
//! at a time by the implicit double-shift QR iteration.

use crate::error::{Result, SolverError};
use crate::traits::{Matrix, Vector};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

const EXCEPTIONAL_SHIFT_ITERATIONS: [usize; 2] = [10, 20];

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EigenSettings {
    pub radix: f64,
    /// A row/column pair is rescaled only if its norm drops below this fraction.
    pub balance_threshold: f64,
    /// QR iterations allowed per eigenvalue before giving up.
    pub max_iterations: usize,
}

impl Default for EigenSettings {
    fn default() -> Self {
        Self {
            radix: 2.0,
            balance_threshold: 0.95,
            max_iterations: 30,
        }
    }
}

/// Real and imaginary parts of the eigenvalues of an `N x N` matrix.
///
/// Index `i` of [`Eigenvalues::real`] and [`Eigenvalues::imag`] describe the
/// same eigenvalue. Complex conjugate pairs sit at adjacent indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eigenvalues<const N: usize> {
    real: Vector<N>,
    imag: Vector<N>,
}

impl<const N: usize> Eigenvalues<N> {
    pub fn compute(matrix: &Matrix<N>) -> Result<Self> {
        Self::compute_with(matrix, EigenSettings::default())
    }

    pub fn compute_with(matrix: &Matrix<N>, settings: EigenSettings) -> Result<Self> {
        let mut h = *matrix;
        balance(&mut h, settings.radix, settings.balance_threshold);
        hessenberg(&mut h);
        hqr(h, settings.max_iterations)
    }

    pub fn real(&self) -> &Vector<N> {
        &self.real
    }

    pub fn imag(&self) -> &Vector<N> {
        &self.imag
    }

    pub fn values(&self) -> Vec<Complex<f64>> {
        self.real
            .iter()
            .zip(self.imag.iter())
            .map(|(&re, &im)| Complex::new(re, im))
            .collect()
    }

    /// Largest real part, `-inf` for `N = 0`.
    pub fn spectral_abscissa(&self) -> f64 {
        self.real.iter().fold(f64::NEG_INFINITY, |acc, &v| acc.max(v))
    }

    pub fn is_stable(&self) -> bool {
        self.real.iter().all(|&v| v < 0.0)
    }

    pub fn into_parts(self) -> (Vector<N>, Vector<N>) {
        (self.real, self.imag)
    }
}

/// Rescales rows and columns by powers of `radix` until their off-diagonal
/// norms are comparable. This is a similarity transform.
pub fn balance<const N: usize>(m: &mut Matrix<N>, radix: f64, threshold: f64) {
    let radix_sq = radix * radix;
    let mut done = false;
    while !done {
        done = true;
        for i in 0..N {
            let mut c = 0.0;
            let mut r = 0.0;
            for j in (0..N).filter(|&j| j != i) {
                c += m[(j, i)].abs();
                r += m[(i, j)].abs();
            }
            if c == 0.0 || r == 0.0 {
                continue;
            }

            let s = c + r;
            let mut f = 1.0;
            let g = r / radix;
            while c < g {
                f *= radix;
                c *= radix_sq;
            }
            let g = r * radix;
            while c > g {
                f /= radix;
                c /= radix_sq;
            }

            if (c + r) / f < threshold * s {
                done = false;
                let g = 1.0 / f;
                for k in 0..N {
                    m[(i, k)] *= g;
                }
                for k in 0..N {
                    m[(k, i)] *= f;
                }
            }
        }
    }
}

/// Reduces `m` to upper Hessenberg form by Gaussian elimination with pivoting.
/// Entries below the first subdiagonal are left at zero.
pub fn hessenberg<const N: usize>(m: &mut Matrix<N>) {
    for r in 1..N.saturating_sub(1) {
        let mut x = 0.0f64;
        let mut pivot = r;
        for j in r..N {
            if m[(j, r - 1)].abs() > x.abs() {
                x = m[(j, r - 1)];
                pivot = j;
            }
        }
        if pivot != r {
            for j in (r - 1)..N {
                m.swap((pivot, j), (r, j));
            }
            m.swap_columns(pivot, r);
        }
        if x != 0.0 {
            for k in (r + 1)..N {
                let mut y = m[(k, r - 1)];
                if y != 0.0 {
                    y /= x;
                    m[(k, r - 1)] = y;
                    for j in r..N {
                        let v = m[(r, j)];
                        m[(k, j)] -= y * v;
                    }
                    for j in 0..N {
                        let v = m[(j, k)];
                        m[(j, r)] += y * v;
                    }
                }
            }
        }
    }
    // Drop the stored multipliers.
    for j in 0..N {
        for i in (j + 2)..N {
            m[(i, j)] = 0.0;
        }
    }
}

fn hqr<const N: usize>(mut h: Matrix<N>, max_iterations: usize) -> Result<Eigenvalues<N>> {
    let mut wr = Vector::<N>::zeros();
    let mut wi = Vector::<N>::zeros();

    let mut anorm = 0.0;
    for i in 0..N {
        for j in i.saturating_sub(1)..N {
            anorm += h[(i, j)].abs();
        }
    }

    let mut nn = N as isize - 1;
    // Accumulated exceptional shifts.
    let mut t = 0.0;
    while nn >= 0 {
        let mut its = 0usize;
        loop {
            let n = nn as usize;

            let mut l = 0usize;
            for cand in (1..=n).rev() {
                let mut s = h[(cand - 1, cand - 1)].abs() + h[(cand, cand)].abs();
                if s == 0.0 {
                    s = anorm;
                }
                if h[(cand, cand - 1)].abs() + s == s {
                    h[(cand, cand - 1)] = 0.0;
                    l = cand;
                    break;
                }
            }

            let mut x = h[(n, n)];
            if l == n {
                wr[n] = x + t;
                wi[n] = 0.0;
                nn -= 1;
            } else {
                let mut y = h[(n - 1, n - 1)];
                let mut w = h[(n, n - 1)] * h[(n - 1, n)];
                if l + 1 == n {
                    let p = 0.5 * (y - x);
                    let q = p * p + w;
                    let z = q.abs().sqrt();
                    x += t;
                    if q >= 0.0 {
                        let z = p + if p >= 0.0 { z } else { -z };
                        wr[n - 1] = x + z;
                        wr[n] = if z != 0.0 { x - w / z } else { x + z };
                        wi[n - 1] = 0.0;
                        wi[n] = 0.0;
                    } else {
                        wr[n - 1] = x + p;
                        wr[n] = x + p;
                        wi[n - 1] = -z;
                        wi[n] = z;
                    }
                    nn -= 2;
                } else {
                    if its == max_iterations {
                        return Err(SolverError::EigenNoConvergence {
                            index: n,
                            iterations: its,
                        });
                    }
                    if EXCEPTIONAL_SHIFT_ITERATIONS.contains(&its) {
                        t += x;
                        for i in 0..=n {
                            h[(i, i)] -= x;
                        }
                        let s = h[(n, n - 1)].abs() + h[(n - 1, n - 2)].abs();
                        x = 0.75 * s;
                        y = x;
                        w = -0.4375 * s * s;
                    }
                    its += 1;
                    double_shift_step(&mut h, l, n, x, y, w);
                }
            }

            if l as isize >= nn {
                break;
            }
        }
    }

    Ok(Eigenvalues { real: wr, imag: wi })
}

/// One implicit double-shift QR sweep on the active block `l..=n` of `h`,
/// with shifts given by the trailing 2x2 block data `x`, `y`, `w`.
fn double_shift_step<const N: usize>(h: &mut Matrix<N>, l: usize, n: usize, x: f64, y: f64, w: f64) {
    let mut p;
    let mut q;
    let mut r;
    let mut z;

    // Look for two consecutive small subdiagonal elements.
    let mut mm = n - 2;
    loop {
        z = h[(mm, mm)];
        let rr = x - z;
        let ss = y - z;
        p = (rr * ss - w) / h[(mm + 1, mm)] + h[(mm, mm + 1)];
        q = h[(mm + 1, mm + 1)] - z - rr - ss;
        r = h[(mm + 2, mm + 1)];
        let s = p.abs() + q.abs() + r.abs();
        p /= s;
        q /= s;
        r /= s;
        if mm == l {
            break;
        }
        let u = h[(mm, mm - 1)].abs() * (q.abs() + r.abs());
        let v = p.abs() * (h[(mm - 1, mm - 1)].abs() + z.abs() + h[(mm + 1, mm + 1)].abs());
        if u + v == v {
            break;
        }
        mm -= 1;
    }

    for i in (mm + 2)..=n {
        h[(i, i - 2)] = 0.0;
        if i != mm + 2 {
            h[(i, i - 3)] = 0.0;
        }
    }

    let mut x = 0.0;
    let mut y;
    for k in mm..n {
        if k != mm {
            p = h[(k, k - 1)];
            q = h[(k + 1, k - 1)];
            r = if k != n - 1 { h[(k + 2, k - 1)] } else { 0.0 };
            x = p.abs() + q.abs() + r.abs();
            if x != 0.0 {
                p /= x;
                q /= x;
                r /= x;
            }
        }
        let mut s = (p * p + q * q + r * r).sqrt();
        if p < 0.0 {
            s = -s;
        }
        if s == 0.0 {
            continue;
        }

        if k == mm {
            if l != mm {
                h[(k, k - 1)] = -h[(k, k - 1)];
            }
        } else {
            h[(k, k - 1)] = -s * x;
        }
        p += s;
        x = p / s;
        y = q / s;
        z = r / s;
        q /= p;
        r /= p;

        for j in k..=n {
            let mut pp = h[(k, j)] + q * h[(k + 1, j)];
            if k != n - 1 {
                pp += r * h[(k + 2, j)];
                h[(k + 2, j)] -= pp * z;
            }
            h[(k + 1, j)] -= pp * y;
            h[(k, j)] -= pp * x;
        }

        let upper = n.min(k + 3);
        for i in l..=upper {
            let mut pp = x * h[(i, k)] + y * h[(i, k + 1)];
            if k != n - 1 {
                pp += z * h[(i, k + 2)];
                h[(i, k + 2)] -= pp * r;
            }
            h[(i, k + 1)] -= pp * q;
            h[(i, k)] -= pp;
        }
    }
}

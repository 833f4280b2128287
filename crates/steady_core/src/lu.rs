//! Dense LU decomposition with scaled partial pivoting (Crout's method).

use crate::error::{Result, SolverError};
use crate::traits::{Matrix, Vector};

/// Replacement for an exactly zero pivot.
pub const TINY_PIVOT: f64 = 1e-20;

/// Packed `L`/`U` factors of a row-permuted matrix.
///
/// The unit diagonal of `L` is implicit; everything on and above the diagonal
/// belongs to `U`.
#[derive(Debug, Clone)]
pub struct LuDecomposition<const N: usize> {
    factors: Matrix<N>,
    pivot_rows: [usize; N],
    pivot_sign: f64,
}

impl<const N: usize> LuDecomposition<N> {
    /// Factors `matrix` in place. Callers that still need the original pass a clone.
    ///
    /// Each row is scaled by the reciprocal of its largest entry before pivots
    /// are compared, so the pivot search is not fooled by badly scaled rows.
    /// Fails when a row is identically zero.
    pub fn decompose(matrix: Matrix<N>) -> Result<Self> {
        let mut a = matrix;
        let mut pivot_rows = [0usize; N];
        let mut pivot_sign = 1.0;

        let mut row_scale = [0.0f64; N];
        for (i, scale) in row_scale.iter_mut().enumerate() {
            let big = a.row(i).iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
            if big == 0.0 {
                return Err(SolverError::Singular { row: i });
            }
            *scale = 1.0 / big;
        }

        for j in 0..N {
            for i in 0..j {
                let mut sum = a[(i, j)];
                for k in 0..i {
                    sum -= a[(i, k)] * a[(k, j)];
                }
                a[(i, j)] = sum;
            }

            let mut big = 0.0;
            let mut imax = j;
            for i in j..N {
                let mut sum = a[(i, j)];
                for k in 0..j {
                    sum -= a[(i, k)] * a[(k, j)];
                }
                a[(i, j)] = sum;
                let scaled = row_scale[i] * sum.abs();
                if scaled >= big {
                    big = scaled;
                    imax = i;
                }
            }

            if imax != j {
                a.swap_rows(imax, j);
                pivot_sign = -pivot_sign;
                row_scale[imax] = row_scale[j];
            }
            pivot_rows[j] = imax;

            if a[(j, j)] == 0.0 {
                a[(j, j)] = TINY_PIVOT;
            }
            if j + 1 < N {
                let inv = 1.0 / a[(j, j)];
                for i in (j + 1)..N {
                    a[(i, j)] *= inv;
                }
            }
        }

        Ok(Self {
            factors: a,
            pivot_rows,
            pivot_sign,
        })
    }

    /// Overwrites `b` with the solution of `A x = b`.
    pub fn solve(&self, b: &mut Vector<N>) {
        let a = &self.factors;

        // Forward substitution starts at the first nonzero entry of the permuted rhs.
        let mut first_nonzero: Option<usize> = None;
        for i in 0..N {
            let ip = self.pivot_rows[i];
            let mut sum = b[ip];
            b[ip] = b[i];
            match first_nonzero {
                Some(start) => {
                    for j in start..i {
                        sum -= a[(i, j)] * b[j];
                    }
                }
                None if sum != 0.0 => first_nonzero = Some(i),
                None => {}
            }
            b[i] = sum;
        }

        for i in (0..N).rev() {
            let mut sum = b[i];
            for j in (i + 1)..N {
                sum -= a[(i, j)] * b[j];
            }
            b[i] = sum / a[(i, i)];
        }
    }

    pub fn solve_vec(&self, b: &Vector<N>) -> Vector<N> {
        let mut x = *b;
        self.solve(&mut x);
        x
    }

    pub fn det(&self) -> f64 {
        (0..N).fold(self.pivot_sign, |d, j| d * self.factors[(j, j)])
    }

    /// `+1.0` or `-1.0` depending on the parity of the row swaps.
    pub fn pivot_sign(&self) -> f64 {
        self.pivot_sign
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn solves_small_system() {
        let a = Matrix::<3>::new(2.0, 1.0, 1.0, 4.0, -6.0, 0.0, -2.0, 7.0, 2.0);
        let b = Vector::<3>::new(5.0, -2.0, 9.0);
        let lu = LuDecomposition::decompose(a).expect("nonsingular");
        let x = lu.solve_vec(&b);
        assert_relative_eq!(x, Vector::<3>::new(1.0, 1.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!(lu.det(), a.determinant(), epsilon = 1e-10);
    }

    #[test]
    fn zero_row_is_singular() {
        let a = Matrix::<3>::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 4.0, 5.0, 6.0);
        let err = LuDecomposition::decompose(a).expect_err("row 1 is zero");
        assert_eq!(err, SolverError::Singular { row: 1 });
    }

    #[test]
    fn rank_deficient_matrix_uses_tiny_pivot() {
        let a = Matrix::<2>::new(1.0, 2.0, 2.0, 4.0);
        let lu = LuDecomposition::decompose(a).expect("no zero rows");
        assert!(lu.det().abs() < 1e-15);
    }

    #[test]
    fn row_swap_flips_determinant_sign() {
        // The scaled pivot of row 1 (3/4) beats row 0 (1/2), forcing a swap.
        let swapped = LuDecomposition::decompose(Matrix::<2>::new(1.0, 2.0, 3.0, 4.0))
            .expect("nonsingular");
        let straight = LuDecomposition::decompose(Matrix::<2>::new(3.0, 4.0, 1.0, 2.0))
            .expect("nonsingular");
        assert_eq!(swapped.pivot_sign(), -1.0);
        assert_eq!(straight.pivot_sign(), 1.0);
        assert_relative_eq!(swapped.det(), -2.0, epsilon = 1e-12);
        assert_relative_eq!(straight.det(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn badly_scaled_rows_are_handled() {
        let a = Matrix::<2>::new(1e-12, 1.0, 1.0, 1.0);
        let b = Vector::<2>::new(1.0, 2.0);
        let x = LuDecomposition::decompose(a).expect("nonsingular").solve_vec(&b);
        assert_relative_eq!(a * x, b, epsilon = 1e-12);
    }

    #[test]
    fn zero_rhs_gives_zero_solution() {
        let a = Matrix::<3>::new(4.0, 1.0, 0.0, 1.0, 4.0, 1.0, 0.0, 1.0, 4.0);
        let x = LuDecomposition::decompose(a)
            .expect("nonsingular")
            .solve_vec(&Vector::<3>::zeros());
        assert_eq!(x, Vector::<3>::zeros());
    }

    fn diagonally_dominant() -> impl Strategy<Value = (Matrix<10>, Vector<10>)> {
        (
            prop::collection::vec(-1.0f64..1.0, 100),
            prop::collection::vec(-10.0f64..10.0, 10),
        )
            .prop_map(|(entries, rhs)| {
                let mut a = Matrix::<10>::from_row_slice(&entries);
                for i in 0..10 {
                    a[(i, i)] += if a[(i, i)] >= 0.0 { 11.0 } else { -11.0 };
                }
                (a, Vector::<10>::from_column_slice(&rhs))
            })
    }

    proptest! {
        #[test]
        fn solve_round_trips((a, b) in diagonally_dominant()) {
            let x = LuDecomposition::decompose(a).expect("dominant matrices are nonsingular").solve_vec(&b);
            let back = a * x;
            for i in 0..10 {
                prop_assert!((back[i] - b[i]).abs() <= 1e-10 * (1.0 + b[i].abs()));
            }
        }
    }
}

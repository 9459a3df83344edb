//! Small dense linear solver for the quadrature fit.

/// Relative pivot threshold: a pivot at or below `PIVOT_TOLERANCE * max|A|`
/// is treated as zero.
pub const PIVOT_TOLERANCE: f32 = 1e-5;

/// The system has no unique solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingularMatrix {
    /// Elimination step at which the pivot collapsed.
    pub step: usize,
    /// Largest remaining pivot magnitude at that step.
    pub pivot: f32,
}

impl core::fmt::Display for SingularMatrix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "singular matrix: pivot {:e} at elimination step {}",
            self.pivot, self.step
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SingularMatrix {}

/// Solve `A·x = b` by Gaussian elimination with partial pivoting.
pub fn solve<const N: usize>(
    mut a: [[f32; N]; N],
    mut b: [f32; N],
) -> Result<[f32; N], SingularMatrix> {
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f32, |m, &v| m.max(v.abs()));
    if scale == 0.0 {
        return Err(SingularMatrix { step: 0, pivot: 0.0 });
    }
    let threshold = PIVOT_TOLERANCE * scale;

    for col in 0..N {
        let mut pivot_row = col;
        for row in col + 1..N {
            if a[row][col].abs() > a[pivot_row][col].abs() {
                pivot_row = row;
            }
        }
        let pivot = a[pivot_row][col];
        if pivot.abs() <= threshold {
            return Err(SingularMatrix {
                step: col,
                pivot: pivot.abs(),
            });
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot_coeffs = a[col];
        let pivot_rhs = b[col];
        for row in col + 1..N {
            let factor = a[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for (x, &p) in a[row].iter_mut().zip(pivot_coeffs.iter()).skip(col) {
                *x -= factor * p;
            }
            b[row] -= factor * pivot_rhs;
        }
    }

    let mut x = [0.0f32; N];
    for row in (0..N).rev() {
        let tail: f32 = (row + 1..N).map(|j| a[row][j] * x[j]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

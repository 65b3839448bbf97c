use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Multiply two 2D arrays.
    pub fn multiply(lhs: ArrayView2<f64>, rhs: ArrayView2<f64>) -> Array2<f64> {
        lhs.dot(&rhs)
    }

    /// Least-squares coefficients of `design · c ≈ rhs` through the normal equations.
    ///
    /// Returns `None` when the normal matrix is singular.
    pub fn least_squares(design: ArrayView2<f64>, rhs: ArrayView1<f64>) -> Option<Array1<f64>> {
        let normal = Self::multiply(design.t(), design);
        let projected = design.t().dot(&rhs);
        Self::solve(normal, projected)
    }

    /// Gaussian elimination with partial pivoting.
    pub fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
        let n = b.len();
        if a.nrows() != n || a.ncols() != n {
            return None;
        }
        for col in 0..n {
            let pivot = (col..n).max_by(|&i, &j| {
                a[[i, col]]
                    .abs()
                    .partial_cmp(&a[[j, col]].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;
            if a[[pivot, col]].abs() < f64::EPSILON {
                return None;
            }
            if pivot != col {
                for k in 0..n {
                    a.swap([col, k], [pivot, k]);
                }
                b.swap(col, pivot);
            }
            for row in (col + 1)..n {
                let factor = a[[row, col]] / a[[col, col]];
                if factor == 0.0 {
                    continue;
                }
                for k in col..n {
                    a[[row, k]] -= factor * a[[col, k]];
                }
                b[row] -= factor * b[col];
            }
        }
        let mut x = Array1::<f64>::zeros(n);
        for row in (0..n).rev() {
            let tail: f64 = ((row + 1)..n).map(|k| a[[row, k]] * x[k]).sum();
            x[row] = (b[row] - tail) / a[[row, row]];
        }
        Some(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn solve_recovers_known_system() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![3.0, 5.0];
        let x = MatrixHelper::solve(a, b).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn least_squares_fits_exact_quadratic() {
        let t: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let design = Array2::from_shape_fn((t.len(), 2), |(i, j)| t[i].powi(j as i32 + 2));
        let rhs = Array1::from_iter(t.iter().map(|x| 3.0 * x * x - 0.5 * x * x * x));
        let coeffs = MatrixHelper::least_squares(design.view(), rhs.view()).unwrap();
        assert!((coeffs[0] - 3.0).abs() < 1e-8);
        assert!((coeffs[1] + 0.5).abs() < 1e-8);
    }

    #[test]
    fn singular_system_is_rejected() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(MatrixHelper::solve(a, array![1.0, 2.0]).is_none());
    }
}

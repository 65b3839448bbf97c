use ndarray::ArrayView2;

use crate::prelude::{MotionError, MotionResult};

/// Index `i` of the segment `[x[i], x[i + 1]]` holding `value`, clamped to the end segments.
fn segment_index(x: &[f64], value: f64) -> usize {
    let n = x.len();
    x.partition_point(|&v| v <= value)
        .saturating_sub(1)
        .min(n.saturating_sub(2))
}

/// Linear interpolation that holds the end values outside of `x`.
pub fn linear_clamped(x: &[f64], y: &[f64], value: f64) -> f64 {
    match x.len() {
        0 => 0.0,
        1 => y[0],
        n => {
            if value <= x[0] {
                y[0]
            } else if value >= x[n - 1] {
                y[n - 1]
            } else {
                let i = segment_index(x, value);
                let w = (value - x[i]) / (x[i + 1] - x[i]);
                y[i] + w * (y[i + 1] - y[i])
            }
        }
    }
}

/// Bilinear interpolation on a rectilinear grid; `z[[i, j]]` is the value at `(xs[i], ys[j])`.
///
/// The point must lie within the grid; callers clamp beforehand.
pub fn bilinear(xs: &[f64], ys: &[f64], z: ArrayView2<f64>, x: f64, y: f64) -> f64 {
    let i = segment_index(xs, x);
    let j = segment_index(ys, y);
    if xs.len() < 2 || ys.len() < 2 {
        return z[[0, 0]];
    }
    let tx = (x - xs[i]) / (xs[i + 1] - xs[i]);
    let ty = (y - ys[j]) / (ys[j + 1] - ys[j]);
    (1.0 - tx) * (1.0 - ty) * z[[i, j]]
        + tx * (1.0 - ty) * z[[i + 1, j]]
        + (1.0 - tx) * ty * z[[i, j + 1]]
        + tx * ty * z[[i + 1, j + 1]]
}

/// Linear interpolation/extrapolation in log10–log10 space.
///
/// Values at an original node return the original ordinate; values outside of
/// `x` are extrapolated along the first or last two points. An empty table
/// yields an empty result.
pub fn log_log_interp(x: &[f64], y: &[f64], xi: &[f64]) -> Vec<f64> {
    if x.is_empty() || y.len() < x.len() {
        return Vec::new();
    }
    let log_x: Vec<f64> = x.iter().map(|v| v.log10()).collect();
    let log_y: Vec<f64> = y.iter().map(|v| v.log10()).collect();
    xi.iter()
        .map(|&value| {
            let target = value.log10();
            if log_x.len() == 1 {
                return y[0];
            }
            if let Some(j) = log_x.iter().position(|&v| (target - v).abs() < 1e-6) {
                return y[j];
            }
            let j = segment_index(&log_x, target);
            let slope = (log_y[j + 1] - log_y[j]) / (log_x[j + 1] - log_x[j]);
            10f64.powf(slope * (target - log_x[j]) + log_y[j])
        })
        .collect()
}

/// Symmetric moving average with `window` points either side, shrinking near the ends.
pub fn smooth(data: &[f64], window: usize) -> Vec<f64> {
    let n = data.len();
    (0..n)
        .map(|i| {
            let left = i;
            let right = n - 1 - i;
            let adjusted = window.min(left).min(right);
            let sum: f64 = data[i - adjusted..=i + adjusted].iter().sum();
            sum / (1 + 2 * adjusted) as f64
        })
        .collect()
}

/// Natural cubic spline with linear extrapolation beyond the knots.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    second: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> MotionResult<Self> {
        if x.len() != y.len() || x.len() < 2 {
            return Err(MotionError::InvalidInput(format!(
                "spline needs at least two matching knots, got {} x and {} y",
                x.len(),
                y.len()
            )));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MotionError::InvalidInput(
                "spline knots must be strictly increasing".into(),
            ));
        }

        let n = x.len();
        let mut second = vec![0.0; n];
        if n > 2 {
            let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
            let m = n - 2;
            let mut diag = vec![0.0; m];
            let mut upper = vec![0.0; m];
            let mut rhs = vec![0.0; m];
            for k in 0..m {
                let i = k + 1;
                diag[k] = 2.0 * (h[i - 1] + h[i]);
                upper[k] = h[i];
                rhs[k] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
            }
            // Thomas algorithm; the sub-diagonal of row k is h[k].
            for k in 1..m {
                let w = h[k] / diag[k - 1];
                diag[k] -= w * upper[k - 1];
                rhs[k] -= w * rhs[k - 1];
            }
            second[m] = rhs[m - 1] / diag[m - 1];
            for k in (0..m - 1).rev() {
                second[k + 1] = (rhs[k] - upper[k] * second[k + 2]) / diag[k];
            }
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            second,
        })
    }

    pub fn eval(&self, value: f64) -> f64 {
        let n = self.x.len();
        if value < self.x[0] {
            let h = self.x[1] - self.x[0];
            let slope = (self.y[1] - self.y[0]) / h - h * (2.0 * self.second[0] + self.second[1]) / 6.0;
            return self.y[0] + slope * (value - self.x[0]);
        }
        if value > self.x[n - 1] {
            let h = self.x[n - 1] - self.x[n - 2];
            let slope = (self.y[n - 1] - self.y[n - 2]) / h
                + h * (self.second[n - 2] + 2.0 * self.second[n - 1]) / 6.0;
            return self.y[n - 1] + slope * (value - self.x[n - 1]);
        }
        let i = segment_index(&self.x, value);
        let h = self.x[i + 1] - self.x[i];
        let a = self.x[i + 1] - value;
        let b = value - self.x[i];
        self.second[i] * a.powi(3) / (6.0 * h)
            + self.second[i + 1] * b.powi(3) / (6.0 * h)
            + (self.y[i] / h - self.second[i] * h / 6.0) * a
            + (self.y[i + 1] / h - self.second[i + 1] * h / 6.0) * b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn log_log_interp_is_exact_at_nodes() {
        let x = [0.1, 1.0, 10.0];
        let y = [2.0, 5.0, 3.0];
        let yi = log_log_interp(&x, &y, &x);
        for (a, b) in yi.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn log_log_interp_extrapolates_with_end_slopes() {
        let x = [1.0, 10.0, 100.0];
        let y = [1.0, 100.0, 1000.0];
        let yi = log_log_interp(&x, &y, &[0.1, 1000.0]);
        // Slope 2 on the left, slope 1 on the right.
        assert!((yi[0] - 0.01).abs() < 1e-12);
        assert!((yi[1] - 10000.0).abs() < 1e-6);
    }

    #[test]
    fn log_log_interp_of_empty_table_is_empty() {
        assert!(log_log_interp(&[], &[], &[1.0, 2.0]).is_empty());
        assert!(log_log_interp(&[1.0, 2.0], &[3.0], &[1.5]).is_empty());
    }

    #[test]
    fn smooth_shrinks_window_at_edges() {
        let out = smooth(&[1.0, 2.0, 3.0, 10.0, 5.0], 1);
        assert_eq!(out[0], 1.0);
        assert!((out[1] - 2.0).abs() < 1e-12);
        assert!((out[2] - 5.0).abs() < 1e-12);
        assert_eq!(out[4], 5.0);
    }

    #[test]
    fn linear_clamped_holds_edges() {
        let x = [1.0, 2.0];
        let y = [10.0, 20.0];
        assert_eq!(linear_clamped(&x, &y, 0.0), 10.0);
        assert_eq!(linear_clamped(&x, &y, 5.0), 20.0);
        assert!((linear_clamped(&x, &y, 1.25) - 12.5).abs() < 1e-12);
    }

    #[test]
    fn bilinear_reproduces_grid_nodes() {
        let xs = [1.0, 2.0, 4.0];
        let ys = [0.0, 1.0];
        let z = Array2::from_shape_fn((3, 2), |(i, j)| (i * 10 + j) as f64);
        assert_eq!(bilinear(&xs, &ys, z.view(), 1.0, 0.0), 0.0);
        assert_eq!(bilinear(&xs, &ys, z.view(), 4.0, 1.0), 21.0);
        assert!((bilinear(&xs, &ys, z.view(), 3.0, 0.5) - 15.5).abs() < 1e-12);
    }

    #[test]
    fn spline_matches_knots_and_cubic_shape() {
        let x: Vec<f64> = (0..8).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        for (xv, yv) in x.iter().zip(y.iter()) {
            assert!((spline.eval(*xv) - yv).abs() < 1e-12);
        }
        assert!((spline.eval(1.25) - 1.25f64.sin()).abs() < 5e-3);
    }

    #[test]
    fn spline_extrapolates_linearly() {
        let spline = CubicSpline::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0]).unwrap();
        assert!((spline.eval(-1.0) + 1.0).abs() < 1e-12);
        assert!((spline.eval(3.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn spline_rejects_unsorted_knots() {
        assert!(CubicSpline::new(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]).is_err());
    }
}

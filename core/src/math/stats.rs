pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    pub fn max_abs(samples: &[f64]) -> f64 {
        samples.iter().fold(0.0, |max, v| max.max(v.abs()))
    }

    /// Cumulative trapezoid integral with a constant step; the first value is zero.
    pub fn integrate(samples: &[f64], step: f64) -> Vec<f64> {
        let mut out = Vec::with_capacity(samples.len());
        let mut total = 0.0;
        for (i, &value) in samples.iter().enumerate() {
            if i > 0 {
                total += step * (value + samples[i - 1]) / 2.0;
            }
            out.push(total);
        }
        out
    }

    /// Root-mean-square relative error of `computed` against `target`, plus the
    /// largest signed relative error.
    pub fn relative_errors(computed: &[f64], target: &[f64]) -> (f64, f64) {
        let errors: Vec<f64> = computed
            .iter()
            .zip(target)
            .map(|(&c, &t)| (c - t) / t)
            .collect();
        let max_error = errors
            .iter()
            .fold(0.0_f64, |max, &e| if max.abs() < e.abs() { e } else { max });
        (Self::rms(&errors), max_error)
    }
}

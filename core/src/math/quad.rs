// Gauss-Kronrod 7/15 abscissae and weights (QUADPACK qk15).
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_2,
    0.140_653_259_715_525_9,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_8,
];

const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Outcome of an adaptive integration.
#[derive(Debug, Clone, Copy)]
pub struct Quadrature {
    pub value: f64,
    pub abs_error: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    lower: f64,
    upper: f64,
    value: f64,
    error: f64,
}

fn gauss_kronrod<F: Fn(f64) -> f64>(f: &F, lower: f64, upper: f64) -> Segment {
    let center = 0.5 * (lower + upper);
    let half = 0.5 * (upper - lower);
    let f_center = f(center);
    let mut kronrod = f_center * WGK[7];
    let mut gauss = f_center * WG[3];
    for (k, (&node, &weight)) in XGK.iter().zip(WGK.iter()).take(7).enumerate() {
        let pair = f(center - half * node) + f(center + half * node);
        kronrod += weight * pair;
        // Odd Kronrod nodes are the embedded Gauss nodes.
        if k % 2 == 1 {
            gauss += WG[k / 2] * pair;
        }
    }
    Segment {
        lower,
        upper,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    }
}

/// Adaptive Gauss–Kronrod quadrature of `f` over `[lower, ∞)`.
///
/// The interval is mapped onto `(0, 1]` with `x = lower + (1 - t) / t`, so the
/// integrand is never evaluated exactly at `lower`.
pub fn integrate_semi_infinite<F: Fn(f64) -> f64>(
    f: F,
    lower: f64,
    abs_tol: f64,
    rel_tol: f64,
    limit: usize,
) -> Quadrature {
    let mapped = |t: f64| {
        let x = lower + (1.0 - t) / t;
        let value = f(x) / (t * t);
        if value.is_finite() {
            value
        } else {
            0.0
        }
    };

    let mut segments = vec![gauss_kronrod(&mapped, 0.0, 1.0)];
    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let abs_error: f64 = segments.iter().map(|s| s.error).sum();
        if abs_error <= abs_tol.max(rel_tol * value.abs()) {
            return Quadrature {
                value,
                abs_error,
                converged: true,
            };
        }
        if segments.len() >= limit.max(1) {
            return Quadrature {
                value,
                abs_error,
                converged: false,
            };
        }
        let worst = segments
            .iter()
            .enumerate()
            .max_by(|a, b| {
                a.1.error
                    .partial_cmp(&b.1.error)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        let segment = segments.swap_remove(worst);
        let middle = 0.5 * (segment.lower + segment.upper);
        segments.push(gauss_kronrod(&mapped, segment.lower, middle));
        segments.push(gauss_kronrod(&mapped, middle, segment.upper));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_decay_integrates_to_one() {
        let result = integrate_semi_infinite(|x| (-x).exp(), 0.0, 1e-8, 1e-8, 200);
        assert!(result.converged);
        assert!((result.value - 1.0).abs() < 1e-7);
    }

    #[test]
    fn half_gaussian_matches_closed_form() {
        let result = integrate_semi_infinite(|x| (-x * x / 2.0).exp(), 0.0, 1e-6, 1e-6, 200);
        let expected = (std::f64::consts::PI / 2.0).sqrt();
        assert!((result.value - expected).abs() < 1e-5);
    }
}

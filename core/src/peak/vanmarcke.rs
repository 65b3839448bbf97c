use num_complex::Complex64;
use std::f64::consts::PI;

use super::{DurationModel, PeakFactorModel, SpectralMoments};
use crate::math::quad::integrate_semi_infinite;
use crate::prelude::Oscillator;

/// Lowest meaningful number of zero crossings.
pub const MIN_ZERO_CROSSINGS: f64 = 1.33;

const TOLERANCE: f64 = 1e-4;
const SEGMENT_LIMIT: usize = 1000;

/// Vanmarcke (1976) extreme-value peak factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct VanmarckePeakFactor;

impl VanmarckePeakFactor {
    /// Peak factor for explicit moments, shared with the spectral inversion.
    pub fn from_moments(duration: f64, m0: f64, m1: f64, m2: f64) -> f64 {
        if m0 <= 0.0 || m2 <= 0.0 {
            return 0.0;
        }
        let bandwidth = (1.0 - m1 * m1 / (m0 * m2)).max(0.0).sqrt();
        let effective_bandwidth = bandwidth.powf(1.2);
        let zero_crossings = (duration * (m2 / m0).sqrt() / PI).max(MIN_ZERO_CROSSINGS);
        let decay = (PI / 2.0).sqrt() * effective_bandwidth;

        let integrand = |x: f64| {
            let half_sq = x * x / 2.0;
            let survival = -(-half_sq).exp_m1();
            let clustering = -(-decay * x).exp_m1();
            1.0 - survival * (-zero_crossings * clustering / half_sq.exp_m1()).exp()
        };
        integrate_semi_infinite(integrand, 0.0, TOLERANCE, TOLERANCE, SEGMENT_LIMIT).value
    }
}

impl PeakFactorModel for VanmarckePeakFactor {
    fn peak_factor(&self, duration: f64, moments: &mut SpectralMoments<'_>) -> f64 {
        let m0 = moments.get(0);
        let m1 = moments.get(1);
        let m2 = moments.get(2);
        Self::from_moments(duration, m0, m1, m2)
    }
}

/// Leaves the ground-motion duration untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantDuration;

impl DurationModel for ConstantDuration {
    fn duration_rms(
        &self,
        duration: f64,
        _oscillator: Oscillator,
        _freq: &[f64],
        _site_tf: &[Complex64],
    ) -> f64 {
        duration
    }
}

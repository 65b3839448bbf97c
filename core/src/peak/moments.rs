use std::collections::HashMap;
use std::f64::consts::PI;

/// Spectral moments of one squared Fourier amplitude spectrum.
///
/// Built per peak calculation and dropped afterwards; the cache never outlives
/// the spectrum it was computed from.
#[derive(Debug, Clone)]
pub struct SpectralMoments<'a> {
    freq: &'a [f64],
    squared: Vec<f64>,
    cache: HashMap<i32, f64>,
}

impl<'a> SpectralMoments<'a> {
    pub fn new(freq: &'a [f64], fourier_amps: &[f64]) -> Self {
        Self {
            freq,
            squared: fourier_amps.iter().map(|a| a * a).collect(),
            cache: HashMap::new(),
        }
    }

    /// Moment of order `power`: `2 ∫ (2πf)^n |FA(f)|² df` by the trapezoid rule.
    pub fn get(&mut self, power: i32) -> f64 {
        if let Some(&value) = self.cache.get(&power) {
            return value;
        }
        let value = self.compute(power);
        self.cache.insert(power, value);
        value
    }

    fn compute(&self, power: i32) -> f64 {
        let weighted = |i: usize| (2.0 * PI * self.freq[i]).powi(power) * self.squared[i];
        let n = self.freq.len().min(self.squared.len());
        // The trapezoid halving cancels the leading factor of two.
        (1..n)
            .map(|i| (self.freq[i] - self.freq[i - 1]) * (weighted(i - 1) + weighted(i)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_spectrum_zeroth_moment_matches_trapezoid() {
        let freq = [0.1, 0.3, 1.0, 2.5, 7.0];
        let amps = [2.0; 5];
        let mut moments = SpectralMoments::new(&freq, &amps);
        let expected = 2.0 * 4.0 * (7.0 - 0.1);
        assert!((moments.get(0) - expected).abs() < 1e-12);
    }

    #[test]
    fn second_moment_weights_by_angular_frequency() {
        let freq = [1.0, 2.0];
        let amps = [1.0, 1.0];
        let mut moments = SpectralMoments::new(&freq, &amps);
        let w1 = (2.0 * PI).powi(2);
        let w2 = (4.0 * PI).powi(2);
        assert!((moments.get(2) - (w1 + w2)).abs() < 1e-9);
        // Cached value is returned unchanged.
        assert_eq!(moments.get(2), moments.get(2));
    }
}

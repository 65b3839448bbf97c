use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Helper that wraps a pair of `rustfft` plans for real-valued series of one length.
///
/// The forward transform keeps the `n / 2 + 1` non-negative frequencies; the
/// inverse rebuilds the Hermitian spectrum and normalises by `n`.
pub struct FftHelper {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch = vec![Complex64::zero(); size];
        Self {
            forward,
            inverse,
            scratch,
        }
    }

    pub fn len(&self) -> usize {
        self.scratch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scratch.is_empty()
    }

    /// Real-input forward transform, zero-padding (or truncating) `input` to the plan length.
    pub fn forward(&mut self, input: &[f64]) -> Vec<Complex64> {
        let size = self.scratch.len();
        for (slot, value) in self
            .scratch
            .iter_mut()
            .zip(input.iter().copied().chain(std::iter::repeat(0.0)))
        {
            *slot = Complex64::new(value, 0.0);
        }
        self.forward.process(&mut self.scratch);
        self.scratch[..size / 2 + 1].to_vec()
    }

    /// Inverse of [`FftHelper::forward`]: takes `n / 2 + 1` bins and returns `n` real samples.
    pub fn inverse(&mut self, spectrum: &[Complex64]) -> Vec<f64> {
        let size = self.scratch.len();
        let half = size / 2;
        self.scratch.iter_mut().for_each(|c| *c = Complex64::zero());
        for (k, value) in spectrum.iter().take(half + 1).enumerate() {
            if k == 0 || k == half {
                self.scratch[k] = Complex64::new(value.re, 0.0);
            } else {
                self.scratch[k] = *value;
                self.scratch[size - k] = value.conj();
            }
        }
        self.inverse.process(&mut self.scratch);
        let scale = 1.0 / size as f64;
        self.scratch.iter().map(|c| c.re * scale).collect()
    }
}

/// Smallest power of two strictly greater than `count`.
pub fn next_pow2_above(count: usize) -> usize {
    let mut n = 1;
    while n <= count {
        n <<= 1;
    }
    n
}

/// Inverse transform of `m` non-negative bins into `2 (m - 1)` real samples.
pub fn real_ifft(spectrum: &[Complex64]) -> Vec<f64> {
    if spectrum.len() < 2 {
        return spectrum.iter().map(|c| c.re).collect();
    }
    FftHelper::new(2 * (spectrum.len() - 1)).inverse(spectrum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_helper_returns_half_spectrum() {
        let mut helper = FftHelper::new(4);
        let output = helper.forward(&[1.0, 0.0, -1.0, 0.0]);
        assert_eq!(output.len(), 3);
        assert!((output[1].re - 2.0).abs() < 1e-12);
    }

    #[test]
    fn round_trip_recovers_zero_padded_signal() {
        let signal: Vec<f64> = (0..300)
            .map(|i| (i as f64 * 0.07).sin() * (-(i as f64) / 150.0).exp())
            .collect();
        let n = next_pow2_above(signal.len());
        assert_eq!(n, 512);
        let spectrum = FftHelper::new(n).forward(&signal);
        let recovered = real_ifft(&spectrum);
        assert_eq!(recovered.len(), n);
        for (i, value) in recovered.iter().enumerate() {
            let expected = signal.get(i).copied().unwrap_or(0.0);
            assert!((value - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn next_pow2_is_strictly_greater() {
        assert_eq!(next_pow2_above(0), 1);
        assert_eq!(next_pow2_above(4), 8);
        assert_eq!(next_pow2_above(5), 8);
    }
}

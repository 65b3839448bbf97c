//! Frequency- and time-domain ground motions.

pub mod compatible;
pub mod import;
pub mod response_spectrum;
pub mod rvt;
pub mod rvt_motion;
pub mod source_theory;
pub mod time_series;

use num_complex::Complex64;

pub use compatible::{CompatibleRvtMotion, CompatibleSettings, MatchReport};
pub use import::{ImportedRvtMotion, TimeSeriesLayout};
pub use response_spectrum::ResponseSpectrum;
pub use rvt::{FasMotion, RvtBase};
pub use rvt_motion::RvtMotion;
pub use source_theory::{SourceParameters, SourceTheoryRvtMotion};
pub use time_series::{InputUnits, TimeSeriesFormat, TimeSeriesKind, TimeSeriesMotion};

/// Acceleration transfer function of a damped single-degree-of-freedom oscillator.
///
/// `damping` is in percent.
pub fn sdof_transfer_function(freq: &[f64], period: f64, damping: f64) -> Vec<Complex64> {
    let natural = 1.0 / period;
    let ratio = damping / 100.0;
    freq.iter()
        .map(|&f| {
            let denominator =
                Complex64::new(f * f - natural * natural, -2.0 * ratio * natural * f);
            Complex64::new(-natural * natural, 0.0) / denominator
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdof_is_unity_at_rest_and_peaks_at_resonance() {
        let tf = sdof_transfer_function(&[0.0, 1.0, 100.0], 1.0, 5.0);
        assert!((tf[0].norm() - 1.0).abs() < 1e-12);
        // Resonant amplification is 1 / (2 ζ).
        assert!((tf[1].norm() - 10.0).abs() < 1e-9);
        assert!(tf[2].norm() < 1e-3);
    }
}

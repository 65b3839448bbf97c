use num_complex::Complex64;

use super::{BooreThompsonDuration, DurationModel, DurationTables};
use crate::prelude::{Oscillator, Scenario};

#[derive(Debug, Clone, Copy)]
struct ModeCoefficients {
    a: f64,
    b: f64,
    d: f64,
    e: f64,
    sd: f64,
}

const MODE_COEFFICIENTS: [ModeCoefficients; 3] = [
    ModeCoefficients {
        a: 0.2688,
        b: 0.0030,
        d: 1.8380,
        e: -0.0198,
        sd: 0.091,
    },
    ModeCoefficients {
        a: 0.2555,
        b: -0.0002,
        d: 1.2154,
        e: -0.0183,
        sd: 0.081,
    },
    ModeCoefficients {
        a: 0.2287,
        b: -0.0014,
        d: 0.9404,
        e: -0.0130,
        sd: 0.056,
    },
];

const MODE_OFFSET: usize = 2;
const AMPLIFICATION_THRESHOLD: f64 = 1.1;

/// Resonant site mode picked from a transfer function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteMode {
    pub freq: f64,
    pub amplitude: f64,
}

/// Wang & Rathje (2018) site-resonance correction layered over Boore–Thompson.
#[derive(Debug, Clone)]
pub struct WangRathjeDuration {
    base: BooreThompsonDuration,
}

impl WangRathjeDuration {
    pub fn new(tables: DurationTables) -> Self {
        Self::wrap(BooreThompsonDuration::new(tables))
    }

    pub fn wrap(base: BooreThompsonDuration) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BooreThompsonDuration {
        &self.base
    }

    /// Up to three strict local maxima of `|tf|`, lowest frequency first.
    pub fn find_modes(freq: &[f64], site_tf: &[Complex64]) -> Vec<SiteMode> {
        let amps: Vec<f64> = site_tf.iter().map(|c| c.norm()).collect();
        let mut modes = Vec::new();
        if amps.len() <= 2 * MODE_OFFSET {
            return modes;
        }
        for i in MODE_OFFSET..amps.len() - MODE_OFFSET {
            let peak = (i - MODE_OFFSET..=i + MODE_OFFSET)
                .filter(|&j| j != i)
                .all(|j| amps[j] < amps[i]);
            if peak {
                modes.push(SiteMode {
                    freq: freq[i],
                    amplitude: amps[i],
                });
                if modes.len() == MODE_COEFFICIENTS.len() {
                    break;
                }
            }
        }
        modes
    }

    /// Duration of a rock-site oscillator relative to the ground-motion duration.
    pub fn rock_duration(duration: f64, osc_freq: f64) -> f64 {
        if osc_freq < 0.1 {
            return duration;
        }
        let f_lim = 5.274 * duration.powf(-0.640);
        if osc_freq >= f_lim {
            return duration;
        }
        let dur0 = 31.858 * duration.powf(-0.849);
        let dur_min = 1.009 * duration / (3.583 + duration);
        let b = 1.0 / (dur0 - dur_min);
        let a = (1.0 / (dur0 - 1.0) - b) * (f_lim - 0.1);
        duration * (dur0 - (osc_freq - 0.1) / (a + b * (osc_freq - 0.1)))
    }

    /// Additional oscillator duration from site resonance.
    pub fn soil_increment(duration: f64, osc_freq: f64, modes: &[SiteMode]) -> f64 {
        let Some(first) = modes.first() else {
            return 0.0;
        };
        let af_ratio = first.amplitude / first.freq;
        modes
            .iter()
            .zip(MODE_COEFFICIENTS.iter())
            .map(|(mode, coef)| {
                let c = coef.a * af_ratio + coef.b * af_ratio.powi(2);
                let m = coef.d * af_ratio + coef.e * af_ratio.powi(2);
                let amplitude = c * (-duration / m).exp();
                let spread = (osc_freq / mode.freq).ln();
                amplitude * (-spread * spread / (2.0 * coef.sd * coef.sd)).exp()
            })
            .sum()
    }

    fn valid_transfer_function(freq: &[f64], site_tf: &[Complex64]) -> bool {
        !site_tf.is_empty()
            && site_tf.len() == freq.len()
            && site_tf.iter().any(|c| c.norm() > AMPLIFICATION_THRESHOLD)
    }
}

impl DurationModel for WangRathjeDuration {
    fn set_scenario(&mut self, scenario: &Scenario) {
        self.base.set_scenario(scenario);
    }

    fn duration_rms(
        &self,
        duration: f64,
        oscillator: Oscillator,
        freq: &[f64],
        site_tf: &[Complex64],
    ) -> f64 {
        let base = self.base.duration_rms(duration, oscillator, freq, site_tf);
        if !oscillator.is_active() || !Self::valid_transfer_function(freq, site_tf) {
            return base;
        }
        let modes = Self::find_modes(freq, site_tf);
        if modes.is_empty() {
            return base;
        }
        let rock = Self::rock_duration(duration, oscillator.freq);
        let increment = Self::soil_increment(duration, oscillator.freq, &modes);
        base * (rock + increment) / rock
    }
}

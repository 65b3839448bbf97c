//! Random-vibration-theory peak estimation.
//!
//! A [`PeakCalculator`] pairs a peak-factor model with a duration model. The
//! duration models stack: Wang–Rathje wraps Boore–Thompson, which corrects the
//! unchanged ground-motion duration used by Vanmarcke alone.

pub mod boore_thompson;
pub mod moments;
pub mod vanmarcke;
pub mod wang_rathje;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub use boore_thompson::{BooreThompsonDuration, CoefficientTables, DurationTables};
pub use moments::SpectralMoments;
pub use vanmarcke::{ConstantDuration, VanmarckePeakFactor};
pub use wang_rathje::{SiteMode, WangRathjeDuration};

use crate::prelude::{MotionError, MotionResult, Oscillator, Scenario};

/// Ratio of expected peak to RMS response.
pub trait PeakFactorModel: Debug + Send + Sync {
    fn peak_factor(&self, duration: f64, moments: &mut SpectralMoments<'_>) -> f64;
}

/// Duration used for the RMS response.
pub trait DurationModel: Debug + Send + Sync {
    fn set_scenario(&mut self, _scenario: &Scenario) {}

    fn duration_rms(
        &self,
        duration: f64,
        oscillator: Oscillator,
        freq: &[f64],
        site_tf: &[Complex64],
    ) -> f64;
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PeakCalculatorKind {
    #[default]
    Vanmarcke,
    BooreThompson,
    WangRathje,
}

impl PeakCalculatorKind {
    /// Whether the kind needs Boore–Thompson coefficient tables.
    pub fn needs_tables(&self) -> bool {
        !matches!(self, PeakCalculatorKind::Vanmarcke)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PeakCalculatorKind::Vanmarcke => "Vanmarcke (1976)",
            PeakCalculatorKind::BooreThompson => "Boore & Thompson (2015)",
            PeakCalculatorKind::WangRathje => "Wang & Rathje (2018)",
        }
    }
}

/// Expected peak response of a Fourier amplitude spectrum.
#[derive(Debug)]
pub struct PeakCalculator {
    kind: Option<PeakCalculatorKind>,
    peak_factor: Box<dyn PeakFactorModel>,
    duration: Box<dyn DurationModel>,
}

impl PeakCalculator {
    /// Built-in calculator that needs no coefficient tables.
    ///
    /// Kinds with a duration correction fail here; build those with [`PeakCalculator::with_tables`].
    pub fn new(kind: PeakCalculatorKind) -> MotionResult<Self> {
        if kind.needs_tables() {
            return Err(MotionError::Coefficients(format!(
                "{} needs duration coefficient tables",
                kind.label()
            )));
        }
        Ok(Self::with_duration(kind, Box::new(ConstantDuration)))
    }

    /// Built-in calculator drawing any duration correction from `tables`.
    pub fn with_tables(kind: PeakCalculatorKind, tables: &DurationTables) -> Self {
        let duration: Box<dyn DurationModel> = match kind {
            PeakCalculatorKind::Vanmarcke => Box::new(ConstantDuration),
            PeakCalculatorKind::BooreThompson => {
                Box::new(BooreThompsonDuration::new(tables.clone()))
            }
            PeakCalculatorKind::WangRathje => Box::new(WangRathjeDuration::new(tables.clone())),
        };
        Self::with_duration(kind, duration)
    }

    fn with_duration(kind: PeakCalculatorKind, duration: Box<dyn DurationModel>) -> Self {
        Self {
            kind: Some(kind),
            peak_factor: Box::new(VanmarckePeakFactor),
            duration,
        }
    }

    /// Vanmarcke peak factor without any duration correction.
    pub fn vanmarcke() -> Self {
        Self::from_parts(Box::new(VanmarckePeakFactor), Box::new(ConstantDuration))
    }

    pub fn from_parts(
        peak_factor: Box<dyn PeakFactorModel>,
        duration: Box<dyn DurationModel>,
    ) -> Self {
        Self {
            kind: None,
            peak_factor,
            duration,
        }
    }

    /// Built-in kind, `None` for custom compositions.
    pub fn kind(&self) -> Option<PeakCalculatorKind> {
        self.kind
    }

    pub fn set_scenario(&mut self, scenario: &Scenario) {
        self.duration.set_scenario(scenario);
    }

    pub fn duration_rms(
        &self,
        duration: f64,
        oscillator: Oscillator,
        freq: &[f64],
        site_tf: &[Complex64],
    ) -> f64 {
        self.duration.duration_rms(duration, oscillator, freq, site_tf)
    }

    /// `peakFactor · sqrt(m0 / durationRms)` for the spectrum `fourier_amps` sampled at `freq`.
    pub fn calc_peak(
        &self,
        duration: f64,
        freq: &[f64],
        fourier_amps: &[f64],
        oscillator: Oscillator,
        site_tf: &[Complex64],
    ) -> f64 {
        let mut moments = SpectralMoments::new(freq, fourier_amps);
        let m0 = moments.get(0);
        if m0 <= 0.0 || duration <= 0.0 {
            return 0.0;
        }
        let peak_factor = self.peak_factor.peak_factor(duration, &mut moments);
        let duration_rms = self.duration_rms(duration, oscillator, freq, site_tf);
        peak_factor * (m0 / duration_rms).sqrt()
    }
}

impl Default for PeakCalculator {
    fn default() -> Self {
        Self::vanmarcke()
    }
}

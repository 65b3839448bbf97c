use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::motion::ResponseSpectrum;

/// Tectonic region that selects the empirical defaults of a scenario.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    #[default]
    Wus,
    Ceus,
    Unknown,
}

impl Region {
    pub fn label(&self) -> &'static str {
        match self {
            Region::Wus => "Western NA",
            Region::Ceus => "Eastern NA",
            Region::Unknown => "Unknown",
        }
    }
}

/// Earthquake scenario driving the source model and the duration corrections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub magnitude: f64,
    /// Epicentral distance (km).
    pub distance: f64,
    pub region: Region,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            magnitude: 6.0,
            distance: 20.0,
            region: Region::Wus,
        }
    }
}

impl Scenario {
    pub fn new(magnitude: f64, distance: f64, region: Region) -> Self {
        Self {
            magnitude,
            distance,
            region,
        }
    }
}

/// Single-degree-of-freedom oscillator; a zero frequency or damping marks a ground-motion peak.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Oscillator {
    /// Natural frequency (Hz).
    pub freq: f64,
    /// Damping ratio (%).
    pub damping: f64,
}

impl Oscillator {
    pub const NONE: Oscillator = Oscillator {
        freq: 0.0,
        damping: 0.0,
    };

    pub fn new(freq: f64, damping: f64) -> Self {
        Self { freq, damping }
    }

    pub fn is_active(&self) -> bool {
        self.freq > 0.0 && self.damping > 0.0
    }
}

/// Wave field represented by an input motion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum MotionType {
    #[default]
    Outcrop,
    Within,
    IncomingOnly,
}

impl MotionType {
    /// Parses either the integer index or a label prefix ("Outcrop", "Within", "Incoming").
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(index) = text.parse::<usize>() {
            return match index {
                0 => Some(MotionType::Outcrop),
                1 => Some(MotionType::Within),
                2 => Some(MotionType::IncomingOnly),
                _ => None,
            };
        }
        if text.is_empty() {
            return None;
        }
        [
            ("Outcrop", MotionType::Outcrop),
            ("Within", MotionType::Within),
            ("Incoming Only", MotionType::IncomingOnly),
        ]
        .into_iter()
        .find(|(label, _)| label.starts_with(text))
        .map(|(_, kind)| kind)
    }
}

/// Common error type for motion construction, import and calculation.
#[derive(thiserror::Error, Debug)]
pub enum MotionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("coefficient table: {0}")]
    Coefficients(String),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),
}

pub type MotionResult<T> = Result<T, MotionError>;

/// Cooperative cancellation flag shared between a caller and a long-running calculation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Surface shared by every ground motion, whether represented by a FAS or a time series.
///
/// An empty transfer-function slice means "no transfer function applied".
pub trait Motion {
    fn name(&self) -> String;
    fn freq(&self) -> &[f64];
    fn calculate(&mut self) -> MotionResult<()>;
    fn pga(&self) -> f64;
    fn pgv(&self) -> f64;
    fn response_spectrum(&self) -> &ResponseSpectrum;
    fn response_spectrum_mut(&mut self) -> &mut ResponseSpectrum;
    fn max_accel(&self, tf: &[Complex64]) -> f64;
    fn max_vel(&self, tf: &[Complex64]) -> f64;
    fn max_disp(&self, tf: &[Complex64]) -> f64;
    fn calc_max_strain(&self, tf: &[Complex64]) -> f64;
    fn compute_sa(&self, periods: &[f64], damping: f64, accel_tf: &[Complex64]) -> Vec<f64>;
    fn abs_fourier_acc(&self, tf: &[Complex64]) -> Vec<f64>;
    fn abs_fourier_vel(&self, tf: &[Complex64]) -> Vec<f64>;

    fn freq_min(&self) -> f64 {
        self.freq().first().copied().unwrap_or(0.0)
    }

    fn freq_max(&self) -> f64 {
        self.freq().last().copied().unwrap_or(0.0)
    }
}

use serde::{Deserialize, Serialize};

use crate::math::grid::log_space;
use crate::prelude::{MotionError, MotionResult};

/// Pseudo-spectral acceleration (g) at a set of oscillator periods (s).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseSpectrum {
    period: Vec<f64>,
    sa: Vec<f64>,
    /// Damping ratio (%).
    damping: f64,
}

impl Default for ResponseSpectrum {
    fn default() -> Self {
        Self {
            period: log_space(0.01, 5.0, 60),
            sa: Vec::new(),
            damping: 5.0,
        }
    }
}

impl ResponseSpectrum {
    pub fn new(period: Vec<f64>, damping: f64) -> Self {
        Self {
            period,
            sa: Vec::new(),
            damping,
        }
    }

    /// Spectrum with values, e.g. a matching target.
    pub fn with_values(period: Vec<f64>, sa: Vec<f64>, damping: f64) -> MotionResult<Self> {
        if period.len() != sa.len() {
            return Err(MotionError::InvalidInput(format!(
                "{} periods but {} spectral accelerations",
                period.len(),
                sa.len()
            )));
        }
        Ok(Self {
            period,
            sa,
            damping,
        })
    }

    pub fn period(&self) -> &[f64] {
        &self.period
    }

    pub fn sa(&self) -> &[f64] {
        &self.sa
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn set_damping(&mut self, damping: f64) {
        self.damping = damping;
    }

    /// Replaces the periods and discards the now stale accelerations.
    pub fn set_period(&mut self, period: Vec<f64>) {
        self.period = period;
        self.sa.clear();
    }

    pub fn set_sa(&mut self, sa: Vec<f64>) {
        self.sa = sa;
    }

    pub fn set_row(&mut self, row: usize, period: f64, sa: f64) -> MotionResult<()> {
        if row >= self.len() {
            return Err(MotionError::InvalidInput(format!(
                "no response spectrum row {}",
                row
            )));
        }
        self.period[row] = period;
        self.sa[row] = sa;
        Ok(())
    }

    pub fn scale_by(&mut self, scale: f64) {
        self.sa.iter_mut().for_each(|v| *v *= scale);
    }

    /// Number of complete `(period, sa)` rows.
    pub fn len(&self) -> usize {
        self.period.len().min(self.sa.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert_rows(&mut self, row: usize, count: usize) {
        let row = row.min(self.len());
        for _ in 0..count {
            self.period.insert(row, 0.0);
            self.sa.insert(row, 0.0);
        }
    }

    pub fn remove_rows(&mut self, row: usize, count: usize) {
        let start = row.min(self.len());
        let end = (row + count).min(self.len());
        self.period.drain(start..end);
        self.sa.drain(start..end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_spans_short_to_long_periods() {
        let spectrum = ResponseSpectrum::default();
        assert_eq!(spectrum.period().len(), 60);
        assert!((spectrum.period()[0] - 0.01).abs() < 1e-12);
        assert_eq!(spectrum.damping(), 5.0);
        assert!(spectrum.is_empty());
    }

    #[test]
    fn changing_periods_clears_values() {
        let mut spectrum =
            ResponseSpectrum::with_values(vec![0.1, 1.0], vec![0.5, 0.2], 5.0).unwrap();
        spectrum.scale_by(2.0);
        assert_eq!(spectrum.sa(), &[1.0, 0.4]);
        spectrum.set_period(vec![0.2, 2.0]);
        assert!(spectrum.sa().is_empty());
    }

    #[test]
    fn rows_can_be_inserted_and_removed() {
        let mut spectrum =
            ResponseSpectrum::with_values(vec![0.1, 1.0], vec![0.5, 0.2], 5.0).unwrap();
        spectrum.insert_rows(1, 1);
        spectrum.set_row(1, 0.5, 0.3).unwrap();
        assert_eq!(spectrum.period(), &[0.1, 0.5, 1.0]);
        spectrum.remove_rows(0, 2);
        assert_eq!(spectrum.sa(), &[0.2]);
        assert!(spectrum.set_row(3, 1.0, 1.0).is_err());
    }
}

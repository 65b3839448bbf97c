use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{sdof_transfer_function, ResponseSpectrum};
use crate::math::fft::{next_pow2_above, real_ifft};
use crate::math::{FftHelper, MatrixHelper, StatsHelper};
use crate::prelude::{Motion, MotionError, MotionResult, MotionType};
use crate::telemetry::LogManager;
use crate::units::UnitSystem;

/// Polynomial terms used by the baseline correction.
const BASELINE_TERMS: usize = 4;
/// Oscillator frequencies are resolved up to this multiple in the time domain.
const OVERSAMPLING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSeriesKind {
    Acceleration,
    Velocity,
    Displacement,
}

impl TimeSeriesKind {
    fn integrations(self) -> usize {
        match self {
            TimeSeriesKind::Acceleration => 0,
            TimeSeriesKind::Velocity => 1,
            TimeSeriesKind::Displacement => 2,
        }
    }
}

/// Units of the acceleration values in a record file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputUnits {
    #[default]
    Gravity,
    CentimetersPerSecondSquared,
    InchesPerSecondSquared,
    MetersPerSecondSquared,
}

impl InputUnits {
    /// Factor converting a value in these units to g.
    pub fn factor(&self) -> f64 {
        match self {
            InputUnits::Gravity => 1.0,
            InputUnits::CentimetersPerSecondSquared => 1.0 / (100.0 * 9.80665),
            InputUnits::InchesPerSecondSquared => 1.0 / (12.0 * 32.174),
            InputUnits::MetersPerSecondSquared => 1.0 / 9.80665,
        }
    }
}

/// Layout of the values in a record file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSeriesFormat {
    /// Every number on a line is a consecutive sample.
    #[default]
    Rows,
    /// One sample per line, taken from the data column.
    Columns,
}

/// Recorded acceleration history (g) with its Fourier transforms.
#[derive(Debug)]
pub struct TimeSeriesMotion {
    name: String,
    description: String,
    motion_type: MotionType,
    time_step: f64,
    accel: Vec<f64>,
    scale: f64,
    freq: Vec<f64>,
    fourier_acc: Vec<Complex64>,
    fourier_vel: Vec<Complex64>,
    response_spectrum: ResponseSpectrum,
    units: UnitSystem,
    pga: f64,
    pgv: f64,
    logger: LogManager,
}

impl TimeSeriesMotion {
    pub fn new(name: impl Into<String>, time_step: f64, accel: Vec<f64>) -> MotionResult<Self> {
        if accel.is_empty() {
            return Err(MotionError::InvalidInput("time series has no samples".into()));
        }
        if time_step <= 0.0 {
            return Err(MotionError::InvalidInput(format!(
                "time step must be positive, got {}",
                time_step
            )));
        }
        Ok(Self {
            name: name.into(),
            description: String::new(),
            motion_type: MotionType::Outcrop,
            time_step,
            accel,
            scale: 1.0,
            freq: Vec::new(),
            fourier_acc: Vec::new(),
            fourier_vel: Vec::new(),
            response_spectrum: ResponseSpectrum::default(),
            units: UnitSystem::default(),
            pga: 0.0,
            pgv: 0.0,
            logger: LogManager::new("time-series"),
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn motion_type(&self) -> MotionType {
        self.motion_type
    }

    pub fn set_motion_type(&mut self, motion_type: MotionType) {
        self.motion_type = motion_type;
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn set_units(&mut self, units: UnitSystem) {
        self.units = units;
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn point_count(&self) -> usize {
        self.accel.len()
    }

    pub fn accel(&self) -> &[f64] {
        &self.accel
    }

    pub fn freq_nyquist(&self) -> f64 {
        1.0 / (2.0 * self.time_step)
    }

    pub fn time(&self) -> Vec<f64> {
        (0..self.accel.len())
            .map(|i| i as f64 * self.time_step)
            .collect()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Records the scale already applied to the samples on import.
    pub(crate) fn set_loaded_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    /// Rescales the record and everything derived from it.
    pub fn set_scale(&mut self, scale: f64) {
        if (self.scale - scale).abs() <= f64::EPSILON {
            return;
        }
        let ratio = scale / self.scale;
        self.scale = scale;
        self.accel.iter_mut().for_each(|a| *a *= ratio);
        self.fourier_acc.iter_mut().for_each(|c| *c *= ratio);
        self.fourier_vel.iter_mut().for_each(|c| *c *= ratio);
        self.response_spectrum.scale_by(ratio);
        self.pga *= ratio;
        self.pgv *= ratio;
    }

    fn integrate(&self, samples: &[f64]) -> Vec<f64> {
        StatsHelper::integrate(samples, self.time_step)
    }

    /// Inverse transform of `fa` after applying `tf`, zero-padding `fa` to the length of `tf`.
    fn calc_time_series(&self, fa: &[Complex64], tf: &[Complex64]) -> Vec<f64> {
        if tf.is_empty() {
            return real_ifft(fa);
        }
        let size = fa.len().max(tf.len());
        let product: Vec<Complex64> = (0..size)
            .map(|i| {
                let amp = fa.get(i).copied().unwrap_or_default();
                let gain = tf.get(i).copied().unwrap_or_default();
                amp * gain
            })
            .collect();
        real_ifft(&product)
    }

    /// Acceleration, velocity or displacement history through `tf`.
    pub fn time_series(
        &self,
        kind: TimeSeriesKind,
        tf: &[Complex64],
        baseline_correct: bool,
    ) -> Vec<f64> {
        let mut ts = self.calc_time_series(&self.fourier_acc, tf);
        ts.truncate(self.accel.len());

        if baseline_correct {
            let disp = self.integrate(&self.integrate(&ts));
            match self.baseline_fit(BASELINE_TERMS, &disp) {
                Some(coeffs) => {
                    let trend = self.acceleration_trend(&coeffs, ts.len());
                    ts.iter_mut().zip(trend).for_each(|(a, t)| *a -= t);
                }
                None => self
                    .logger
                    .warning("baseline fit is singular, leaving the record uncorrected"),
            }
        }

        for _ in 0..kind.integrations() {
            ts = self.integrate(&ts);
        }
        if kind != TimeSeriesKind::Acceleration {
            let conv = self.units.ts_conv();
            ts.iter_mut().for_each(|v| *v *= conv);
        }
        ts
    }

    /// Least-squares polynomial `Σ c_j τ^j` of `series`, with `τ = t / T` and
    /// the constant and linear coefficients held at zero.
    pub fn baseline_fit(&self, terms: usize, series: &[f64]) -> Option<Vec<f64>> {
        if terms < 3 || series.len() < terms {
            return None;
        }
        let span = self.span(series.len());
        let design = Array2::from_shape_fn((series.len(), terms - 2), |(i, j)| {
            (i as f64 * self.time_step / span).powi(j as i32 + 2)
        });
        let rhs = Array1::from_vec(series.to_vec());
        let fitted = MatrixHelper::least_squares(design.view(), rhs.view())?;
        let mut coeffs = vec![0.0; 2];
        coeffs.extend(fitted.iter());
        Some(coeffs)
    }

    fn span(&self, count: usize) -> f64 {
        (count.saturating_sub(1) as f64 * self.time_step).max(self.time_step)
    }

    /// Second derivative in time of the fitted displacement polynomial.
    fn acceleration_trend(&self, coeffs: &[f64], count: usize) -> Vec<f64> {
        let span = self.span(count);
        (0..count)
            .map(|i| {
                let tau = i as f64 * self.time_step / span;
                coeffs
                    .iter()
                    .enumerate()
                    .skip(2)
                    .map(|(j, c)| (j * (j - 1)) as f64 * c * tau.powi(j as i32 - 2))
                    .sum::<f64>()
                    / (span * span)
            })
            .collect()
    }

    /// Velocity through `tf` without the unit conversion, optionally mean-removed.
    pub fn strain_time_series(&self, tf: &[Complex64], baseline_correct: bool) -> Vec<f64> {
        let mut strain = self.calc_time_series(&self.fourier_vel, tf);
        strain.truncate(self.accel.len());
        if baseline_correct && !strain.is_empty() {
            let mean = strain.iter().sum::<f64>() / strain.len() as f64;
            strain.iter_mut().for_each(|v| *v -= mean);
        }
        strain
    }

    /// Cumulative Arias intensity of the acceleration through `tf`, over the recorded samples.
    pub fn arias_intensity(&self, tf: &[Complex64]) -> Vec<f64> {
        let mut accel = self.calc_time_series(&self.fourier_acc, tf);
        accel.truncate(self.accel.len());
        let factor = self.time_step * PI / (4.0 * self.units.gravity());
        let mut total = 0.0;
        let mut ai = Vec::with_capacity(accel.len());
        for (i, a) in accel.iter().enumerate() {
            if i > 0 {
                total += factor * (accel[i - 1].powi(2) + a.powi(2));
            }
            ai.push(total);
        }
        ai
    }

    fn abs_fourier(&self, fa: &[Complex64], tf: &[Complex64]) -> Vec<f64> {
        fa.iter()
            .enumerate()
            .map(|(i, c)| {
                let gain = tf.get(i).copied().unwrap_or(Complex64::new(1.0, 0.0));
                (c * gain).norm() * self.time_step
            })
            .collect()
    }

    pub fn abs_fourier_disp(&self, tf: &[Complex64]) -> Vec<f64> {
        self.abs_fourier_vel(tf)
            .into_iter()
            .zip(&self.freq)
            .map(|(v, f)| if *f > 0.0 { v / (2.0 * PI * f) } else { 0.0 })
            .collect()
    }
}

impl Motion for TimeSeriesMotion {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn freq(&self) -> &[f64] {
        &self.freq
    }

    fn calculate(&mut self) -> MotionResult<()> {
        let n = next_pow2_above(self.accel.len());
        let mut padded = self.accel.clone();
        padded.resize(n, 0.0);
        let velocity = self.integrate(&padded);

        let mut fft = FftHelper::new(n);
        self.fourier_acc = fft.forward(&padded);
        self.fourier_vel = fft.forward(&velocity);

        let delta = 1.0 / (2.0 * self.time_step * (self.fourier_acc.len() - 1) as f64);
        self.freq = (0..self.fourier_acc.len())
            .map(|i| i as f64 * delta)
            .collect();

        self.pga = StatsHelper::max_abs(&padded);
        self.pgv = StatsHelper::max_abs(&velocity) * self.units.ts_conv();

        let sa = self.compute_sa(
            self.response_spectrum.period(),
            self.response_spectrum.damping(),
            &[],
        );
        self.response_spectrum.set_sa(sa);
        self.logger.detail(&format!(
            "{}: {} samples, PGA {:.4} g",
            self.name,
            self.accel.len(),
            self.pga
        ));
        Ok(())
    }

    fn pga(&self) -> f64 {
        self.pga
    }

    fn pgv(&self) -> f64 {
        self.pgv
    }

    fn response_spectrum(&self) -> &ResponseSpectrum {
        &self.response_spectrum
    }

    fn response_spectrum_mut(&mut self) -> &mut ResponseSpectrum {
        &mut self.response_spectrum
    }

    fn max_accel(&self, tf: &[Complex64]) -> f64 {
        StatsHelper::max_abs(&self.calc_time_series(&self.fourier_acc, tf))
    }

    fn max_vel(&self, tf: &[Complex64]) -> f64 {
        StatsHelper::max_abs(&self.time_series(TimeSeriesKind::Velocity, tf, false))
    }

    fn max_disp(&self, tf: &[Complex64]) -> f64 {
        StatsHelper::max_abs(&self.time_series(TimeSeriesKind::Displacement, tf, false))
    }

    fn calc_max_strain(&self, tf: &[Complex64]) -> f64 {
        StatsHelper::max_abs(&self.strain_time_series(tf, false))
    }

    /// Time-domain oscillator peaks with the spectrum oversampled so that the
    /// oscillator frequency stays well below the Nyquist frequency.
    fn compute_sa(&self, periods: &[f64], damping: f64, accel_tf: &[Complex64]) -> Vec<f64> {
        let nfreq = self.freq.len();
        if nfreq < 2 {
            return vec![0.0; periods.len()];
        }
        let delta_freq = self.freq[1] - self.freq[0];
        periods
            .iter()
            .map(|&period| {
                let f = 1.0 / period;
                let min_size = nfreq.max((f * OVERSAMPLING / delta_freq) as usize);
                let size = min_size.next_power_of_two() + 1;
                let scale = size as f64 / nfreq as f64;

                let mut tf: Vec<Complex64> = sdof_transfer_function(&self.freq, period, damping)
                    .into_iter()
                    .enumerate()
                    .map(|(j, h)| {
                        let site = accel_tf.get(j).copied().unwrap_or(Complex64::new(1.0, 0.0));
                        h * scale * site
                    })
                    .collect();
                tf.resize(size, Complex64::default());
                self.max_accel(&tf)
            })
            .collect()
    }

    fn abs_fourier_acc(&self, tf: &[Complex64]) -> Vec<f64> {
        self.abs_fourier(&self.fourier_acc, tf)
    }

    fn abs_fourier_vel(&self, tf: &[Complex64]) -> Vec<f64> {
        self.abs_fourier(&self.fourier_vel, tf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse() -> TimeSeriesMotion {
        let dt = 0.01;
        let accel: Vec<f64> = (0..1000)
            .map(|i| {
                let t = i as f64 * dt;
                0.3 * (2.0 * PI * 2.0 * t).sin() * (-((t - 4.0) / 1.5).powi(2)).exp()
            })
            .collect();
        let mut motion = TimeSeriesMotion::new("pulse", dt, accel).unwrap();
        motion.calculate().unwrap();
        motion
    }

    #[test]
    fn rejects_empty_or_zero_step_records() {
        assert!(TimeSeriesMotion::new("empty", 0.01, Vec::new()).is_err());
        assert!(TimeSeriesMotion::new("flat", 0.0, vec![0.1]).is_err());
    }

    #[test]
    fn spectrum_uses_next_power_of_two() {
        let motion = pulse();
        assert_eq!(motion.freq().len(), 513);
        assert!((motion.freq_max() - motion.freq_nyquist()).abs() < 1e-12);
        assert!((motion.pga() - StatsHelper::max_abs(motion.accel())).abs() < 1e-15);
    }

    #[test]
    fn unfiltered_acceleration_recovers_record() {
        let motion = pulse();
        let ts = motion.time_series(TimeSeriesKind::Acceleration, &[], false);
        assert_eq!(ts.len(), 1000);
        for (a, b) in ts.iter().zip(motion.accel()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert!((motion.max_accel(&[]) - motion.pga()).abs() < 1e-9);
    }

    #[test]
    fn short_period_sa_tracks_pga() {
        let motion = pulse();
        let sa = motion.compute_sa(&[0.01, 0.5], 5.0, &[]);
        assert!((sa[0] / motion.pga() - 1.0).abs() < 0.05);
        // A 2 Hz oscillator resonates with the pulse.
        assert!(sa[1] > motion.pga());
    }

    #[test]
    fn baseline_correction_removes_polynomial_drift() {
        let dt = 0.01;
        let accel: Vec<f64> = (0..2000).map(|i| 0.01 + 0.002 * i as f64 * dt).collect();
        let mut motion = TimeSeriesMotion::new("drift", dt, accel).unwrap();
        motion.calculate().unwrap();
        let raw = motion.time_series(TimeSeriesKind::Displacement, &[], false);
        let corrected = motion.time_series(TimeSeriesKind::Displacement, &[], true);
        assert!(StatsHelper::max_abs(&corrected) < 1e-3 * StatsHelper::max_abs(&raw));
    }

    #[test]
    fn scaling_updates_derived_values() {
        let mut motion = pulse();
        let pga = motion.pga();
        let sa = motion.response_spectrum().sa().to_vec();
        motion.set_scale(2.0);
        assert!((motion.pga() - 2.0 * pga).abs() < 1e-12);
        assert!((motion.response_spectrum().sa()[5] - 2.0 * sa[5]).abs() < 1e-12);
        assert!((motion.max_accel(&[]) - 2.0 * pga).abs() < 1e-9);
    }

    #[test]
    fn arias_intensity_is_non_decreasing() {
        let motion = pulse();
        let ai = motion.arias_intensity(&[]);
        assert_eq!(ai.len(), motion.point_count());
        assert_eq!(ai[0], 0.0);
        assert!(ai.windows(2).all(|w| w[1] >= w[0]));
        assert!(ai[ai.len() - 1] > 0.0);
    }

    #[test]
    fn strain_is_mean_removed_velocity() {
        let motion = pulse();
        let strain = motion.strain_time_series(&[], true);
        let mean = strain.iter().sum::<f64>() / strain.len() as f64;
        assert!(mean.abs() < 1e-12);
        let vel = motion.time_series(TimeSeriesKind::Velocity, &[], false);
        let conv = motion.units().ts_conv();
        assert!((motion.calc_max_strain(&[]) * conv - StatsHelper::max_abs(&vel)).abs() < 1e-6 * conv);
    }
}
